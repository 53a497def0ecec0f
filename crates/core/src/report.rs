// Report retrieval
//
// Reports are rendered by the backend. The dashboard only fetches a
// download link for completed sessions and never stores it.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::CmeApi;
use crate::error::ApiError;
use crate::session::{Session, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLink {
    pub session_id: String,
    pub download_url: String,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("report is only available for completed sessions (session is {0})")]
    NotAllowed(SessionStatus),

    #[error("report has no download link yet")]
    NoLink,

    #[error("failed to generate report: {0}")]
    Api(#[from] ApiError),
}

/// Fetch the report download link for a completed session.
pub async fn fetch_report(api: &dyn CmeApi, session: &Session) -> Result<ReportLink, ReportError> {
    if !session.status.allows_report() {
        return Err(ReportError::NotAllowed(session.status.clone()));
    }

    let response = api
        .get_report(&session.session_id)
        .await
        .inspect_err(|e| warn!(session_id = %session.session_id, error = %e, "Report request failed"))?;

    let download_url = response
        .download_url
        .filter(|url| !url.is_empty())
        .ok_or(ReportError::NoLink)?;
    info!(session_id = %session.session_id, "Report link issued");

    Ok(ReportLink {
        session_id: session.session_id.clone(),
        download_url,
    })
}
