// Session creation
//
// Client-side validation of the creation form followed by a single guarded
// submit. A submit issued while another is outstanding is ignored; the guard
// is released on every exit path so a failed submit can be retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{CmeApi, CreateSessionRequest};
use crate::config::Jurisdictions;
use crate::error::{ApiError, ValidationError};

const CREATE_FAILED_FALLBACK: &str = "Failed to create session";

/// Navigation targets of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "session_id", rename_all = "snake_case")]
pub enum Route {
    SessionList,
    SessionDetail(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::SessionList => "/".to_string(),
            Route::SessionDetail(id) => format!("/sessions/{}", id),
        }
    }
}

/// Creation form state. `mode` is not entered here; the backend defaults it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSessionForm {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub state: String,
    pub exam_date: String,
    pub case_id: String,
    pub attorney_name: String,
}

impl CreateSessionForm {
    /// Blank form with the first configured jurisdiction and today's date.
    pub fn new(jurisdictions: &Jurisdictions) -> Self {
        Self {
            state: jurisdictions.default_code().to_string(),
            exam_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            ..Default::default()
        }
    }

    /// Check required fields and build the request body.
    /// Blank optional fields are omitted from the request.
    pub fn validate(
        &self,
        jurisdictions: &Jurisdictions,
    ) -> Result<CreateSessionRequest, ValidationError> {
        let required = [
            ("patient_id", &self.patient_id),
            ("patient_name", &self.patient_name),
            ("doctor_name", &self.doctor_name),
            ("state", &self.state),
            ("exam_date", &self.exam_date),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(name));
            }
        }

        let state = self.state.trim();
        if !jurisdictions.contains(state) {
            return Err(ValidationError::UnknownJurisdiction(state.to_string()));
        }

        let exam_date = self.exam_date.trim();
        if NaiveDate::parse_from_str(exam_date, "%Y-%m-%d").is_err() {
            return Err(ValidationError::InvalidExamDate(exam_date.to_string()));
        }

        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        Ok(CreateSessionRequest {
            patient_id: self.patient_id.trim().to_string(),
            patient_name: self.patient_name.trim().to_string(),
            doctor_name: self.doctor_name.trim().to_string(),
            state: state.to_string(),
            exam_date: exam_date.to_string(),
            case_id: optional(&self.case_id),
            attorney_name: optional(&self.attorney_name),
        })
    }
}

#[derive(Error, Debug)]
pub enum CreateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Server or transport failure, carrying the text to show the user.
    #[error("{message}")]
    Server {
        message: String,
        #[source]
        source: ApiError,
    },
}

impl CreateError {
    fn from_api(source: ApiError) -> Self {
        let message = source
            .user_message()
            .unwrap_or(CREATE_FAILED_FALLBACK)
            .to_string();
        CreateError::Server { message, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// Session created; the caller navigates to `route` and refreshes the list.
    Created { session_id: String, route: Route },
    /// Another submit is still in flight; nothing was sent.
    AlreadySubmitting,
}

/// Submits creation forms, one at a time.
pub struct SessionCreator {
    api: Arc<dyn CmeApi>,
    jurisdictions: Jurisdictions,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionCreator {
    pub fn new(api: Arc<dyn CmeApi>, jurisdictions: Jurisdictions) -> Self {
        Self {
            api,
            jurisdictions,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn jurisdictions(&self) -> &Jurisdictions {
        &self.jurisdictions
    }

    /// Whether a submit is outstanding (the submit button is disabled).
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn submit(&self, form: &CreateSessionForm) -> Result<CreateOutcome, CreateError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(CreateOutcome::AlreadySubmitting);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let request = form.validate(&self.jurisdictions)?;

        match self.api.create_session(&request).await {
            Ok(session_id) => {
                info!(%session_id, state = %request.state, "Created CME session");
                let route = Route::SessionDetail(session_id.clone());
                Ok(CreateOutcome::Created { session_id, route })
            }
            Err(e) => {
                warn!(error = %e, "Failed to create CME session");
                Err(CreateError::from_api(e))
            }
        }
    }
}
