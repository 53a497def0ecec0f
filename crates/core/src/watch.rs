// Status watching
//
// Status transitions happen asynchronously on the backend. Watching is plain
// re-fetching on a fixed interval until the session reaches a terminal
// status; it is observation, not retry, so a failed fetch ends the watch.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::CmeApi;
use crate::error::ApiError;
use crate::session::{Session, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("timed out after {:?} waiting for session to finish (last status: {last})", .elapsed)]
    Timeout {
        elapsed: Duration,
        last: SessionStatus,
    },

    #[error("failed to fetch session: {0}")]
    Api(#[from] ApiError),
}

/// Poll `session_id` until it reaches `completed` or `error`.
///
/// `on_change` is called with the first snapshot and then whenever the status
/// differs from the previous poll. Returns the terminal snapshot.
pub async fn watch_session<F>(
    api: &dyn CmeApi,
    session_id: &str,
    options: WatchOptions,
    mut on_change: F,
) -> Result<Session, WatchError>
where
    F: FnMut(&Session),
{
    let start = Instant::now();
    let mut last: Option<SessionStatus> = None;

    loop {
        let session = api.get_session(session_id).await?;

        if last.as_ref() != Some(&session.status) {
            if let Some(previous) = &last {
                if !previous.can_reach(&session.status) {
                    warn!(
                        session_id,
                        from = %previous,
                        to = %session.status,
                        "Unexpected status transition"
                    );
                }
            }
            debug!(session_id, status = %session.status, "Session status changed");
            on_change(&session);
            last = Some(session.status.clone());
        }

        if session.status.is_terminal() {
            return Ok(session);
        }

        let elapsed = start.elapsed();
        if elapsed >= options.timeout {
            return Err(WatchError::Timeout {
                elapsed,
                last: session.status,
            });
        }

        tokio::time::sleep(options.interval).await;
    }
}
