// Session collection filtering and aggregates
//
// Pure client-side derivations over the fetched session list. Nothing here
// is cached; callers recompute on every render.

use serde::Serialize;

use crate::session::{Session, SessionStatus};

/// List filter: exact jurisdiction match plus free-text search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Jurisdiction code; empty means all states.
    pub state: String,
    /// Case-insensitive substring of patient name, doctor name or session id.
    pub search: String,
}

impl SessionFilter {
    pub fn new(state: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            search: search.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty() && self.search.is_empty()
    }

    pub fn clear(&mut self) {
        self.state.clear();
        self.search.clear();
    }

    pub fn matches(&self, session: &Session) -> bool {
        let matches_state =
            self.state.is_empty() || session.state.as_deref() == Some(self.state.as_str());
        if !matches_state {
            return false;
        }
        if self.search.is_empty() {
            return true;
        }

        let needle = self.search.to_lowercase();
        let contains = |field: Option<&str>| {
            field
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false)
        };

        contains(session.patient_name.as_deref())
            || contains(session.doctor_name.as_deref())
            || contains(Some(session.session_id.as_str()))
    }
}

/// Apply a filter, preserving input order.
pub fn filter_sessions<'a>(sessions: &'a [Session], filter: &SessionFilter) -> Vec<&'a Session> {
    sessions.iter().filter(|s| filter.matches(s)).collect()
}

/// Aggregate counters shown above the session list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub total: usize,
    pub completed: usize,
    pub processing: usize,
    /// `created` + `recording_uploaded`
    pub pending: usize,
}

impl SessionStats {
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let count = |pred: fn(&SessionStatus) -> bool| {
            sessions.iter().filter(|s| pred(&s.status)).count()
        };

        Self {
            total: sessions.len(),
            completed: count(|s| *s == SessionStatus::Completed),
            processing: count(|s| *s == SessionStatus::Processing),
            pending: count(SessionStatus::is_pending),
        }
    }
}
