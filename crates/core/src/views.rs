// Dashboard view models
//
// Each view owns its fetched data and re-fetches on entry. There is no
// shared cache. Fetch failures degrade to an empty list or a "not found"
// detail state instead of propagating.

use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::badge::{status_badge, StatusBadge};
use crate::client::CmeApi;
use crate::error::ApiError;
use crate::query::{filter_sessions, SessionFilter, SessionStats};
use crate::session::Session;

const NOT_SET: &str = "Not set";
const NOT_AVAILABLE: &str = "N/A";

/// One line of the session list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRow {
    pub session_id: String,
    pub patient_name: String,
    pub badge: StatusBadge,
    pub state: String,
    pub doctor_name: String,
    pub exam_date: String,
    pub mode: String,
    pub attorney_name: Option<String>,
}

impl SessionRow {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.session_id.clone(),
            patient_name: or_placeholder(&session.patient_name, "Unnamed Patient"),
            badge: status_badge(&session.status),
            state: session.state.clone().unwrap_or_default(),
            doctor_name: or_placeholder(&session.doctor_name, NOT_AVAILABLE),
            exam_date: or_placeholder(&session.exam_date, NOT_SET),
            mode: or_placeholder(&session.mode, NOT_AVAILABLE),
            attorney_name: session.attorney_name.clone().filter(|a| !a.is_empty()),
        }
    }
}

fn or_placeholder(value: &Option<String>, placeholder: &str) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(placeholder)
        .to_string()
}

/// Session list: all sessions plus the active filter.
#[derive(Debug, Clone, Default)]
pub struct SessionListView {
    sessions: Vec<Session>,
    pub filter: SessionFilter,
}

impl SessionListView {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions,
            filter: SessionFilter::default(),
        }
    }

    /// Fetch on entry. A failed fetch renders as an empty list.
    pub async fn load(api: &dyn CmeApi) -> Self {
        Self::new(fetch_sessions(api).await)
    }

    /// Full re-fetch, keeping the current filter.
    pub async fn refresh(&mut self, api: &dyn CmeApi) {
        self.sessions = fetch_sessions(api).await;
    }

    pub fn with_filter(mut self, filter: SessionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Stats cover the whole collection, not just the filtered rows.
    pub fn stats(&self) -> SessionStats {
        SessionStats::from_sessions(&self.sessions)
    }

    pub fn rows(&self) -> Vec<SessionRow> {
        filter_sessions(&self.sessions, &self.filter)
            .into_iter()
            .map(SessionRow::from_session)
            .collect()
    }
}

async fn fetch_sessions(api: &dyn CmeApi) -> Vec<Session> {
    match api.list_sessions().await {
        Ok(sessions) => {
            debug!(count = sessions.len(), "Fetched CME sessions");
            sessions
        }
        Err(e) => {
            warn!(error = %e, "Error fetching CME sessions");
            Vec::new()
        }
    }
}

/// Detail view tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailTab {
    #[default]
    Overview,
    Timeline,
    Demeanor,
    Recordings,
}

impl DetailTab {
    pub const ALL: [DetailTab; 4] = [
        DetailTab::Overview,
        DetailTab::Timeline,
        DetailTab::Demeanor,
        DetailTab::Recordings,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            DetailTab::Overview => "overview",
            DetailTab::Timeline => "timeline",
            DetailTab::Demeanor => "demeanor",
            DetailTab::Recordings => "recordings",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DetailTab::Overview => "Overview",
            DetailTab::Timeline => "Timeline",
            DetailTab::Demeanor => "Demeanor",
            DetailTab::Recordings => "Recordings",
        }
    }
}

impl FromStr for DetailTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetailTab::ALL
            .into_iter()
            .find(|tab| tab.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown tab '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverviewTab {
    pub patient_id: String,
    pub examiner: String,
    pub exam_date: String,
    pub attorney: String,
    pub mode: String,
    pub state: String,
    pub legal_basis: String,
    pub video_permitted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineTab {
    pub processing_stage: String,
    pub note: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemeanorTab {
    pub description: &'static str,
    pub note: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordingsTab {
    /// `None` renders the "No Recording Uploaded" empty state.
    pub video_uri: Option<String>,
}

/// Content of the selected detail tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tab", rename_all = "lowercase")]
pub enum TabView {
    Overview(OverviewTab),
    Timeline(TimelineTab),
    Demeanor(DemeanorTab),
    Recordings(RecordingsTab),
}

impl TabView {
    pub fn build(tab: DetailTab, session: &Session) -> Self {
        match tab {
            DetailTab::Overview => TabView::Overview(OverviewTab {
                patient_id: session.patient_id.clone().unwrap_or_default(),
                examiner: session.doctor_name.clone().unwrap_or_default(),
                exam_date: or_placeholder(&session.exam_date, NOT_SET),
                attorney: or_placeholder(&session.attorney_name, NOT_AVAILABLE),
                mode: session.mode.clone().unwrap_or_default(),
                state: session.state.clone().unwrap_or_default(),
                legal_basis: or_placeholder(
                    &session.recording_allowed.as_ref().and_then(|r| r.rule.clone()),
                    NOT_AVAILABLE,
                ),
                video_permitted: session.video_permitted(),
            }),
            DetailTab::Timeline => TabView::Timeline(TimelineTab {
                processing_stage: or_placeholder(&session.processing_stage, "Not started"),
                note: "Test declarations and observed actions will appear here after processing completes.",
            }),
            DetailTab::Demeanor => TabView::Demeanor(DemeanorTab {
                description: "Analysis will detect negative tone, interruptions, dismissive behavior, and unprofessional conduct.",
                note: "Results will appear here after processing completes.",
            }),
            DetailTab::Recordings => TabView::Recordings(RecordingsTab {
                video_uri: session.video_uri.clone().filter(|uri| !uri.is_empty()),
            }),
        }
    }

    pub fn tab(&self) -> DetailTab {
        match self {
            TabView::Overview(_) => DetailTab::Overview,
            TabView::Timeline(_) => DetailTab::Timeline,
            TabView::Demeanor(_) => DetailTab::Demeanor,
            TabView::Recordings(_) => DetailTab::Recordings,
        }
    }
}

/// Status-gated actions on the detail header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionActions {
    pub upload: bool,
    pub report: bool,
}

impl SessionActions {
    pub fn for_session(session: &Session) -> Self {
        Self {
            upload: session.status.allows_upload(),
            report: session.status.allows_report(),
        }
    }
}

/// Result of loading a detail view.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loaded(Session),
    NotFound,
}

/// Session detail: one fetched snapshot and the selected tab.
#[derive(Debug, Clone)]
pub struct SessionDetailView {
    session_id: String,
    pub state: DetailState,
    pub active_tab: DetailTab,
}

impl SessionDetailView {
    /// Fetch on entry. Any failure renders the "not found" state.
    pub async fn load(api: &dyn CmeApi, session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: fetch_detail(api, session_id).await,
            active_tab: DetailTab::default(),
        }
    }

    /// Full re-fetch after an action.
    pub async fn reload(&mut self, api: &dyn CmeApi) {
        self.state = fetch_detail(api, &self.session_id).await;
    }

    pub fn select_tab(&mut self, tab: DetailTab) {
        self.active_tab = tab;
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            DetailState::Loaded(session) => Some(session),
            DetailState::NotFound => None,
        }
    }

    pub fn badge(&self) -> Option<StatusBadge> {
        self.session().map(|s| status_badge(&s.status))
    }

    /// No actions are offered when the session failed to load.
    pub fn actions(&self) -> SessionActions {
        self.session()
            .map(SessionActions::for_session)
            .unwrap_or(SessionActions {
                upload: false,
                report: false,
            })
    }

    pub fn tab_view(&self) -> Option<TabView> {
        self.session()
            .map(|session| TabView::build(self.active_tab, session))
    }
}

/// Fetch one session, degrading every failure to `NotFound`.
pub(crate) async fn fetch_detail(api: &dyn CmeApi, session_id: &str) -> DetailState {
    match api.get_session(session_id).await {
        Ok(session) => DetailState::Loaded(session),
        Err(ApiError::NotFound) => {
            debug!(session_id, "Session not found");
            DetailState::NotFound
        }
        Err(e) => {
            warn!(session_id, error = %e, "Error fetching session");
            DetailState::NotFound
        }
    }
}
