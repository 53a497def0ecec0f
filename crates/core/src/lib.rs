// CME Dashboard Core
//
// Presentation and request orchestration for CME recording sessions. All
// business logic (transcription, analysis, report rendering, storage) lives in
// the backend and is reached over HTTP.
//
// Key design decisions:
// - Session status is server-authoritative; the client only re-fetches and reflects it
// - View models (list, detail, tabs) are plain data so any front end can render them
// - Backend access goes through CmeApi / StorageUploader traits
// - Each view fetches on entry; there is no shared cache
// - No automatic retries anywhere; every failure returns to a re-triable state

pub mod badge;
pub mod client;
pub mod config;
pub mod create;
pub mod error;
pub mod query;
pub mod report;
pub mod session;
pub mod upload;
pub mod views;
pub mod watch;

// Re-exports for convenience
pub use badge::{format_status_label, status_badge, BadgeTone, StatusBadge};
pub use client::{
    ApiClient, CmeApi, CreateSessionRequest, ReportResponse, StorageUploader, UploadRequest,
    UploadTarget,
};
pub use config::{ClientConfig, ConfigError, DashboardConfig, Jurisdiction, Jurisdictions};
pub use create::{CreateError, CreateOutcome, CreateSessionForm, Route, SessionCreator};
pub use error::{ApiError, ApiResult, ValidationError};
pub use query::{filter_sessions, SessionFilter, SessionStats};
pub use report::{fetch_report, ReportError, ReportLink};
pub use session::{RecordingAllowed, Session, SessionStatus};
pub use upload::{RecordingFile, UploadError, UploadStep, UploadWorkflow};
pub use views::{
    DetailState, DetailTab, SessionActions, SessionDetailView, SessionListView, SessionRow,
    TabView,
};
pub use watch::{watch_session, WatchError, WatchOptions};
