// Shared test doubles for the CmeApi / StorageUploader seams

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cme_core::client::{
    CmeApi, CreateSessionRequest, ReportResponse, StorageUploader, UploadRequest, UploadTarget,
};
use cme_core::error::{ApiError, ApiResult};
use cme_core::session::{Session, SessionStatus};

/// Records every call and answers from in-memory state.
#[derive(Default)]
pub struct SpyBackend {
    pub calls: Mutex<Vec<String>>,
    pub sessions: Mutex<HashMap<String, Session>>,
    pub fail: Mutex<Vec<&'static str>>,
    pub created_requests: Mutex<Vec<CreateSessionRequest>>,
    pub next_session_id: Mutex<Option<String>>,
    pub report_url: Mutex<Option<String>>,
    /// Holds `create_session` open this long before answering.
    pub create_delay: Mutex<Option<Duration>>,
    /// `content_length` of the last `put_object`.
    pub uploaded_length: Mutex<Option<u64>>,
}

impl SpyBackend {
    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let spy = Self::default();
        {
            let mut map = spy.sessions.lock().unwrap();
            for session in sessions {
                map.insert(session.session_id.clone(), session);
            }
        }
        spy
    }

    /// Make the named operation fail with a server error.
    pub fn failing(self, operation: &'static str) -> Self {
        self.fail.lock().unwrap().push(operation);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls().iter().any(|c| c == operation)
    }

    fn record(&self, operation: &'static str) -> ApiResult<()> {
        self.calls.lock().unwrap().push(operation.to_string());
        if self.fail.lock().unwrap().contains(&operation) {
            return Err(ApiError::Server {
                status: 500,
                message: format!("{operation} failed"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CmeApi for SpyBackend {
    async fn list_sessions(&self) -> ApiResult<Vec<Session>> {
        self.record("list_sessions")?;
        let mut sessions: Vec<Session> = self.sessions.lock().unwrap().values().cloned().collect();
        sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(sessions)
    }

    async fn get_session(&self, session_id: &str) -> ApiResult<Session> {
        self.record("get_session")?;
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> ApiResult<String> {
        self.record("create_session")?;
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.created_requests.lock().unwrap().push(request.clone());
        let id = self
            .next_session_id
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| "new-session".to_string());
        let mut session = Session::new(id.clone(), SessionStatus::Created);
        session.patient_name = Some(request.patient_name.clone());
        self.sessions.lock().unwrap().insert(id.clone(), session);
        Ok(id)
    }

    async fn request_upload(&self, request: &UploadRequest) -> ApiResult<UploadTarget> {
        self.record("request_upload")?;
        Ok(UploadTarget {
            upload_url: format!(
                "https://storage.example/{}/{}?sig=abc",
                request.session_id, request.filename
            ),
        })
    }

    async fn start_processing(&self, session_id: &str) -> ApiResult<()> {
        self.record("start_processing")?;
        if let Some(session) = self.sessions.lock().unwrap().get_mut(session_id) {
            session.status = SessionStatus::Processing;
        }
        Ok(())
    }

    async fn get_report(&self, _session_id: &str) -> ApiResult<ReportResponse> {
        self.record("get_report")?;
        Ok(ReportResponse {
            download_url: self.report_url.lock().unwrap().clone(),
        })
    }
}

#[async_trait]
impl StorageUploader for SpyBackend {
    async fn put_object(
        &self,
        _upload_url: &str,
        _content_type: &str,
        content_length: u64,
        _body: reqwest::Body,
    ) -> ApiResult<()> {
        self.record("put_object")?;
        *self.uploaded_length.lock().unwrap() = Some(content_length);
        Ok(())
    }
}
