// HTTP client for the CME backend API
//
// Decision: Backend access sits behind two traits. CmeApi is the primary REST
// surface; StorageUploader is the direct-to-storage PUT, which bypasses the
// API entirely. Workflows take trait objects so tests can spy on call order.

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::Session;

/// Fields posted to `POST /cme/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSessionRequest {
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub state: String,
    pub exam_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attorney_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `POST /cme/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadRequest {
    pub session_id: String,
    pub filename: String,
    pub content_type: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadTarget {
    pub upload_url: String,
}

#[derive(Debug, Clone, Serialize)]
struct ProcessRequest<'a> {
    session_id: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportResponse {
    #[serde(default)]
    pub download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListSessionsResponse {
    #[serde(default)]
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// The backend REST surface consumed by the dashboard.
#[async_trait]
pub trait CmeApi: Send + Sync {
    /// `GET /cme/sessions`
    async fn list_sessions(&self) -> ApiResult<Vec<Session>>;

    /// `GET /cme/sessions/{id}`
    async fn get_session(&self, session_id: &str) -> ApiResult<Session>;

    /// `POST /cme/sessions`
    async fn create_session(&self, request: &CreateSessionRequest) -> ApiResult<String>;

    /// `POST /cme/upload` - ask for a pre-authorized upload target.
    async fn request_upload(&self, request: &UploadRequest) -> ApiResult<UploadTarget>;

    /// `POST /cme/process`
    async fn start_processing(&self, session_id: &str) -> ApiResult<()>;

    /// `GET /cme/sessions/{id}/report`
    async fn get_report(&self, session_id: &str) -> ApiResult<ReportResponse>;
}

/// Raw byte transfer to an upload target returned by [`CmeApi::request_upload`].
///
/// `content_length` is sent explicitly because storage targets reject
/// chunked uploads and a streamed body has no length of its own.
#[async_trait]
pub trait StorageUploader: Send + Sync {
    async fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        content_length: u64,
        body: Body,
    ) -> ApiResult<()>;
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_http(&config.api_url, http))
    }

    pub fn with_http(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL under the base URL. Each segment is
    /// percent-encoded, so ids containing `/`, `?` or `#` stay one segment.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        self.handle_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> ApiResult<T> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let bytes = response.bytes().await?;
        // Some endpoints answer 200 with an empty body
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Pull the backend's error text out of a failure body.
/// Prefers `error`, then `message`, then the raw text.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    body.trim().to_string()
}

#[async_trait]
impl CmeApi for ApiClient {
    async fn list_sessions(&self) -> ApiResult<Vec<Session>> {
        let response: Option<ListSessionsResponse> = self.get(&["cme", "sessions"]).await?;
        Ok(response.map(|r| r.sessions).unwrap_or_default())
    }

    async fn get_session(&self, session_id: &str) -> ApiResult<Session> {
        self.get(&["cme", "sessions", session_id]).await
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> ApiResult<String> {
        let response: CreateSessionResponse = self.post(&["cme", "sessions"], request).await?;
        response
            .session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("missing session_id".to_string()))
    }

    async fn request_upload(&self, request: &UploadRequest) -> ApiResult<UploadTarget> {
        self.post(&["cme", "upload"], request).await
    }

    async fn start_processing(&self, session_id: &str) -> ApiResult<()> {
        let _: serde_json::Value = self
            .post(&["cme", "process"], &ProcessRequest { session_id })
            .await?;
        Ok(())
    }

    async fn get_report(&self, session_id: &str) -> ApiResult<ReportResponse> {
        self.get(&["cme", "sessions", session_id, "report"]).await
    }
}

#[async_trait]
impl StorageUploader for ApiClient {
    async fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        content_length: u64,
        body: Body,
    ) -> ApiResult<()> {
        debug!(bytes = content_length, content_type, "PUT recording to upload target");
        let response = self
            .http
            .put(upload_url)
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, content_length)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        Err(ApiError::Server {
            status: status.as_u16(),
            message: error_message(&text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error":"patient_id already exists","message":"x"}"#),
            "patient_id already exists"
        );
        assert_eq!(error_message(r#"{"message":"bad request"}"#), "bad request");
        assert_eq!(error_message("Gateway Timeout\n"), "Gateway Timeout");
        assert_eq!(error_message(""), "");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::with_http("http://localhost:9000/", reqwest::Client::new());
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = ApiClient::with_http("http://localhost:9000", reqwest::Client::new());
        assert_eq!(
            client.endpoint(&["cme", "sessions"]).unwrap().as_str(),
            "http://localhost:9000/cme/sessions"
        );
        assert_eq!(
            client
                .endpoint(&["cme", "sessions", "case/42?x#y", "report"])
                .unwrap()
                .as_str(),
            "http://localhost:9000/cme/sessions/case%2F42%3Fx%23y/report"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::with_http("https://example.org/api/", reqwest::Client::new());
        assert_eq!(
            client.endpoint(&["cme", "upload"]).unwrap().as_str(),
            "https://example.org/api/cme/upload"
        );

        let client = ApiClient::with_http("not a url", reqwest::Client::new());
        assert!(matches!(
            client.endpoint(&["cme"]),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_create_request_skips_blank_optionals() {
        let request = CreateSessionRequest {
            patient_id: "P-1".into(),
            patient_name: "Jane Roe".into(),
            doctor_name: "Dr. Alvarez".into(),
            state: "FL".into(),
            exam_date: "2026-10-19".into(),
            case_id: None,
            attorney_name: Some("Saul".into()),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("case_id").is_none());
        assert_eq!(json["attorney_name"], "Saul");
    }
}
