// Recording upload workflow
//
// Three ordered steps:
//   1. request an upload target from the API
//   2. PUT the raw bytes directly to that target
//   3. ask the API to start processing
// A failure at any step aborts the rest. Nothing is retried or resumed; a
// failed upload starts over from step 1. If step 3 fails after the bytes
// landed, the session is left as the backend sees it.
//
// Recordings read from disk are streamed into the PUT body, never buffered
// whole. The closing re-fetch is not part of the protocol and degrades like
// any detail fetch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Body;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

use crate::client::{CmeApi, StorageUploader, UploadRequest};
use crate::error::{ApiError, ValidationError};
use crate::session::{Session, SessionStatus};
use crate::views::{fetch_detail, DetailState};

/// Extension -> content type for recordings the dashboard accepts.
const MEDIA_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("mkv", "video/x-matroska"),
    ("avi", "video/x-msvideo"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("aac", "audio/aac"),
];

/// Guess a recording's content type from its file extension.
pub fn content_type_for(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
}

fn is_media_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.starts_with("video/") || lower.starts_with("audio/")
}

/// Where a recording's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordingSource {
    /// Opened and streamed at transfer time.
    Disk(PathBuf),
    Memory(Vec<u8>),
}

/// A recording ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFile {
    pub filename: String,
    pub content_type: String,
    size: u64,
    source: RecordingSource,
}

fn check_recording(content_type: &str, size: u64) -> Result<(), ValidationError> {
    if !is_media_type(content_type) {
        return Err(ValidationError::UnsupportedMediaType(content_type.to_string()));
    }
    if size == 0 {
        return Err(ValidationError::EmptyFile);
    }
    Ok(())
}

impl RecordingFile {
    /// Build from in-memory bytes. Only audio and video are accepted.
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, ValidationError> {
        let content_type = content_type.into();
        let size = bytes.len() as u64;
        check_recording(&content_type, size)?;
        Ok(Self {
            filename: filename.into(),
            content_type,
            size,
            source: RecordingSource::Memory(bytes),
        })
    }

    /// Describe a recording on disk. Only its metadata is read here; the
    /// content is streamed during the transfer step.
    ///
    /// The content type comes from `content_type` when given, otherwise from
    /// the file extension.
    pub async fn from_path(path: &Path, content_type: Option<&str>) -> Result<Self, UploadError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording")
            .to_string();

        let content_type = match content_type {
            Some(ct) => ct.to_string(),
            None => content_type_for(&filename)
                .ok_or_else(|| ValidationError::UnsupportedMediaType(filename.clone()))?
                .to_string(),
        };

        let read_error = |source| UploadError::ReadFile {
            path: path.display().to_string(),
            source,
        };
        let metadata = tokio::fs::metadata(path).await.map_err(read_error)?;
        if !metadata.is_file() {
            return Err(read_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        check_recording(&content_type, metadata.len())?;
        Ok(Self {
            filename,
            content_type,
            size: metadata.len(),
            source: RecordingSource::Disk(path.to_path_buf()),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of a recording backed by a file on disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            RecordingSource::Disk(path) => Some(path),
            RecordingSource::Memory(_) => None,
        }
    }

    /// Request body for the transfer step. Files are opened here and
    /// streamed in chunks.
    pub async fn into_body(self) -> Result<Body, UploadError> {
        match self.source {
            RecordingSource::Memory(bytes) => Ok(Body::from(bytes)),
            RecordingSource::Disk(path) => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .map_err(|source| UploadError::ReadFile {
                        path: path.display().to_string(),
                        source,
                    })?;
                Ok(Body::from(file))
            }
        }
    }
}

/// Protocol step, used to report where an upload failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    RequestTarget,
    TransferBytes,
    StartProcessing,
}

impl std::fmt::Display for UploadStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStep::RequestTarget => write!(f, "request upload target"),
            UploadStep::TransferBytes => write!(f, "transfer recording"),
            UploadStep::StartProcessing => write!(f, "start processing"),
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("upload not allowed while session is {0}")]
    NotAllowed(SessionStatus),

    #[error("upload target is not a valid URL: {0}")]
    InvalidTarget(String),

    #[error("failed to {step}: {source}")]
    Step {
        step: UploadStep,
        #[source]
        source: ApiError,
    },
}

impl UploadError {
    /// The protocol step that failed, if the failure came from the network.
    pub fn step(&self) -> Option<UploadStep> {
        match self {
            UploadError::Step { step, .. } => Some(*step),
            UploadError::InvalidTarget(_) => Some(UploadStep::RequestTarget),
            _ => None,
        }
    }
}

fn at(step: UploadStep) -> impl FnOnce(ApiError) -> UploadError {
    move |source| UploadError::Step { step, source }
}

/// Drives the upload-then-process protocol for one session.
pub struct UploadWorkflow {
    api: Arc<dyn CmeApi>,
    storage: Arc<dyn StorageUploader>,
}

impl UploadWorkflow {
    pub fn new(api: Arc<dyn CmeApi>, storage: Arc<dyn StorageUploader>) -> Self {
        Self { api, storage }
    }

    /// Upload `file` for `session` and start processing.
    ///
    /// Once processing has started the upload has succeeded. The session is
    /// then re-fetched; a failed re-fetch yields `DetailState::NotFound`
    /// rather than an error.
    pub async fn run(
        &self,
        session: &Session,
        file: RecordingFile,
    ) -> Result<DetailState, UploadError> {
        if !session.status.allows_upload() {
            return Err(UploadError::NotAllowed(session.status.clone()));
        }
        let session_id = session.session_id.as_str();

        let request = UploadRequest {
            session_id: session_id.to_string(),
            filename: file.filename.clone(),
            content_type: file.content_type.clone(),
            file_size: file.size(),
        };
        let target = self
            .api
            .request_upload(&request)
            .await
            .map_err(at(UploadStep::RequestTarget))
            .inspect_err(|e| error!(session_id, error = %e, "Upload aborted"))?;

        let upload_url = url::Url::parse(&target.upload_url)
            .map_err(|_| UploadError::InvalidTarget(target.upload_url.clone()))?;
        info!(
            session_id,
            filename = %file.filename,
            bytes = file.size(),
            host = upload_url.host_str().unwrap_or_default(),
            "Transferring recording"
        );

        let content_type = file.content_type.clone();
        let size = file.size();
        let body = file
            .into_body()
            .await
            .inspect_err(|e| error!(session_id, error = %e, "Upload aborted"))?;
        self.storage
            .put_object(&target.upload_url, &content_type, size, body)
            .await
            .map_err(at(UploadStep::TransferBytes))
            .inspect_err(|e| error!(session_id, error = %e, "Upload aborted"))?;

        self.api
            .start_processing(session_id)
            .await
            .map_err(at(UploadStep::StartProcessing))
            .inspect_err(|e| error!(session_id, error = %e, "Processing not started"))?;
        info!(session_id, "Processing started");

        Ok(fetch_detail(self.api.as_ref(), session_id).await)
    }
}
