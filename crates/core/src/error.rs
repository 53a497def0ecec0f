// Error types
//
// ApiError covers every failure talking to the backend (transport and
// non-success responses). ValidationError is raised client-side before any
// request is issued.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("not found")]
    NotFound,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Message suitable for showing to the user. Server errors carry the
    /// backend's own error text.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("unsupported state '{0}'")]
    UnknownJurisdiction(String),

    #[error("exam date '{0}' is not a valid YYYY-MM-DD date")]
    InvalidExamDate(String),

    #[error("unsupported recording type '{0}', expected audio or video")]
    UnsupportedMediaType(String),

    #[error("recording file is empty")]
    EmptyFile,
}
