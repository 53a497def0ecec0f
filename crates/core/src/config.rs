// Dashboard configuration
//
// Configuration is loaded from environment variables with typed accessors
// falling back to defaults. The jurisdiction list is configurable because it
// grows as the backend gains consent rules for new states.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:9000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;
const DEFAULT_JURISDICTIONS: [(&str, &str); 4] = [
    ("FL", "Florida"),
    ("CA", "California"),
    ("TX", "Texas"),
    ("PA", "Pennsylvania"),
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid jurisdiction entry '{0}', expected CODE:Name")]
    InvalidJurisdiction(String),

    #[error("jurisdiction list is empty")]
    NoJurisdictions,

    #[error("duplicate jurisdiction code '{0}'")]
    DuplicateJurisdiction(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// A jurisdiction a session may be recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jurisdiction {
    pub code: String,
    pub name: String,
}

/// The closed set of jurisdiction codes accepted on the creation form.
/// Order is preserved; the first entry is the form default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jurisdictions(Vec<Jurisdiction>);

impl Jurisdictions {
    pub fn new(entries: Vec<Jurisdiction>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::NoJurisdictions);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|j| j.code == entry.code) {
                return Err(ConfigError::DuplicateJurisdiction(entry.code.clone()));
            }
        }
        Ok(Self(entries))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|j| j.code == code)
    }

    pub fn get(&self, code: &str) -> Option<&Jurisdiction> {
        self.0.iter().find(|j| j.code == code)
    }

    /// Form default (first configured entry).
    pub fn default_code(&self) -> &str {
        &self.0[0].code
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jurisdiction> {
        self.0.iter()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.0.iter().map(|j| j.code.as_str()).collect()
    }
}

impl Default for Jurisdictions {
    fn default() -> Self {
        Self(
            DEFAULT_JURISDICTIONS
                .iter()
                .map(|(code, name)| Jurisdiction {
                    code: (*code).to_string(),
                    name: (*name).to_string(),
                })
                .collect(),
        )
    }
}

impl FromStr for Jurisdictions {
    type Err = ConfigError;

    /// Parse `FL:Florida,CA:California`. A bare code uses itself as name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for raw in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (code, name) = match raw.split_once(':') {
                Some((code, name)) => (code.trim(), name.trim()),
                None => (raw, raw),
            };
            if code.is_empty() || name.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic())
            {
                return Err(ConfigError::InvalidJurisdiction(raw.to_string()));
            }
            entries.push(Jurisdiction {
                code: code.to_ascii_uppercase(),
                name: name.to_string(),
            });
        }
        Jurisdictions::new(entries)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL
    pub api_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Default)]
pub struct DashboardConfig {
    /// Backend API base URL
    pub api_url: Option<String>,
    /// Request timeout in seconds
    pub request_timeout_secs: Option<u64>,
    /// Jurisdiction list override
    pub jurisdictions: Option<Jurisdictions>,
    /// Poll interval for `watch`, in seconds
    pub watch_interval_secs: Option<u64>,
}

impl DashboardConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `CME_API_URL`: Backend base URL (default: http://localhost:9000)
    /// - `CME_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
    /// - `CME_JURISDICTIONS`: Comma list of `CODE:Name` (default: FL, CA, TX, PA)
    /// - `CME_WATCH_INTERVAL_SECS`: Status poll interval (default: 5)
    pub fn from_env() -> Result<Self, ConfigError> {
        let jurisdictions = match env::var("CME_JURISDICTIONS") {
            Ok(v) if !v.trim().is_empty() => Some(v.parse()?),
            _ => None,
        };

        Ok(Self {
            api_url: env::var("CME_API_URL").ok().filter(|v| !v.is_empty()),
            request_timeout_secs: parse_secs("CME_REQUEST_TIMEOUT_SECS")?,
            jurisdictions,
            watch_interval_secs: parse_secs("CME_WATCH_INTERVAL_SECS")?,
        })
    }

    /// Get API URL with default
    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Get request timeout with default
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Get jurisdictions with default
    pub fn jurisdictions(&self) -> Jurisdictions {
        self.jurisdictions.clone().unwrap_or_default()
    }

    /// Get watch interval with default
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(
            self.watch_interval_secs
                .unwrap_or(DEFAULT_WATCH_INTERVAL_SECS),
        )
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url()).with_timeout(self.request_timeout())
    }
}

fn parse_secs(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .map(Some)
            .ok_or(ConfigError::InvalidValue { name, value }),
        _ => Ok(None),
    }
}
