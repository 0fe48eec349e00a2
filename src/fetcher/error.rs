use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    Configuration,
    Transport,
    Timeout,
    Protocol,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Whether the message came verbatim from the service rather than from us.
    pub fn is_domain(&self) -> bool {
        self.kind == FetchErrorKind::Domain
    }
}

pub fn missing_api_key() -> FetchError {
    FetchError::new(FetchErrorKind::Configuration, "API key not found.")
}

pub fn http_status_error(status: u16, body: &str) -> FetchError {
    let excerpt = body.chars().take(240).collect::<String>();
    let mut message = format!("API request failed with status {status}.");
    if !excerpt.trim().is_empty() {
        message = format!("{message} Response: {}", excerpt.trim());
    }
    FetchError::new(FetchErrorKind::Transport, message).with_http_status(status)
}

pub fn protocol_error(message: impl Into<String>) -> FetchError {
    FetchError::new(FetchErrorKind::Protocol, message)
}

pub fn domain_error(message: impl Into<String>) -> FetchError {
    FetchError::new(FetchErrorKind::Domain, message)
}
