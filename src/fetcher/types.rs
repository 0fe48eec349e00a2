use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

impl Default for CredentialRef {
    fn default() -> Self {
        CredentialRef::Env {
            var: default_api_key_var(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub credential: CredentialRef,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            credential: CredentialRef::default(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl FetcherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_api_key_var() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Everything a backend needs to issue one generation call.
#[derive(Clone)]
pub struct GenerationRequest {
    pub request_id: String,
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub prompt: String,
    pub timeout: Duration,
}

impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("request_id", &self.request_id)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("prompt_bytes", &self.prompt.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectClass {
    Safe,
    Euclid,
    Keter,
    Unassigned,
    Other(String),
}

impl ObjectClass {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "unassigned" => ObjectClass::Unassigned,
            "safe" => ObjectClass::Safe,
            "euclid" => ObjectClass::Euclid,
            "keter" => ObjectClass::Keter,
            _ => ObjectClass::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObjectClass::Safe => "Safe",
            ObjectClass::Euclid => "Euclid",
            ObjectClass::Keter => "Keter",
            ObjectClass::Unassigned => "Unassigned",
            ObjectClass::Other(text) => text,
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub item_number: String,
    pub name: String,
    pub object_class: ObjectClass,
    pub description: String,
    pub containment: String,
    pub additional_info: String,
}
