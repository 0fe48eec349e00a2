use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, header};
use serde_json::json;

use crate::fetcher::{
    error::{FetchError, FetchErrorKind, http_status_error},
    types::GenerationRequest,
};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Transport for one generation call. Returns the raw success body.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
}

impl GeminiBackend {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| {
                FetchError::new(
                    FetchErrorKind::Configuration,
                    format!("unable to build http client: {err}"),
                )
            })?;
        Ok(Self { client })
    }
}

pub fn generate_content_url(endpoint: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        endpoint.trim_end_matches('/'),
        model
    )
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String, FetchError> {
        let url = generate_content_url(&request.endpoint, &request.model);
        let started_at = Instant::now();
        tracing::debug!(
            target: "fetcher.gemini",
            request_id = %request.request_id,
            model = %request.model,
            url = %url,
            timeout_ms = request.timeout.as_millis() as u64,
            "gemini_dispatch_start"
        );

        let body = json!({
            "contents": [{
                "parts": [{ "text": request.prompt }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json"
            }
        });

        let response = self
            .client
            .post(url)
            .timeout(request.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, request.api_key.as_str())
            .header("x-request-id", request.request_id.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                tracing::debug!(
                    target: "fetcher.gemini",
                    request_id = %request.request_id,
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error = %err,
                    "gemini_http_error"
                );
                if err.is_timeout() {
                    FetchError::new(FetchErrorKind::Timeout, "API request timed out.")
                } else {
                    FetchError::new(
                        FetchErrorKind::Transport,
                        format!("API request failed: {err}"),
                    )
                }
            })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|err| {
            FetchError::new(
                FetchErrorKind::Transport,
                format!("API response body could not be read: {err}"),
            )
            .with_http_status(status)
        })?;
        tracing::debug!(
            target: "fetcher.gemini",
            request_id = %request.request_id,
            status = status,
            body_bytes = text.len(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "gemini_http_response"
        );

        if !(200..300).contains(&status) {
            return Err(http_status_error(status, &text));
        }

        Ok(text)
    }
}
