use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};

use tokio::time::timeout;
use uuid::Uuid;

use crate::{
    fetcher::{
        backend::{GeminiBackend, GenerationBackend},
        credentials::{CredentialProvider, EnvCredentialProvider},
        error::{FetchError, FetchErrorKind},
        prompt::record_prompt,
        response::{extract_payload_text, parse_record_payload},
        types::{FetcherConfig, GenerationRequest, Record},
    },
    identifier::Identifier,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Completed(Result<Record, FetchError>),
    /// A fetch for the same identifier was already outstanding.
    Suppressed,
}

pub struct RecordFetcher {
    config: FetcherConfig,
    backend: Arc<dyn GenerationBackend>,
    credentials: Arc<dyn CredentialProvider>,
    in_flight: Arc<Mutex<HashSet<Identifier>>>,
}

impl RecordFetcher {
    pub fn new(
        config: FetcherConfig,
        backend: Arc<dyn GenerationBackend>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            config,
            backend,
            credentials,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            config.clone(),
            Arc::new(GeminiBackend::new()?),
            Arc::new(EnvCredentialProvider),
        ))
    }

    pub fn is_in_flight(&self, identifier: &Identifier) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(identifier)
    }

    /// Runs one lookup. Never retries.
    pub async fn fetch(&self, identifier: &Identifier) -> FetchOutcome {
        let Some(_claim) = InFlightClaim::acquire(&self.in_flight, identifier) else {
            tracing::debug!(
                target: "fetcher",
                identifier = %identifier,
                "record_fetch_suppressed"
            );
            return FetchOutcome::Suppressed;
        };

        let started_at = Instant::now();
        let result = self.fetch_once(identifier).await;
        match &result {
            Ok(record) => tracing::info!(
                target: "fetcher",
                identifier = %identifier,
                item_number = %record.item_number,
                object_class = %record.object_class,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                "record_fetch_completed"
            ),
            Err(err) => tracing::warn!(
                target: "fetcher",
                identifier = %identifier,
                kind = ?err.kind,
                http_status = ?err.http_status,
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                error = %err,
                "record_fetch_failed"
            ),
        }

        FetchOutcome::Completed(result)
    }

    async fn fetch_once(&self, identifier: &Identifier) -> Result<Record, FetchError> {
        let api_key = self.credentials.resolve(&self.config.credential).await?;
        let request_timeout = self.config.request_timeout();
        let request = GenerationRequest {
            request_id: format!("fetch:{}", Uuid::now_v7()),
            endpoint: self.config.endpoint.clone(),
            model: self.config.model.clone(),
            api_key,
            prompt: record_prompt(identifier),
            timeout: request_timeout,
        };
        tracing::info!(
            target: "fetcher",
            identifier = %identifier,
            request_id = %request.request_id,
            model = %request.model,
            "record_fetch_started"
        );

        let body = match timeout(request_timeout, self.backend.generate(request)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::new(
                    FetchErrorKind::Timeout,
                    format!(
                        "API request timed out after {} ms.",
                        request_timeout.as_millis()
                    ),
                ));
            }
        };

        let text = extract_payload_text(&body)?;
        parse_record_payload(&text, identifier)
    }
}

struct InFlightClaim {
    in_flight: Arc<Mutex<HashSet<Identifier>>>,
    identifier: Identifier,
}

impl InFlightClaim {
    fn acquire(in_flight: &Arc<Mutex<HashSet<Identifier>>>, identifier: &Identifier) -> Option<Self> {
        let inserted = in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identifier.clone());
        inserted.then(|| Self {
            in_flight: Arc::clone(in_flight),
            identifier: identifier.clone(),
        })
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.identifier);
    }
}
