use std::{sync::Arc, time::Duration};

use scp_terminal::{
    fetcher::{
        FetchErrorKind, FetchOutcome, ObjectClass, RecordFetcher,
        backend::{GeminiBackend, GenerationBackend},
        credentials::EnvCredentialProvider,
        types::{CredentialRef, FetcherConfig, GenerationRequest},
    },
    identifier::{Identifier, Series},
};
use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::oneshot,
};

/// Serves one canned response and hands back the raw request it received.
async fn spawn_http_server(
    status_line: &'static str,
    body: String,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind should succeed");
    let address = listener.local_addr().expect("local addr should exist");
    let (request_tx, request_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept should succeed");
        let mut request_buffer = vec![0u8; 16 * 1024];
        let read = stream.read(&mut request_buffer).await.unwrap_or(0);
        let _ = request_tx.send(String::from_utf8_lossy(&request_buffer[..read]).to_string());

        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream
            .write_all(response.as_bytes())
            .await
            .expect("response should be written");
    });

    (format!("http://{address}/v1beta"), request_rx)
}

fn request(endpoint: String) -> GenerationRequest {
    GenerationRequest {
        request_id: "fetch:test".to_string(),
        endpoint,
        model: "gemini-test".to_string(),
        api_key: "secret-key".to_string(),
        prompt: "describe SCP-173".to_string(),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn posts_prompt_with_api_key_header_and_json_mime_type() {
    let (endpoint, request_rx) = spawn_http_server("200 OK", "{}".to_string()).await;
    let backend = GeminiBackend::new().expect("backend should build");

    let body = backend
        .generate(request(endpoint))
        .await
        .expect("generation should succeed");
    assert_eq!(body, "{}");

    let raw = request_rx.await.expect("server should capture the request");
    let lowered = raw.to_ascii_lowercase();
    assert!(raw.starts_with("POST /v1beta/models/gemini-test:generateContent"));
    assert!(lowered.contains("x-goog-api-key: secret-key"));
    assert!(!raw.contains("key=secret-key"), "key must not be in the query");
}

#[tokio::test]
async fn non_success_status_becomes_transport_error() {
    let (endpoint, _request_rx) =
        spawn_http_server("500 Internal Server Error", "{\"error\":\"boom\"}".to_string()).await;
    let backend = GeminiBackend::new().expect("backend should build");

    let err = backend
        .generate(request(endpoint))
        .await
        .expect_err("generation should fail");
    assert_eq!(err.kind, FetchErrorKind::Transport);
    assert_eq!(err.http_status, Some(500));
    assert!(err.message.starts_with("API request failed with status 500."));
}

#[tokio::test]
async fn record_fetcher_parses_envelope_from_live_transport() {
    let payload = json!({
        "itemNumber": "SCP-4256",
        "name": "Test Subject",
        "objectClass": "Keter",
        "description": "d",
        "containment": "c"
    });
    let envelope = json!({
        "candidates": [{
            "content": { "parts": [{ "text": payload.to_string() }] }
        }]
    });
    let (endpoint, _request_rx) = spawn_http_server("200 OK", envelope.to_string()).await;

    let config = FetcherConfig {
        endpoint,
        credential: CredentialRef::InlineToken {
            token: "secret-key".to_string(),
        },
        request_timeout_ms: 5_000,
        ..FetcherConfig::default()
    };
    let fetcher = RecordFetcher::new(
        config,
        Arc::new(GeminiBackend::new().expect("backend should build")),
        Arc::new(EnvCredentialProvider),
    );
    let identifier = Identifier::new(Series::V, "256").expect("identifier should build");

    let FetchOutcome::Completed(result) = fetcher.fetch(&identifier).await else {
        panic!("fetch should not be suppressed");
    };
    let record = result.expect("record should parse");
    assert_eq!(record.item_number, "SCP-4256");
    assert_eq!(record.object_class, ObjectClass::Keter);
}
