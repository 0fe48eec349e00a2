use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use scp_terminal::{
    config::TerminalConfig,
    console::{Console, ConsoleOutput},
    fetcher::{
        FetchOutcome, RecordFetcher,
        backend::GenerationBackend,
        credentials::EnvCredentialProvider,
        error::FetchError,
        types::{CredentialRef, FetcherConfig, GenerationRequest},
    },
    identifier::{Identifier, Series},
    panel::FetchCompletion,
};
use serde_json::json;
use tokio::sync::{Notify, mpsc};

struct CannedBackend {
    calls: AtomicUsize,
    payload: String,
    gate: Option<Arc<Notify>>,
}

#[async_trait]
impl GenerationBackend for CannedBackend {
    async fn generate(&self, _request: GenerationRequest) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(json!({
            "candidates": [{ "content": { "parts": [{ "text": self.payload }] } }]
        })
        .to_string())
    }
}

struct Harness {
    console: Console,
    completions: mpsc::UnboundedReceiver<FetchCompletion>,
    backend: Arc<CannedBackend>,
    fetcher: Arc<RecordFetcher>,
}

fn harness(payload: serde_json::Value, gate: Option<Arc<Notify>>) -> Harness {
    let backend = Arc::new(CannedBackend {
        calls: AtomicUsize::new(0),
        payload: payload.to_string(),
        gate,
    });
    let config = FetcherConfig {
        credential: CredentialRef::InlineToken {
            token: "test-key".to_string(),
        },
        ..FetcherConfig::default()
    };
    let fetcher = Arc::new(RecordFetcher::new(
        config,
        Arc::clone(&backend) as Arc<dyn GenerationBackend>,
        Arc::new(EnvCredentialProvider),
    ));
    let (console, completions) = Console::new(&TerminalConfig::default(), Arc::clone(&fetcher));
    Harness {
        console,
        completions,
        backend,
        fetcher,
    }
}

fn console(
    payload: serde_json::Value,
) -> (
    Console,
    mpsc::UnboundedReceiver<FetchCompletion>,
    Arc<CannedBackend>,
) {
    let Harness {
        console,
        completions,
        backend,
        ..
    } = harness(payload, None);
    (console, completions, backend)
}

/// Yields to spawned tasks until `ready` holds.
async fn settle(mut ready: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !ready() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("spawned work should settle");
}

fn text(output: &[ConsoleOutput]) -> Vec<String> {
    output
        .iter()
        .filter_map(|item| match item {
            ConsoleOutput::Line(line) => Some(line.clone()),
            ConsoleOutput::ClearScreen => None,
        })
        .collect()
}

fn open_panel(console: &mut Console) {
    console.handle_line("login shyguy123");
    let output = text(&console.handle_line("access"));
    assert!(output.contains(&"Opening secure lookup panel...".to_string()));
    assert!(output.contains(&"SCP Database Access".to_string()));
    assert!(console.panel().is_some());
    assert_eq!(console.prompt(), "lookup> ");
}

async fn next_completion(
    completions: &mut mpsc::UnboundedReceiver<FetchCompletion>,
) -> FetchCompletion {
    tokio::time::timeout(Duration::from_secs(5), completions.recv())
        .await
        .expect("completion should arrive")
        .expect("channel should stay open")
}

#[tokio::test]
async fn given_open_panel_when_lookup_submitted_then_record_is_rendered() {
    let (mut console, mut completions, backend) = console(json!({
        "itemNumber": "SCP-173",
        "name": "The Sculpture",
        "objectClass": "Euclid",
        "description": "Concrete statue.",
        "containment": "Locked container."
    }));
    open_panel(&mut console);

    let submitted = text(&console.handle_line("I 173"));
    assert_eq!(submitted, vec!["Accessing secure file SCP-173..."]);

    let completion = next_completion(&mut completions).await;
    let rendered = text(&console.handle_completion(completion));
    assert_eq!(rendered[0], "SCP-173: The Sculpture");
    assert_eq!(rendered[1], "EUCLID-CLASS");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    let panel = console.panel().expect("panel should still be open");
    assert!(panel.pending().is_none());
    assert_eq!(
        panel.last_record().map(|record| record.name.as_str()),
        Some("The Sculpture")
    );
}

#[tokio::test]
async fn given_panel_form_when_stepwise_entry_then_validation_messages_follow_order() {
    let (mut console, _completions, backend) = console(json!({}));
    open_panel(&mut console);

    assert_eq!(
        text(&console.handle_line("search")),
        vec!["Please select a series"]
    );
    assert_eq!(
        text(&console.handle_line("series ii")),
        vec!["Selected Series II (SCP-1000 to SCP-1999)"]
    );
    assert_eq!(
        console.panel().and_then(|panel| panel.series()),
        Some(Series::II)
    );
    assert_eq!(
        text(&console.handle_line("12")),
        vec!["SCP number: 12"]
    );
    assert_eq!(
        text(&console.handle_line("search")),
        vec!["Please enter a valid SCP number (001-999)"]
    );
    assert_eq!(
        text(&console.handle_line("12345")),
        vec!["Enter 3-digit identifier (001-999)"]
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn given_closed_panel_when_stale_completion_arrives_then_it_is_discarded() {
    let (mut console, _completions, _backend) = console(json!({}));
    open_panel(&mut console);
    let stale_token = console
        .panel()
        .expect("panel should be open")
        .token()
        .clone();

    let closed = text(&console.handle_line("close"));
    assert_eq!(closed[0], "Lookup panel closed.");
    assert!(stale_token.is_cancelled());
    assert!(console.panel().is_none());

    let identifier = Identifier::new(Series::I, "096").expect("identifier should build");
    let stale = FetchCompletion {
        identifier: identifier.clone(),
        token: stale_token.clone(),
        outcome: FetchOutcome::Completed(Err(FetchError::new(
            scp_terminal::fetcher::FetchErrorKind::Transport,
            "late",
        ))),
    };
    assert!(console.handle_completion(stale.clone()).is_empty());

    // Reopening starts a fresh panel session; the old token still does not apply.
    console.handle_line("access");
    assert!(console.handle_completion(stale).is_empty());
    assert!(console.panel().is_some());
}

#[tokio::test]
async fn given_open_panel_when_terminal_commands_typed_then_interpreter_is_untouched() {
    let (mut console, _completions, _backend) = console(json!({}));
    open_panel(&mut console);
    let before = console.interpreter().transcript().clone();

    let output = text(&console.handle_line("database"));
    assert_eq!(output[0], "Unrecognized panel input: database");
    assert_eq!(console.interpreter().transcript(), &before);

    assert_eq!(console.handle_line("clear"), vec![ConsoleOutput::ClearScreen]);
    assert!(console.interpreter().transcript().is_empty());
    assert!(console.panel().is_some());
}

#[tokio::test]
async fn given_service_error_payload_when_lookup_completes_then_message_is_shown() {
    let (mut console, mut completions, _backend) = console(json!({ "error": "not found" }));
    open_panel(&mut console);

    console.handle_line("IV 404");
    let completion = next_completion(&mut completions).await;
    assert_eq!(
        text(&console.handle_completion(completion)),
        vec!["not found", " "]
    );
}

#[tokio::test]
async fn given_closed_terminal_when_clear_then_screen_clears() {
    let (mut console, _completions, _backend) = console(json!({}));
    assert!(!console.boot().is_empty());
    assert_eq!(console.prompt(), "> ");

    assert_eq!(console.handle_line("clear"), vec![ConsoleOutput::ClearScreen]);
    assert!(console.interpreter().transcript().is_empty());
    assert!(console.handle_line("   ").is_empty());
}

#[tokio::test]
async fn given_pending_fetch_when_panel_closes_then_task_stops_and_claim_is_released() {
    let gate = Arc::new(Notify::new());
    let Harness {
        mut console,
        mut completions,
        backend,
        fetcher,
    } = harness(json!({ "name": "The Sculpture" }), Some(Arc::clone(&gate)));
    let identifier = Identifier::new(Series::I, "173").expect("identifier should build");
    open_panel(&mut console);

    console.handle_line("I 173");
    settle(|| backend.calls.load(Ordering::SeqCst) == 1).await;
    assert!(fetcher.is_in_flight(&identifier));

    console.handle_line("close");
    settle(|| !fetcher.is_in_flight(&identifier)).await;

    gate.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(matches!(
        completions.try_recv(),
        Err(mpsc::error::TryRecvError::Empty)
    ));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}
