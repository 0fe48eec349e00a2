use std::{io, sync::Arc};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{Config, TerminalConfig},
    fetcher::RecordFetcher,
    identifier::Identifier,
    interpreter::{ChromeControl, Interpreter, PanelVisibility, Turn},
    panel::{self, FetchCompletion, LookupPanel, PanelInput, parse_panel_input},
};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const BLANK: &str = " ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleOutput {
    ClearScreen,
    Line(String),
}

enum ExitReason {
    EndOfInput,
    Signal(&'static str),
}

/// Routes input to the interpreter or, while it is open, the lookup panel.
pub struct Console {
    interpreter: Interpreter,
    panel: Option<LookupPanel>,
    fetcher: Arc<RecordFetcher>,
    completions: mpsc::UnboundedSender<FetchCompletion>,
}

impl Console {
    pub fn new(
        config: &TerminalConfig,
        fetcher: Arc<RecordFetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<FetchCompletion>) {
        let (completions, completions_rx) = mpsc::unbounded_channel();
        let console = Self {
            interpreter: Interpreter::new(config),
            panel: None,
            fetcher,
            completions,
        };
        (console, completions_rx)
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn panel(&self) -> Option<&LookupPanel> {
        self.panel.as_ref()
    }

    pub fn prompt(&self) -> &'static str {
        if self.panel.is_some() { "lookup> " } else { "> " }
    }

    pub fn boot(&self) -> Vec<ConsoleOutput> {
        lines_output(self.interpreter.transcript().lines().iter().cloned())
    }

    pub fn handle_line(&mut self, line: &str) -> Vec<ConsoleOutput> {
        if self.panel.is_some() {
            return self.handle_panel_line(line);
        }

        let mut output = match self.interpreter.evaluate(line) {
            Turn::Ignored => Vec::new(),
            Turn::Cleared => vec![ConsoleOutput::ClearScreen],
            // The first line echoes what the user just typed.
            Turn::Emitted(lines) => lines_output(lines.into_iter().skip(1)),
        };

        if self.interpreter.panel_visibility() == PanelVisibility::Open
            && let Some(token) = self.interpreter.panel_token()
        {
            self.panel = Some(LookupPanel::new(token));
            output.extend(lines_output(panel::intro_lines()));
        }

        output
    }

    pub fn handle_completion(&mut self, completion: FetchCompletion) -> Vec<ConsoleOutput> {
        let Some(form) = self.panel.as_mut() else {
            tracing::debug!(
                target: "console",
                identifier = %completion.identifier,
                "completion_without_panel_discarded"
            );
            return Vec::new();
        };

        match form.apply(completion) {
            Some(mut lines) => {
                lines.push(BLANK.to_string());
                lines_output(lines)
            }
            None => Vec::new(),
        }
    }

    fn handle_panel_line(&mut self, line: &str) -> Vec<ConsoleOutput> {
        let Some(input) = parse_panel_input(line) else {
            return Vec::new();
        };
        let Some(form) = self.panel.as_mut() else {
            return Vec::new();
        };

        let lines = match input {
            PanelInput::Help => panel::help_lines(),
            PanelInput::Close => {
                self.interpreter.apply_chrome(ChromeControl::ClosePanel);
                self.panel = None;
                vec!["Lookup panel closed.".to_string(), BLANK.to_string()]
            }
            PanelInput::Clear => {
                self.interpreter.apply_chrome(ChromeControl::ClearTranscript);
                return vec![ConsoleOutput::ClearScreen];
            }
            PanelInput::Series(series) => {
                form.select_series(series);
                vec![format!("Selected {}", series.label())]
            }
            PanelInput::Number(text) => match form.enter_number(&text) {
                Ok(()) => vec![format!("SCP number: {text}")],
                Err(err) => vec![err.to_string()],
            },
            PanelInput::Lookup(series, text) => {
                form.select_series(series);
                match form.enter_number(&text) {
                    Ok(()) => self.submit_lookup(),
                    Err(err) => vec![err.to_string()],
                }
            }
            PanelInput::Submit => self.submit_lookup(),
            PanelInput::Invalid(err) => vec![err.to_string()],
            PanelInput::Unknown(text) => {
                let mut lines = vec![format!("Unrecognized panel input: {text}")];
                lines.extend(panel::help_lines());
                lines
            }
        };

        lines_output(lines)
    }

    fn submit_lookup(&mut self) -> Vec<String> {
        let Some(form) = self.panel.as_mut() else {
            return Vec::new();
        };

        match form.submit() {
            Ok(identifier) => {
                let label = identifier.display_label();
                let token = form.token().clone();
                self.dispatch(identifier, token);
                vec![format!("Accessing secure file {label}...")]
            }
            Err(err) => vec![err.to_string()],
        }
    }

    fn dispatch(&self, identifier: Identifier, token: CancellationToken) {
        let fetcher = Arc::clone(&self.fetcher);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(
                        target: "console",
                        identifier = %identifier,
                        "fetch_abandoned_panel_closed"
                    );
                    return;
                }
                outcome = fetcher.fetch(&identifier) => outcome,
            };
            let _ = completions.send(FetchCompletion {
                identifier,
                token,
                outcome,
            });
        });
    }
}

fn lines_output<I>(lines: I) -> Vec<ConsoleOutput>
where
    I: IntoIterator<Item = String>,
{
    lines.into_iter().map(ConsoleOutput::Line).collect()
}

pub async fn run(config: Config) -> Result<()> {
    let fetcher = Arc::new(
        RecordFetcher::from_config(&config.fetcher).context("failed to construct record fetcher")?,
    );
    let (mut console, mut completions) = Console::new(&config.terminal, fetcher);

    let mut stdout = tokio::io::stdout();
    let mut input = BufReader::new(tokio::io::stdin());
    let mut line_buf = Vec::new();
    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;

    write_output(&mut stdout, &console.boot(), console.prompt()).await?;

    let exit_reason = loop {
        let output = tokio::select! {
            _ = sigint.recv() => break ExitReason::Signal("SIGINT"),
            _ = sigterm.recv() => break ExitReason::Signal("SIGTERM"),
            line = next_input_line(&mut input, &mut line_buf) => {
                match line.context("failed to read terminal input")? {
                    Some(line) => console.handle_line(&line),
                    None => break ExitReason::EndOfInput,
                }
            }
            Some(completion) = completions.recv() => console.handle_completion(completion),
        };
        write_output(&mut stdout, &output, console.prompt()).await?;
    };

    match exit_reason {
        ExitReason::EndOfInput => tracing::info!(target: "console", "terminal_stopped_end_of_input"),
        ExitReason::Signal(signal_name) => {
            tracing::info!(target: "console", signal = signal_name, "terminal_stopped_signal")
        }
    }
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

/// Reads one line, replacing invalid UTF-8. `None` at end of input.
///
/// `buf` must outlive a cancelled call; bytes read so far stay in it.
async fn next_input_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    Ok(Some(line))
}

async fn write_output<W>(writer: &mut W, output: &[ConsoleOutput], prompt: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for item in output {
        match item {
            ConsoleOutput::ClearScreen => writer.write_all(CLEAR_SCREEN.as_bytes()).await?,
            ConsoleOutput::Line(line) => {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
        }
    }
    writer.write_all(prompt.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
