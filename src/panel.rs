use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::{
    fetcher::{FetchErrorKind, FetchOutcome, Record},
    identifier::{Identifier, Series},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    MissingSeries,
    InvalidNumber,
    InvalidEntry,
    UnknownSeries(String),
    LookupPending(String),
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::MissingSeries => f.write_str("Please select a series"),
            PanelError::InvalidNumber => f.write_str("Please enter a valid SCP number (001-999)"),
            PanelError::InvalidEntry => f.write_str("Enter 3-digit identifier (001-999)"),
            PanelError::UnknownSeries(raw) => {
                write!(f, "Unknown series '{raw}'. Choose one of I to IX")
            }
            PanelError::LookupPending(label) => {
                write!(f, "A lookup is already in progress for {label}")
            }
        }
    }
}

impl std::error::Error for PanelError {}

/// A finished fetch travelling back to the panel that asked for it.
#[derive(Debug, Clone)]
pub struct FetchCompletion {
    pub identifier: Identifier,
    pub token: CancellationToken,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelInput {
    Help,
    Close,
    Clear,
    Submit,
    Series(Series),
    Number(String),
    Lookup(Series, String),
    Invalid(PanelError),
    Unknown(String),
}

pub fn parse_panel_input(line: &str) -> Option<PanelInput> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let words: Vec<&str> = trimmed.split_whitespace().collect();
    let keyword = words[0].to_lowercase();
    let input = match (keyword.as_str(), words.as_slice()) {
        ("help", [_]) => PanelInput::Help,
        ("close" | "exit" | "quit", [_]) => PanelInput::Close,
        ("clear", [_]) => PanelInput::Clear,
        ("search" | "lookup", [_]) => PanelInput::Submit,
        ("series", [_, raw]) => match raw.parse::<Series>() {
            Ok(series) => PanelInput::Series(series),
            Err(_) => PanelInput::Invalid(PanelError::UnknownSeries(raw.to_string())),
        },
        ("number", [_, raw]) => PanelInput::Number(raw.to_string()),
        (_, [raw]) if raw.bytes().all(|byte| byte.is_ascii_digit()) => {
            PanelInput::Number(raw.to_string())
        }
        (_, [raw]) => match raw.parse::<Series>() {
            Ok(series) => PanelInput::Series(series),
            Err(_) => PanelInput::Unknown(trimmed.to_string()),
        },
        (_, [series, number]) => match series.parse::<Series>() {
            Ok(series) => PanelInput::Lookup(series, number.to_string()),
            Err(_) => PanelInput::Unknown(trimmed.to_string()),
        },
        _ => PanelInput::Unknown(trimmed.to_string()),
    };

    Some(input)
}

/// Lookup form state for one open panel session.
#[derive(Debug)]
pub struct LookupPanel {
    token: CancellationToken,
    series: Option<Series>,
    number: String,
    pending: Option<Identifier>,
    last_record: Option<Record>,
}

impl LookupPanel {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            series: None,
            number: String::new(),
            pending: None,
            last_record: None,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn series(&self) -> Option<Series> {
        self.series
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn pending(&self) -> Option<&Identifier> {
        self.pending.as_ref()
    }

    pub fn last_record(&self) -> Option<&Record> {
        self.last_record.as_ref()
    }

    pub fn select_series(&mut self, series: Series) {
        self.series = Some(series);
    }

    /// Accepts up to three digits; anything else leaves the entry untouched.
    pub fn enter_number(&mut self, text: &str) -> Result<(), PanelError> {
        if text.len() > 3 || !text.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(PanelError::InvalidEntry);
        }
        self.number = text.to_string();
        Ok(())
    }

    /// Validates the form and marks the resulting identifier as pending.
    pub fn submit(&mut self) -> Result<Identifier, PanelError> {
        if let Some(pending) = &self.pending {
            return Err(PanelError::LookupPending(pending.display_label()));
        }

        let series = self.series.ok_or(PanelError::MissingSeries)?;
        let identifier =
            Identifier::new(series, &self.number).map_err(|_| PanelError::InvalidNumber)?;

        self.last_record = None;
        self.pending = Some(identifier.clone());
        tracing::info!(
            target: "panel",
            identifier = %identifier,
            series = %identifier.series(),
            label = %identifier.display_label(),
            "lookup_submitted"
        );
        Ok(identifier)
    }

    /// Applies a completion if it is still wanted. `None` means it was discarded.
    pub fn apply(&mut self, completion: FetchCompletion) -> Option<Vec<String>> {
        if completion.token.is_cancelled() || self.is_closed() {
            tracing::debug!(
                target: "panel",
                identifier = %completion.identifier,
                "stale_fetch_discarded"
            );
            return None;
        }
        if self.pending.as_ref() != Some(&completion.identifier) {
            tracing::debug!(
                target: "panel",
                identifier = %completion.identifier,
                "unexpected_fetch_discarded"
            );
            return None;
        }
        self.pending = None;

        let label = completion.identifier.display_label();
        let lines = match completion.outcome {
            FetchOutcome::Completed(Ok(record)) => {
                let lines = record_lines(&record);
                self.last_record = Some(record);
                lines
            }
            FetchOutcome::Completed(Err(err))
                if err.is_domain() || err.kind == FetchErrorKind::Configuration =>
            {
                vec![err.message]
            }
            FetchOutcome::Completed(Err(err)) => {
                vec![format!("Failed to retrieve data for {label}: {}", err.message)]
            }
            FetchOutcome::Suppressed => {
                vec![PanelError::LookupPending(label).to_string()]
            }
        };
        Some(lines)
    }
}

pub fn intro_lines() -> Vec<String> {
    let mut lines = vec![
        "SCP Database Access".to_string(),
        "Security Level 3 Clearance Required".to_string(),
        "Select a series and enter an SCP number to access its file.".to_string(),
        "All accesses are logged and monitored by Foundation security.".to_string(),
    ];
    lines.extend(Series::ALL.iter().map(|series| format!("  {}", series.label())));
    lines.extend(help_lines());
    lines
}

pub fn help_lines() -> Vec<String> {
    vec![
        "Panel commands: series <I-IX>, number <001-999>, search, <series> <number>, close, clear"
            .to_string(),
    ]
}

pub fn record_lines(record: &Record) -> Vec<String> {
    let mut lines = vec![
        format!("{}: {}", record.item_number, record.name),
        format!("{}-CLASS", record.object_class.as_str().to_uppercase()),
        " ".to_string(),
        record.description.clone(),
        " ".to_string(),
        "Containment Procedures".to_string(),
        record.containment.clone(),
    ];
    if !record.additional_info.is_empty() {
        lines.push(" ".to_string());
        lines.push("Additional Information".to_string());
        lines.push(record.additional_info.clone());
    }
    lines.push(" ".to_string());
    lines.push(format!(
        "Access granted to {} file. Further details require Level 4 clearance.",
        record.item_number
    ));
    lines
}
