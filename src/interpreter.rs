use tokio_util::sync::CancellationToken;

use crate::{
    command::{Command, parse_command},
    config::TerminalConfig,
    session::{AuthorizationLevel, Session, SharedSecret},
    transcript::Transcript,
};

const BLANK: &str = " ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelVisibility {
    Closed,
    Open,
}

/// Controls raised by the lookup panel rather than typed at the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeControl {
    ClosePanel,
    ClearTranscript,
}

/// What one evaluated line did to the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    /// Nothing was evaluated or recorded.
    Ignored,
    Cleared,
    /// Echo line followed by the response, as appended.
    Emitted(Vec<String>),
}

#[derive(Debug)]
pub struct Interpreter {
    secret: SharedSecret,
    session: Session,
    transcript: Transcript,
    panel: Option<CancellationToken>,
}

impl Interpreter {
    pub fn new(config: &TerminalConfig) -> Self {
        let mut transcript = Transcript::new();
        transcript.extend([
            BLANK.to_string(),
            "SCP FOUNDATION TERMINAL v4.2".to_string(),
            "SECURE CONNECTION ESTABLISHED".to_string(),
            format!("CLEARANCE LEVEL: {}", config.clearance_label),
            BLANK.to_string(),
            "Type 'help' for available commands".to_string(),
        ]);

        Self {
            secret: SharedSecret::new(config.login_secret.clone()),
            session: Session::new(),
            transcript,
            panel: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn panel_visibility(&self) -> PanelVisibility {
        if self.panel.is_some() {
            PanelVisibility::Open
        } else {
            PanelVisibility::Closed
        }
    }

    /// Token for the current panel session; cancelled when the panel closes.
    pub fn panel_token(&self) -> Option<CancellationToken> {
        self.panel.clone()
    }

    pub fn evaluate(&mut self, line: &str) -> Turn {
        if self.panel.is_some() {
            tracing::debug!(target: "interpreter", "command_ignored_panel_open");
            return Turn::Ignored;
        }

        let Some(command) = parse_command(line) else {
            return Turn::Ignored;
        };

        let mut response = match command {
            Command::Clear => {
                self.transcript.clear();
                return Turn::Cleared;
            }
            Command::Help => help_lines(self.session.authorization_level()),
            Command::About => vec![
                "Secure. Contain. Protect.".to_string(),
                "Global foundation for anomalous object research and containment.".to_string(),
            ],
            Command::Status => vec![
                "System status: NOMINAL".to_string(),
                "Security: ACTIVE".to_string(),
                "Threat level: ELEVATED".to_string(),
                format!("Authorization: {}", self.session.authorization_level()),
            ],
            Command::Login { token: None } => vec!["Usage: login <password>".to_string()],
            Command::Login { token: Some(token) } => self.login(&token),
            Command::Access => match self.require_authorization() {
                Ok(()) => self.open_panel(),
                Err(denied) => denied,
            },
            Command::Database => match self.require_authorization() {
                Ok(()) => database_lines(),
                Err(denied) => denied,
            },
            Command::Unknown { input } => vec![
                format!("Command not recognized: {input}"),
                "Type 'help' for available commands".to_string(),
            ],
        };
        response.push(BLANK.to_string());

        let mut lines = Vec::with_capacity(response.len() + 1);
        lines.push(format!("> {}", line.trim()));
        lines.extend(response);
        self.transcript.extend(lines.iter().cloned());
        Turn::Emitted(lines)
    }

    pub fn apply_chrome(&mut self, control: ChromeControl) {
        match control {
            ChromeControl::ClosePanel => {
                if let Some(token) = self.panel.take() {
                    token.cancel();
                    tracing::info!(target: "interpreter", "lookup_panel_closed");
                }
            }
            ChromeControl::ClearTranscript => self.transcript.clear(),
        }
    }

    fn login(&mut self, token: &str) -> Vec<String> {
        if self.secret.verify(token) {
            self.session.authorize();
            tracing::info!(target: "interpreter", "login_succeeded");
            vec!["Authentication successful. Security clearance granted.".to_string()]
        } else {
            tracing::warn!(
                target: "interpreter",
                authorized = self.session.is_authorized(),
                "login_failed"
            );
            vec!["Authentication failed. Invalid credentials.".to_string()]
        }
    }

    /// Single gate for privileged commands; the error is the denial text.
    fn require_authorization(&self) -> Result<(), Vec<String>> {
        if self.session.is_authorized() {
            return Ok(());
        }
        Err(vec![
            "Access denied. Authorization required.".to_string(),
            "Use 'login <password>' to authenticate.".to_string(),
        ])
    }

    fn open_panel(&mut self) -> Vec<String> {
        self.panel = Some(CancellationToken::new());
        tracing::info!(target: "interpreter", "lookup_panel_opened");
        vec![
            "Accessing main database...".to_string(),
            "Opening secure lookup panel...".to_string(),
        ]
    }
}

fn help_lines(level: AuthorizationLevel) -> Vec<String> {
    let commands = match level {
        AuthorizationLevel::Unauthenticated => "about, clear, help, login, status",
        AuthorizationLevel::Authorized => "about, access, clear, database, help, status",
    };
    vec![format!("Available commands: {commands}")]
}

fn database_lines() -> Vec<String> {
    vec![
        "SCP database contains 7999+ entries".to_string(),
        "Classified objects: 3472".to_string(),
        "Keter-class: 483 | Euclid-class: 1923 | Safe-class: 5593".to_string(),
        "Use 'access' command to proceed".to_string(),
    ]
}
