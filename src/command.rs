#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    About,
    Status,
    Clear,
    Login { token: Option<String> },
    Access,
    Database,
    Unknown { input: String },
}

/// Classifies one input line. Blank input yields `None`.
///
/// Only the keyword is case-folded; a login token keeps its case.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (trimmed, ""),
    };

    let command = match (keyword.to_lowercase().as_str(), rest.is_empty()) {
        ("login", true) => Command::Login { token: None },
        ("login", false) => Command::Login {
            token: Some(rest.to_string()),
        },
        ("help", true) => Command::Help,
        ("about", true) => Command::About,
        ("status", true) => Command::Status,
        ("clear", true) => Command::Clear,
        ("access", true) => Command::Access,
        ("database", true) => Command::Database,
        _ => Command::Unknown {
            input: trimmed.to_string(),
        },
    };

    Some(command)
}
