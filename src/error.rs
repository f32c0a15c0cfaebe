use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("ticket '{0}' not found")]
    TicketNotFound(String),

    #[error("invalid status '{0}'")]
    InvalidStatus(String),

    #[error("invalid priority '{0}'")]
    InvalidPriority(String),

    #[error("invalid category '{0}'")]
    InvalidCategory(String),

    #[error("no ticket is open")]
    NoOpenTicket,

    #[error("ticket is closed; new replies are disabled")]
    TicketClosed,

    #[error("reply text is empty")]
    EmptyMessage,

    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    /// Field-level messages from a server-side validation failure, if any.
    pub fn field_errors(&self) -> Option<&[String]> {
        match self {
            ConsoleError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
