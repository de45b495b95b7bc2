use thiserror::Error;

/// Bad user input. Reported next to the offending control, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Please enter an email address")]
    EmptyEmail,
    #[error("Please enter a valid email address")]
    InvalidEmail(String),
    #[error("This email is already in the list")]
    DuplicateRecipient(String),
    #[error("Please enter a valid URL")]
    InvalidUrl(String),
}

/// A failed chat request. The `Display` text is what ends up in the toast
/// and in the error message appended to the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Request timed out. The server is taking too long to respond.")]
    Timeout,
    #[error("Server error: {status}. {}", .detail.as_deref().unwrap_or("Please try again."))]
    Server { status: u16, detail: Option<String> },
    #[error("Cannot reach the server. Please ensure the backend is running.")]
    Unreachable(String),
    #[error("Sorry, I encountered an error.")]
    InvalidResponse(String),
}

impl RequestError {
    pub fn marks_offline(&self) -> bool {
        matches!(self, RequestError::Unreachable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend unreachable: {0}")]
pub struct ConnectivityError(pub String);

/// Why a send (or regenerate) was refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Backend server is not reachable. Please check if it's running.")]
    Offline,
    #[error("A response is still pending. Please wait for it to finish.")]
    Busy,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no data directory available")]
    NoDataDir,
    #[error("{0} storage is not supported")]
    Unsupported(&'static str),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("could not read import file: {0}")]
    Io(#[from] std::io::Error),
    #[error("import file is not valid JSON: {0}")]
    Malformed(serde_json::Error),
    #[error("import document must be a JSON object")]
    NotAnObject,
    #[error("import field `{field}` is invalid: {source}")]
    InvalidField {
        field: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}
