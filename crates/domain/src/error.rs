/// Shared error type used across all Tidings crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// A persisted record matches none of the known turn shapes.
    #[error("unclassifiable record at line {line}: {reason}")]
    Classification { line: usize, reason: String },

    #[error("history store: {0}")]
    Store(String),

    #[error("notify: {0}")]
    Notify(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("a run is already in progress for {store}")]
    RunBusy { store: String },

    #[error("tool loop limit reached ({rounds} rounds)")]
    ToolLoopLimit { rounds: usize },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// `true` for failures to reach a remote service at all (connection
    /// refused, DNS, TLS, timeouts), as opposed to an error answer from it.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
