use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the client surfaces to the user maps onto one of these
/// kinds. `NoData` is an empty-state signal, not a failure; callers
/// switch on it to show the no-data placeholder instead of an error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected payload: {0}")]
    Protocol(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("unknown task id {0}")]
    NotFound(u64),

    #[error("chart render failed: {0}")]
    Render(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("no progress data in the selected timeframe")]
    NoData,
}

impl Error {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Covers connect failures and client-side timeouts alike.
        Self::Network(err.to_string())
    }
}
