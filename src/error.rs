//! Error taxonomy for lakeconn.
//!
//! Every library API returns `Result<T, Error>`. The lifecycle manager catches
//! these at its boundary and turns them into recorded errors and
//! notifications, so observers of a session never see them directly.

use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure or a non-2xx answer from the backend.
    #[error("{message}")]
    Network {
        message: String,
        /// HTTP status when the backend answered at all.
        status: Option<u16>,
    },

    #[error("Unsupported provider: '{0}'. Available: jira, github, jenkins, gitlab")]
    UnsupportedProvider(String),

    /// Caller input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    pub fn network(message: impl Into<String>, status: Option<u16>) -> Self {
        Error::Network {
            message: message.into(),
            status,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// HTTP status carried by a network error, if the backend responded.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Network { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this failure means the backend is unreachable.
    ///
    /// A transport error without any response (DNS, refused connection,
    /// timeout) counts, as do gateway-style 502/503/504 answers.
    pub fn is_offline(&self) -> bool {
        match self {
            Error::Network { status: None, .. } => true,
            Error::Network {
                status: Some(code), ..
            } => matches!(code, 502..=504),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
