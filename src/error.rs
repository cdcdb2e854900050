use thiserror::Error;

use crate::session::trigger::TriggerError;

pub type Result<T> = std::result::Result<T, AutofillError>;

#[derive(Debug, Error)]
pub enum AutofillError {
    /// Page markup could not be turned into a document tree
    #[error("HTML parse error: {0}")]
    HtmlParse(String),

    /// Oracle replied, but nothing parseable as a selector→key object could be
    /// recovered. Intentionally carries no partial content.
    #[error("Invalid oracle response from {provider}")]
    InvalidOracleResponse { provider: String },

    #[error("No response content from {0}")]
    EmptyOracleResponse(String),

    #[error("{provider} request failed: {source}")]
    OracleTransport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error: HTTP {status}")]
    OracleStatus { provider: String, status: u16 },

    #[error("{0} is not configured (missing API key)")]
    OracleNotConfigured(String),

    #[error("Unknown oracle provider: {0}")]
    UnknownProvider(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No active profile")]
    NoActiveProfile,

    #[error("Invalid profile data: {0}")]
    InvalidProfile(String),

    #[error("Region not found: {0}")]
    RegionNotFound(String),

    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

impl AutofillError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AutofillError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        AutofillError::Json {
            context: context.into(),
            source,
        }
    }
}
