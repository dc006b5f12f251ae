use chrono::{DateTime, Utc};
use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Kind of entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Model,
    Market,
    Position,
    Balance,
    Receipt,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Model => "model",
            Self::Market => "market",
            Self::Position => "position",
            Self::Balance => "balance",
            Self::Receipt => "receipt",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bad input, rejected before the ledger is touched.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },

    #[error("market {market_id} is closed: {reason}")]
    MarketClosed { market_id: String, reason: String },

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("market {market_id} is already resolved")]
    AlreadyResolved { market_id: String },

    #[error("market {market_id} is not resolved yet")]
    NotResolved { market_id: String },

    #[error("market {market_id} cannot resolve before {deadline}")]
    ResolutionNotDue {
        market_id: String,
        deadline: DateTime<Utc>,
    },

    #[error("position in market {market_id} is already claimed")]
    AlreadyClaimed { market_id: String },

    #[error("nothing to claim in market {market_id}: {reason}")]
    NothingToClaim { market_id: String, reason: String },

    #[error("monitoring fetch failed: {0}")]
    Fetch(String),

    #[error("operation timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn not_found(entity: Entity, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Infrastructure failures that a scheduler may retry with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_)
                | Self::Timeout { .. }
                | Self::Http(_)
                | Self::Io(_)
                | Self::Connection(_)
                | Self::Database(_)
        )
    }

    /// Outcomes of a lost race against another automated process.
    ///
    /// Automated callers treat these as no-ops; direct user actions surface them.
    #[must_use]
    pub fn is_benign_race(&self) -> bool {
        matches!(
            self,
            Self::AlreadyResolved { .. } | Self::AlreadyClaimed { .. }
        )
    }
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}
