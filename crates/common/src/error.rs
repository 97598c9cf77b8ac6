use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // ── Recoverable per evaluation cycle ──────────────────────────────
    #[error("out-of-order observation for {symbol}: {timestamp_ms} precedes last recorded {last_ms}")]
    OutOfOrder {
        symbol: String,
        timestamp_ms: i64,
        last_ms: i64,
    },

    #[error("no observations for {symbol} within the last {window_ms}ms")]
    InsufficientData { symbol: String, window_ms: i64 },

    #[error("percentage change with a zero base value")]
    DivisionByZero,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("data source error: {0}")]
    Source(String),

    // ── Ambient ───────────────────────────────────────────────────────
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors that abort a single evaluation cycle but must
    /// never take the process down. The poller logs these and skips
    /// signal emission for that symbol/cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::OutOfOrder { .. }
                | Error::InsufficientData { .. }
                | Error::DivisionByZero
                | Error::InvalidArgument(_)
                | Error::Source(_)
                | Error::Http(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
