//! Error taxonomy for the MEXC client
//!
//! Transport and 5xx/429 failures are transient and eligible for retry;
//! everything else surfaces immediately. Callers above the client treat an
//! exhausted retry budget as "no data this cycle", never as a crash.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MexcError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("MEXC API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse MEXC response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("API credentials not configured")]
    MissingCredentials,

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),
}

impl MexcError {
    /// Whether a retry with backoff could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            MexcError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            MexcError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
