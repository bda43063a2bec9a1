use thiserror::Error;

/// Error taxonomy shared by every stage of the harness.
///
/// Extraction misses (no invitation link, no passcode in a message) are
/// deliberately NOT errors; they are `Option` results on the extraction
/// functions, and callers treat absence as a legitimate outcome.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no known page variant matched: {0}")]
    Classification(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("api error: {0}")]
    Api(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl FlowError {
    pub fn timeout(what: impl Into<String>, waited_ms: u64) -> Self {
        Self::Timeout {
            what: what.into(),
            waited_ms,
        }
    }

    /// True when the error is a bounded-wait expiry (inbox or DOM).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
