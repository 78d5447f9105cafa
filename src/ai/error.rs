use thiserror::Error;

/// Failures of the external completion service. None of these reach the
/// client; the orchestrator degrades to an empty suggestion list.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("completion service not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("parse error: {0}")]
    Parse(String),
}
