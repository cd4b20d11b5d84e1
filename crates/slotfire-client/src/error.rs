use thiserror::Error;

/// Failures talking to the reservation service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API error ({code}): {message}")]
    Api { code: i64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Request timeout after {ms}ms")]
    Timeout { ms: u64 },
}

/// Failures querying the reference clock.
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("SNTP query failed: {0}")]
    Sntp(String),

    #[error("Time query timeout after {ms}ms")]
    Timeout { ms: u64 },
}

pub type Result<T> = std::result::Result<T, ClientError>;
