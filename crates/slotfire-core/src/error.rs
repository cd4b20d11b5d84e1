use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlotfireError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid target id {key:?}: {reason}")]
    InvalidTargetId { key: String, reason: String },

    #[error("Cookie field not found: {field}")]
    CookieFieldNotFound { field: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SlotfireError {
    /// Short error code string used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            SlotfireError::Config(_) => "CONFIG_ERROR",
            SlotfireError::InvalidTargetId { .. } => "INVALID_TARGET_ID",
            SlotfireError::CookieFieldNotFound { .. } => "COOKIE_FIELD_NOT_FOUND",
            SlotfireError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotfireError>;
