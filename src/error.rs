pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a launch payload was refused. Every variant is terminal: a payload that
/// fails once fails again for the same token and clock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Signature field is missing")]
    MissingSignature,

    #[error("Signature does not match")]
    SignatureMismatch,

    #[error("Payload expired: issued {age}s ago, limit is {max_age}s")]
    Expired { age: i64, max_age: u64 },

    #[error("Issuance timestamp is missing or not numeric")]
    MissingTimestamp,

    #[error("Invalid user payload: {0}")]
    InvalidUserPayload(String),
}

impl VerifyError {
    /// Stable snake_case code for transport layers.
    pub fn reason(&self) -> &'static str {
        match self {
            VerifyError::MalformedPayload(_) => "malformed_payload",
            VerifyError::MissingSignature => "missing_signature",
            VerifyError::SignatureMismatch => "signature_mismatch",
            VerifyError::Expired { .. } => "expired",
            VerifyError::MissingTimestamp => "missing_timestamp",
            VerifyError::InvalidUserPayload(_) => "invalid_user_payload",
        }
    }
}
