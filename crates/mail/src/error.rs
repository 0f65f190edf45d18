//! Error types returned across the query service boundary

/// Failure to turn a payload into readable text
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Message body is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Message body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors produced by the mail query operations
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// No valid credential could be obtained
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The service failed to initialize and will not retry
    #[error("Gmail service not initialized: {reason}")]
    ServiceUnavailable { reason: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Failed to extract message: {0}")]
    Extraction(#[from] ExtractionError),

    /// Any other failure reported by the mail API
    #[error("{context}: {message}")]
    Remote { context: String, message: String },
}

impl MailError {
    pub fn authentication(err: &anyhow::Error) -> Self {
        Self::Authentication {
            message: format!("{:#}", err),
        }
    }

    pub fn remote(context: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Remote {
            context: context.into(),
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T, E = MailError> = std::result::Result<T, E>;
