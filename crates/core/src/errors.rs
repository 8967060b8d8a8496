use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Booking conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Internal error: {0}")]
    Internal(#[from] eyre::Report),
}

impl BookingError {
    /// The message a view would show, without the variant prefix.
    pub fn user_message(&self) -> String {
        match self {
            BookingError::NotFound(msg)
            | BookingError::Validation(msg)
            | BookingError::Authentication(msg)
            | BookingError::Authorization(msg)
            | BookingError::Conflict(msg)
            | BookingError::Network(msg) => msg.clone(),
            BookingError::Api { message, .. } => message.clone(),
            BookingError::Internal(report) => report.to_string(),
        }
    }

    /// Whether the failure means the stored token is no longer usable.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            BookingError::Authentication(_) => true,
            BookingError::Api { status: 401, .. } => true,
            _ => {
                let msg = self.user_message().to_lowercase();
                ["token", "auth", "unauthor", "expired"]
                    .iter()
                    .any(|needle| msg.contains(needle))
            }
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
