use thiserror::Error;

/// Failures surfaced by [`Transport::request`](crate::Transport::request).
///
/// Every variant that corresponds to an HTTP outcome carries a status via
/// [`status`](TransportError::status); retry decisions are made on that
/// status alone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Request parameters failed validation; nothing was sent.
    #[error("{0}")]
    Validation(String),

    /// No response within the transport timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server rejected a redemption for lack of credits (HTTP 402).
    #[error("Not enough credits to redeem.")]
    InsufficientCredits,

    /// Any other non-success status.
    #[error("Error in API: {status}")]
    Api { status: u16 },

    /// Connection-level failure with no HTTP status.
    #[error("Network error: {0}")]
    Network(String),

    /// The fallback response did not invoke the expected callback.
    #[error("Fallback callback {0} was not invoked")]
    CallbackNotInvoked(String),

    /// Neither transport can send requests.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

impl TransportError {
    /// HTTP-equivalent status of this failure, if it has one.
    ///
    /// Timeouts on either transport report 504.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Timeout | TransportError::CallbackNotInvoked(_) => Some(504),
            TransportError::InsufficientCredits => Some(402),
            TransportError::Api { status } => Some(*status),
            TransportError::Validation(_)
            | TransportError::Network(_)
            | TransportError::Unavailable(_) => None,
        }
    }

    /// Only server-class (5xx) failures are retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status(), Some(status) if (500..600).contains(&status))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
