use core_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Branch SDK not initialized")]
    NotInitialized,

    #[error("Branch SDK initialization pending")]
    InitPending,

    #[error("Branch SDK initialization failed")]
    InitFailed,

    #[error("Branch SDK already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Error getting device data: {0}")]
    DeviceData(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Queued task {0} did not finish before the watchdog fired")]
    TaskStalled(&'static str),

    #[error("Queued task was dropped before it completed")]
    TaskAbandoned,

    #[error(transparent)]
    Config(#[from] core_runtime::Error),
}

impl SessionError {
    /// Errors raised before anything was queued or sent.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SessionError::NotInitialized
                | SessionError::InitPending
                | SessionError::InitFailed
                | SessionError::AlreadyInitialized
        )
    }

    /// Underlying transport failure, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            SessionError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
