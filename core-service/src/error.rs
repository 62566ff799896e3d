use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Session error: {0}")]
    Session(#[from] core_session::SessionError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("A default client is already installed")]
    DefaultAlreadyInstalled,

    #[error("No default client installed")]
    DefaultNotInstalled,
}

pub type Result<T> = std::result::Result<T, CoreError>;
