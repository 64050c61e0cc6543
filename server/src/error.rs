use thiserror::Error;

/// Failures of the transport around the session. Gameplay never produces these.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("packet codec error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("invalid address {0}")]
    Address(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
