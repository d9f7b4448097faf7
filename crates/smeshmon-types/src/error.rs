use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmeshmonError {
    #[error("Invalid network parameters: {0}")]
    InvalidNetworkParams(String),

    #[error("Invalid PoET parameters: {0}")]
    InvalidPoetParams(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Layer out of range: {0}")]
    LayerOutOfRange(i64),
}

pub type Result<T> = std::result::Result<T, SmeshmonError>;
