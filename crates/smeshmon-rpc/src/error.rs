use smeshmon_types::SmeshmonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Not available: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Types(#[from] SmeshmonError),
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RpcError::Decode(err.to_string())
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
