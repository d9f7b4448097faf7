use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors that can occur while setting up or running the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] smeshmon_rpc::RpcError),

    #[error("Sync error: {0}")]
    Sync(#[from] smeshmon_sync::SyncError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not connected")]
    NotConnected,
}
