use smeshmon_rpc::RpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Source error: {0}")]
    Source(#[from] RpcError),

    #[error("Giving up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

pub type Result<T> = std::result::Result<T, SyncError>;
