use async_trait::async_trait;
use std::sync::Arc;

use smeshmon_rpc::SmesherApi;
use smeshmon_types::{Millis, SmesherEvent, WindowQuery};

use crate::{Result, SyncError};

/// Records that can be paged through by time
pub trait Timestamped {
    fn timestamp(&self) -> Millis;
}

impl Timestamped for SmesherEvent {
    fn timestamp(&self) -> Millis {
        self.time
    }
}

/// A chunked list endpoint addressed by time windows
#[async_trait]
pub trait WindowSource<T>: Send + Sync {
    async fn fetch_window(&self, query: WindowQuery) -> Result<Vec<T>>;
}

/// Receiver for the pages and errors of a fetch sequence
#[async_trait]
pub trait PageSink<T: Send + Sync>: Send {
    async fn on_page(&mut self, page: &[T]);

    async fn on_error(&mut self, _error: &SyncError) {}
}

/// Identity state history of a node, as a window source
pub struct ApiStates<A: ?Sized> {
    api: Arc<A>,
}

impl<A: ?Sized> ApiStates<A> {
    pub fn new(api: Arc<A>) -> Self {
        ApiStates { api }
    }
}

#[async_trait]
impl<A: SmesherApi + ?Sized> WindowSource<SmesherEvent> for ApiStates<A> {
    async fn fetch_window(&self, query: WindowQuery) -> Result<Vec<SmesherEvent>> {
        Ok(self.api.smesher_states_chunk(&query).await?)
    }
}
