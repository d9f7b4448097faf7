mod error;
mod retry;
mod source;
mod reconciler;
mod pager;

pub use error::{Result, SyncError};
pub use retry::RetryPolicy;
pub use source::{ApiStates, PageSink, Timestamped, WindowSource};
pub use reconciler::{FetchOutcome, FetchedRange, Reconciler, DEFAULT_PAGE_SIZE};
pub use pager::{fetch_all_pages, fetch_all_rewards, DEFAULT_MAX_PAGES};

#[cfg(test)]
mod tests;
