use std::sync::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use smeshmon_types::{Millis, SortOrder, WindowQuery};

use crate::{PageSink, Result, RetryPolicy, SyncError, Timestamped, WindowSource};

/// Largest page the node serves per call
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Timestamps of the oldest and newest records delivered so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchedRange {
    pub oldest: Millis,
    pub newest: Millis,
}

impl FetchedRange {
    fn widen(self, oldest: Millis, newest: Millis) -> Self {
        FetchedRange {
            oldest: self.oldest.min(oldest),
            newest: self.newest.max(newest),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Completed { pages: usize, items: usize },
    /// Another sequence was already running; nothing was requested
    Busy,
}

/// Walks a time-windowed list endpoint page by page.
///
/// A full page means there may be more: ascending sequences move `from` past
/// the newest record of the page, descending ones move `to` before the
/// oldest. A short page ends the sequence. Failed requests are retried with
/// the same window so no range is skipped.
pub struct Reconciler {
    page_size: usize,
    retry: RetryPolicy,
    range: Mutex<Option<FetchedRange>>,
    in_flight: AsyncMutex<()>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Reconciler::new(DEFAULT_PAGE_SIZE, RetryPolicy::default())
    }
}

impl Reconciler {
    pub fn new(page_size: usize, retry: RetryPolicy) -> Self {
        Reconciler {
            page_size: page_size.max(1),
            retry,
            range: Mutex::new(None),
            in_flight: AsyncMutex::new(()),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn range(&self) -> Option<FetchedRange> {
        *self.range.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn reset(&self) {
        *self.range.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn widen<T: Timestamped>(&self, page: &[T]) {
        let oldest = page.iter().map(Timestamped::timestamp).min();
        let newest = page.iter().map(Timestamped::timestamp).max();
        if let (Some(oldest), Some(newest)) = (oldest, newest) {
            let mut range = self.range.lock().unwrap_or_else(|e| e.into_inner());
            *range = Some(match *range {
                Some(known) => known.widen(oldest, newest),
                None => FetchedRange { oldest, newest },
            });
        }
    }

    /// Fetch everything in `[from, to]`, delivering pages to `sink` as they arrive
    pub async fn fetch<T, S, K>(
        &self,
        source: &S,
        order: SortOrder,
        to: Millis,
        from: Option<Millis>,
        sink: &mut K,
    ) -> Result<FetchOutcome>
    where
        T: Timestamped + Send + Sync,
        S: WindowSource<T> + ?Sized,
        K: PageSink<T> + ?Sized,
    {
        let _guard = match self.in_flight.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("fetch sequence already in flight, skipping");
                return Ok(FetchOutcome::Busy);
            }
        };

        let mut query = WindowQuery {
            order,
            to,
            from,
            limit: self.page_size,
        };
        let mut pages = 0;
        let mut items = 0;

        loop {
            let page = self.fetch_page(source, query, sink).await?;
            pages += 1;
            items += page.len();

            if !page.is_empty() {
                self.widen(&page);
                sink.on_page(&page).await;
            }
            if page.len() < self.page_size {
                break;
            }

            match order {
                SortOrder::Asc => {
                    let newest = page.iter().map(Timestamped::timestamp).max();
                    query.from = newest.map(|t| t + 1);
                }
                SortOrder::Desc => {
                    if let Some(oldest) = page.iter().map(Timestamped::timestamp).min() {
                        query.to = oldest - 1;
                    }
                }
            }
            if query.from.map_or(false, |from| from > query.to) {
                break;
            }
        }

        debug!("fetched {} items in {} pages", items, pages);
        Ok(FetchOutcome::Completed { pages, items })
    }

    /// Fetch whatever is newer than the newest record seen, up to `now`
    pub async fn poll<T, S, K>(&self, source: &S, now: Millis, sink: &mut K) -> Result<FetchOutcome>
    where
        T: Timestamped + Send + Sync,
        S: WindowSource<T> + ?Sized,
        K: PageSink<T> + ?Sized,
    {
        let from = self.range().map(|r| r.newest + 1);
        self.fetch(source, SortOrder::Asc, now, from, sink).await
    }

    async fn fetch_page<T, S, K>(&self, source: &S, query: WindowQuery, sink: &mut K) -> Result<Vec<T>>
    where
        T: Timestamped + Send + Sync,
        S: WindowSource<T> + ?Sized,
        K: PageSink<T> + ?Sized,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match source.fetch_window(query).await {
                Ok(page) => return Ok(page),
                Err(err) => {
                    warn!(
                        "window {:?}..{} ({}) failed on attempt {}: {}",
                        query.from, query.to, query.order, attempt, err
                    );
                    sink.on_error(&err).await;
                    if self.retry.is_exhausted(attempt) {
                        return Err(SyncError::Exhausted {
                            attempts: attempt,
                            last: err.to_string(),
                        });
                    }
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }
}
