use async_trait::async_trait;
use futures::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use smeshmon_ledger::EventLog;
use smeshmon_rpc::{RpcError, SmesherApi};
use smeshmon_sync::{fetch_all_rewards, ApiStates, FetchOutcome, PageSink, Reconciler, SyncError};
use smeshmon_timeline::{ItemKey, TimelineItem};
use smeshmon_types::{Millis, NetworkParameters, Rewards, SmesherEvent, SortOrder};

use crate::{MonitorConfig, MonitorSnapshot, Result, SharedState, SourceKind};

/// Capacity of the change channel; slow subscribers see `Lagged`
const CHANGE_BUFFER: usize = 256;

/// Source of wall-clock time in milliseconds
pub type Clock = fn() -> Millis;

pub fn now_millis() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

/// Items written by one state update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineChange {
    pub generation: u64,
    pub revision: u64,
    pub keys: Vec<ItemKey>,
}

fn layer_period(net: &NetworkParameters) -> Duration {
    Duration::from_millis(net.layer_duration_ms().max(1) as u64)
}

/// Handles shared by the tasks of one connection
#[derive(Clone)]
struct TaskContext {
    api: Arc<dyn SmesherApi>,
    state: Arc<RwLock<SharedState>>,
    changes: broadcast::Sender<TimelineChange>,
    network: watch::Receiver<Option<NetworkParameters>>,
    identities: Arc<Notify>,
    generation: u64,
    config: MonitorConfig,
    clock: Clock,
}

impl TaskContext {
    fn now(&self) -> Millis {
        (self.clock)()
    }

    /// Apply `f` to the latest state and publish the items it touched.
    ///
    /// Returns `None` without touching anything once the connection has
    /// moved on to a newer generation.
    async fn write<R>(&self, f: impl FnOnce(&mut SharedState) -> R) -> Option<R> {
        let mut state = self.state.write().await;
        if state.generation != self.generation {
            debug!("dropping write from stale connection {}", self.generation);
            return None;
        }
        let result = f(&mut state);
        let keys = state.engine.take_dirty();
        if !keys.is_empty() {
            // no subscribers is fine
            let _ = self.changes.send(TimelineChange {
                generation: self.generation,
                revision: state.engine.revision(),
                keys,
            });
        }
        Some(result)
    }

    /// Wait until the network parameters are known
    async fn network(&self) -> Option<NetworkParameters> {
        let mut rx = self.network.clone();
        let params = rx.wait_for(Option::is_some).await.ok()?;
        *params
    }

    /// Call the node until it answers, recording each failure on the source
    async fn fetch<T, F, Fut>(&self, kind: SourceKind, call: F) -> Option<T>
    where
        F: Fn(Arc<dyn SmesherApi>) -> Fut,
        Fut: Future<Output = std::result::Result<T, RpcError>>,
    {
        let label = kind.to_string();
        self.config
            .retry_policy()
            .retry(&label, |_| {
                let request = call(self.api.clone());
                async move {
                    let result = request.await;
                    if let Err(err) = &result {
                        self.write(|state| state.set_error(kind, err.to_string()))
                            .await;
                    }
                    result
                }
            })
            .await
            .ok()
    }
}

/// Merges fetched state pages into the log and projects them
struct EventSink<'a> {
    ctx: &'a TaskContext,
}

#[async_trait]
impl<'a> PageSink<SmesherEvent> for EventSink<'a> {
    async fn on_page(&mut self, page: &[SmesherEvent]) {
        let now = self.ctx.now();
        let new_identities = self
            .ctx
            .write(|state| {
                let summary = state.log.append(page);
                state.events.set_data(state.log.len());
                if !summary.is_empty() {
                    let projected = state.project(now);
                    debug!(
                        "merged {} events ({} duplicates), projected {}",
                        summary.added, summary.duplicates, projected
                    );
                }
                summary.new_identities.len()
            })
            .await;

        if let Some(count) = new_identities.filter(|n| *n > 0) {
            info!("discovered {} new identities", count);
            self.ctx.identities.notify_one();
        }
    }

    async fn on_error(&mut self, error: &SyncError) {
        self.ctx
            .write(|state| state.set_error(SourceKind::Events, error.to_string()))
            .await;
    }
}

async fn run_network(ctx: TaskContext, tx: watch::Sender<Option<NetworkParameters>>) {
    let Some(network) = ctx
        .fetch(SourceKind::Network, |api| async move { api.network_info().await })
        .await
    else {
        return;
    };
    let params = network.params;
    let now = ctx.now();
    let applied = ctx
        .write(|state| {
            state.network.set_data(network);
            state.engine.set_network(params);
            state.engine.tick(now);
        })
        .await;
    if applied.is_some() {
        info!(
            "network: genesis at {}, {}s layers, {} layers per epoch",
            params.genesis_time, params.layer_duration, params.layers_per_epoch
        );
        let _ = tx.send(Some(params));
    }
}

async fn run_node_status(ctx: TaskContext) {
    let Some(net) = ctx.network().await else {
        return;
    };
    loop {
        if let Some(status) = ctx
            .fetch(SourceKind::NodeStatus, |api| async move { api.node_status().await })
            .await
        {
            if ctx.write(|state| state.node_status.set_data(status)).await.is_none() {
                return;
            }
        }
        tokio::time::sleep(layer_period(&net)).await;
    }
}

async fn run_poet(ctx: TaskContext) {
    if ctx.network().await.is_none() {
        return;
    }
    loop {
        if let Some(poet) = ctx
            .fetch(SourceKind::Poet, |api| async move { api.poet_info().await })
            .await
        {
            let now = ctx.now();
            let params = poet.config;
            let applied = ctx
                .write(|state| {
                    state.poet.set_data(poet);
                    state.engine.set_poet(params);
                    state.project(now);
                    state.apply_books();
                })
                .await;
            if applied.is_none() {
                return;
            }
        }
        tokio::time::sleep(ctx.config.poet_poll_interval()).await;
    }
}

async fn run_events(ctx: TaskContext) {
    if ctx.network().await.is_none() {
        return;
    }
    let reconciler = Reconciler::new(ctx.config.page_size, ctx.config.retry_policy());
    let source = ApiStates::new(ctx.api.clone());
    let mut sink = EventSink { ctx: &ctx };
    let mut initial = true;

    loop {
        let now = ctx.now();
        // newest first on the initial load, then only what is new
        let outcome = if initial {
            reconciler
                .fetch(&source, SortOrder::Desc, now, None, &mut sink)
                .await
        } else {
            reconciler.poll(&source, now, &mut sink).await
        };
        match outcome {
            Ok(FetchOutcome::Completed { pages, items }) => {
                initial = false;
                debug!("smesher states: {} items in {} pages", items, pages);
            }
            Ok(FetchOutcome::Busy) => {}
            Err(err) => warn!("fetching smesher states failed: {}", err),
        }
        tokio::time::sleep(ctx.config.events_poll_interval()).await;
    }
}

async fn run_rewards(ctx: TaskContext) {
    let Some(net) = ctx.network().await else {
        return;
    };
    let page_size = ctx.config.page_size;
    let max_pages = ctx.config.max_reward_pages;

    loop {
        let identities = ctx.state.read().await.log.identities().to_vec();
        if !identities.is_empty() {
            let fetched = ctx
                .fetch(SourceKind::Rewards, |api| {
                    let identities = identities.clone();
                    async move {
                        let pages = identities
                            .iter()
                            .map(|id| fetch_all_rewards(api.as_ref(), id, page_size, max_pages));
                        let all = try_join_all(pages).await?;
                        Ok::<_, RpcError>(identities.iter().copied().zip(all).collect::<Rewards>())
                    }
                })
                .await;
            if let Some(rewards) = fetched {
                let applied = ctx
                    .write(|state| {
                        state.rewards.set_data(rewards);
                        state.apply_books();
                    })
                    .await;
                if applied.is_none() {
                    return;
                }
            }
        }
        tokio::select! {
            _ = tokio::time::sleep(layer_period(&net)) => {}
            _ = ctx.identities.notified() => {}
        }
    }
}

async fn run_proposals(ctx: TaskContext) {
    let Some(net) = ctx.network().await else {
        return;
    };
    loop {
        if let Some(proposals) = ctx
            .fetch(SourceKind::Proposals, |api| async move { api.proposals().await })
            .await
        {
            let applied = ctx
                .write(|state| {
                    state.proposals.set_data(proposals);
                    state.apply_books();
                })
                .await;
            if applied.is_none() {
                return;
            }
        }
        tokio::time::sleep(layer_period(&net)).await;
    }
}

async fn run_eligibilities(ctx: TaskContext) {
    let Some(net) = ctx.network().await else {
        return;
    };
    loop {
        if let Some(eligibilities) = ctx
            .fetch(SourceKind::Eligibilities, |api| async move {
                api.eligibilities().await
            })
            .await
        {
            let applied = ctx
                .write(|state| {
                    state.eligibilities.set_data(eligibilities);
                    state.apply_books();
                })
                .await;
            if applied.is_none() {
                return;
            }
        }
        tokio::time::sleep(layer_period(&net)).await;
    }
}

async fn run_clock(ctx: TaskContext) {
    if ctx.network().await.is_none() {
        return;
    }
    let mut ticker = tokio::time::interval(ctx.config.clock_tick());
    loop {
        ticker.tick().await;
        let now = ctx.now();
        let applied = ctx
            .write(|state| {
                state.engine.tick(now);
                state.project(now);
            })
            .await;
        if applied.is_none() {
            return;
        }
    }
}

/// Polls one node and keeps its timeline up to date.
///
/// Each data source runs in its own task. All of them write into one
/// [`SharedState`] and every write that touches the timeline is announced
/// on the channel returned by [`Monitor::subscribe`].
pub struct Monitor {
    config: MonitorConfig,
    clock: Clock,
    state: Arc<RwLock<SharedState>>,
    changes: broadcast::Sender<TimelineChange>,
    tasks: Vec<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        Self::with_clock(config, now_millis)
    }

    pub fn with_clock(config: MonitorConfig, clock: Clock) -> Result<Self> {
        config.validate()?;
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Ok(Self {
            config,
            clock,
            state: Arc::new(RwLock::new(SharedState::new())),
            changes,
            tasks: Vec::new(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Start polling `api`, dropping everything learned from the previous node.
    ///
    /// Returns the new connection generation.
    pub async fn connect(&mut self, api: Arc<dyn SmesherApi>) -> u64 {
        self.abort_tasks();
        let generation = {
            let mut state = self.state.write().await;
            state.reset();
            state.generation
        };
        info!("connecting monitor, generation {}", generation);

        let (network_tx, network_rx) = watch::channel(None);
        let ctx = TaskContext {
            api,
            state: self.state.clone(),
            changes: self.changes.clone(),
            network: network_rx,
            identities: Arc::new(Notify::new()),
            generation,
            config: self.config.clone(),
            clock: self.clock,
        };

        self.tasks = vec![
            tokio::spawn(run_network(ctx.clone(), network_tx)),
            tokio::spawn(run_node_status(ctx.clone())),
            tokio::spawn(run_poet(ctx.clone())),
            tokio::spawn(run_events(ctx.clone())),
            tokio::spawn(run_rewards(ctx.clone())),
            tokio::spawn(run_proposals(ctx.clone())),
            tokio::spawn(run_eligibilities(ctx.clone())),
            tokio::spawn(run_clock(ctx)),
        ];
        generation
    }

    /// Stop polling and clear all state
    pub async fn disconnect(&mut self) {
        self.abort_tasks();
        self.state.write().await.reset();
        info!("monitor disconnected");
    }

    pub fn is_connected(&self) -> bool {
        !self.tasks.is_empty()
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn items(&self) -> Vec<TimelineItem> {
        self.state.read().await.engine.items()
    }

    pub async fn item(&self, key: &ItemKey) -> Option<TimelineItem> {
        self.state.read().await.engine.get(key).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimelineChange> {
        self.changes.subscribe()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
