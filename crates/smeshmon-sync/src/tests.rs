#[cfg(test)]
mod tests {
    use crate::*;
    use async_trait::async_trait;
    use smeshmon_rpc::{MockApi, MockCall, RpcError};
    use smeshmon_types::{
        EventDetails, Identity, Millis, Reward, SmesherEvent, Smidge, SortOrder, WindowQuery,
        IDENTITY_LEN,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Stamp(Millis);

    impl Timestamped for Stamp {
        fn timestamp(&self) -> Millis {
            self.0
        }
    }

    /// Serves a fixed list, failing the first `failures` calls
    struct ListSource {
        items: Vec<Stamp>,
        failures: Mutex<u32>,
        delay: Option<Duration>,
        calls: Mutex<Vec<WindowQuery>>,
    }

    impl ListSource {
        fn new(times: impl IntoIterator<Item = Millis>) -> Self {
            ListSource {
                items: times.into_iter().map(Stamp).collect(),
                failures: Mutex::new(0),
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, failures: u32) -> Self {
            self.failures = Mutex::new(failures);
            self
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn calls(&self) -> Vec<WindowQuery> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WindowSource<Stamp> for ListSource {
        async fn fetch_window(&self, query: WindowQuery) -> Result<Vec<Stamp>> {
            self.calls.lock().unwrap().push(query);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            {
                let mut failures = self.failures.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(SyncError::Source(RpcError::Transport("connection refused".into())));
                }
            }
            let mut page: Vec<Stamp> = self
                .items
                .iter()
                .copied()
                .filter(|s| query.contains(s.0))
                .collect();
            page.sort_by_key(|s| s.0);
            if query.order == SortOrder::Desc {
                page.reverse();
            }
            page.truncate(query.limit);
            Ok(page)
        }
    }

    #[derive(Default)]
    struct Collect {
        items: Vec<Stamp>,
        pages: usize,
        errors: usize,
    }

    #[async_trait]
    impl PageSink<Stamp> for Collect {
        async fn on_page(&mut self, page: &[Stamp]) {
            self.pages += 1;
            self.items.extend_from_slice(page);
        }

        async fn on_error(&mut self, _error: &SyncError) {
            self.errors += 1;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_page_then_short_page_makes_two_calls() {
        let source = ListSource::new((1..=140).map(|i| i * 1_000));
        let reconciler = Reconciler::new(100, RetryPolicy::default());
        let mut sink = Collect::default();

        let outcome = reconciler
            .fetch(&source, SortOrder::Asc, 1_000_000, None, &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Completed { pages: 2, items: 140 });
        let calls = source.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].from, None);
        assert_eq!(calls[1].from, Some(100_001));
        assert_eq!(calls[1].to, 1_000_000);

        assert_eq!(sink.pages, 2);
        assert_eq!(sink.items.len(), 140);
        let last_of_first = sink.items[99].0;
        assert!(sink.items[100..].iter().all(|s| s.0 >= last_of_first));
        assert!(sink.items.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(
            reconciler.range(),
            Some(FetchedRange { oldest: 1_000, newest: 140_000 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_descending_sequence_moves_upper_bound() {
        let source = ListSource::new(1..=250);
        let reconciler = Reconciler::new(100, RetryPolicy::default());
        let mut sink = Collect::default();

        reconciler
            .fetch(&source, SortOrder::Desc, 250, Some(1), &mut sink)
            .await
            .unwrap();

        let calls = source.calls();
        assert_eq!(calls.iter().map(|q| q.to).collect::<Vec<_>>(), vec![250, 150, 50]);
        assert!(calls.iter().all(|q| q.from == Some(1)));
        assert_eq!(sink.items.len(), 250);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_window_is_retried_unchanged() {
        let source = ListSource::new((1..=10).map(|i| i * 10)).failing(2);
        let reconciler = Reconciler::new(100, RetryPolicy::fixed(Duration::from_secs(5)));
        let mut sink = Collect::default();
        let started = Instant::now();

        let outcome = reconciler
            .fetch(&source, SortOrder::Asc, 1_000, Some(5), &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, FetchOutcome::Completed { pages: 1, items: 10 });
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(sink.errors, 2);
        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|q| q.to == 1_000 && q.from == Some(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_error() {
        let source = ListSource::new(vec![1]).failing(u32::MAX);
        let policy = RetryPolicy::fixed(Duration::from_secs(1)).with_max_attempts(3);
        let reconciler = Reconciler::new(100, policy);
        let mut sink = Collect::default();

        let err = reconciler
            .fetch(&source, SortOrder::Asc, 10, None, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Exhausted { attempts: 3, .. }));
        assert_eq!(sink.errors, 3);
        assert!(reconciler.range().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetch_is_dropped() {
        let source = ListSource::new(vec![1, 2, 3]).slow(Duration::from_secs(1));
        let reconciler = Reconciler::default();
        let mut first = Collect::default();
        let mut second = Collect::default();

        let (a, b) = tokio::join!(
            reconciler.fetch(&source, SortOrder::Asc, 10, None, &mut first),
            async {
                tokio::task::yield_now().await;
                reconciler.fetch(&source, SortOrder::Asc, 10, None, &mut second).await
            }
        );

        assert_eq!(a.unwrap(), FetchOutcome::Completed { pages: 1, items: 3 });
        assert_eq!(b.unwrap(), FetchOutcome::Busy);
        assert_eq!(source.calls().len(), 1);
        assert!(second.items.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_resumes_after_newest() {
        let source = ListSource::new(vec![10, 20, 30]);
        let reconciler = Reconciler::default();
        let mut sink = Collect::default();

        reconciler.poll(&source, 100, &mut sink).await.unwrap();
        reconciler.poll(&source, 200, &mut sink).await.unwrap();

        let calls = source.calls();
        assert_eq!(calls[0].from, None);
        assert_eq!(calls[1].from, Some(31));
        assert_eq!(calls[1].to, 200);
        assert_eq!(sink.items.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_policy_gives_up() {
        let policy = RetryPolicy::fixed(Duration::from_millis(10)).with_max_attempts(2);
        let mut attempts = 0;
        let result: std::result::Result<(), String> = policy
            .retry("op", |_| {
                attempts += 1;
                async { Err("nope".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 2);

        let ok: std::result::Result<u32, String> = RetryPolicy::default()
            .retry("op", |attempt| async move {
                if attempt < 3 {
                    Err("later".to_string())
                } else {
                    Ok(attempt)
                }
            })
            .await;
        assert_eq!(ok.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_offset_pager_stops_on_short_page() {
        let mut offsets = Vec::new();
        let all: std::result::Result<Vec<usize>, ()> = fetch_all_pages(3, 10, |limit, offset| {
            offsets.push(offset);
            let chunk: Vec<usize> = (offset..(offset + limit).min(7)).collect();
            async move { Ok(chunk) }
        })
        .await;
        assert_eq!(all.unwrap(), (0..7).collect::<Vec<_>>());
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn test_offset_pager_respects_max_pages() {
        let mut calls = 0;
        let all: std::result::Result<Vec<u8>, ()> = fetch_all_pages(2, 10, |_, _| {
            calls += 1;
            async { Ok(vec![0, 0]) }
        })
        .await;
        assert_eq!(calls, 10);
        assert_eq!(all.unwrap().len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_states_and_rewards() {
        let api = Arc::new(MockApi::new());
        let id = Identity::from_bytes([9; IDENTITY_LEN]);
        api.push_events((0..5).map(|t| SmesherEvent::new(id, t, EventDetails::AtxReady)));
        api.set_rewards(
            id,
            (0..150)
                .map(|layer| Reward {
                    layer_paid: layer,
                    reward_for_layer: Smidge::new(1),
                    reward_for_fees: Smidge::ZERO,
                    coinbase: "sm1".into(),
                    smesher: id,
                })
                .collect(),
        );

        let source = ApiStates::new(api.clone());
        let reconciler = Reconciler::default();
        let mut seen = Vec::new();

        struct Events<'a>(&'a mut Vec<SmesherEvent>);

        #[async_trait]
        impl<'a> PageSink<SmesherEvent> for Events<'a> {
            async fn on_page(&mut self, page: &[SmesherEvent]) {
                self.0.extend_from_slice(page);
            }
        }

        reconciler
            .poll(&source, 100, &mut Events(&mut seen))
            .await
            .unwrap();
        assert_eq!(seen.len(), 5);

        let rewards = fetch_all_rewards(api.as_ref(), &id, 100, DEFAULT_MAX_PAGES)
            .await
            .unwrap();
        assert_eq!(rewards.len(), 150);
        assert_eq!(api.calls_to("rewards_chunk").len(), 2);
        assert!(api
            .calls()
            .iter()
            .any(|c| matches!(c, MockCall::Rewards { offset: 100, .. })));
    }
}
