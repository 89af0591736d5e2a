use crate::analysis::ApiResult;
use crate::config::QueryDescriptor;
use crate::controllers::lifecycle::{Poller, Sequencer};
use crate::controllers::options::ParallelOptions;
use crate::error::{ConsoleError, Result};
use crate::execution::{new_correlation_id, RequestExecutor};
use crate::http::ReqwestTransport;
use crate::traits::Transport;
use crate::types::{ApiRequest, ParallelQueryState};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Default)]
struct RoundFence {
    rounds: Sequencer,
    /// Newest round applied per key
    applied: HashMap<String, u64>,
}

struct ParallelInner<T, C: Transport> {
    executor: RequestExecutor<C>,
    descriptors: Vec<QueryDescriptor>,
    correlation_id: String,
    refetch_interval: Mutex<Option<Duration>>,
    fence: Mutex<RoundFence>,
    state: watch::Sender<ParallelQueryState<T>>,
    liveness: CancellationToken,
    poller: Poller,
}

/// A fixed set of independent reads fetched together.
///
/// One member failing never blocks or erases the others: each key keeps its
/// own data and error.
pub struct ParallelQuerySet<T = Value, C: Transport = ReqwestTransport> {
    inner: Arc<ParallelInner<T, C>>,
}

impl<T, C> ParallelQuerySet<T, C>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Transport,
{
    /// Mount the set and start its first round.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn mount(
        executor: RequestExecutor<C>,
        descriptors: Vec<QueryDescriptor>,
        options: ParallelOptions,
    ) -> Result<Self> {
        let mut keys = HashSet::new();
        for descriptor in &descriptors {
            if !keys.insert(descriptor.key.as_str()) {
                return Err(ConsoleError::duplicate_key(&descriptor.key));
            }
        }

        let (state, _) = watch::channel(ParallelQueryState::default());
        let inner = Arc::new(ParallelInner {
            executor,
            descriptors,
            correlation_id: options.correlation_id.unwrap_or_else(new_correlation_id),
            refetch_interval: Mutex::new(options.refetch_interval),
            fence: Mutex::new(RoundFence::default()),
            state,
            liveness: CancellationToken::new(),
            poller: Poller::new(),
        });

        debug!(
            correlation_id = %inner.correlation_id,
            members = inner.descriptors.len(),
            "parallel set mounted"
        );

        inner.spawn_round();
        inner.install_poller(options.refetch_interval);

        Ok(Self { inner })
    }

    pub fn state(&self) -> ParallelQueryState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ParallelQueryState<T>> {
        self.inner.state.subscribe()
    }

    /// Run a new round and wait until every member has settled
    pub async fn refetch_all(&self) {
        if let Some(round) = self.inner.begin() {
            self.inner.run(round).await;
        }
    }

    pub fn set_refetch_interval(&self, interval: Option<Duration>) {
        {
            let mut current = self.inner.refetch_interval.lock();
            if *current == interval {
                return;
            }
            *current = interval;
        }
        self.inner.install_poller(interval);
    }
}

impl<T, C: Transport> ParallelQuerySet<T, C> {
    pub fn correlation_id(&self) -> &str {
        &self.inner.correlation_id
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.descriptors.iter().map(|d| d.key.as_str())
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_active()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.liveness.is_cancelled()
    }

    pub fn teardown(&self) {
        self.inner.poller.clear();

        let _fence = self.inner.fence.lock();
        if !self.inner.liveness.is_cancelled() {
            self.inner.liveness.cancel();
            info!(correlation_id = %self.inner.correlation_id, "parallel set torn down");
        }
    }
}

impl<T, C: Transport> Drop for ParallelQuerySet<T, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T, C> ParallelInner<T, C>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Transport,
{
    fn begin(&self) -> Option<u64> {
        let mut fence = self.fence.lock();
        if self.liveness.is_cancelled() {
            return None;
        }

        let round = fence.rounds.issue();
        self.state.send_modify(|state| state.loading = true);
        Some(round)
    }

    async fn run(&self, round: u64) {
        let cancel = self.liveness.child_token();
        let mut pending: FuturesUnordered<_> = self
            .descriptors
            .iter()
            .map(|descriptor| {
                let request = ApiRequest::get(descriptor.endpoint.as_str())
                    .with_correlation_id(format!("{}:{}", self.correlation_id, descriptor.key));
                let cancel = &cancel;
                async move {
                    let outcome = self
                        .executor
                        .execute_cancellable::<T>(&request, &descriptor.options, cancel)
                        .await;
                    (descriptor.key.as_str(), outcome)
                }
            })
            .collect();

        let mut failed = 0usize;
        while let Some((key, outcome)) = pending.next().await {
            let Some(result) = outcome else {
                continue;
            };
            if result.is_err() {
                failed += 1;
            }
            self.apply_member(round, key, result);
        }

        self.complete(round);

        if failed > 0 && !self.liveness.is_cancelled() {
            warn!(
                correlation_id = %self.correlation_id,
                round,
                failed,
                total = self.descriptors.len(),
                "parallel round finished with failures"
            );
        }
    }

    fn apply_member(&self, round: u64, key: &str, result: ApiResult<T>) {
        let mut fence = self.fence.lock();
        if self.liveness.is_cancelled() {
            return;
        }

        let newest = fence.applied.get(key).copied().unwrap_or(0);
        if round < newest {
            debug!(correlation_id = %self.correlation_id, key, round, "discarding superseded member result");
            return;
        }
        fence.applied.insert(key.to_string(), round);

        self.state.send_modify(|state| match result {
            Ok(data) => {
                state.data.insert(key.to_string(), data);
                state.errors.remove(key);
            }
            Err(error) => {
                state.errors.insert(key.to_string(), error);
            }
        });
    }

    /// Mark `round` settled; `loading` clears once the newest round is done
    fn complete(&self, round: u64) {
        let mut fence = self.fence.lock();
        if self.liveness.is_cancelled() {
            return;
        }

        fence.rounds.accept(round);
        let idle = fence.rounds.is_idle();
        self.state.send_if_modified(|state| {
            if state.loading == !idle {
                return false;
            }
            state.loading = !idle;
            true
        });
    }

    fn spawn_round(self: &Arc<Self>) {
        if let Some(round) = self.begin() {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.run(round).await;
            });
        }
    }

    fn install_poller(self: &Arc<Self>, interval: Option<Duration>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.poller.install(interval, &self.liveness, move || match weak.upgrade() {
            Some(inner) => {
                inner.spawn_round();
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequestOptions;
    use crate::testing::{mock_executor, MockReply, MockTransport};
    use serde_json::json;

    fn descriptors(keys: &[&str]) -> Vec<QueryDescriptor> {
        keys.iter()
            .map(|key| QueryDescriptor::new(*key, format!("/api/{}", key)))
            .collect()
    }

    async fn settled<C: Transport>(set: &ParallelQuerySet<Value, C>) -> ParallelQueryState<Value> {
        let mut receiver = set.subscribe();
        let state = receiver.wait_for(|state| !state.loading).await.map(|s| s.clone());
        state.unwrap_or_else(|_| set.state())
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_keeps_other_members() {
        let transport = MockTransport::new()
            .with_reply("/api/a", MockReply::json(200, json!("alpha")))
            .with_reply("/api/b", MockReply::json(500, json!({"error": "broken"})))
            .with_reply("/api/c", MockReply::json(200, json!("gamma")));
        let set = ParallelQuerySet::mount(
            mock_executor(&transport),
            descriptors(&["a", "b", "c"]),
            ParallelOptions::default(),
        )
        .unwrap();
        assert!(set.state().loading);

        let state = settled(&set).await;
        assert_eq!(state.data.get("a"), Some(&json!("alpha")));
        assert_eq!(state.data.get("c"), Some(&json!("gamma")));
        assert!(!state.data.contains_key("b"));
        assert_eq!(state.errors.get("b").and_then(|e| e.status_code()), Some(500));
        assert!(state.has_errors());
    }

    #[tokio::test(start_paused = true)]
    async fn test_member_recovery_clears_its_error_only() {
        let transport = MockTransport::new()
            .with_reply("/api/a", MockReply::json(200, json!(1)))
            .with_reply("/api/a", MockReply::json(500, json!({})))
            .with_reply("/api/b", MockReply::json(503, json!({})))
            .with_reply("/api/b", MockReply::json(200, json!(2)));
        let set = ParallelQuerySet::mount(
            mock_executor(&transport),
            descriptors(&["a", "b"]),
            ParallelOptions::default(),
        )
        .unwrap();
        settled(&set).await;

        set.refetch_all().await;
        let state = set.state();
        assert_eq!(state.data.get("a"), Some(&json!(1)));
        assert!(state.errors.contains_key("a"));
        assert_eq!(state.data.get("b"), Some(&json!(2)));
        assert!(!state.errors.contains_key("b"));
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_members_land_as_they_settle() {
        let transport = MockTransport::new()
            .with_reply("/api/fast", MockReply::json(200, json!("f")))
            .with_reply(
                "/api/slow",
                MockReply::json(200, json!("s")).delayed(Duration::from_millis(100)),
            );
        let set = ParallelQuerySet::mount(
            mock_executor(&transport),
            descriptors(&["fast", "slow"]),
            ParallelOptions::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        let state = set.state();
        assert!(state.loading);
        assert_eq!(state.data.get("fast"), Some(&json!("f")));
        assert!(!state.data.contains_key("slow"));

        let state = settled(&set).await;
        assert_eq!(state.data.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_round_never_overwrites_newer() {
        let transport = MockTransport::new()
            .with_reply("/api/a", MockReply::json(200, json!("mounted")))
            .with_reply(
                "/api/a",
                MockReply::json(200, json!("old")).delayed(Duration::from_millis(200)),
            )
            .with_reply("/api/a", MockReply::json(200, json!("new")));
        let set: Arc<ParallelQuerySet<Value, _>> = Arc::new(
            ParallelQuerySet::mount(
                mock_executor(&transport),
                descriptors(&["a"]),
                ParallelOptions::default(),
            )
            .unwrap(),
        );
        assert_eq!(settled(&*set).await.data.get("a"), Some(&json!("mounted")));

        let older = tokio::spawn({
            let set = Arc::clone(&set);
            async move { set.refetch_all().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(transport.attempts("/api/a"), 2);

        set.refetch_all().await;
        assert_eq!(set.state().data.get("a"), Some(&json!("new")));
        assert!(!set.state().loading);

        older.await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(set.state().data.get("a"), Some(&json!("new")));
        assert!(!set.state().loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_keys_are_rejected() {
        let transport = MockTransport::new();
        let result = ParallelQuerySet::<Value, _>::mount(
            mock_executor(&transport),
            vec![
                QueryDescriptor::new("repos", "/api/repos"),
                QueryDescriptor::new("repos", "/api/repositories"),
            ],
            ParallelOptions::default(),
        );

        assert!(matches!(result, Err(ConsoleError::DuplicateQueryKey { key }) if key == "repos"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_member_correlation_ids_and_options() {
        let transport = MockTransport::new()
            .with_reply("/api/a", MockReply::text(503, ""))
            .with_reply("/api/b", MockReply::text(503, ""));
        let set = ParallelQuerySet::mount(
            mock_executor(&transport),
            vec![
                QueryDescriptor::new("a", "/api/a")
                    .with_options(RequestOptions::default().retries(2).retry_delay(Duration::ZERO)),
                QueryDescriptor::new("b", "/api/b"),
            ],
            ParallelOptions::default().correlation_id("dashboard"),
        )
        .unwrap();
        settled(&set).await;

        assert_eq!(transport.attempts("/api/a"), 3);
        assert_eq!(transport.attempts("/api/b"), 1);
        let ids: HashSet<String> = transport
            .requests()
            .into_iter()
            .filter_map(|r| r.correlation_id)
            .collect();
        assert_eq!(
            ids,
            HashSet::from(["dashboard:a".to_string(), "dashboard:b".to_string()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_and_teardown() {
        let transport = MockTransport::new()
            .with_reply("/api/a", MockReply::json(200, json!(1)))
            .with_reply("/api/b", MockReply::json(200, json!(2)));
        let set: ParallelQuerySet<Value, _> = ParallelQuerySet::mount(
            mock_executor(&transport),
            descriptors(&["a", "b"]),
            ParallelOptions::default().refetch_interval(Duration::from_millis(100)),
        )
        .unwrap();
        assert!(set.is_polling());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(transport.attempts("/api/a"), 3);

        set.set_refetch_interval(None);
        assert!(!set.is_polling());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.attempts("/api/a"), 3);

        let before = set.state();
        set.teardown();
        set.refetch_all().await;
        assert_eq!(set.state(), before);
        assert_eq!(transport.attempts("/api/b"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_in_flight_round() {
        let transport = MockTransport::new().with_reply(
            "/api/a",
            MockReply::json(200, json!(1)).delayed(Duration::from_millis(100)),
        );
        let set: ParallelQuerySet<Value, _> = ParallelQuerySet::mount(
            mock_executor(&transport),
            descriptors(&["a"]),
            ParallelOptions::default(),
        )
        .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        set.teardown();
        tokio::time::sleep(Duration::from_millis(500)).await;

        let state = set.state();
        assert!(state.loading);
        assert!(state.data.is_empty());
    }
}
