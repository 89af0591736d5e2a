use crate::analysis::ApiResult;
use crate::config::RequestOptions;
use crate::controllers::lifecycle::{Poller, Sequencer};
use crate::controllers::options::{ErrorCallback, QueryOptions, SuccessCallback};
use crate::execution::{new_correlation_id, RequestExecutor};
use crate::http::ReqwestTransport;
use crate::traits::Transport;
use crate::types::{ApiRequest, QueryState};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Values that can change while a query is mounted
struct Settings {
    endpoint: String,
    enabled: bool,
    dependencies: Vec<String>,
    refetch_interval: Option<Duration>,
}

struct QueryInner<T, C: Transport> {
    executor: RequestExecutor<C>,
    correlation_id: String,
    request_options: RequestOptions,
    on_success: Option<SuccessCallback<T>>,
    on_error: Option<ErrorCallback>,
    settings: Mutex<Settings>,
    /// Serializes state writes with teardown
    fence: Mutex<Sequencer>,
    state: watch::Sender<QueryState<T>>,
    liveness: CancellationToken,
    poller: Poller,
}

/// Lifecycle owner of one read query bound to one consumer.
///
/// Mounting starts the first fetch (when enabled) and the polling timer
/// (when configured). Every later fetch goes through [`refetch`], the
/// timer, or a change of endpoint/dependencies. Dropping the controller
/// tears it down.
///
/// [`refetch`]: QueryController::refetch
pub struct QueryController<T, C: Transport = ReqwestTransport> {
    inner: Arc<QueryInner<T, C>>,
}

impl<T, C> QueryController<T, C>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Transport,
{
    /// Mount a query for `endpoint`.
    ///
    /// # Panics
    /// Must be called from within a Tokio runtime.
    pub fn mount<S: Into<String>>(executor: RequestExecutor<C>, endpoint: S, options: QueryOptions<T>) -> Self {
        let QueryOptions {
            enabled,
            request,
            refetch_interval,
            initial_data,
            dependencies,
            correlation_id,
            on_success,
            on_error,
        } = options;

        let (state, _) = watch::channel(QueryState::seeded(initial_data));
        let inner = Arc::new(QueryInner {
            executor,
            correlation_id: correlation_id.unwrap_or_else(new_correlation_id),
            request_options: request,
            on_success,
            on_error,
            settings: Mutex::new(Settings {
                endpoint: endpoint.into(),
                enabled,
                dependencies,
                refetch_interval,
            }),
            fence: Mutex::new(Sequencer::default()),
            state,
            liveness: CancellationToken::new(),
            poller: Poller::new(),
        });

        debug!(
            correlation_id = %inner.correlation_id,
            endpoint = %inner.settings.lock().endpoint,
            enabled,
            "query mounted"
        );

        if enabled {
            inner.spawn_fetch();
        }
        inner.install_poller(refetch_interval);

        Self { inner }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> QueryState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.inner.state.subscribe()
    }

    /// Fetch now, regardless of `enabled`, and wait for the result to land.
    ///
    /// Does nothing after teardown.
    pub async fn refetch(&self) {
        if let Some(ticket) = self.inner.begin() {
            self.inner.run(ticket).await;
        }
    }

    /// Enabling a disabled query starts a fetch
    pub fn set_enabled(&self, enabled: bool) {
        let became_enabled = {
            let mut settings = self.inner.settings.lock();
            let became_enabled = enabled && !settings.enabled;
            settings.enabled = enabled;
            became_enabled
        };

        if became_enabled {
            self.inner.spawn_fetch();
        }
    }

    /// Point the query at another resource; fetches when enabled
    pub fn set_endpoint<S: Into<String>>(&self, endpoint: S) {
        let endpoint = endpoint.into();
        let should_fetch = {
            let mut settings = self.inner.settings.lock();
            if settings.endpoint == endpoint {
                false
            } else {
                settings.endpoint = endpoint;
                settings.enabled
            }
        };

        if should_fetch {
            self.inner.spawn_fetch();
        }
    }

    /// Replace the dependency list; any change fetches when enabled
    pub fn set_dependencies<I, S>(&self, dependencies: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();
        let should_fetch = {
            let mut settings = self.inner.settings.lock();
            if settings.dependencies == dependencies {
                false
            } else {
                settings.dependencies = dependencies;
                settings.enabled
            }
        };

        if should_fetch {
            self.inner.spawn_fetch();
        }
    }

    /// Change the polling period. The old timer is cleared before a new one
    /// is installed; `None` or zero leaves no timer at all.
    pub fn set_refetch_interval(&self, interval: Option<Duration>) {
        {
            let mut settings = self.inner.settings.lock();
            if settings.refetch_interval == interval {
                return;
            }
            settings.refetch_interval = interval;
        }
        self.inner.install_poller(interval);
    }

    pub fn endpoint(&self) -> String {
        self.inner.settings.lock().endpoint.clone()
    }
}

impl<T, C: Transport> QueryController<T, C> {
    /// Identifier sent with every request of this controller
    pub fn correlation_id(&self) -> &str {
        &self.inner.correlation_id
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_active()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.liveness.is_cancelled()
    }

    /// Stop polling, cancel in-flight fetches and freeze the state.
    ///
    /// Idempotent; also runs on drop.
    pub fn teardown(&self) {
        self.inner.poller.clear();

        let _fence = self.inner.fence.lock();
        if !self.inner.liveness.is_cancelled() {
            self.inner.liveness.cancel();
            info!(correlation_id = %self.inner.correlation_id, "query torn down");
        }
    }
}

impl<T, C: Transport> Drop for QueryController<T, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T, C> QueryInner<T, C>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Transport,
{
    /// Take a ticket and flag the fetch as in flight
    fn begin(&self) -> Option<u64> {
        let mut fence = self.fence.lock();
        if self.liveness.is_cancelled() {
            return None;
        }

        let ticket = fence.issue();
        let resolved = fence.has_resolved();
        self.state.send_modify(|state| {
            if resolved {
                state.loading = false;
                state.is_refetching = true;
            } else {
                state.loading = true;
                state.is_refetching = false;
            }
        });
        Some(ticket)
    }

    async fn run(&self, ticket: u64) {
        let endpoint = self.settings.lock().endpoint.clone();
        let request = ApiRequest::get(endpoint).with_correlation_id(self.correlation_id.as_str());
        let cancel = self.liveness.child_token();

        let outcome = self
            .executor
            .execute_cancellable::<T>(&request, &self.request_options, &cancel)
            .await;

        if let Some(result) = outcome {
            self.apply(ticket, result);
        }
    }

    fn apply(&self, ticket: u64, result: ApiResult<T>) {
        {
            let mut fence = self.fence.lock();
            if self.liveness.is_cancelled() {
                debug!(correlation_id = %self.correlation_id, ticket, "discarding response after teardown");
                return;
            }
            if !fence.accept(ticket) {
                debug!(correlation_id = %self.correlation_id, ticket, "discarding superseded response");
                return;
            }

            let idle = fence.is_idle();
            self.state.send_modify(|state| {
                match &result {
                    Ok(data) => {
                        state.data = Some(data.clone());
                        state.error = None;
                    }
                    Err(error) => state.error = Some(error.clone()),
                }
                state.loading = false;
                state.is_refetching = !idle;
            });
        }

        self.notify(&result);
    }

    fn notify(&self, result: &ApiResult<T>) {
        if self.liveness.is_cancelled() {
            return;
        }
        match result {
            Ok(data) => {
                if let Some(callback) = &self.on_success {
                    callback(data);
                }
            }
            Err(error) => {
                if let Some(callback) = &self.on_error {
                    callback(error);
                }
            }
        }
    }

    fn spawn_fetch(self: &Arc<Self>) {
        if let Some(ticket) = self.begin() {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.run(ticket).await;
            });
        }
    }

    fn install_poller(self: &Arc<Self>, interval: Option<Duration>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.poller.install(interval, &self.liveness, move || match weak.upgrade() {
            Some(inner) => {
                inner.spawn_fetch();
                true
            }
            None => false,
        });
    }
}
