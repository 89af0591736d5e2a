use crate::analysis::{ApiError, ApiResult};
use crate::controllers::options::MutationOptions;
use crate::execution::{new_correlation_id, RequestExecutor};
use crate::http::ReqwestTransport;
use crate::traits::Transport;
use crate::types::{ApiRequest, HttpMethod, MutationMethod, MutationState};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Owner of one write operation.
///
/// Every `mutate` call makes exactly one attempt. Calls may overlap; the
/// state stays `loading` until all of them have settled.
pub struct MutationController<T, C: Transport = ReqwestTransport> {
    executor: RequestExecutor<C>,
    endpoint: String,
    method: MutationMethod,
    options: MutationOptions<T>,
    correlation_id: String,
    state: watch::Sender<MutationState<T>>,
    /// Calls in flight; also serializes state writes with teardown
    pending: Mutex<usize>,
    liveness: CancellationToken,
}

impl<T, C> MutationController<T, C>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
    C: Transport,
{
    pub fn new<S: Into<String>>(
        executor: RequestExecutor<C>,
        endpoint: S,
        method: MutationMethod,
        mut options: MutationOptions<T>,
    ) -> Self {
        let correlation_id = options.correlation_id.take().unwrap_or_else(new_correlation_id);
        let (state, _) = watch::channel(MutationState::default());

        Self {
            executor,
            endpoint: endpoint.into(),
            method,
            options,
            correlation_id,
            state,
            pending: Mutex::new(0),
            liveness: CancellationToken::new(),
        }
    }

    /// Send `payload` and wait for the outcome.
    ///
    /// The result is returned to the caller even after teardown; only the
    /// state and the callbacks are frozen.
    pub async fn mutate<B: Serialize + ?Sized>(&self, payload: &B) -> ApiResult<T> {
        let method = HttpMethod::from(self.method);
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => {
                let error = ApiError::serialization(
                    None,
                    format!("could not encode payload for {} {}: {}", method, self.endpoint, e),
                    Some(self.correlation_id.clone()),
                );
                self.settle(Err(error.clone()), false);
                return Err(error);
            }
        };

        self.begin();

        let request = ApiRequest::new(method, self.endpoint.as_str())
            .with_body(body)
            .with_correlation_id(self.correlation_id.as_str());
        let result = self
            .executor
            .execute::<T>(&request, &self.options.request_options())
            .await;

        self.settle(result.clone(), true);
        result
    }

    fn begin(&self) {
        let mut pending = self.pending.lock();
        *pending += 1;
        if self.liveness.is_cancelled() {
            return;
        }
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    fn settle(&self, result: ApiResult<T>, started: bool) {
        {
            let mut pending = self.pending.lock();
            if started {
                *pending = pending.saturating_sub(1);
            }
            if self.liveness.is_cancelled() {
                debug!(correlation_id = %self.correlation_id, "discarding mutation result after teardown");
                return;
            }

            let still_pending = *pending > 0;
            self.state.send_modify(|state| {
                match &result {
                    Ok(data) => {
                        state.data = Some(data.clone());
                        state.error = None;
                    }
                    Err(error) => state.error = Some(error.clone()),
                }
                state.loading = still_pending;
            });
        }

        if self.liveness.is_cancelled() {
            return;
        }
        match &result {
            Ok(data) => {
                if let Some(callback) = &self.options.on_success {
                    callback(data);
                }
            }
            Err(error) => {
                if let Some(callback) = &self.options.on_error {
                    callback(error);
                }
            }
        }
    }
}

impl<T: Clone, C: Transport> MutationController<T, C> {
    pub fn state(&self) -> MutationState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState<T>> {
        self.state.subscribe()
    }

    /// Clear data, error and loading. No-op when already clear.
    pub fn reset(&self) {
        let _pending = self.pending.lock();
        if self.liveness.is_cancelled() {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.data.is_none() && state.error.is_none() && !state.loading {
                return false;
            }
            *state = MutationState::default();
            true
        });
    }
}

impl<T, C: Transport> MutationController<T, C> {
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn method(&self) -> MutationMethod {
        self.method
    }

    pub fn is_torn_down(&self) -> bool {
        self.liveness.is_cancelled()
    }

    pub fn teardown(&self) {
        let _pending = self.pending.lock();
        if !self.liveness.is_cancelled() {
            self.liveness.cancel();
            info!(correlation_id = %self.correlation_id, "mutation torn down");
        }
    }
}

impl<T, C: Transport> Drop for MutationController<T, C> {
    fn drop(&mut self) {
        self.teardown();
    }
}
