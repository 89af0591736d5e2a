use crate::analysis::ApiError;
use crate::config::RequestOptions;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Invoked with the payload of every applied successful fetch
pub type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Invoked with the error of every applied failed fetch
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Options for a [`QueryController`](super::QueryController)
pub struct QueryOptions<T> {
    /// When false, nothing is fetched until an explicit refetch (default: true)
    pub enabled: bool,
    pub request: RequestOptions,
    /// Polling period; `None` or zero disables polling
    pub refetch_interval: Option<Duration>,
    /// Seed returned as `data` before the first successful fetch
    pub initial_data: Option<T>,
    /// Changing any element triggers a fresh fetch
    pub dependencies: Vec<String>,
    /// Overrides the generated correlation id
    pub correlation_id: Option<String>,
    pub(crate) on_success: Option<SuccessCallback<T>>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl<T> QueryOptions<T> {
    pub fn new() -> Self {
        Self {
            enabled: true,
            request: RequestOptions::default(),
            refetch_interval: None,
            initial_data: None,
            dependencies: Vec::new(),
            correlation_id: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn request(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.request.retries = retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.request.retry_delay = retry_delay;
        self
    }

    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn initial_data(mut self, data: T) -> Self {
        self.initial_data = Some(data);
        self
    }

    pub fn dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("enabled", &self.enabled)
            .field("request", &self.request)
            .field("refetch_interval", &self.refetch_interval)
            .field("initial_data", &self.initial_data)
            .field("dependencies", &self.dependencies)
            .field("correlation_id", &self.correlation_id)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Options for a [`MutationController`](super::MutationController)
pub struct MutationOptions<T> {
    /// Deadline for the single attempt (default: 30s)
    pub timeout: Duration,
    pub correlation_id: Option<String>,
    pub(crate) on_success: Option<SuccessCallback<T>>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl<T> MutationOptions<T> {
    pub fn new() -> Self {
        Self {
            timeout: RequestOptions::default().timeout,
            correlation_id: None,
            on_success: None,
            on_error: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Mutations make exactly one attempt
    pub(crate) fn request_options(&self) -> RequestOptions {
        RequestOptions::default().timeout(self.timeout).retries(0)
    }
}

impl<T> Default for MutationOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for a [`ParallelQuerySet`](super::ParallelQuerySet)
#[derive(Debug, Clone, Default)]
pub struct ParallelOptions {
    /// Polling period; `None` or zero disables polling
    pub refetch_interval: Option<Duration>,
    pub correlation_id: Option<String>,
}

impl ParallelOptions {
    pub fn refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = Some(interval);
        self
    }

    pub fn correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}
