use crate::cli::{Cli, Commands, RequestArgs, SendMethod};
use crate::ui;
use console_query::config::DEFAULT_CONFIG_FILE;
use console_query::{
    ClientConfig, ConsoleError, MutationController, MutationOptions, ParallelOptions, ParallelQuerySet,
    QueryController, QueryOptions, RequestExecutor, RequestOptions, Result,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

/// Run the parsed command; returns the process exit code
pub fn execute(cli: Cli) -> Result<i32> {
    let rt = Runtime::new()
        .map_err(|e| ConsoleError::general(format!("Failed to create async runtime: {}", e)))?;

    rt.block_on(execute_async(cli))
}

async fn execute_async(cli: Cli) -> Result<i32> {
    let config = resolve_config(cli.config.as_deref(), cli.base_url)?;
    debug!(base_url = %config.base_url, "configuration resolved");

    match cli.command {
        Commands::Get { endpoint, request } => get(&config, endpoint, &request).await,
        Commands::Watch {
            endpoint,
            interval_ms,
            count,
            request,
        } => watch(&config, endpoint, Duration::from_millis(interval_ms), count, &request).await,
        Commands::Batch => batch(&config).await,
        Commands::Send {
            method,
            endpoint,
            body,
            timeout_ms,
        } => send(&config, method, endpoint, body, timeout_ms).await,
    }
}

/// Explicit `--config`, then the default file when present, then `--base-url` alone
fn resolve_config(path: Option<&Path>, base_url: Option<String>) -> Result<ClientConfig> {
    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None if default_path.exists() => Some(default_path),
        None => None,
    };

    let mut config = match (file, &base_url) {
        (Some(file), _) => ClientConfig::load_with_validation(file)?,
        (None, Some(_)) => ClientConfig::new(""),
        (None, None) => {
            return Err(ConsoleError::invalid_config(format!(
                "no base URL: pass --base-url or create {}",
                DEFAULT_CONFIG_FILE
            )))
        }
    };

    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }
    config.validate()?;
    Ok(config)
}

fn request_options(defaults: &RequestOptions, args: &RequestArgs) -> RequestOptions {
    let mut options = *defaults;
    if let Some(timeout_ms) = args.timeout_ms {
        options.timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(retries) = args.retries {
        options.retries = retries;
    }
    if let Some(retry_delay_ms) = args.retry_delay_ms {
        options.retry_delay = Duration::from_millis(retry_delay_ms);
    }
    options
}

async fn get(config: &ClientConfig, endpoint: String, args: &RequestArgs) -> Result<i32> {
    let executor = RequestExecutor::from_config(config)?;
    let options = QueryOptions::<Value>::new().request(request_options(&config.defaults, args));
    let query = QueryController::mount(executor, endpoint.as_str(), options);

    let mut receiver = query.subscribe();
    let state = receiver
        .wait_for(|state| !state.is_fetching())
        .await
        .map(|state| state.clone())
        .unwrap_or_else(|_| query.state());

    match (&state.error, &state.data) {
        (Some(error), _) => {
            ui::api_failure(&endpoint, error);
            Ok(1)
        }
        (None, data) => {
            ui::payload(&endpoint, data.as_ref().unwrap_or(&Value::Null));
            Ok(0)
        }
    }
}

async fn watch(
    config: &ClientConfig,
    endpoint: String,
    interval: Duration,
    count: Option<usize>,
    args: &RequestArgs,
) -> Result<i32> {
    if interval.is_zero() {
        return Err(ConsoleError::invalid_config("--interval-ms must be greater than zero"));
    }

    let executor = RequestExecutor::from_config(config)?;
    let options = QueryOptions::<Value>::new()
        .request(request_options(&config.defaults, args))
        .refetch_interval(interval);
    let query = QueryController::mount(executor, endpoint.as_str(), options);
    let mut receiver = query.subscribe();

    ui::info_message(&format!(
        "Polling {} every {}ms (Ctrl-C to stop)",
        endpoint,
        interval.as_millis()
    ));

    let mut printed = 0usize;
    let mut failures = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = receiver.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let state = receiver.borrow_and_update().clone();
        if state.is_fetching() {
            continue;
        }

        printed += 1;
        ui::section_header(&format!("#{}", printed));
        match (&state.error, &state.data) {
            (Some(error), _) => {
                failures += 1;
                ui::api_failure(&endpoint, error);
            }
            (None, data) => ui::payload(&endpoint, data.as_ref().unwrap_or(&Value::Null)),
        }

        if count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    query.teardown();
    Ok(if failures > 0 { 1 } else { 0 })
}

async fn batch(config: &ClientConfig) -> Result<i32> {
    let descriptors = config.descriptors();
    if descriptors.is_empty() {
        return Err(ConsoleError::invalid_config("no [[queries]] configured for batch"));
    }

    let executor = RequestExecutor::from_config(config)?;
    let set: ParallelQuerySet = ParallelQuerySet::mount(executor, descriptors, ParallelOptions::default())?;

    let mut receiver = set.subscribe();
    let state = receiver
        .wait_for(|state| !state.loading)
        .await
        .map(|state| state.clone())
        .unwrap_or_else(|_| set.state());

    for key in set.keys() {
        match (state.errors.get(key), state.data.get(key)) {
            (Some(error), _) => ui::api_failure(key, error),
            (None, Some(data)) => ui::payload(key, data),
            (None, None) => ui::info_message(&format!("{}: no result", key)),
        }
    }

    Ok(if state.has_errors() { 1 } else { 0 })
}

async fn send(
    config: &ClientConfig,
    method: SendMethod,
    endpoint: String,
    body: Option<String>,
    timeout_ms: Option<u64>,
) -> Result<i32> {
    let payload: Value = match body {
        Some(body) => serde_json::from_str(&body)?,
        None => Value::Null,
    };

    let mut options = MutationOptions::<Value>::new();
    if let Some(timeout_ms) = timeout_ms {
        options = options.timeout(Duration::from_millis(timeout_ms));
    } else {
        options = options.timeout(config.defaults.timeout);
    }

    let executor = RequestExecutor::from_config(config)?;
    let mutation = MutationController::new(executor, endpoint.as_str(), method.into(), options);

    match mutation.mutate(&payload).await {
        Ok(data) => {
            ui::payload(&endpoint, &data);
            Ok(0)
        }
        Err(error) => {
            ui::api_failure(&endpoint, &error);
            Ok(1)
        }
    }
}
