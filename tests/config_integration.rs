//! Configuration file integration tests
//!
//! Loads `console-query.toml` files from disk and drives a parallel set
//! built from the configured queries.

use console_query::{ClientConfig, ConsoleError, ParallelOptions, ParallelQuerySet, RequestExecutor};
use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn write_config(dir: &Path, base_url: &str) -> std::io::Result<std::path::PathBuf> {
    let content = format!(
        r#"# Console query integration test configuration
base_url = "{base_url}"
follow_redirects = false
connect_timeout_ms = 2000
headers."x-console-client" = "integration"

[defaults]
timeout_ms = 2000
retries = 1
retry_delay_ms = 0

[[queries]]
key = "projects"
endpoint = "/api/projects"

[[queries]]
key = "containers"
endpoint = "/api/containers"
retries = 0
"#
    );

    let path = dir.join("console-query.toml");
    fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn test_load_resolves_query_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "http://devhost.local:8080").unwrap();

    let config = ClientConfig::load_with_validation(&path).unwrap();
    assert_eq!(config.base_url, "http://devhost.local:8080");
    assert_eq!(config.follow_redirects, Some(false));
    assert_eq!(
        config.headers.get("x-console-client").map(String::as_str),
        Some("integration")
    );

    let descriptors = config.descriptors();
    assert_eq!(descriptors.len(), 2);
    assert_eq!(descriptors[0].options.retries, 1);
    assert_eq!(descriptors[0].options.timeout, Duration::from_millis(2000));
    assert_eq!(descriptors[1].options.retries, 0);
}

#[test]
fn test_missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let error = ClientConfig::load_with_validation(&missing).unwrap_err();
    assert!(matches!(error, ConsoleError::ConfigNotFound { .. }));
}

#[test]
fn test_duplicate_keys_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dup.toml");
    fs::write(
        &path,
        r#"
base_url = "http://devhost.local"

[[queries]]
key = "repos"
endpoint = "/api/repos"

[[queries]]
key = "repos"
endpoint = "/api/repositories"
"#,
    )
    .unwrap();

    let error = ClientConfig::load_with_validation(&path).unwrap_err();
    assert!(matches!(error, ConsoleError::DuplicateQueryKey { ref key } if key == "repos"));
}

#[tokio::test]
async fn test_configured_queries_run_as_parallel_set() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/projects"))
        .and(header("x-console-client", "integration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["web"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/containers"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &server.uri()).unwrap();
    let config = ClientConfig::load_with_validation(&config_path).unwrap();

    let executor = RequestExecutor::from_config(&config).unwrap();
    let set: ParallelQuerySet =
        ParallelQuerySet::mount(executor, config.descriptors(), ParallelOptions::default()).unwrap();

    let mut receiver = set.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(|s| !s.loading))
        .await
        .expect("round settles")
        .map(|s| s.clone())
        .unwrap();

    assert_eq!(state.data.get("projects"), Some(&json!(["web"])));
    assert_eq!(
        state.errors.get("containers").and_then(|e| e.status_code()),
        Some(503)
    );

    let containers = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == "/api/containers")
        .count();
    assert_eq!(containers, 1);
}
