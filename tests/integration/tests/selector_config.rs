//! Selectors built from configuration files.

use keyjar::{BackendPreference, BackendSelector, ErrorKind, KeychainConfig, SelectorState};
use keyjar_integration_tests::{init_tracing, read, write};
use tempfile::TempDir;

#[tokio::test]
async fn test_memory_backend_from_config_file() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keyjar.json5");
    std::fs::write(
        &path,
        r#"{
            backend: "memory",
            operation_timeout_ms: 5000,
            memory: { max_payload_len: 16 },
        }"#,
    )
    .unwrap();

    let config = KeychainConfig::load(&path).unwrap();
    config.validate().unwrap();
    let selector = BackendSelector::from_config(&config);
    assert_eq!(selector.state(), SelectorState::Unresolved);

    assert!(write(&selector, "svc", "user1", b"short").await.is_ok());
    assert_eq!(selector.state(), SelectorState::Resolved(Some("memory")));

    let outcome = write(&selector, "svc", "user1", &[b'x'; 17]).await;
    assert_eq!(outcome.error(), ErrorKind::OtherError);
    assert_eq!(
        read(&selector, "svc", "user1").await.binary_data(),
        Some(&b"short"[..])
    );
}

#[tokio::test]
async fn test_none_backend_reports_unavailable() {
    init_tracing();
    let mut config = KeychainConfig::default();
    config.backend = BackendPreference::None;
    let selector = BackendSelector::from_config(&config);

    for outcome in [
        write(&selector, "svc", "user1", b"pw").await,
        read(&selector, "svc", "user1").await,
    ] {
        assert_eq!(outcome.error(), ErrorKind::NoBackendAvailable);
        assert_eq!(outcome.binary_data(), None);
    }
    assert!(!selector.is_available().await);
}

#[test]
fn test_env_overrides() {
    std::env::set_var("KEYJAR_BACKEND", "none");
    std::env::set_var("KEYJAR_TIMEOUT_MS", "1200");

    let mut config = KeychainConfig::default();
    config.apply_env();
    assert_eq!(config.backend, BackendPreference::None);
    assert_eq!(config.operation_timeout_ms, Some(1200));

    std::env::set_var("KEYJAR_BACKEND", "floppy");
    let mut config = KeychainConfig::default();
    config.apply_env();
    assert_eq!(config.backend, BackendPreference::Auto);

    std::env::remove_var("KEYJAR_BACKEND");
    std::env::remove_var("KEYJAR_TIMEOUT_MS");
}
