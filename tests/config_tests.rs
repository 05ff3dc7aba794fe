use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use wallet_slot_client::transport::TransportMode;
use wallet_slot_client::Config;

#[test]
fn test_config_from_path_with_full_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    let config_content = r#"
[api]
base_url = "https://api.wallet-slot.test/v1"
timeout_secs = 30
transport = "fetch"
debug = true
fallback_fetch = false

[retry]
max_retries = 4
base_delay_ms = 100

[storage]
data_dir = "/var/lib/wallet-slot"
"#;

    fs::write(&config_path, config_content).unwrap();

    let config = Config::from_path(&config_path).unwrap();
    assert_eq!(config.api.base_url, "https://api.wallet-slot.test/v1");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.api.transport, TransportMode::Fetch);
    assert!(config.api.debug);
    assert!(!config.api.fallback_fetch);
    assert_eq!(config.retry.max_retries, 4);
    assert_eq!(config.retry.base_delay_ms, 100);
    assert_eq!(config.retry.max_jitter_ms, 200);
    assert_eq!(
        config.session_path(),
        PathBuf::from("/var/lib/wallet-slot/session.json")
    );
}

#[test]
fn test_config_defaults_for_optional_sections() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
[api]
base_url = "http://localhost:8080"
"#,
    )
    .unwrap();

    let config = Config::from_path(&config_path).unwrap();
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.api.transport, TransportMode::Client);
    assert!(!config.api.debug);
    assert!(config.api.fallback_fetch);
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.retry.base_delay_ms, 300);
    assert_eq!(config.device_id_path(), PathBuf::from(".wallet-slot/device_id"));
}

#[test]
fn test_config_with_missing_file() {
    let dir = tempdir().unwrap();
    let result = Config::from_path(dir.path().join("config.toml"));
    assert!(result.is_err());
}

#[test]
fn test_config_with_invalid_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    let invalid_content = r#"
[api
base_url = "http://localhost"
"#;

    fs::write(&config_path, invalid_content).unwrap();

    let result = Config::from_path(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_config_with_missing_base_url() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
[api]
timeout_secs = 5
"#,
    )
    .unwrap();

    let result = Config::from_path(&config_path);
    assert!(result.is_err());
}

#[test]
fn test_config_with_unknown_transport() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(
        &config_path,
        r#"
[api]
base_url = "http://localhost"
transport = "curl"
"#,
    )
    .unwrap();

    assert!(Config::from_path(&config_path).is_err());
}
