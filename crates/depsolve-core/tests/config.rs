use std::io::Write;

use depsolve_core::config::{dirs_path, GlobalConfig};
use tempfile::NamedTempFile;

#[test]
fn test_global_config_default_registry() {
    let config = GlobalConfig::default();
    assert_eq!(config.registry.url, "https://registry.npmjs.org");
    assert_eq!(config.registry.retries, 0);
}

#[test]
fn test_global_config_default_limits_nonzero() {
    let config = GlobalConfig::default();
    assert!(config.resolver.max_concurrent_fetches > 0);
    assert!(config.resolver.cache_capacity > 0);
}

#[test]
fn test_global_config_defaults_from_empty_toml() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.registry.timeout_secs, 30);
    assert_eq!(config.server.bind, "127.0.0.1:8080");
}

#[test]
fn test_dirs_path_contains_depsolve() {
    let path = dirs_path();
    assert!(path.ends_with(".depsolve"));
}

#[test]
fn test_global_config_parse_from_toml() {
    let toml = r#"
[registry]
url = "https://npm.example.com"
timeout-secs = 5
retries = 2

[resolver]
max-concurrent-fetches = 4
cache-capacity = 10

[server]
bind = "0.0.0.0:9000"
"#;
    let config: GlobalConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.registry.url, "https://npm.example.com");
    assert_eq!(config.registry.timeout_secs, 5);
    assert_eq!(config.registry.retries, 2);
    assert_eq!(config.resolver.max_concurrent_fetches, 4);
    assert_eq!(config.resolver.cache_capacity, 10);
    assert_eq!(config.server.bind, "0.0.0.0:9000");
}

#[test]
fn test_load_from_missing_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = GlobalConfig::load_from(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config.resolver.cache_capacity, 1024);
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[resolver]\nmax-concurrent-fetches = 2").unwrap();
    let config = GlobalConfig::load_from(file.path()).unwrap();
    assert_eq!(config.resolver.max_concurrent_fetches, 2);
    assert_eq!(config.resolver.cache_capacity, 1024);
}

#[test]
fn test_load_from_invalid_file_fails() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[resolver\nbroken").unwrap();
    let err = GlobalConfig::load_from(file.path()).unwrap_err();
    assert!(err.to_string().contains("Configuration error"), "got: {err}");
}
