use diskwatch::core::config::Config;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_default() {
    let config = Config::default();
    assert_eq!(config.interval_minutes, 30);
    assert!(config.notify_enabled);
    assert_eq!(config.icon_healthy, "drive-harddisk");
    assert_eq!(config.icon_failing, "dialog-warning");
}

#[test]
fn test_config_load_nonexistent_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing").join("config.json");

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("diskwatch").join("config.json");

    let mut config = Config::default();
    config.set_value("interval", "5").unwrap();
    config.set_value("notify", "off").unwrap();
    config.set_value("icon_failing", "emblem-important").unwrap();
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.interval_minutes, 5);
    assert!(!loaded.notify_enabled);
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, r#"{ "interval_minutes": 10 }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.interval_minutes, 10);
    assert!(config.notify_enabled);
    assert_eq!(config.unit_timeout_secs, 30);
}

#[test]
fn test_config_invalid_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "not json at all").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_rejects_zero_interval() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut config = Config::default();
    assert!(config.set_value("interval_minutes", "0").is_err());
    assert_eq!(config.interval_minutes, 30);

    config.interval_minutes = 0;
    assert!(config.save_to(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_config_runtime_options() {
    let config = Config {
        startup_delay_secs: 0,
        unit_timeout_secs: 0,
        rescan_interval_secs: 15,
        ..Default::default()
    };

    let options = config.runtime_options();
    assert_eq!(options.startup_delay, Duration::ZERO);
    assert!(options.unit_timeout.is_none());
    assert_eq!(options.rescan_interval, Some(Duration::from_secs(15)));
}
