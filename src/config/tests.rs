use super::{Settings, load_config_from};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;

fn missing_file(tmp: &TempDir) -> String {
    tmp.path().join("nothing-here").to_string_lossy().into_owned()
}

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.broker.heartbeat_interval_secs, 20);
    assert_eq!(settings.addr(), "127.0.0.1:8080");
}

#[test]
#[serial]
fn load_config_without_sources_uses_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    temp_env::with_vars_unset(
        [
            "BEATSUB_SERVER__HOST",
            "BEATSUB_SERVER__PORT",
            "BEATSUB_BROKER__HEARTBEAT_INTERVAL_SECS",
        ],
        || {
            let cfg = load_config_from(&missing_file(&tmp)).expect("load_config failed");
            assert_eq!(cfg, Settings::default());
        },
    );
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let path = tmp.path().join("default.toml");
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [broker]
        heartbeat_interval_secs = 5
    "#;
    fs::write(&path, toml).expect("write config file");

    let base = tmp.path().join("default").to_string_lossy().into_owned();
    temp_env::with_vars_unset(
        [
            "BEATSUB_SERVER__HOST",
            "BEATSUB_SERVER__PORT",
            "BEATSUB_BROKER__HEARTBEAT_INTERVAL_SECS",
        ],
        || {
            let cfg = load_config_from(&base).expect("load_config failed");
            assert_eq!(cfg.server.host, "0.0.0.0");
            assert_eq!(cfg.server.port, 9000);
            assert_eq!(cfg.broker.heartbeat_interval_secs, 5);
        },
    );
}

#[test]
#[serial]
fn load_config_env_overrides_single_field() {
    let tmp = TempDir::new().expect("create tempdir");
    temp_env::with_vars(
        [
            ("BEATSUB_SERVER__PORT", Some("9100")),
            ("BEATSUB_BROKER__HEARTBEAT_INTERVAL_SECS", Some("45")),
        ],
        || {
            let cfg = load_config_from(&missing_file(&tmp)).expect("load_config failed");
            assert_eq!(cfg.server.host, "127.0.0.1");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.broker.heartbeat_interval_secs, 45);
        },
    );
}
