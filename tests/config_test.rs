use std::path::PathBuf;

use tempfile::TempDir;

use supplynet::config::{local_config_path, Settings};
use supplynet::util::testing::init_test_setup;

#[test]
fn given_local_config_when_loading_then_overrides_defaults() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        local_config_path(dir.path()),
        r#"
ledger_file = "chains.toml"

[hierarchy]
verify_on_commit = false
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).unwrap();

    // Assert
    assert_eq!(settings.ledger_file, PathBuf::from("chains.toml"));
    assert!(!settings.hierarchy.verify_on_commit);
}

#[test]
fn given_broken_local_config_when_loading_then_config_error() {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    std::fs::write(local_config_path(dir.path()), "ledger_file = [").unwrap();

    let err = Settings::load(Some(dir.path())).unwrap_err();

    assert_eq!(err.code(), "config_error");
}

#[test]
fn given_env_override_when_loading_then_env_wins() {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    std::fs::write(
        local_config_path(dir.path()),
        "[display]\ncurrency = \"USD\"\n",
    )
    .unwrap();
    std::env::set_var("SUPPLYNET_DISPLAY__CURRENCY", "EUR");

    let settings = Settings::load(Some(dir.path())).unwrap();
    std::env::remove_var("SUPPLYNET_DISPLAY__CURRENCY");

    assert_eq!(settings.display.currency, "EUR");
}

#[test]
fn given_settings_when_rendering_toml_then_parses_back() {
    init_test_setup();
    let settings = Settings::default();

    let text = settings.to_toml().unwrap();
    let back: Settings = toml::from_str(&text).unwrap();

    assert_eq!(back, settings);
}
