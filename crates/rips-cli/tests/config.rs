//! Configuration lookup and translation into interpreter options.

use std::fs;
use std::path::PathBuf;

use tempfile::tempdir;

use rips_cli::config::{CONFIG_FILENAME, RipsConfig, user_config_path};
use rips_model::ContextMode;

const SAMPLE: &str = r#"
store_dir = "/var/lib/rips"
context_mode = "namespaced"

[join]
date_columns = ["fecha"]

[join.declared]
form_encounter = [["pid", "pid"]]
billing = [["encounter", "encounter"], ["pid", "pid"]]
"#;

#[test]
fn explicit_path_wins_over_local_file() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_FILENAME), "output_dir = \"local\"").unwrap();
    let explicit = dir.path().join("custom.toml");
    fs::write(&explicit, SAMPLE).unwrap();

    let loaded = RipsConfig::load(Some(&explicit), dir.path()).unwrap();
    assert_eq!(loaded.source.as_deref(), Some(explicit.as_path()));
    assert_eq!(loaded.config.store_dir, PathBuf::from("/var/lib/rips"));
    assert_eq!(loaded.config.output_dir, PathBuf::from("output"));
    assert_eq!(loaded.config.context_mode, ContextMode::Namespaced);
}

#[test]
fn local_file_is_found_in_working_directory() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_FILENAME), "output_dir = \"reports\"").unwrap();

    let loaded = RipsConfig::load(None, dir.path()).unwrap();
    assert_eq!(loaded.config.output_dir, PathBuf::from("reports"));
    assert_eq!(loaded.config.store_dir, PathBuf::from(".rips"));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = RipsConfig::load(Some(&missing), dir.path()).unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");
}

#[test]
fn defaults_apply_without_any_file() {
    if user_config_path().is_some_and(|path| path.is_file()) {
        return;
    }
    let dir = tempdir().unwrap();
    let loaded = RipsConfig::load(None, dir.path()).unwrap();
    assert_eq!(loaded.source, None);
    assert_eq!(loaded.config, RipsConfig::default());
}

#[test]
fn declared_joins_replace_column_name_joins() {
    let config = RipsConfig::from_toml_str(SAMPLE).unwrap();
    let options = config.interpreter_options();
    assert_eq!(options.join.name(), "declared");
    assert_eq!(options.context_mode, ContextMode::Namespaced);

    let options = RipsConfig::default().interpreter_options();
    assert_eq!(options.join.name(), "column_name");
    assert_eq!(options.context_mode, ContextMode::Shadowing);
}
