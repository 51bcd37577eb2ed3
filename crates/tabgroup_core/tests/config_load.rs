use std::io::Write;
use tabgroup_core::config::DEFAULT_STATE_KEY;
use tabgroup_core::{load_config, load_config_from_dir, ConfigError, CoreConfig};

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = load_config_from_dir(dir.path()).unwrap();

    assert_eq!(config, CoreConfig::default());
    assert_eq!(config.state_key, DEFAULT_STATE_KEY);
    assert!(!config.sort_mode);
    assert_eq!(config.label_separator, std::path::MAIN_SEPARATOR.to_string());
}

#[test]
fn full_file_overrides_every_field() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
state_key = "project-x.tabs"
sort_mode = true
reveal_on_change = false
label_separator = " > "
log_level = "warn"
"#
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();

    assert_eq!(
        config,
        CoreConfig {
            state_key: "project-x.tabs".to_string(),
            sort_mode: true,
            reveal_on_change: false,
            label_separator: " > ".to_string(),
            log_level: "warn".to_string(),
        }
    );
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "sort_mode = \"sometimes\"").unwrap();

    let err = load_config(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("invalid config"));
    assert!(std::error::Error::source(&err).is_some());
}
