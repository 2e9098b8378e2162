#![forbid(unsafe_code)]

//! Loading runtime configuration from disk.

use std::io::Write;

use lokal_runtime::{ConfigError, CultureContext, FallbackBehavior, LocalizeConfig};

fn write_config(contents: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn toml_file_builds_a_context() {
    let file = write_config(
        r#"
        culture = "de_AT"
        design_mode = true
        fallback_behavior = "key"
        include_invariant_culture = false
        sweep_threshold = 8
        "#,
        ".toml",
    );
    let config = LocalizeConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.fallback_behavior, FallbackBehavior::Key);
    assert_eq!(config.sweep_threshold, 8);

    let ctx = CultureContext::from_config(&config).unwrap();
    assert_eq!(ctx.culture().name(), "de-AT");
    assert!(ctx.design_mode());
    assert!(ctx.available_cultures().is_empty());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = LocalizeConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let file = write_config("culture = [", ".toml");
    let err = LocalizeConfig::from_toml_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
    assert!(err.to_string().starts_with("TOML parse error"));
}

#[test]
fn unknown_fallback_behavior_is_rejected() {
    let err = LocalizeConfig::from_json_str(r#"{"fallback_behavior": "shout"}"#).unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn invalid_culture_is_rejected_at_load() {
    let file = write_config(r#"culture = "!!""#, ".toml");
    match LocalizeConfig::from_toml_file(file.path()).unwrap_err() {
        ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_culture_fails_fast_at_context_creation() {
    let config = LocalizeConfig {
        culture: Some("!!".into()),
        ..LocalizeConfig::default()
    };
    let err = CultureContext::from_config(&config).unwrap_err();
    match err {
        ConfigError::Validation(errors) => assert_eq!(errors.len(), 1),
        other => panic!("unexpected error: {other}"),
    }
}
