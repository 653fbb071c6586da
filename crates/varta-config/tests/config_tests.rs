// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Varta configuration system.

use varta_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_varta_config() {
    let toml = r#"
[agent]
name = "test-assistant"
log_level = "debug"

[gemini]
api_key = "AIza-test"
fast_model = "gemini-3-flash-preview"
pro_model = "gemini-3-pro-preview"
poll_interval_secs = 2

[storage]
database_path = "/tmp/test.db"
media_dir = "/tmp/media"
wal_mode = false

[limits]
daily_image_limit = 5
daily_video_limit = 2
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "test-assistant");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.gemini.api_key.as_deref(), Some("AIza-test"));
    assert_eq!(config.gemini.poll_interval_secs, 2);
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.limits.daily_image_limit, 5);
    assert_eq!(config.limits.daily_video_limit, 2);
}

/// Unknown field in a section produces an error.
#[test]
fn unknown_field_in_gemini_produces_error() {
    let toml = r#"
[gemini]
api_kye = "abc"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("api_kye"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.agent.name, "varta");
    assert_eq!(config.agent.log_level, "info");
    assert!(config.gemini.api_key.is_none());
    assert_eq!(config.gemini.fast_model, "gemini-3-flash-preview");
    assert_eq!(config.gemini.video_model, "veo-3.1-generate-preview");
    assert_eq!(config.gemini.poll_interval_secs, 8);
    assert!(config.storage.wal_mode);
    assert_eq!(config.limits.daily_image_limit, 7);
    assert_eq!(config.limits.daily_video_limit, 3);
}

/// Validation failures surface through the high-level entry point.
#[test]
fn load_and_validate_rejects_zero_poll_interval() {
    let errors = load_and_validate_str("[gemini]\npoll_interval_secs = 0\n")
        .expect_err("zero poll interval should fail validation");
    assert!(errors
        .iter()
        .any(|e| e.to_string().contains("poll_interval_secs")));
}

/// The high-level entry point accepts a fully-defaulted config.
#[test]
fn load_and_validate_accepts_defaults() {
    let config = load_and_validate_str("").expect("default config should validate");
    assert_eq!(config.limits.daily_video_limit, 3);
}
