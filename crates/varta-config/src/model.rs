// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Varta chat core.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Varta configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VartaConfig {
    /// Application identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Generation quota limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Application identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the assistant.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "varta".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. Usually supplied via the `VARTA_GEMINI_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Fast chat model identifier.
    #[serde(default = "default_fast_model")]
    pub fast_model: String,

    /// Pro chat model identifier, used when the pro toggle is on.
    #[serde(default = "default_pro_model")]
    pub pro_model: String,

    /// Image generation model identifier.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Video generation model identifier.
    #[serde(default = "default_video_model")]
    pub video_model: String,

    /// Fixed wait between polls of a long-running video operation, seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            fast_model: default_fast_model(),
            pro_model: default_pro_model(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_fast_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_pro_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-generate-preview".to_string()
}

fn default_poll_interval_secs() -> u64 {
    8
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory where downloaded video clips are written.
    #[serde(default = "default_media_dir")]
    pub media_dir: String,

    /// Enable write-ahead-log journaling.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            media_dir: default_media_dir(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("varta/varta.db").display().to_string())
        .unwrap_or_else(|| "varta.db".to_string())
}

fn default_media_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("varta/media").display().to_string())
        .unwrap_or_else(|| "media".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Daily free-generation limits. Subscribed users bypass both.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Free image generations per calendar day.
    #[serde(default = "default_daily_image_limit")]
    pub daily_image_limit: u32,

    /// Free video generations per calendar day.
    #[serde(default = "default_daily_video_limit")]
    pub daily_video_limit: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_image_limit: default_daily_image_limit(),
            daily_video_limit: default_daily_video_limit(),
        }
    }
}

fn default_daily_image_limit() -> u32 {
    7
}

fn default_daily_video_limit() -> u32 {
    3
}
