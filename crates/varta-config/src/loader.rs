// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./varta.toml` > `~/.config/varta/varta.toml` > `/etc/varta/varta.toml`
//! with environment variable overrides via `VARTA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::VartaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/varta/varta.toml` (system-wide)
/// 3. `~/.config/varta/varta.toml` (user XDG config)
/// 4. `./varta.toml` (local directory)
/// 5. `VARTA_*` environment variables
pub fn load_config() -> Result<VartaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VartaConfig::default()))
        .merge(Toml::file("/etc/varta/varta.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("varta/varta.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("varta.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<VartaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VartaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VartaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VartaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `VARTA_GEMINI_API_KEY` must map to
/// `gemini.api_key`, not `gemini.api.key`.
fn env_provider() -> Env {
    Env::prefixed("VARTA_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("gemini_", "gemini.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("limits_", "limits.", 1);
        mapped.into()
    })
}
