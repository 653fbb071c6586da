// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge.
//!
//! Converts Figment deserialization errors into miette diagnostics so config
//! mistakes render with codes and help text instead of a bare Debug dump.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error with diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(varta::config::unknown_key),
        help("remove the key or check its spelling against `varta.toml` docs")
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(varta::config::validation))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(varta::config::other))]
    Other(String),
}

/// Convert a Figment error (which may aggregate several failures) into a
/// list of [`ConfigError`] diagnostics.
pub fn figment_to_config_errors(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| match &e.kind {
            figment::error::Kind::UnknownField(field, _) => ConfigError::UnknownKey {
                key: field.clone(),
            },
            _ => ConfigError::Other(e.to_string()),
        })
        .collect()
}

/// Render a list of config errors to stderr via miette's fancy reporter.
pub fn render_errors(errors: &[ConfigError]) {
    for error in errors {
        eprintln!("{:?}", miette::Report::msg(error.to_string()));
    }
}
