// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Varta chat core.

use thiserror::Error;

/// The primary error type used across the Varta adapter traits and the
/// turn orchestration core.
#[derive(Debug, Error)]
pub enum VartaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// A submission carried neither text nor an attachment.
    #[error("empty submission: message text or an attachment is required")]
    EmptyInput,

    /// The referenced session does not exist.
    #[error("unknown session: {id}")]
    UnknownSession { id: String },

    /// The referenced message does not exist in the session.
    #[error("unknown message: {id}")]
    UnknownMessage { id: String },

    /// A turn is already in flight; overlapping submissions are rejected.
    #[error("a turn is already in flight")]
    TurnInFlight,

    /// The backend rejected the current credential-scoped resource.
    /// The caller must prompt for credential reselection before retrying.
    #[error("backend rejected the current API credential")]
    KeyReset,

    /// Generation backend errors (API failure, malformed response, stream abort).
    #[error("backend error: {message}")]
    Backend {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VartaError {
    /// Convenience constructor for a backend error with no underlying source.
    pub fn backend(message: impl Into<String>) -> Self {
        VartaError::Backend {
            message: message.into(),
            source: None,
        }
    }
}
