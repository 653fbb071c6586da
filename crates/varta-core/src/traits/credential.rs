// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential selection boundary for paid backend capabilities.

use async_trait::async_trait;

use crate::error::VartaError;

/// Collaborator consulted around video generation, which requires a
/// user-selected paid API credential.
///
/// The orchestrator asks for selection before a video call and requests
/// reselection when the backend raises [`crate::VartaError::KeyReset`].
/// The triggering turn is never retried automatically.
#[async_trait]
pub trait CredentialGate: Send + Sync {
    /// Returns whether a credential is currently selected.
    async fn has_selected_key(&self) -> Result<bool, VartaError>;

    /// Prompts the user to select (or reselect) a credential.
    async fn request_reselect(&self) -> Result<(), VartaError>;
}
