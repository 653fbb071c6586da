// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording CredentialGate for engine tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use varta_core::{CredentialGate, VartaError};

/// CredentialGate that records reselect requests instead of prompting.
#[derive(Default)]
pub struct MockCredentialGate {
    selected: AtomicBool,
    reselect_requests: AtomicUsize,
}

impl MockCredentialGate {
    /// Gate with a credential already selected.
    pub fn selected() -> Self {
        let gate = Self::default();
        gate.selected.store(true, Ordering::SeqCst);
        gate
    }

    /// Number of times reselection was requested.
    pub fn reselect_count(&self) -> usize {
        self.reselect_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialGate for MockCredentialGate {
    async fn has_selected_key(&self) -> Result<bool, VartaError> {
        Ok(self.selected.load(Ordering::SeqCst))
    }

    async fn request_reselect(&self) -> Result<(), VartaError> {
        self.reselect_requests.fetch_add(1, Ordering::SeqCst);
        self.selected.store(true, Ordering::SeqCst);
        Ok(())
    }
}
