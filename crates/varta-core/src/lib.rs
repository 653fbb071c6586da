// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Varta chat orchestration core.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Varta workspace. The generation backend
//! and state store adapters implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VartaError;
pub use types::{AdapterKind, HealthStatus, MessageId, SessionId};

// Re-export the adapter traits at crate root.
pub use traits::{Adapter, CredentialGate, GenerationBackend, StateStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varta_error_has_all_variants() {
        let _config = VartaError::Config("test".into());
        let _empty = VartaError::EmptyInput;
        let _session = VartaError::UnknownSession { id: "s".into() };
        let _message = VartaError::UnknownMessage { id: "m".into() };
        let _busy = VartaError::TurnInFlight;
        let _key = VartaError::KeyReset;
        let _backend = VartaError::Backend {
            message: "test".into(),
            source: None,
        };
        let _storage = VartaError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _internal = VartaError::Internal("test".into());
    }

    #[test]
    fn key_reset_is_distinguishable() {
        let err = VartaError::KeyReset;
        assert!(matches!(err, VartaError::KeyReset));
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn session_and_message_ids() {
        let sid = SessionId::generate();
        let mid = MessageId::generate();
        assert_ne!(sid.0, mid.0);

        let sid2 = sid.clone();
        assert_eq!(sid, sid2);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that the adapter traits are accessible
        // through the public API.
        fn _assert_adapter<T: Adapter>() {}
        fn _assert_backend<T: GenerationBackend>() {}
        fn _assert_store<T: StateStore>() {}
        fn _assert_credential<T: CredentialGate>() {}
    }
}
