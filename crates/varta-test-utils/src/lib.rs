// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Varta integration tests.
//!
//! Scripted mock implementations of the generation backend, state store,
//! and credential gate, enabling fast deterministic engine tests without
//! network or disk.

pub mod credential;
pub mod memory_store;
pub mod mock_backend;

pub use credential::MockCredentialGate;
pub use memory_store::MemoryStateStore;
pub use mock_backend::{ChatScript, MockBackend, VideoScript};
