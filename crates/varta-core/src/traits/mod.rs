// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.

pub mod adapter;
pub mod backend;
pub mod credential;
pub mod store;

pub use adapter::Adapter;
pub use backend::{ChatStream, GenerationBackend, ProgressFn};
pub use credential::CredentialGate;
pub use store::StateStore;
