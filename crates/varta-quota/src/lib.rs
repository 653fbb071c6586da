// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota accounting for the Varta chat core.
//!
//! Daily free-generation caps per media kind with calendar-day reset, plus
//! the lifetime video trial counter. The turn orchestrator consults the
//! gate before every generation and records increments only after success.

pub mod tracker;

pub use tracker::{QuotaDecision, QuotaTracker};
