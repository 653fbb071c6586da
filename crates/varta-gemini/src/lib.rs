// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini generation backend adapter for Varta.
//!
//! Implements the [`varta_core::GenerationBackend`] trait over the Gemini
//! generateContent API: SSE streaming chat, one-shot image generation and
//! analysis, conversation summarization, and long-running video generation
//! driven through an explicit polled state machine.

pub mod backend;
pub mod client;
pub mod sse;
pub mod types;
pub mod video;

pub use backend::GeminiBackend;
pub use client::GeminiClient;
pub use video::{OperationSource, VideoPhase};
