// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation backend trait: the four capabilities the turn orchestrator
//! depends on, plus one-shot conversation summarization.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::VartaError;
use crate::traits::adapter::Adapter;
use crate::types::{
    AspectRatio, ChatEvent, ChatOptions, MediaRef, Message, VideoClip, VideoRequest,
};

/// A pinned, boxed stream of chat events.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatEvent, VartaError>> + Send>>;

/// Progress callback invoked while a long-running video operation is
/// incomplete, with the elapsed time in whole seconds.
pub type ProgressFn<'a> = &'a (dyn Fn(u64) + Send + Sync);

/// Adapter for the hosted generative-AI backend.
///
/// Transport, authentication, and model selection are adapter-internal.
/// The one error the core specifically recognizes is [`VartaError::KeyReset`],
/// raised when the provider reports a missing or invalid credential-scoped
/// resource during video generation.
#[async_trait]
pub trait GenerationBackend: Adapter {
    /// Streams a chat completion over the prior message history.
    ///
    /// Fragment order is significant and must be preserved as accumulation
    /// order; the stream ends with a single [`ChatEvent::Done`] carrying
    /// the authoritative full text and deduplicated grounding sources.
    async fn stream_chat(
        &self,
        prompt: &str,
        history: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatStream, VartaError>;

    /// Generates an image, optionally refining an existing source image.
    ///
    /// Returns `None` when the backend produced no image without raising a
    /// transport error.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        source: Option<&MediaRef>,
    ) -> Result<Option<MediaRef>, VartaError>;

    /// Renders a video through a long-running operation, polling until
    /// terminal and invoking `on_progress` at least once per poll interval
    /// while incomplete.
    async fn generate_video(
        &self,
        request: &VideoRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<Option<VideoClip>, VartaError>;

    /// Describes an attached image.
    async fn analyze_image(
        &self,
        data: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Option<String>, VartaError>;

    /// One-shot summarization over a conversation history.
    async fn summarize(&self, history: &[Message]) -> Result<Option<String>, VartaError>;
}
