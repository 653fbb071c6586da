// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation backend for deterministic testing.
//!
//! `MockBackend` implements `GenerationBackend` with pre-scripted results
//! popped from FIFO queues, enabling fast, CI-runnable tests without
//! external API calls. Call counters expose whether a path reached the
//! backend at all, which the quota tests rely on.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use varta_core::traits::backend::{ChatStream, ProgressFn};
use varta_core::types::{
    AdapterKind, AspectRatio, ChatEvent, ChatOptions, HealthStatus, MediaRef, Message, VideoClip,
    VideoRequest,
};
use varta_core::{Adapter, GenerationBackend, VartaError};

/// One scripted chat completion: a full event sequence, fragments first.
pub struct ChatScript {
    pub events: Vec<Result<ChatEvent, VartaError>>,
}

impl ChatScript {
    /// Fragments followed by a `Done` whose full text is their concatenation.
    pub fn fragments(fragments: &[&str]) -> Self {
        let mut events: Vec<Result<ChatEvent, VartaError>> = fragments
            .iter()
            .map(|f| Ok(ChatEvent::Fragment(f.to_string())))
            .collect();
        events.push(Ok(ChatEvent::Done {
            full_text: fragments.concat(),
            sources: Vec::new(),
        }));
        Self { events }
    }

    /// Fragments, then an error -- the stream never reaches `Done`.
    pub fn failing_after(fragments: &[&str], error: VartaError) -> Self {
        let mut events: Vec<Result<ChatEvent, VartaError>> = fragments
            .iter()
            .map(|f| Ok(ChatEvent::Fragment(f.to_string())))
            .collect();
        events.push(Err(error));
        Self { events }
    }
}

/// One scripted video generation: progress ticks, then a result.
pub struct VideoScript {
    /// Number of progress callbacks to invoke before resolving.
    pub progress_ticks: u32,
    pub result: Result<Option<VideoClip>, VartaError>,
}

impl VideoScript {
    pub fn succeeding(ticks: u32) -> Self {
        Self {
            progress_ticks: ticks,
            result: Ok(Some(VideoClip {
                media: MediaRef("/tmp/mock-clip.mp4".to_string()),
                duration_secs: 15,
            })),
        }
    }

    pub fn empty() -> Self {
        Self {
            progress_ticks: 0,
            result: Ok(None),
        }
    }

    pub fn key_reset() -> Self {
        Self {
            progress_ticks: 0,
            result: Err(VartaError::KeyReset),
        }
    }
}

/// A mock generation backend with scripted results.
///
/// When a queue is empty, a benign default is returned so tests only need
/// to script the calls they assert on.
#[derive(Default)]
pub struct MockBackend {
    chat_scripts: Mutex<VecDeque<ChatScript>>,
    image_results: Mutex<VecDeque<Result<Option<MediaRef>, VartaError>>>,
    video_scripts: Mutex<VecDeque<VideoScript>>,
    analysis_results: Mutex<VecDeque<Option<String>>>,
    summary_results: Mutex<VecDeque<Option<String>>>,

    chat_calls: AtomicUsize,
    image_calls: AtomicUsize,
    video_calls: AtomicUsize,
    analysis_calls: AtomicUsize,
    summary_calls: AtomicUsize,

    /// Prompts passed to analyze_image, in call order.
    analysis_prompts: Mutex<Vec<String>>,
    /// History lengths passed to stream_chat, in call order.
    chat_history_lens: Mutex<Vec<usize>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_chat(&self, script: ChatScript) {
        self.chat_scripts.lock().await.push_back(script);
    }

    pub async fn push_image(&self, result: Result<Option<MediaRef>, VartaError>) {
        self.image_results.lock().await.push_back(result);
    }

    pub async fn push_video(&self, script: VideoScript) {
        self.video_scripts.lock().await.push_back(script);
    }

    pub async fn push_analysis(&self, result: Option<String>) {
        self.analysis_results.lock().await.push_back(result);
    }

    pub async fn push_summary(&self, result: Option<String>) {
        self.summary_results.lock().await.push_back(result);
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    pub fn analysis_calls(&self) -> usize {
        self.analysis_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub async fn analysis_prompts(&self) -> Vec<String> {
        self.analysis_prompts.lock().await.clone()
    }

    pub async fn chat_history_lens(&self) -> Vec<usize> {
        self.chat_history_lens.lock().await.clone()
    }
}

#[async_trait]
impl Adapter for MockBackend {
    fn name(&self) -> &str {
        "mock-backend"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_kind(&self) -> AdapterKind {
        AdapterKind::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, VartaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VartaError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn stream_chat(
        &self,
        _prompt: &str,
        history: &[Message],
        _options: &ChatOptions,
    ) -> Result<ChatStream, VartaError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.chat_history_lens.lock().await.push(history.len());
        let script = self
            .chat_scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ChatScript::fragments(&["mock response"]));
        Ok(Box::pin(stream::iter(script.events)))
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        _aspect: AspectRatio,
        _source: Option<&MediaRef>,
    ) -> Result<Option<MediaRef>, VartaError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(Some(MediaRef("data:image/png;base64,bW9jaw==".to_string()))))
    }

    async fn generate_video(
        &self,
        _request: &VideoRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<Option<VideoClip>, VartaError> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .video_scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| VideoScript::succeeding(0));
        for tick in 0..script.progress_ticks {
            on_progress(u64::from(tick) * 8);
        }
        script.result
    }

    async fn analyze_image(
        &self,
        _data: &[u8],
        _mime_type: &str,
        prompt: &str,
    ) -> Result<Option<String>, VartaError> {
        self.analysis_calls.fetch_add(1, Ordering::SeqCst);
        self.analysis_prompts.lock().await.push(prompt.to_string());
        Ok(self
            .analysis_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Some("mock analysis".to_string())))
    }

    async fn summarize(&self, _history: &[Message]) -> Result<Option<String>, VartaError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .summary_results
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Some("mock summary".to_string())))
    }
}
