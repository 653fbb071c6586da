// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GenerationBackend implementation over the Gemini API.
//!
//! Ties the HTTP client, SSE parser, and video operation driver together
//! behind the four abstract capabilities the turn orchestrator depends on.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures::StreamExt;
use tracing::{debug, warn};

use varta_config::model::{GeminiConfig, StorageConfig};
use varta_core::traits::backend::{ChatStream, ProgressFn};
use varta_core::types::{
    AdapterKind, AspectRatio, ChatEvent, ChatOptions, GroundingSource, HealthStatus, MediaRef,
    Message, Role, VideoClip, VideoRequest,
};
use varta_core::{Adapter, GenerationBackend, VartaError};

use crate::client::GeminiClient;
use crate::sse;
use crate::types::{
    Content, GenerateContentRequest, GenerationConfig, ImageConfig, Operation, Part, Tool,
    VideoGenerationRequest, VideoInstance, VideoParameters, VideoSeed,
};
use crate::video::{drive_operation, OperationSource, VideoPhase};

/// Rendered clips come back at a fixed length.
const CLIP_DURATION_SECS: u32 = 15;

/// Base persona for chat turns.
const CHAT_INSTRUCTION: &str = "You are Varta, a warm and capable assistant. \
Use culturally relevant examples where they help. Be genuinely useful.";

/// Persona for one-shot summaries.
const SUMMARY_INSTRUCTION: &str =
    "You are Varta. You specialize in clear, concise conversation summaries.";

/// Persona for image analysis.
const ANALYSIS_INSTRUCTION: &str =
    "You are Varta. Analyze the image provided and respond in detail.";

/// Appended to every system instruction so replies mirror the user's language.
const LANGUAGE_PARITY_INSTRUCTION: &str = "CRITICAL RULE: Always detect the language \
used by the user and respond in that EXACT SAME LANGUAGE, including mixed-language \
registers. This applies to your tone, vocabulary, and cultural context.";

/// Style prefix applied to image generation prompts.
const IMAGE_STYLE_PREFIX: &str =
    "Professional high-definition photography, 8k, sharp focus, cinematic lighting: ";

/// Style prefix applied to video generation prompts.
const VIDEO_STYLE_PREFIX: &str =
    "3D cinematic masterpiece animation, highly detailed environment: ";

/// Gemini-backed generation adapter.
#[derive(Debug)]
pub struct GeminiBackend {
    client: GeminiClient,
    config: GeminiConfig,
    media_dir: PathBuf,
}

impl GeminiBackend {
    /// Creates the backend from configuration. Fails when no API key is set.
    pub fn new(gemini: &GeminiConfig, storage: &StorageConfig) -> Result<Self, VartaError> {
        let api_key = gemini.api_key.clone().ok_or_else(|| {
            VartaError::Config(
                "gemini.api_key is required -- set it in varta.toml or via VARTA_GEMINI_API_KEY"
                    .to_string(),
            )
        })?;
        Ok(Self {
            client: GeminiClient::new(api_key)?,
            config: gemini.clone(),
            media_dir: PathBuf::from(&storage.media_dir),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, url: String) -> Self {
        self.client = self.client.with_base_url(url);
        self
    }

    fn chat_model(&self, options: &ChatOptions) -> &str {
        if options.use_pro {
            &self.config.pro_model
        } else {
            &self.config.fast_model
        }
    }

    /// Maps conversation history into API contents, text only.
    fn history_contents(history: &[Message]) -> Vec<Content> {
        history
            .iter()
            .filter(|m| !m.content.is_empty())
            .map(|m| {
                let role = match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                Content::text(role, m.content.clone())
            })
            .collect()
    }

    /// Renders history as a plain transcript for summarization.
    fn transcript(history: &[Message]) -> String {
        history
            .iter()
            .map(|m| format!("{}: {}", m.role.to_string().to_uppercase(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Adapter for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_kind(&self) -> AdapterKind {
        AdapterKind::Backend
    }

    async fn health_check(&self) -> Result<HealthStatus, VartaError> {
        // Construction requires a key; transport health is observed per call.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VartaError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn stream_chat(
        &self,
        prompt: &str,
        history: &[Message],
        options: &ChatOptions,
    ) -> Result<ChatStream, VartaError> {
        let mut contents = Self::history_contents(history);
        contents.push(Content::text("user", prompt));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(format!(
                "{CHAT_INSTRUCTION} {LANGUAGE_PARITY_INSTRUCTION}"
            ))),
            tools: options.use_search.then(|| vec![Tool::google_search()]),
            generation_config: None,
        };

        let model = self.chat_model(options);
        let response = self.client.stream_generate(model, &request).await?;
        let mut chunks = sse::parse_sse_stream(response);

        // Re-emit the raw chunk stream as chat events, accumulating the
        // authoritative full text and deduplicating grounding sources by
        // URI (first-seen title wins).
        let (tx, rx) = futures::channel::mpsc::unbounded();
        tokio::spawn(async move {
            let mut full_text = String::new();
            let mut sources: Vec<GroundingSource> = Vec::new();

            while let Some(result) = chunks.next().await {
                match result {
                    Ok(chunk) => {
                        let text = chunk.text();
                        if !text.is_empty() {
                            full_text.push_str(&text);
                            if tx.unbounded_send(Ok(ChatEvent::Fragment(text))).is_err() {
                                return;
                            }
                        }
                        for web in chunk.web_sources() {
                            if !sources.iter().any(|s| s.uri == web.uri) {
                                sources.push(GroundingSource {
                                    title: web
                                        .title
                                        .clone()
                                        .unwrap_or_else(|| "Source".to_string()),
                                    uri: web.uri.clone(),
                                });
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.unbounded_send(Err(e));
                        return;
                    }
                }
            }

            let _ = tx.unbounded_send(Ok(ChatEvent::Done { full_text, sources }));
        });

        Ok(Box::pin(rx))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        source: Option<&MediaRef>,
    ) -> Result<Option<MediaRef>, VartaError> {
        let mut parts = Vec::new();
        match source.and_then(MediaRef::data_parts) {
            Some((mime, payload)) => {
                parts.push(Part::inline(mime, payload));
                parts.push(Part::text(format!(
                    "Refine this image with these instructions: {prompt}. \
                     Keep the original composition's soul intact."
                )));
            }
            None => parts.push(Part::text(format!("{IMAGE_STYLE_PREFIX}{prompt}"))),
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: None,
            tools: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: aspect.to_string(),
                }),
            }),
        };

        let response = self.client.generate(&self.config.image_model, &request).await?;
        let Some(inline) = response.inline_data() else {
            debug!("image generation returned no inline data");
            return Ok(None);
        };
        Ok(Some(MediaRef(format!(
            "data:{};base64,{}",
            inline.mime_type, inline.data
        ))))
    }

    async fn generate_video(
        &self,
        request: &VideoRequest,
        on_progress: ProgressFn<'_>,
    ) -> Result<Option<VideoClip>, VartaError> {
        let api_request = VideoGenerationRequest {
            instances: vec![VideoInstance {
                prompt: format!("{VIDEO_STYLE_PREFIX}{}", request.prompt),
                video: request
                    .seed_video
                    .as_ref()
                    .map(|m| VideoSeed { uri: m.0.clone() }),
            }],
            parameters: VideoParameters {
                aspect_ratio: request.aspect.to_string(),
                number_of_videos: 1,
                resolution: "720p".to_string(),
            },
        };

        let submitted = self
            .client
            .start_video(&self.config.video_model, &api_request)
            .await?;
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        let phase = drive_operation(self, submitted, interval, on_progress).await?;

        let uri = match phase {
            VideoPhase::Done { uri } => uri,
            VideoPhase::Failed { reason } => {
                warn!(reason = %reason, "video operation failed");
                return Ok(None);
            }
            // drive_operation only returns terminal phases.
            VideoPhase::Submitted | VideoPhase::Polling { .. } => {
                return Err(VartaError::Internal(
                    "video driver returned a non-terminal phase".to_string(),
                ));
            }
        };

        let bytes = self.client.download(&uri).await?;
        tokio::fs::create_dir_all(&self.media_dir)
            .await
            .map_err(|e| VartaError::Storage {
                source: Box::new(e),
            })?;
        let path = self
            .media_dir
            .join(format!("clip-{}.mp4", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| VartaError::Storage {
                source: Box::new(e),
            })?;
        debug!(path = %path.display(), bytes = bytes.len(), "video clip written");

        Ok(Some(VideoClip {
            media: MediaRef::from_path(&path),
            duration_secs: CLIP_DURATION_SECS,
        }))
    }

    async fn analyze_image(
        &self,
        data: &[u8],
        mime_type: &str,
        prompt: &str,
    ) -> Result<Option<String>, VartaError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::inline(mime_type, encoded), Part::text(prompt)],
            }],
            system_instruction: Some(Content::system(format!(
                "{ANALYSIS_INSTRUCTION} {LANGUAGE_PARITY_INSTRUCTION}"
            ))),
            tools: None,
            generation_config: None,
        };

        let response = self.client.generate(&self.config.fast_model, &request).await?;
        let text = response.text();
        Ok((!text.is_empty()).then_some(text))
    }

    async fn summarize(&self, history: &[Message]) -> Result<Option<String>, VartaError> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(
                "user",
                format!(
                    "Summarize this conversation clearly. {LANGUAGE_PARITY_INSTRUCTION}\n\n\
                     Conversation:\n{}",
                    Self::transcript(history)
                ),
            )],
            system_instruction: Some(Content::system(format!(
                "{SUMMARY_INSTRUCTION} {LANGUAGE_PARITY_INSTRUCTION}"
            ))),
            tools: None,
            generation_config: None,
        };

        let response = self.client.generate(&self.config.fast_model, &request).await?;
        let text = response.text();
        Ok((!text.is_empty()).then_some(text))
    }
}

#[async_trait]
impl OperationSource for GeminiBackend {
    async fn poll(&self, name: &str) -> Result<Operation, VartaError> {
        self.client.poll_operation(name).await
    }
}
