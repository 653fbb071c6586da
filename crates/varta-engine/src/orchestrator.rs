// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestrator: the coordination core of a chat turn.
//!
//! Takes a user submission, classifies the requested action, enforces
//! quotas, drives the generation workflow (streaming chat, one-shot image
//! generation/analysis, polled video rendering), and reconciles results
//! back into the session store.
//!
//! The orchestrator holds no conversation state itself -- its only state is
//! the atomic in-flight flag and the association between a session and the
//! placeholder message it is currently populating. At most one turn is in
//! flight at a time; overlapping submissions are rejected with
//! [`VartaError::TurnInFlight`] rather than left to interleave.
//!
//! All generation-path errors are caught at the turn boundary and converted
//! to message mutations; none escape to the presentation layer. The
//! in-flight flag always clears, even on error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::Engine as _;
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use varta_config::model::LimitsConfig;
use varta_core::types::{
    AspectRatio, Attachment, ChatEvent, ChatOptions, ChatSession, MediaRef, Message, ResultKind,
    UserStats, VideoRequest,
};
use varta_core::{
    CredentialGate, GenerationBackend, MessageId, SessionId, StateStore, VartaError,
};
use varta_quota::{QuotaDecision, QuotaTracker};
use varta_router::{classify, clean_media_prompt, Intent};

use crate::notices;
use crate::store::SessionStore;

/// Coordinates turns between the presentation layer, the quota tracker,
/// the generation backend, and the session store.
pub struct TurnOrchestrator {
    sessions: SessionStore,
    backend: Arc<dyn GenerationBackend>,
    store: Arc<dyn StateStore>,
    quota: Mutex<QuotaTracker>,
    credential: Option<Arc<dyn CredentialGate>>,
    use_search: AtomicBool,
    use_pro: AtomicBool,
    loading: AtomicBool,
}

/// Clears the in-flight flag when the turn ends, regardless of outcome.
struct TurnGuard<'a> {
    orchestrator: &'a TurnOrchestrator,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.loading.store(false, Ordering::SeqCst);
        self.orchestrator.sessions.touch();
    }
}

impl TurnOrchestrator {
    /// Initializes the store, loads persisted state, normalizes the quota
    /// record, and ensures at least one session exists.
    pub async fn load(
        backend: Arc<dyn GenerationBackend>,
        store: Arc<dyn StateStore>,
        credential: Option<Arc<dyn CredentialGate>>,
        limits: &LimitsConfig,
    ) -> Result<Self, VartaError> {
        store.initialize().await?;

        let stats = store.load_stats().await?.unwrap_or_default();
        let quota = QuotaTracker::new(limits, stats);
        // Persist the load-time reset so a stale record does not survive a
        // crash before the first generation.
        store.save_stats(quota.stats()).await?;

        let sessions = SessionStore::load(store.clone()).await?;

        let orchestrator = Self {
            sessions,
            backend,
            store,
            quota: Mutex::new(quota),
            credential,
            use_search: AtomicBool::new(false),
            use_pro: AtomicBool::new(false),
            loading: AtomicBool::new(false),
        };

        if orchestrator.sessions.is_empty() {
            orchestrator
                .sessions
                .create_front(notices::DEFAULT_SESSION_TITLE)
                .await?;
            info!("no persisted sessions; created initial session");
        }

        Ok(orchestrator)
    }

    // --- Entry points ---

    /// Runs one full turn: validation, user message, placeholder,
    /// classification, generation, finalization.
    pub async fn submit_turn(
        &self,
        session_id: &SessionId,
        text: &str,
        attachment: Option<Attachment>,
        aspect: Option<AspectRatio>,
    ) -> Result<(), VartaError> {
        let trimmed = text.trim();
        if trimmed.is_empty() && attachment.is_none() {
            return Err(VartaError::EmptyInput);
        }
        if !self.sessions.contains(session_id) {
            return Err(VartaError::UnknownSession {
                id: session_id.to_string(),
            });
        }
        let _guard = self.begin_turn()?;

        let input_image = attachment.as_ref().map(Attachment::to_media_ref);
        self.sessions
            .push_user_message(session_id, Message::user(trimmed, input_image))
            .await?;

        let placeholder = Message::assistant(notices::THINKING);
        let placeholder_id = placeholder.id.clone();
        self.sessions.push_message(session_id, placeholder).await?;

        if let Err(error) = self
            .run_turn(session_id, &placeholder_id, trimmed, attachment, aspect)
            .await
        {
            self.fail_turn(session_id, &placeholder_id, error).await;
        }
        Ok(())
    }

    /// Truncates the conversation at the edited message, replaces its
    /// content, and re-runs the full pipeline as if newly submitted. No
    /// trace of the messages after the edit point remains.
    pub async fn edit_and_resubmit(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        new_text: &str,
    ) -> Result<(), VartaError> {
        let trimmed = new_text.trim();
        if trimmed.is_empty() {
            return Err(VartaError::EmptyInput);
        }
        // Resolve the target before mutating anything.
        let _ = self.sessions.message(session_id, message_id)?;
        let _guard = self.begin_turn()?;

        let removed = self.sessions.truncate_from(session_id, message_id).await?;
        let input_image = removed.input_image.clone();
        self.sessions
            .push_user_message(session_id, Message::user(trimmed, input_image.clone()))
            .await?;

        let placeholder = Message::assistant(notices::THINKING);
        let placeholder_id = placeholder.id.clone();
        self.sessions.push_message(session_id, placeholder).await?;

        let attachment = input_image.as_ref().and_then(attachment_from_media);
        if let Err(error) = self
            .run_turn(session_id, &placeholder_id, trimmed, attachment, None)
            .await
        {
            self.fail_turn(session_id, &placeholder_id, error).await;
        }
        Ok(())
    }

    /// Renders a new clip seeded from a previously generated video. The
    /// original message is never mutated; a new assistant message carries
    /// the edit. Edits are charged against the daily video quota exactly
    /// like fresh generations.
    pub async fn submit_video_edit(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        edit_prompt: &str,
        aspect: Option<AspectRatio>,
    ) -> Result<(), VartaError> {
        let original = self.sessions.message(session_id, message_id)?;
        let Some(seed) = original.generated_video.clone() else {
            return Err(VartaError::UnknownMessage {
                id: message_id.to_string(),
            });
        };
        let _guard = self.begin_turn()?;

        let placeholder = Message::assistant(notices::THINKING);
        let placeholder_id = placeholder.id.clone();
        self.sessions.push_message(session_id, placeholder).await?;

        if let Err(error) = self
            .run_video(
                session_id,
                &placeholder_id,
                edit_prompt.to_string(),
                Some(seed),
                aspect,
                notices::VIDEO_EDIT_READY,
            )
            .await
        {
            self.fail_turn(session_id, &placeholder_id, error).await;
        }
        Ok(())
    }

    /// One-shot summarization over the session history. Silently no-ops
    /// when fewer than two messages exist.
    pub async fn summarize(&self, session_id: &SessionId) -> Result<(), VartaError> {
        if !self.sessions.contains(session_id) {
            return Err(VartaError::UnknownSession {
                id: session_id.to_string(),
            });
        }
        if self.sessions.message_count(session_id)? < 2 {
            debug!("fewer than two messages; summarize is a no-op");
            return Ok(());
        }
        let _guard = self.begin_turn()?;

        let placeholder = Message::assistant(notices::THINKING);
        let placeholder_id = placeholder.id.clone();
        self.sessions.push_message(session_id, placeholder).await?;

        // History excludes the just-appended placeholder.
        let history = self.sessions.history_before(session_id, &placeholder_id)?;
        let content = match self.backend.summarize(&history).await {
            Ok(Some(text)) => text,
            Ok(None) => notices::SUMMARY_FAILED.to_string(),
            Err(error) => {
                warn!(error = %error, "summarization failed");
                notices::SUMMARY_FAILED.to_string()
            }
        };
        self.sessions
            .update_message(session_id, &placeholder_id, |m| m.content = content)
            .await
    }

    /// Creates an empty session at the front of the list.
    pub async fn create_session(&self) -> Result<SessionId, VartaError> {
        self.sessions.create_front(notices::DEFAULT_SESSION_TITLE).await
    }

    /// Deletes a session and all its messages.
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), VartaError> {
        self.sessions.delete(session_id).await
    }

    // --- Observation and toggles ---

    /// Whether a turn is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Subscribe to state-change notifications for re-rendering.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.sessions.subscribe()
    }

    /// Snapshot of all sessions in display order.
    pub fn sessions(&self) -> Vec<ChatSession> {
        self.sessions.snapshot()
    }

    /// Snapshot of one session.
    pub fn session(&self, session_id: &SessionId) -> Option<ChatSession> {
        self.sessions.session(session_id)
    }

    /// Current usage statistics snapshot.
    pub async fn stats(&self) -> UserStats {
        self.quota.lock().await.stats().clone()
    }

    pub fn set_use_search(&self, on: bool) {
        self.use_search.store(on, Ordering::SeqCst);
    }

    pub fn set_use_pro(&self, on: bool) {
        self.use_pro.store(on, Ordering::SeqCst);
    }

    /// Flips the subscription flag and persists the stats record.
    pub async fn set_subscribed(&self, subscribed: bool) {
        self.record_stats(|quota| quota.set_subscribed(subscribed)).await;
    }

    // --- Turn internals ---

    /// Acquires the in-flight gate; rejects overlapping submissions.
    fn begin_turn(&self) -> Result<TurnGuard<'_>, VartaError> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(VartaError::TurnInFlight);
        }
        self.sessions.touch();
        Ok(TurnGuard { orchestrator: self })
    }

    fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            use_search: self.use_search.load(Ordering::SeqCst),
            use_pro: self.use_pro.load(Ordering::SeqCst),
        }
    }

    /// Classifies the submission and dispatches into one of the four
    /// generation paths.
    async fn run_turn(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
        text: &str,
        attachment: Option<Attachment>,
        aspect: Option<AspectRatio>,
    ) -> Result<(), VartaError> {
        let intent = classify(text, attachment.is_some());
        debug!(intent = %intent, session_id = %session_id, "turn classified");
        match intent {
            Intent::Chat => self.run_chat(session_id, placeholder_id, text).await,
            Intent::ImageAnalysis => {
                self.run_analysis(session_id, placeholder_id, text, attachment)
                    .await
            }
            Intent::ImageGeneration => {
                self.run_image(session_id, placeholder_id, text, attachment, aspect)
                    .await
            }
            Intent::VideoGeneration => {
                self.run_video(
                    session_id,
                    placeholder_id,
                    clean_media_prompt(text),
                    None,
                    aspect,
                    notices::VIDEO_READY,
                )
                .await
            }
        }
    }

    /// Streaming chat: fragments accumulate into the placeholder; the
    /// terminal event overwrites with the authoritative full text and
    /// attaches grounding sources. A mid-stream error preserves the text
    /// accumulated so far and appends the failure notice.
    async fn run_chat(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
        text: &str,
    ) -> Result<(), VartaError> {
        let history = self.sessions.history_before(session_id, placeholder_id)?;
        // The prompt carries the new submission; history is everything
        // before it.
        let history = &history[..history.len().saturating_sub(1)];
        let options = self.chat_options();
        let mut stream = self.backend.stream_chat(text, history, &options).await?;

        let mut finished = false;
        while let Some(event) = stream.next().await {
            match event {
                Ok(ChatEvent::Fragment(fragment)) => {
                    self.sessions
                        .update_message(session_id, placeholder_id, |m| {
                            if m.content == notices::THINKING {
                                m.content.clear();
                            }
                            m.content.push_str(&fragment);
                        })
                        .await?;
                }
                Ok(ChatEvent::Done { full_text, sources }) => {
                    self.sessions
                        .update_message(session_id, placeholder_id, |m| {
                            if !full_text.is_empty() {
                                m.content = full_text;
                            } else if m.content == notices::THINKING {
                                m.content = notices::GENERIC_FAILURE.to_string();
                            }
                            if !sources.is_empty() {
                                m.kind = ResultKind::Search;
                            }
                            m.sources = sources;
                        })
                        .await?;
                    finished = true;
                }
                Err(error) => {
                    warn!(error = %error, "chat stream failed mid-turn");
                    self.append_failure(session_id, placeholder_id).await?;
                    finished = true;
                    break;
                }
            }
        }

        if !finished {
            // Stream ended without a terminal event.
            self.append_failure(session_id, placeholder_id).await?;
        }
        Ok(())
    }

    /// Image analysis: failures are non-fatal to the turn and substitute a
    /// fallback message.
    async fn run_analysis(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<(), VartaError> {
        let content = match attachment {
            Some(att) => {
                let prompt = if text.is_empty() {
                    notices::ANALYSIS_DEFAULT_PROMPT
                } else {
                    text
                };
                match self
                    .backend
                    .analyze_image(&att.bytes, &att.mime_type, prompt)
                    .await
                {
                    Ok(Some(analysis)) => analysis,
                    Ok(None) => notices::ANALYSIS_FAILED.to_string(),
                    Err(error) => {
                        warn!(error = %error, "image analysis failed (non-fatal)");
                        notices::ANALYSIS_FAILED.to_string()
                    }
                }
            }
            None => notices::ANALYSIS_FAILED.to_string(),
        };
        self.sessions
            .update_message(session_id, placeholder_id, |m| m.content = content)
            .await
    }

    /// Image generation: the quota gate runs strictly before the backend
    /// call; a blocked turn terminates with a notice and no counter change.
    async fn run_image(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
        text: &str,
        attachment: Option<Attachment>,
        aspect: Option<AspectRatio>,
    ) -> Result<(), VartaError> {
        if self.quota.lock().await.check_image() == QuotaDecision::Exhausted {
            info!("daily image quota exhausted; turn terminated without backend call");
            return self
                .sessions
                .update_message(session_id, placeholder_id, |m| {
                    m.content = notices::IMAGE_QUOTA_EXCEEDED.to_string();
                })
                .await;
        }

        let prompt = clean_media_prompt(text);
        let aspect = aspect.unwrap_or_else(AspectRatio::default_image);
        let source = attachment.as_ref().map(Attachment::to_media_ref);

        match self
            .backend
            .generate_image(&prompt, aspect, source.as_ref())
            .await?
        {
            Some(media) => {
                self.record_stats(|quota| quota.record_image()).await;
                self.sessions
                    .update_message(session_id, placeholder_id, |m| {
                        m.generated_image = Some(media);
                        m.kind = ResultKind::ImageGeneration;
                        m.content = notices::image_ready(aspect);
                    })
                    .await
            }
            None => {
                self.sessions
                    .update_message(session_id, placeholder_id, |m| {
                        m.content = notices::IMAGE_FAILED.to_string();
                    })
                    .await
            }
        }
    }

    /// Video generation (fresh or seeded edit): quota gate, credential
    /// check, then the polled long-running operation. The progress callback
    /// overwrites the placeholder content once per poll.
    async fn run_video(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
        prompt: String,
        seed_video: Option<MediaRef>,
        aspect: Option<AspectRatio>,
        success_notice: &str,
    ) -> Result<(), VartaError> {
        if self.quota.lock().await.check_video() == QuotaDecision::Exhausted {
            info!("daily video quota exhausted; turn terminated without backend call");
            return self
                .sessions
                .update_message(session_id, placeholder_id, |m| {
                    m.content = notices::VIDEO_QUOTA_EXCEEDED.to_string();
                })
                .await;
        }

        if let Some(gate) = &self.credential
            && !gate.has_selected_key().await?
        {
            gate.request_reselect().await?;
        }

        let request = VideoRequest {
            prompt,
            aspect: aspect.unwrap_or_else(AspectRatio::default_video),
            seed_video,
        };

        let sid = session_id.clone();
        let pid = placeholder_id.clone();
        let sessions = &self.sessions;
        let progress = move |elapsed: u64| {
            let _ = sessions.update_message_sync(&sid, &pid, |m| {
                m.content = notices::video_progress(elapsed);
            });
        };

        match self.backend.generate_video(&request, &progress).await? {
            Some(clip) => {
                self.record_stats(|quota| quota.record_video()).await;
                self.sessions
                    .update_message(session_id, placeholder_id, |m| {
                        m.generated_video = Some(clip.media);
                        m.duration_secs = Some(clip.duration_secs);
                        m.kind = ResultKind::VideoGeneration;
                        m.content = success_notice.to_string();
                    })
                    .await
            }
            None => {
                self.sessions
                    .update_message(session_id, placeholder_id, |m| {
                        m.content = notices::VIDEO_FAILED.to_string();
                    })
                    .await
            }
        }
    }

    /// Converts a generation-path error into a terminal message mutation.
    /// `KeyReset` additionally triggers credential reselection; the turn is
    /// not retried.
    async fn fail_turn(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
        error: VartaError,
    ) {
        let notice = match &error {
            VartaError::KeyReset => {
                info!("backend rejected credential; prompting reselection");
                if let Some(gate) = &self.credential
                    && let Err(gate_error) = gate.request_reselect().await
                {
                    warn!(error = %gate_error, "credential reselection prompt failed");
                }
                notices::KEY_RESET
            }
            _ => {
                warn!(error = %error, "turn failed");
                notices::GENERIC_FAILURE
            }
        };

        let result = self
            .sessions
            .update_message(session_id, placeholder_id, |m| {
                if m.content == notices::THINKING || m.content.is_empty() {
                    m.content = notice.to_string();
                } else {
                    // Keep whatever the turn produced before failing.
                    m.content.push_str("\n\n");
                    m.content.push_str(notice);
                }
            })
            .await;
        if let Err(store_error) = result {
            warn!(error = %store_error, "failed to record turn failure");
        }
    }

    /// Appends the generic failure notice, preserving accumulated content.
    async fn append_failure(
        &self,
        session_id: &SessionId,
        placeholder_id: &MessageId,
    ) -> Result<(), VartaError> {
        self.sessions
            .update_message(session_id, placeholder_id, |m| {
                if m.content == notices::THINKING || m.content.is_empty() {
                    m.content = notices::GENERIC_FAILURE.to_string();
                } else {
                    m.content.push_str("\n\n");
                    m.content.push_str(notices::GENERIC_FAILURE);
                }
            })
            .await
    }

    /// Applies a quota mutation and persists the resulting stats record.
    /// Persistence failures are logged, not fatal -- the generation already
    /// succeeded.
    async fn record_stats(&self, mutate: impl FnOnce(&mut QuotaTracker) -> UserStats) {
        let stats = {
            let mut quota = self.quota.lock().await;
            mutate(&mut quota)
        };
        if let Err(error) = self.store.save_stats(&stats).await {
            warn!(error = %error, "failed to persist usage stats");
        }
    }
}

/// Rebuilds an attachment from a persisted inline data reference, for
/// resubmitted messages that originally carried a file.
fn attachment_from_media(media: &MediaRef) -> Option<Attachment> {
    let (mime, payload) = media.data_parts()?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some(Attachment {
        bytes,
        mime_type: mime.to_string(),
    })
}
