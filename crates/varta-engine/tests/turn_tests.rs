// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end turn orchestration tests against the mock backend and the
//! in-memory state store.

use std::sync::Arc;

use chrono::Utc;
use varta_config::model::LimitsConfig;
use varta_core::types::{
    AspectRatio, Attachment, ChatEvent, GroundingSource, Role, UserStats,
};
use varta_core::{SessionId, StateStore, VartaError};
use varta_engine::{notices, TurnOrchestrator};
use varta_test_utils::{ChatScript, MemoryStateStore, MockBackend, MockCredentialGate, VideoScript};

struct Ctx {
    backend: Arc<MockBackend>,
    store: Arc<MemoryStateStore>,
    gate: Arc<MockCredentialGate>,
    orch: TurnOrchestrator,
    session: SessionId,
}

fn stats_today(image: u32, video: u32) -> UserStats {
    UserStats {
        video_trial_count: 0,
        daily_video_count: video,
        daily_image_count: image,
        last_reset_date: Utc::now().date_naive(),
        is_subscribed: false,
    }
}

async fn setup_with_stats(stats: UserStats) -> Ctx {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStateStore::new());
    store.seed_stats(stats).await;
    let gate = Arc::new(MockCredentialGate::selected());
    let orch = TurnOrchestrator::load(
        backend.clone(),
        store.clone(),
        Some(gate.clone()),
        &LimitsConfig::default(),
    )
    .await
    .unwrap();
    let session = orch.sessions()[0].id.clone();
    Ctx {
        backend,
        store,
        gate,
        orch,
        session,
    }
}

async fn setup() -> Ctx {
    setup_with_stats(stats_today(0, 0)).await
}

fn last_assistant_content(ctx: &Ctx) -> String {
    let session = ctx.orch.session(&ctx.session).unwrap();
    session
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.content.clone())
        .unwrap()
}

fn attachment() -> Attachment {
    Attachment {
        bytes: b"PNG-DATA".to_vec(),
        mime_type: "image/png".to_string(),
    }
}

// --- Session lifecycle ---

#[tokio::test]
async fn load_creates_initial_session_when_store_is_empty() {
    let ctx = setup().await;
    assert_eq!(ctx.orch.sessions().len(), 1);
    assert!(ctx.orch.sessions()[0].messages.is_empty());
}

#[tokio::test]
async fn create_session_inserts_empty_session_at_front() {
    let ctx = setup().await;
    let before = ctx.orch.sessions().len();
    let id = ctx.orch.create_session().await.unwrap();

    let sessions = ctx.orch.sessions();
    assert_eq!(sessions.len(), before + 1);
    assert_eq!(sessions[0].id, id);
    assert!(sessions[0].messages.is_empty());
}

#[tokio::test]
async fn delete_session_removes_and_persists() {
    let ctx = setup().await;
    let id = ctx.orch.create_session().await.unwrap();
    ctx.orch.delete_session(&id).await.unwrap();
    assert!(ctx.orch.session(&id).is_none());
    assert!(!ctx
        .store
        .load_sessions()
        .await
        .unwrap()
        .iter()
        .any(|s| s.id == id));
}

// --- Input validation ---

#[tokio::test]
async fn empty_submission_is_rejected_before_any_mutation() {
    let ctx = setup().await;
    let writes_before = ctx.store.session_writes();

    let err = ctx
        .orch
        .submit_turn(&ctx.session, "   ", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, VartaError::EmptyInput));
    assert!(ctx.orch.session(&ctx.session).unwrap().messages.is_empty());
    assert_eq!(ctx.store.session_writes(), writes_before);
    assert!(!ctx.orch.is_loading());
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let ctx = setup().await;
    let err = ctx
        .orch
        .submit_turn(&SessionId::generate(), "hello", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, VartaError::UnknownSession { .. }));
}

// --- Chat path ---

#[tokio::test]
async fn chat_turn_accumulates_fragments_then_overwrites_with_full_text() {
    let ctx = setup().await;
    ctx.backend
        .push_chat(ChatScript::fragments(&["Na", "ma", "ste"]))
        .await;

    ctx.orch
        .submit_turn(&ctx.session, "say namaste", None, None)
        .await
        .unwrap();

    // The placeholder's content passed through each accumulation state,
    // observable through the write-through persistence.
    let observed: Vec<String> = ctx
        .store
        .write_history()
        .await
        .iter()
        .filter_map(|snapshot| {
            snapshot
                .iter()
                .find(|s| s.id == ctx.session)?
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Assistant)
                .map(|m| m.content.clone())
        })
        .collect();
    let accumulation: Vec<&str> = observed
        .iter()
        .map(String::as_str)
        .filter(|c| *c != notices::THINKING)
        .collect();
    assert_eq!(accumulation, vec!["Na", "Nama", "Namaste", "Namaste"]);

    assert_eq!(last_assistant_content(&ctx), "Namaste");
    assert!(!ctx.orch.is_loading());
}

#[tokio::test]
async fn chat_history_excludes_prompt_and_placeholder() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "first question", None, None)
        .await
        .unwrap();
    ctx.orch
        .submit_turn(&ctx.session, "second question", None, None)
        .await
        .unwrap();

    // First turn: no prior history. Second turn: the finished first
    // exchange only.
    assert_eq!(ctx.backend.chat_history_lens().await, vec![0, 2]);
}

#[tokio::test]
async fn grounded_chat_attaches_sources_and_search_kind() {
    let ctx = setup().await;
    ctx.backend
        .push_chat(ChatScript {
            events: vec![
                Ok(ChatEvent::Fragment("It is sunny.".to_string())),
                Ok(ChatEvent::Done {
                    full_text: "It is sunny.".to_string(),
                    sources: vec![GroundingSource {
                        title: "Weather".to_string(),
                        uri: "https://weather.example".to_string(),
                    }],
                }),
            ],
        })
        .await;

    ctx.orch.set_use_search(true);
    ctx.orch
        .submit_turn(&ctx.session, "weather today?", None, None)
        .await
        .unwrap();

    let session = ctx.orch.session(&ctx.session).unwrap();
    let reply = session.messages.last().unwrap();
    assert_eq!(reply.kind, varta_core::types::ResultKind::Search);
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].uri, "https://weather.example");
}

#[tokio::test]
async fn mid_stream_failure_preserves_partial_text_and_appends_notice() {
    let ctx = setup().await;
    ctx.backend
        .push_chat(ChatScript::failing_after(
            &["Hello, "],
            VartaError::backend("connection dropped"),
        ))
        .await;

    ctx.orch
        .submit_turn(&ctx.session, "hi", None, None)
        .await
        .unwrap();

    let content = last_assistant_content(&ctx);
    assert!(content.starts_with("Hello, "), "partial text kept: {content}");
    assert!(content.contains(notices::GENERIC_FAILURE));
    assert!(!ctx.orch.is_loading());
}

// --- Classification routing ---

#[tokio::test]
async fn video_terms_route_to_the_video_path() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();
    assert_eq!(ctx.backend.video_calls(), 1);
    assert_eq!(ctx.backend.chat_calls(), 0);
    assert_eq!(ctx.backend.image_calls(), 0);
}

#[tokio::test]
async fn image_terms_route_to_the_image_path() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "draw a picture of a temple", None, None)
        .await
        .unwrap();
    assert_eq!(ctx.backend.image_calls(), 1);
    assert_eq!(ctx.backend.video_calls(), 0);
}

#[tokio::test]
async fn attachment_without_media_terms_routes_to_analysis() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "what is this?", Some(attachment()), None)
        .await
        .unwrap();
    assert_eq!(ctx.backend.analysis_calls(), 1);
    assert_eq!(last_assistant_content(&ctx), "mock analysis");
}

#[tokio::test]
async fn analysis_uses_default_prompt_when_text_is_empty() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "", Some(attachment()), None)
        .await
        .unwrap();
    assert_eq!(
        ctx.backend.analysis_prompts().await,
        vec![notices::ANALYSIS_DEFAULT_PROMPT.to_string()]
    );
}

#[tokio::test]
async fn analysis_failure_is_non_fatal() {
    let ctx = setup().await;
    ctx.backend.push_analysis(None).await;
    ctx.orch
        .submit_turn(&ctx.session, "what is this?", Some(attachment()), None)
        .await
        .unwrap();
    assert_eq!(last_assistant_content(&ctx), notices::ANALYSIS_FAILED);
}

// --- Image generation quota ---

#[tokio::test]
async fn image_quota_blocks_at_limit_without_backend_call() {
    let ctx = setup_with_stats(stats_today(7, 0)).await;
    ctx.orch
        .submit_turn(&ctx.session, "draw a picture of a fort", None, None)
        .await
        .unwrap();

    assert_eq!(ctx.backend.image_calls(), 0);
    assert_eq!(last_assistant_content(&ctx), notices::IMAGE_QUOTA_EXCEEDED);
    assert_eq!(ctx.orch.stats().await.daily_image_count, 7);
}

#[tokio::test]
async fn image_success_increments_counter_and_sets_media() {
    let ctx = setup_with_stats(stats_today(6, 0)).await;
    ctx.orch
        .submit_turn(
            &ctx.session,
            "draw a picture of a fort",
            None,
            Some(AspectRatio::Portrait),
        )
        .await
        .unwrap();

    let session = ctx.orch.session(&ctx.session).unwrap();
    let reply = session.messages.last().unwrap();
    assert!(reply.generated_image.is_some());
    assert!(reply.generated_video.is_none());
    assert_eq!(reply.kind, varta_core::types::ResultKind::ImageGeneration);
    assert!(reply.content.contains("9:16"));

    let stats = ctx.orch.stats().await;
    assert_eq!(stats.daily_image_count, 7);
    // Persisted on mutation.
    assert_eq!(ctx.store.load_stats().await.unwrap().unwrap(), stats);
}

#[tokio::test]
async fn image_null_result_keeps_counter_and_reports_failure() {
    let ctx = setup_with_stats(stats_today(2, 0)).await;
    ctx.backend.push_image(Ok(None)).await;
    ctx.orch
        .submit_turn(&ctx.session, "draw a picture of a fort", None, None)
        .await
        .unwrap();

    assert_eq!(last_assistant_content(&ctx), notices::IMAGE_FAILED);
    assert_eq!(ctx.orch.stats().await.daily_image_count, 2);
}

// --- Video generation quota ---

#[tokio::test]
async fn video_quota_blocks_at_limit_without_backend_call() {
    let ctx = setup_with_stats(stats_today(0, 3)).await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();

    assert_eq!(ctx.backend.video_calls(), 0);
    assert_eq!(last_assistant_content(&ctx), notices::VIDEO_QUOTA_EXCEEDED);
    let stats = ctx.orch.stats().await;
    assert_eq!(stats.daily_video_count, 3);
    assert_eq!(stats.video_trial_count, 0);
    assert!(!ctx.orch.is_loading());
}

#[tokio::test]
async fn video_success_increments_daily_and_trial_counters() {
    let ctx = setup_with_stats(stats_today(0, 2)).await;
    ctx.backend.push_video(VideoScript::succeeding(2)).await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();

    let session = ctx.orch.session(&ctx.session).unwrap();
    let reply = session.messages.last().unwrap();
    assert!(reply.generated_video.is_some());
    assert!(reply.generated_image.is_none());
    assert_eq!(reply.duration_secs, Some(15));
    assert_eq!(reply.kind, varta_core::types::ResultKind::VideoGeneration);
    assert_eq!(reply.content, notices::VIDEO_READY);

    let stats = ctx.orch.stats().await;
    assert_eq!(stats.daily_video_count, 3);
    assert_eq!(stats.video_trial_count, 1);
    assert_eq!(ctx.store.load_stats().await.unwrap().unwrap(), stats);
}

#[tokio::test]
async fn video_null_result_reports_failure_without_increment() {
    let ctx = setup_with_stats(stats_today(0, 1)).await;
    ctx.backend.push_video(VideoScript::empty()).await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();

    assert_eq!(last_assistant_content(&ctx), notices::VIDEO_FAILED);
    let stats = ctx.orch.stats().await;
    assert_eq!(stats.daily_video_count, 1);
    assert_eq!(stats.video_trial_count, 0);
}

#[tokio::test]
async fn subscriber_bypasses_video_quota() {
    let mut stats = stats_today(0, 99);
    stats.is_subscribed = true;
    let ctx = setup_with_stats(stats).await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();
    assert_eq!(ctx.backend.video_calls(), 1);
    assert_eq!(last_assistant_content(&ctx), notices::VIDEO_READY);
}

// --- Credential reset ---

#[tokio::test]
async fn key_reset_prompts_reselection_and_leaves_retry_notice() {
    let ctx = setup_with_stats(stats_today(0, 0)).await;
    ctx.backend.push_video(VideoScript::key_reset()).await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();

    assert_eq!(last_assistant_content(&ctx), notices::KEY_RESET);
    assert!(ctx.gate.reselect_count() >= 1);
    assert!(!ctx.orch.is_loading());
    // No counters incremented, and the backend was called exactly once
    // (no automatic retry).
    let stats = ctx.orch.stats().await;
    assert_eq!(stats.daily_video_count, 0);
    assert_eq!(stats.video_trial_count, 0);
    assert_eq!(ctx.backend.video_calls(), 1);
}

// --- Edit and resubmit ---

#[tokio::test]
async fn edit_and_resubmit_truncates_suffix_and_regenerates() {
    let ctx = setup().await;
    ctx.backend.push_chat(ChatScript::fragments(&["A1"])).await;
    ctx.backend.push_chat(ChatScript::fragments(&["A2"])).await;
    ctx.backend.push_chat(ChatScript::fragments(&["A2'"])).await;

    ctx.orch
        .submit_turn(&ctx.session, "U1", None, None)
        .await
        .unwrap();
    ctx.orch
        .submit_turn(&ctx.session, "U2", None, None)
        .await
        .unwrap();

    let u2_id = {
        let session = ctx.orch.session(&ctx.session).unwrap();
        assert_eq!(session.messages.len(), 4);
        session.messages[2].id.clone()
    };

    ctx.orch
        .edit_and_resubmit(&ctx.session, &u2_id, "new text")
        .await
        .unwrap();

    let session = ctx.orch.session(&ctx.session).unwrap();
    let contents: Vec<&str> = session.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["U1", "A1", "new text", "A2'"]);
    // The replacement user message is fresh, not the original mutated.
    assert_ne!(session.messages[2].id, u2_id);
}

#[tokio::test]
async fn edit_with_empty_text_is_rejected() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "U1", None, None)
        .await
        .unwrap();
    let u1_id = ctx.orch.session(&ctx.session).unwrap().messages[0].id.clone();

    let err = ctx
        .orch
        .edit_and_resubmit(&ctx.session, &u1_id, "  ")
        .await
        .unwrap_err();
    assert!(matches!(err, VartaError::EmptyInput));
    assert_eq!(ctx.orch.session(&ctx.session).unwrap().messages.len(), 2);
}

// --- Video edit ---

#[tokio::test]
async fn video_edit_appends_new_message_and_charges_quota() {
    let ctx = setup_with_stats(stats_today(0, 0)).await;
    ctx.backend.push_video(VideoScript::succeeding(1)).await;
    ctx.orch
        .submit_turn(&ctx.session, "make a video of rain", None, None)
        .await
        .unwrap();

    let (original_id, count_before) = {
        let session = ctx.orch.session(&ctx.session).unwrap();
        (
            session.messages.last().unwrap().id.clone(),
            session.messages.len(),
        )
    };

    ctx.backend.push_video(VideoScript::succeeding(1)).await;
    ctx.orch
        .submit_video_edit(&ctx.session, &original_id, "make it rain harder", None)
        .await
        .unwrap();

    let session = ctx.orch.session(&ctx.session).unwrap();
    assert_eq!(session.messages.len(), count_before + 1);
    let edited = session.messages.last().unwrap();
    assert_eq!(edited.content, notices::VIDEO_EDIT_READY);
    assert!(edited.generated_video.is_some());
    // Original message untouched.
    let original = session
        .messages
        .iter()
        .find(|m| m.id == original_id)
        .unwrap();
    assert_eq!(original.content, notices::VIDEO_READY);

    // Edits are charged like fresh generations.
    let stats = ctx.orch.stats().await;
    assert_eq!(stats.daily_video_count, 2);
    assert_eq!(stats.video_trial_count, 2);
}

#[tokio::test]
async fn video_edit_of_non_video_message_is_rejected() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "hello", None, None)
        .await
        .unwrap();
    let text_id = ctx.orch.session(&ctx.session).unwrap().messages[1].id.clone();

    let err = ctx
        .orch
        .submit_video_edit(&ctx.session, &text_id, "edit", None)
        .await
        .unwrap_err();
    assert!(matches!(err, VartaError::UnknownMessage { .. }));
}

// --- Summarization ---

#[tokio::test]
async fn summarize_is_a_silent_noop_under_two_messages() {
    let ctx = setup().await;
    ctx.orch.summarize(&ctx.session).await.unwrap();
    assert_eq!(ctx.backend.summary_calls(), 0);
    assert!(ctx.orch.session(&ctx.session).unwrap().messages.is_empty());
}

#[tokio::test]
async fn summarize_appends_summary_message() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "tell me about trains", None, None)
        .await
        .unwrap();

    ctx.backend
        .push_summary(Some("You talked about trains.".to_string()))
        .await;
    ctx.orch.summarize(&ctx.session).await.unwrap();

    assert_eq!(ctx.backend.summary_calls(), 1);
    assert_eq!(last_assistant_content(&ctx), "You talked about trains.");
}

#[tokio::test]
async fn summarize_failure_leaves_notice() {
    let ctx = setup().await;
    ctx.orch
        .submit_turn(&ctx.session, "tell me about trains", None, None)
        .await
        .unwrap();

    ctx.backend.push_summary(None).await;
    ctx.orch.summarize(&ctx.session).await.unwrap();
    assert_eq!(last_assistant_content(&ctx), notices::SUMMARY_FAILED);
}

// --- Persistence contract ---

#[tokio::test]
async fn every_turn_mutation_writes_through_to_the_store() {
    let ctx = setup().await;
    ctx.backend
        .push_chat(ChatScript::fragments(&["Na", "ma", "ste"]))
        .await;
    let before = ctx.store.session_writes();

    ctx.orch
        .submit_turn(&ctx.session, "say namaste", None, None)
        .await
        .unwrap();

    // user append + placeholder append + three fragments + final overwrite.
    assert_eq!(ctx.store.session_writes() - before, 6);
    let persisted = ctx.store.load_sessions().await.unwrap();
    assert_eq!(persisted[0].messages.len(), 2);
}

// --- Concurrency gate ---

mod gating {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use tokio::sync::{oneshot, Mutex};
    use varta_core::traits::backend::{ChatStream, ProgressFn};
    use varta_core::types::{
        AdapterKind, ChatOptions, HealthStatus, MediaRef, Message, VideoClip, VideoRequest,
    };
    use varta_core::{Adapter, GenerationBackend};

    /// Backend whose chat stream blocks until released, so a test can hold
    /// a turn in flight.
    struct GatedBackend {
        release: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl Adapter for GatedBackend {
        fn name(&self) -> &str {
            "gated"
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
    impl GenerationBackend for GatedBackend {
        async fn stream_chat(
            &self,
            _prompt: &str,
            _history: &[Message],
            _options: &ChatOptions,
        ) -> Result<ChatStream, VartaError> {
            let release = self.release.lock().await.take();
            Ok(Box::pin(stream::once(async move {
                if let Some(rx) = release {
                    let _ = rx.await;
                }
                Ok(ChatEvent::Done {
                    full_text: "released".to_string(),
                    sources: Vec::new(),
                })
            })))
        }

        async fn generate_image(
            &self,
            _prompt: &str,
            _aspect: AspectRatio,
            _source: Option<&MediaRef>,
        ) -> Result<Option<MediaRef>, VartaError> {
            Ok(None)
        }

        async fn generate_video(
            &self,
            _request: &VideoRequest,
            _on_progress: ProgressFn<'_>,
        ) -> Result<Option<VideoClip>, VartaError> {
            Ok(None)
        }

        async fn analyze_image(
            &self,
            _data: &[u8],
            _mime_type: &str,
            _prompt: &str,
        ) -> Result<Option<String>, VartaError> {
            Ok(None)
        }

        async fn summarize(&self, _history: &[Message]) -> Result<Option<String>, VartaError> {
            Ok(None)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn overlapping_submission_is_rejected_while_in_flight() {
        let (release_tx, release_rx) = oneshot::channel();
        let backend = Arc::new(GatedBackend {
            release: Mutex::new(Some(release_rx)),
        });
        let store = Arc::new(MemoryStateStore::new());
        let orch = Arc::new(
            TurnOrchestrator::load(backend, store, None, &LimitsConfig::default())
                .await
                .unwrap(),
        );
        let session = orch.sessions()[0].id.clone();

        let task = {
            let orch = orch.clone();
            let session = session.clone();
            tokio::spawn(async move { orch.submit_turn(&session, "hello", None, None).await })
        };

        while !orch.is_loading() {
            tokio::task::yield_now().await;
        }

        let err = orch
            .submit_turn(&session, "again", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, VartaError::TurnInFlight));

        release_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!orch.is_loading());

        // Only the first turn's messages exist.
        let messages = orch.session(&session).unwrap().messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, "released");
    }
}
