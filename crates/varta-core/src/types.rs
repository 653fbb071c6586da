// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across adapter traits and the Varta core.

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generates a fresh random session identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generates a fresh random message identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Author role of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Result kind of an assistant message, tagging which generation path
/// produced it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResultKind {
    #[default]
    Text,
    ImageGeneration,
    VideoGeneration,
    Search,
}

/// Aspect ratio for generated media, from the fixed enumerated set the
/// backend accepts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    #[strum(serialize = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    #[strum(serialize = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    #[strum(serialize = "9:16")]
    Portrait,
    #[serde(rename = "4:3")]
    #[strum(serialize = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    #[strum(serialize = "3:4")]
    Tall,
}

impl AspectRatio {
    /// Default ratio for image generation.
    pub fn default_image() -> Self {
        AspectRatio::Square
    }

    /// Default ratio for video generation.
    pub fn default_video() -> Self {
        AspectRatio::Landscape
    }
}

/// A locally-referenceable media handle: either an inline `data:` URL
/// (images, uploaded files) or a path to a file on local disk
/// (downloaded video bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef(pub String);

impl MediaRef {
    /// Builds an inline `data:` URL from raw bytes and a MIME type.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Self(format!("data:{mime_type};base64,{encoded}"))
    }

    /// Builds a handle referencing a file on local disk.
    pub fn from_path(path: &std::path::Path) -> Self {
        Self(path.display().to_string())
    }

    /// Splits a `data:` URL into MIME type and base64 payload.
    pub fn data_parts(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime = meta.strip_suffix(";base64").unwrap_or(meta);
        Some((mime, payload))
    }

    /// Returns the base64 payload if this is a `data:` URL.
    pub fn data_payload(&self) -> Option<&str> {
        self.data_parts().map(|(_, payload)| payload)
    }
}

impl std::fmt::Display for MediaRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A web grounding source attached to a search-grounded chat response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// One turn's utterance within a session.
///
/// Created by the orchestrator at turn start (user message) and at
/// response-placeholder time (assistant message); mutated in place by
/// streaming callbacks and the finalization step. Never deleted
/// individually, only with its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Image the user attached to this message, as a displayable data reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_image: Option<MediaRef>,
    /// Generated image produced by this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_image: Option<MediaRef>,
    /// Generated video produced by this turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_video: Option<MediaRef>,
    /// Clip duration in seconds, for generated videos.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
    #[serde(default)]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<GroundingSource>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a user message, optionally carrying an attached image reference.
    pub fn user(content: impl Into<String>, input_image: Option<MediaRef>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            input_image,
            generated_image: None,
            generated_video: None,
            duration_secs: None,
            kind: ResultKind::Text,
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Creates an assistant message with the given initial content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: content.into(),
            input_image: None,
            generated_image: None,
            generated_video: None,
            duration_secs: None,
            kind: ResultKind::Text,
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// An ordered conversation owned by the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: SessionId,
    /// Display title, set once from the first user message and never recomputed.
    pub title: String,
    pub messages: Vec<Message>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Creates an empty session with the given display title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: SessionId::generate(),
            title: title.into(),
            messages: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Process-wide quota state.
///
/// Daily counters are valid only for the calendar day recorded in
/// `last_reset_date`; the quota tracker normalizes stale records before
/// any read. Records persisted by earlier revisions carry only the trial
/// counter and subscription flag -- the daily fields deserialize through
/// their defaults and are date-normalized on first check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub video_trial_count: u32,
    #[serde(default)]
    pub daily_video_count: u32,
    #[serde(default)]
    pub daily_image_count: u32,
    #[serde(default = "epoch_date")]
    pub last_reset_date: NaiveDate,
    pub is_subscribed: bool,
}

/// Sentinel date predating any real record; forces a reset on first check.
fn epoch_date() -> NaiveDate {
    NaiveDate::MIN
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            video_trial_count: 0,
            daily_video_count: 0,
            daily_image_count: 0,
            last_reset_date: epoch_date(),
            is_subscribed: false,
        }
    }
}

/// A file attached to a submission, not yet converted to a media reference.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Attachment {
    /// Converts the attachment into a displayable inline data reference.
    pub fn to_media_ref(&self) -> MediaRef {
        MediaRef::from_bytes(&self.mime_type, &self.bytes)
    }
}

/// Per-turn chat options toggled by the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatOptions {
    /// Enable web-search grounding for this turn.
    pub use_search: bool,
    /// Use the larger pro model instead of the fast one.
    pub use_pro: bool,
}

/// One event from a streaming chat completion.
///
/// Fragments arrive in accumulation order; the stream terminates with a
/// single `Done` carrying the authoritative full text and the grounding
/// sources collected while streaming (deduplicated by URI, first-seen
/// title wins).
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Fragment(String),
    Done {
        full_text: String,
        sources: Vec<GroundingSource>,
    },
}

/// A video generation request handed to the backend.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub prompt: String,
    pub aspect: AspectRatio,
    /// Existing clip to use as the seed for editing/extension.
    pub seed_video: Option<MediaRef>,
}

/// A finished video clip returned by the backend.
#[derive(Debug, Clone)]
pub struct VideoClip {
    pub media: MediaRef,
    pub duration_secs: u32,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterKind {
    Backend,
    Storage,
}
