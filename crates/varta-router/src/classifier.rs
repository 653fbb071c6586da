// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic intent classification for user submissions.
//!
//! Classifies a submission into one of four generation paths using
//! zero-cost term-set scans. No LLM pre-call, no network, no latency.
//! Classification is a pure function of the submission text and the
//! presence of an attachment -- conversation history never influences it.

/// Generation path requested by a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Long-running video generation.
    VideoGeneration,
    /// One-shot image generation.
    ImageGeneration,
    /// Describe an attached image.
    ImageAnalysis,
    /// Plain streaming chat.
    Chat,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intent::VideoGeneration => write!(f, "video-generation"),
            Intent::ImageGeneration => write!(f, "image-generation"),
            Intent::ImageAnalysis => write!(f, "image-analysis"),
            Intent::Chat => write!(f, "chat"),
        }
    }
}

/// Video-like terms (contains, case-insensitive), including Hindi equivalents.
const VIDEO_TERMS: &[&str] = &["video", "animation", "movie", "chalchitra", "film", "clip"];

/// Image-like terms (contains, case-insensitive), including Hindi equivalents.
const IMAGE_TERMS: &[&str] = &[
    "image", "photo", "picture", "tasveer", "chitra", "drawing", "portrait",
];

/// Action terms that signal a generation request when paired with a bare
/// mention of a media word.
const ACTION_TERMS: &[&str] = &[
    "make", "create", "banao", "dikhao", "generate", "show", "draw",
];

/// Explicit command prefix forcing the video path.
const VIDEO_PREFIX: &str = "/video";

/// Explicit command prefix forcing the image path.
const IMAGE_PREFIX: &str = "/image";

/// Classify a submission into its generation path.
///
/// Video is checked strictly before image: a prompt matching both term
/// sets takes the video path. This ordering determines which quota is
/// charged and must be preserved.
pub fn classify(text: &str, has_attachment: bool) -> Intent {
    let lower = text.trim().to_lowercase();

    let is_video =
        lower.starts_with(VIDEO_PREFIX) || VIDEO_TERMS.iter().any(|t| lower.contains(t));
    if is_video {
        return Intent::VideoGeneration;
    }

    let is_image =
        lower.starts_with(IMAGE_PREFIX) || IMAGE_TERMS.iter().any(|t| lower.contains(t));
    let has_action = ACTION_TERMS.iter().any(|t| lower.contains(t));
    if is_image || (has_action && (lower.contains("video") || lower.contains("photo"))) {
        return Intent::ImageGeneration;
    }

    if has_attachment {
        return Intent::ImageAnalysis;
    }

    Intent::Chat
}
