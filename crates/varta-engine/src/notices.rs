// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notice text for terminal turn states.
//!
//! Every failure path leaves exactly one assistant message with
//! human-readable content; the sentinel below is never a terminal state.

use varta_core::types::AspectRatio;

/// Sentinel placeholder content while a turn is in flight.
pub const THINKING: &str = "Varta is thinking...";

/// Default title for a freshly created session.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Default prompt when an image is attached with no text.
pub const ANALYSIS_DEFAULT_PROMPT: &str = "Describe this image in detail.";

/// Fallback when analysis returns nothing or fails; non-fatal to the turn.
pub const ANALYSIS_FAILED: &str = "Image analysis failed.";

/// Daily image cap reached; the backend is never called.
pub const IMAGE_QUOTA_EXCEEDED: &str =
    "Daily free image limit reached. Upgrade to Premium for unlimited images.";

/// Daily video cap reached; distinct wording from the image case.
pub const VIDEO_QUOTA_EXCEEDED: &str =
    "Daily free video trial finished for today. Upgrade to Premium for unlimited 3D videos.";

/// Image generation returned no result; counter is not incremented.
pub const IMAGE_FAILED: &str = "The image did not come through. Please try again.";

/// Video generation finished without media; counter is not incremented.
pub const VIDEO_FAILED: &str = "Video rendering failed. Please try again.";

/// Fresh video generation completed.
pub const VIDEO_READY: &str = "Your 15s cinematic clip is ready!";

/// Video edit completed.
pub const VIDEO_EDIT_READY: &str = "Edit complete! Your vision has been updated.";

/// The backend rejected the current credential; a new key must be selected
/// before retrying. The turn is not retried automatically.
pub const KEY_RESET: &str =
    "A paid API key is required for video generation. Please select your key and try again.";

/// Generic backend failure notice.
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong on our side. Please try again.";

/// Summarization returned nothing or failed.
pub const SUMMARY_FAILED: &str = "Summary could not be generated.";

/// Image generation completed, naming the rendered aspect ratio.
pub fn image_ready(aspect: AspectRatio) -> String {
    format!("Your photo is ready ({aspect}).")
}

/// Overwrites the placeholder on every video poll with elapsed-time status.
pub fn video_progress(elapsed_secs: u64) -> String {
    format!("Rendering your vision... {elapsed_secs}s elapsed. Great things take time!")
}
