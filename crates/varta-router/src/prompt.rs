// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media prompt cleanup.
//!
//! Strips command prefixes and request filler ("make a video of ...") from a
//! submission before it is handed to a generation model, leaving only the
//! scene description.

use std::sync::LazyLock;

use regex::Regex;

/// Fallback scene when cleanup leaves nothing usable.
pub const DEFAULT_SCENE_PROMPT: &str = "A beautiful scenic mountain landscape at sunrise";

/// Leading `/image` or `/video` command prefix.
static COMMAND_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^/(image|video)\s*").expect("static regex"));

/// Request filler: action/media words plus articles and connectives that
/// precede the actual scene description.
static REQUEST_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(generate|create|make|banao|show|dikhao|video|image|photo|picture|tasveer|chitra|chalchitra)\s+(a|an)?\s*(video|image|photo|picture)?\s*(of|about)?\s+",
    )
    .expect("static regex")
});

/// Curly-brace annotations and quote characters that confuse generation models.
static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)\{.*?\}|["']"#).expect("static regex"));

/// Reduce a submission to its scene description.
///
/// Returns [`DEFAULT_SCENE_PROMPT`] when nothing remains after cleanup.
pub fn clean_media_prompt(text: &str) -> String {
    let stripped = COMMAND_PREFIX.replace(text.trim(), "");
    let stripped = REQUEST_FILLER.replace_all(&stripped, "");
    let stripped = NOISE.replace_all(&stripped, "");
    let cleaned = stripped.trim();
    if cleaned.is_empty() {
        DEFAULT_SCENE_PROMPT.to_string()
    } else {
        cleaned.to_string()
    }
}
