// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent routing for the Varta chat core.
//!
//! Pure, zero-cost classification of user submissions into generation
//! paths, plus prompt cleanup for the media paths.

pub mod classifier;
pub mod prompt;

pub use classifier::{classify, Intent};
pub use prompt::{clean_media_prompt, DEFAULT_SCENE_PROMPT};
