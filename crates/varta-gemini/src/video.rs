// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running video operation state machine.
//!
//! The operation is modeled as an explicit tagged state stepped by a poll
//! driver: `Submitted -> Polling{elapsed} -> Done{uri} | Failed{reason}`.
//! While incomplete, the driver waits a fixed interval, invokes the progress
//! callback with elapsed time, and polls again. The driver itself imposes no
//! upper bound on iterations; the backend operation is trusted to terminate.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use varta_core::traits::backend::ProgressFn;
use varta_core::VartaError;

use crate::types::Operation;

/// States of a long-running video operation as observed by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoPhase {
    /// Operation accepted, no poll has completed yet.
    Submitted,
    /// Last poll reported the operation incomplete.
    Polling { elapsed: Duration },
    /// Operation finished with a retrievable media locator.
    Done { uri: String },
    /// Operation finished without media, or reported an error.
    Failed { reason: String },
}

impl VideoPhase {
    /// Maps a completed operation to its terminal phase. Returns `None`
    /// while the operation is still running.
    pub fn terminal(op: &Operation) -> Option<VideoPhase> {
        if !op.done {
            return None;
        }
        if let Some(err) = &op.error {
            return Some(VideoPhase::Failed {
                reason: err.message.clone(),
            });
        }
        let uri = op
            .response
            .as_ref()
            .and_then(|r| r.generated_videos.first())
            .and_then(|v| v.video.as_ref())
            .map(|v| v.uri.clone());
        Some(match uri {
            Some(uri) => VideoPhase::Done { uri },
            None => VideoPhase::Failed {
                reason: "operation completed without a media locator".to_string(),
            },
        })
    }
}

/// Source of operation status, abstracted so the driver is testable with a
/// scripted fake.
#[async_trait]
pub trait OperationSource: Send + Sync {
    /// Fetches the current state of the operation by resource name.
    async fn poll(&self, name: &str) -> Result<Operation, VartaError>;
}

/// Drives a submitted operation to a terminal phase.
///
/// Errors from the source (including [`VartaError::KeyReset`]) propagate to
/// the caller; a completed operation without media becomes
/// [`VideoPhase::Failed`], not an error.
pub async fn drive_operation(
    source: &dyn OperationSource,
    submitted: Operation,
    interval: Duration,
    on_progress: ProgressFn<'_>,
) -> Result<VideoPhase, VartaError> {
    let started = Instant::now();
    let mut op = submitted;

    loop {
        if let Some(terminal) = VideoPhase::terminal(&op) {
            debug!(name = %op.name, ?terminal, "video operation reached terminal phase");
            return Ok(terminal);
        }

        let elapsed = started.elapsed();
        on_progress(elapsed.as_secs());
        tokio::time::sleep(interval).await;

        op = source.poll(&op.name).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::types::{GeneratedVideo, OperationError, OperationResponse, VideoFile};

    /// Scripted operation source popping states from a FIFO queue.
    struct ScriptedSource {
        states: Mutex<VecDeque<Result<Operation, VartaError>>>,
    }

    impl ScriptedSource {
        fn new(states: Vec<Result<Operation, VartaError>>) -> Self {
            Self {
                states: Mutex::new(VecDeque::from(states)),
            }
        }
    }

    #[async_trait]
    impl OperationSource for ScriptedSource {
        async fn poll(&self, _name: &str) -> Result<Operation, VartaError> {
            self.states
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted")
        }
    }

    fn pending(name: &str) -> Operation {
        Operation {
            name: name.to_string(),
            done: false,
            response: None,
            error: None,
        }
    }

    fn done_with_uri(name: &str, uri: &str) -> Operation {
        Operation {
            name: name.to_string(),
            done: true,
            response: Some(OperationResponse {
                generated_videos: vec![GeneratedVideo {
                    video: Some(VideoFile {
                        uri: uri.to_string(),
                    }),
                }],
            }),
            error: None,
        }
    }

    fn done_empty(name: &str) -> Operation {
        Operation {
            name: name.to_string(),
            done: true,
            response: Some(OperationResponse {
                generated_videos: vec![],
            }),
            error: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_done_and_reports_progress() {
        let source = ScriptedSource::new(vec![
            Ok(pending("op")),
            Ok(done_with_uri("op", "https://dl.example/v.mp4")),
        ]);
        let ticks = Mutex::new(Vec::new());

        let phase = drive_operation(
            &source,
            pending("op"),
            Duration::from_secs(8),
            &|elapsed| ticks.lock().unwrap().push(elapsed),
        )
        .await
        .unwrap();

        assert_eq!(
            phase,
            VideoPhase::Done {
                uri: "https://dl.example/v.mp4".to_string()
            }
        );
        // One progress tick per incomplete poll, with monotonic elapsed time.
        let ticks = ticks.lock().unwrap();
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0], 0);
        assert!(ticks[1] >= 8);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_completion_skips_progress() {
        let source = ScriptedSource::new(vec![]);
        let ticks = Mutex::new(Vec::new());

        let phase = drive_operation(
            &source,
            done_with_uri("op", "https://dl.example/v.mp4"),
            Duration::from_secs(8),
            &|elapsed| ticks.lock().unwrap().push(elapsed),
        )
        .await
        .unwrap();

        assert!(matches!(phase, VideoPhase::Done { .. }));
        assert!(ticks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn completion_without_media_is_failed() {
        let source = ScriptedSource::new(vec![Ok(done_empty("op"))]);
        let phase = drive_operation(&source, pending("op"), Duration::from_secs(8), &|_| {})
            .await
            .unwrap();
        assert!(matches!(phase, VideoPhase::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn operation_error_is_failed_with_reason() {
        let mut op = pending("op");
        op.done = true;
        op.error = Some(OperationError {
            code: 13,
            message: "render backend crashed".to_string(),
        });
        let source = ScriptedSource::new(vec![]);
        let phase = drive_operation(&source, op, Duration::from_secs(8), &|_| {})
            .await
            .unwrap();
        assert_eq!(
            phase,
            VideoPhase::Failed {
                reason: "render backend crashed".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn key_reset_from_poll_propagates() {
        let source = ScriptedSource::new(vec![Err(VartaError::KeyReset)]);
        let err = drive_operation(&source, pending("op"), Duration::from_secs(8), &|_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, VartaError::KeyReset));
    }
}
