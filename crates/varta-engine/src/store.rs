// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory session store with write-through persistence.
//!
//! The store exclusively owns all [`ChatSession`] and [`Message`] instances;
//! the presentation layer holds only snapshots. Every mutation bumps a watch
//! revision (for re-rendering) and is followed by a full rewrite of the
//! persisted session record. The one exception is the synchronous mutator
//! used by polling progress callbacks, which cannot await; its transient
//! status text is persisted by the next turn-level write.

use std::sync::Arc;
use std::sync::RwLock;

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use varta_core::types::{ChatSession, Message};
use varta_core::{MessageId, SessionId, StateStore, VartaError};

/// Maximum characters of the first user message used as the session title.
const TITLE_MAX_CHARS: usize = 30;

/// Owner of the in-memory session list, loaded once at startup.
pub struct SessionStore {
    sessions: RwLock<Vec<ChatSession>>,
    store: Arc<dyn StateStore>,
    revision: watch::Sender<u64>,
}

impl SessionStore {
    /// Loads the persisted session list from the state store.
    pub async fn load(store: Arc<dyn StateStore>) -> Result<Self, VartaError> {
        let sessions = store.load_sessions().await?;
        debug!(count = sessions.len(), "session list loaded");
        let (revision, _) = watch::channel(0);
        Ok(Self {
            sessions: RwLock::new(sessions),
            store,
            revision,
        })
    }

    /// Subscribe to mutation notifications. The value is a revision counter;
    /// observers re-read snapshots on change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Bumps the revision without mutating sessions (loading-flag changes).
    pub fn touch(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Snapshot of all sessions in display order.
    pub fn snapshot(&self) -> Vec<ChatSession> {
        self.sessions.read().expect("session lock").clone()
    }

    /// Snapshot of one session.
    pub fn session(&self, id: &SessionId) -> Option<ChatSession> {
        self.sessions
            .read()
            .expect("session lock")
            .iter()
            .find(|s| &s.id == id)
            .cloned()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions
            .read()
            .expect("session lock")
            .iter()
            .any(|s| &s.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().expect("session lock").is_empty()
    }

    /// Creates an empty session at the front of the list and persists.
    pub async fn create_front(&self, title: &str) -> Result<SessionId, VartaError> {
        let session = ChatSession::new(title);
        let id = session.id.clone();
        self.apply(|sessions| sessions.insert(0, session));
        self.persist().await?;
        Ok(id)
    }

    /// Removes a session and persists.
    pub async fn delete(&self, id: &SessionId) -> Result<(), VartaError> {
        let removed = self.apply(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| &s.id != id);
            before != sessions.len()
        });
        if !removed {
            return Err(VartaError::UnknownSession { id: id.to_string() });
        }
        self.persist().await
    }

    /// Appends a user message, deriving the session title from the first
    /// message. The title is set once and never recomputed.
    pub async fn push_user_message(
        &self,
        session_id: &SessionId,
        message: Message,
    ) -> Result<(), VartaError> {
        self.with_session(session_id, |session| {
            if session.messages.is_empty() {
                session.title = truncate_title(&message.content);
            }
            session.messages.push(message);
        })?;
        self.persist().await
    }

    /// Appends a message (assistant placeholder or finalized) and persists.
    pub async fn push_message(
        &self,
        session_id: &SessionId,
        message: Message,
    ) -> Result<(), VartaError> {
        self.with_session(session_id, |session| session.messages.push(message))?;
        self.persist().await
    }

    /// Mutates one message in place and persists.
    pub async fn update_message(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        mutate: impl FnOnce(&mut Message),
    ) -> Result<(), VartaError> {
        self.update_message_sync(session_id, message_id, mutate)?;
        self.persist().await
    }

    /// Mutates one message in memory only, bumping the revision. Used by
    /// streaming and polling callbacks that cannot await; the mutation is
    /// persisted by the next turn-level write.
    pub fn update_message_sync(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        mutate: impl FnOnce(&mut Message),
    ) -> Result<(), VartaError> {
        self.with_session(session_id, |session| {
            let Some(message) = session.messages.iter_mut().find(|m| &m.id == message_id) else {
                return Err(VartaError::UnknownMessage {
                    id: message_id.to_string(),
                });
            };
            mutate(message);
            Ok(())
        })?
    }

    /// Reads one message.
    pub fn message(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
    ) -> Result<Message, VartaError> {
        self.session(session_id)
            .ok_or_else(|| VartaError::UnknownSession {
                id: session_id.to_string(),
            })?
            .messages
            .iter()
            .find(|m| &m.id == message_id)
            .cloned()
            .ok_or_else(|| VartaError::UnknownMessage {
                id: message_id.to_string(),
            })
    }

    /// Removes the given message and every message after it, returning the
    /// removed target. Conversation history after this operation contains no
    /// trace of the truncated suffix.
    pub async fn truncate_from(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
    ) -> Result<Message, VartaError> {
        let removed = self.with_session(session_id, |session| {
            let Some(index) = session.messages.iter().position(|m| &m.id == message_id) else {
                return Err(VartaError::UnknownMessage {
                    id: message_id.to_string(),
                });
            };
            let removed = session.messages[index].clone();
            session.messages.truncate(index);
            Ok(removed)
        })??;
        self.persist().await?;
        Ok(removed)
    }

    /// Prior history for a generation call: all messages before `before`,
    /// keeping only terminal content.
    pub fn history_before(
        &self,
        session_id: &SessionId,
        before: &MessageId,
    ) -> Result<Vec<Message>, VartaError> {
        let session = self
            .session(session_id)
            .ok_or_else(|| VartaError::UnknownSession {
                id: session_id.to_string(),
            })?;
        let end = session
            .messages
            .iter()
            .position(|m| &m.id == before)
            .unwrap_or(session.messages.len());
        Ok(session.messages[..end].to_vec())
    }

    /// Count of messages that carry real conversation content (placeholders
    /// excluded by the caller having finalized them).
    pub fn message_count(&self, session_id: &SessionId) -> Result<usize, VartaError> {
        Ok(self
            .session(session_id)
            .ok_or_else(|| VartaError::UnknownSession {
                id: session_id.to_string(),
            })?
            .messages
            .len())
    }

    /// Runs a closure against one session under the write lock, stamping
    /// `updated_at` and bumping the revision.
    fn with_session<R>(
        &self,
        session_id: &SessionId,
        f: impl FnOnce(&mut ChatSession) -> R,
    ) -> Result<R, VartaError> {
        let result = {
            let mut sessions = self.sessions.write().expect("session lock");
            let Some(session) = sessions.iter_mut().find(|s| &s.id == session_id) else {
                return Err(VartaError::UnknownSession {
                    id: session_id.to_string(),
                });
            };
            let result = f(session);
            session.updated_at = Utc::now();
            result
        };
        self.revision.send_modify(|r| *r += 1);
        Ok(result)
    }

    fn apply<R>(&self, f: impl FnOnce(&mut Vec<ChatSession>) -> R) -> R {
        let result = f(&mut self.sessions.write().expect("session lock"));
        self.revision.send_modify(|r| *r += 1);
        result
    }

    /// Rewrites the full persisted session record.
    async fn persist(&self) -> Result<(), VartaError> {
        let snapshot = self.snapshot();
        self.store.save_sessions(&snapshot).await
    }
}

/// Derives a session title from the first user message, truncated on a
/// char boundary.
fn truncate_title(content: &str) -> String {
    let title: String = content.chars().take(TITLE_MAX_CHARS).collect();
    if title.is_empty() {
        super::notices::DEFAULT_SESSION_TITLE.to_string()
    } else {
        title
    }
}
