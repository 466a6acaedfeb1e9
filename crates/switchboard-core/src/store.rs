//! Transcript Persistence
//!
//! Contract for the external document store that keeps transcripts between
//! turns, plus an in-memory implementation for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::message::Transcript;

/// Opaque conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transcript store trait for persistence
///
/// Callers must not run two turns for the same conversation concurrently;
/// the store does no read-modify-write locking of its own.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Load a transcript, `None` if the id is unknown
    async fn load(&self, id: &ConversationId) -> Result<Option<Transcript>>;

    /// Persist a new conversation and allocate its id
    async fn create(&self, initial: &Transcript) -> Result<ConversationId>;

    /// Overwrite the transcript of an existing conversation
    async fn save(&self, id: &ConversationId, transcript: &Transcript) -> Result<()>;
}

/// In-memory transcript store (for development/testing)
#[derive(Default)]
pub struct MemoryTranscriptStore {
    transcripts: RwLock<HashMap<ConversationId, Transcript>>,
}

impl MemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.transcripts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.transcripts.read().await.is_empty()
    }
}

#[async_trait]
impl TranscriptStore for MemoryTranscriptStore {
    async fn load(&self, id: &ConversationId) -> Result<Option<Transcript>> {
        Ok(self.transcripts.read().await.get(id).cloned())
    }

    async fn create(&self, initial: &Transcript) -> Result<ConversationId> {
        let id = ConversationId::new();
        self.transcripts
            .write()
            .await
            .insert(id.clone(), initial.clone());
        tracing::debug!(conversation = %id, "Created conversation");
        Ok(id)
    }

    async fn save(&self, id: &ConversationId, transcript: &Transcript) -> Result<()> {
        self.transcripts
            .write()
            .await
            .insert(id.clone(), transcript.clone());
        Ok(())
    }
}
