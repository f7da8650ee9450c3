use async_trait::async_trait;
use thiserror::Error;

use finda_core::TurnState;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Key-value store for per-conversation turn state. The coordinator deletes
/// the entry the moment a terminal stop reason is set.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Result<Option<TurnState>, RepositoryError>;
    async fn save(&self, state: TurnState) -> Result<(), RepositoryError>;
    async fn delete(&self, conversation_id: &str) -> Result<(), RepositoryError>;
}
