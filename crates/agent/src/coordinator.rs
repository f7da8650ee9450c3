//! Conversation coordinator: serializes turns per conversation, enforces the
//! turn deadline, persists state between turns, and makes terminal replies
//! idempotent for a short replay window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

use finda_core::{ApplicationError, CatalogQuery, TurnState};
use finda_db::{ConversationStore, RepositoryError};

use crate::engine::TurnEngine;
use crate::extractor::ConstraintExtractor;
use crate::replies::TurnReply;

#[derive(Clone, Copy, Debug)]
pub struct CoordinatorSettings {
    /// Deadline for one full turn, extraction included.
    pub turn_timeout: Duration,
    /// How long a terminal reply stays replayable after the state is deleted.
    pub completed_ttl: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self { turn_timeout: Duration::from_secs(25), completed_ttl: Duration::from_secs(60) }
    }
}

pub struct Coordinator<Q, E> {
    engine: TurnEngine<Q, E>,
    store: Arc<dyn ConversationStore>,
    settings: CoordinatorSettings,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    completed: Mutex<HashMap<String, (Instant, TurnReply)>>,
}

impl<Q, E> Coordinator<Q, E>
where
    Q: CatalogQuery,
    E: ConstraintExtractor,
{
    pub fn new(
        engine: TurnEngine<Q, E>,
        store: Arc<dyn ConversationStore>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            engine,
            store,
            settings,
            locks: Mutex::new(HashMap::new()),
            completed: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one inbound message end to end. Engine faults and deadline
    /// overruns leave the stored state untouched and come back as a retryable
    /// user-facing reply.
    pub async fn handle_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<TurnReply, ApplicationError> {
        if let Some(reply) = self.replay_completed(conversation_id).await {
            tracing::info!(event = "completed_reply_replayed", conversation_id);
            return Ok(reply);
        }

        let lock = self.conversation_lock(conversation_id).await;
        let _guard = lock.lock().await;

        // A duplicate that queued behind a finalizing turn finds the state
        // deleted; the reply it must replay landed in the cache while it was
        // waiting, so the cache is checked again under the lock.
        if let Some(reply) = self.replay_completed(conversation_id).await {
            tracing::info!(event = "completed_reply_replayed", conversation_id);
            return Ok(reply);
        }

        let correlation_id = Uuid::new_v4();
        let snapshot = self
            .store
            .load(conversation_id)
            .await
            .map_err(persistence_error)?
            .unwrap_or_else(|| TurnState::new(conversation_id));
        let turn_index = snapshot.turn_index;

        let outcome =
            match tokio::time::timeout(self.settings.turn_timeout, self.engine.run_turn(snapshot, text))
                .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(error)) => {
                    tracing::error!(
                        event = "turn_failed",
                        conversation_id,
                        turn_index,
                        %correlation_id,
                        error = %error,
                    );
                    return Ok(TurnReply::text(error.user_message()));
                }
                Err(_) => {
                    let error = ApplicationError::Timeout {
                        elapsed_secs: self.settings.turn_timeout.as_secs(),
                    };
                    tracing::error!(
                        event = "turn_timed_out",
                        conversation_id,
                        turn_index,
                        %correlation_id,
                    );
                    return Ok(TurnReply::text(error.user_message()));
                }
            };

        if outcome.state.is_terminal() {
            self.store.delete(conversation_id).await.map_err(persistence_error)?;
            self.remember_completed(conversation_id, outcome.reply.clone()).await;
            self.forget_lock(conversation_id, &lock).await;
            tracing::info!(
                event = "conversation_completed",
                conversation_id,
                turn_index = outcome.state.turn_index,
                stop_reason = ?outcome.state.stop_reason,
                %correlation_id,
            );
        } else {
            self.store.save(outcome.state.clone()).await.map_err(persistence_error)?;
            tracing::info!(
                event = "turn_completed",
                conversation_id,
                turn_index = outcome.state.turn_index,
                candidate_count = outcome.state.candidate_count,
                awaiting_selection = outcome.state.awaiting_selection,
                %correlation_id,
            );
        }

        Ok(outcome.reply)
    }

    /// Whether the conversation ended recently enough to still be in the
    /// replay window. Lets a caller driving a single conversation stop its
    /// read loop.
    pub async fn is_completed(&self, conversation_id: &str) -> bool {
        self.replay_completed(conversation_id).await.is_some()
    }

    async fn conversation_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(conversation_id.to_string()).or_default().clone()
    }

    /// Drops the lock entry for a finished conversation, but only while no
    /// other handler holds a clone of it. A contended entry stays in the map
    /// so queued duplicates keep serializing on the same mutex.
    async fn forget_lock(&self, conversation_id: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // Two strong handles when uncontended: the map's entry and ours.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(conversation_id);
        }
    }

    async fn replay_completed(&self, conversation_id: &str) -> Option<TurnReply> {
        let mut completed = self.completed.lock().await;
        completed.retain(|_, (stored_at, _)| stored_at.elapsed() < self.settings.completed_ttl);
        completed.get(conversation_id).map(|(_, reply)| reply.clone())
    }

    async fn remember_completed(&self, conversation_id: &str, reply: TurnReply) {
        let mut completed = self.completed.lock().await;
        completed.retain(|_, (stored_at, _)| stored_at.elapsed() < self.settings.completed_ttl);
        completed.insert(conversation_id.to_string(), (Instant::now(), reply));
    }
}

fn persistence_error(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
