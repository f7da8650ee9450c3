use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use finda_core::search::{CatalogQuery, SearchError, SearchResult};
use finda_core::{build_search_result, matches_filters, MemberDetails, MemberOffer, RankingWeights, TurnState};

use crate::store::{ConversationStore, RepositoryError};

/// Catalog engine over an in-process offer list. Shares the filter predicate
/// and ranking with the SQL engine, so both order candidates identically.
pub struct InMemoryCatalogQuery {
    offers: Vec<MemberOffer>,
    weights: RankingWeights,
}

impl InMemoryCatalogQuery {
    pub fn new(offers: Vec<MemberOffer>) -> Self {
        Self { offers, weights: RankingWeights::default() }
    }

    pub fn with_weights(offers: Vec<MemberOffer>, weights: RankingWeights) -> Self {
        Self { offers, weights }
    }
}

#[async_trait]
impl CatalogQuery for InMemoryCatalogQuery {
    async fn search(
        &self,
        details: &MemberDetails,
        top_k: usize,
    ) -> Result<SearchResult, SearchError> {
        let matching: Vec<MemberOffer> = self
            .offers
            .iter()
            .filter(|offer| matches_filters(offer, details))
            .cloned()
            .collect();
        Ok(build_search_result(matching, details, top_k, &self.weights))
    }
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    states: RwLock<HashMap<String, TurnState>>,
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, conversation_id: &str) -> Result<Option<TurnState>, RepositoryError> {
        let states = self.states.read().await;
        Ok(states.get(conversation_id).cloned())
    }

    async fn save(&self, state: TurnState) -> Result<(), RepositoryError> {
        let mut states = self.states.write().await;
        states.insert(state.conversation_id.clone(), state);
        Ok(())
    }

    async fn delete(&self, conversation_id: &str) -> Result<(), RepositoryError> {
        let mut states = self.states.write().await;
        states.remove(conversation_id);
        Ok(())
    }
}
