//! Turn engine: the deterministic pipeline that maps one inbound message to
//! an updated turn state and a reply.
//!
//! The pipeline for a regular message is extract, merge, search, relax on
//! zero results, then decide. A message that answers a presented option list
//! is resolved by numeral instead; an unresolved selection attempt re-prompts
//! without consuming a turn.

use finda_core::{
    apply, decide, parse_selection, run_ladder, ApplicationError, CatalogQuery, ExtractionContext,
    ExtractionIntent, PolicyConfig, SelectionOutcome, StopReason, TurnAction, TurnState,
};

use crate::extractor::ConstraintExtractor;
use crate::replies::{self, TurnReply};

pub struct TurnEngine<Q, E> {
    catalog: Q,
    extractor: E,
    policy: PolicyConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub state: TurnState,
    pub reply: TurnReply,
}

impl<Q, E> TurnEngine<Q, E>
where
    Q: CatalogQuery,
    E: ConstraintExtractor,
{
    pub fn new(catalog: Q, extractor: E, policy: PolicyConfig) -> Self {
        Self { catalog, extractor, policy }
    }

    pub async fn run_turn(
        &self,
        state: TurnState,
        text: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        if state.awaiting_selection {
            self.resolve_selection(state, text).await
        } else {
            self.resolve_message(state, text).await
        }
    }

    async fn resolve_selection(
        &self,
        mut state: TurnState,
        text: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        match parse_selection(text, state.candidates.len()) {
            SelectionOutcome::Chosen(index) => {
                let candidate = state.candidates[index].clone();
                state.awaiting_selection = false;
                state.stop_reason = Some(StopReason::FoundUniqueMember);
                state.advance_turn();
                let reply = TurnReply {
                    message: replies::render_confirmation(
                        &candidate,
                        StopReason::FoundUniqueMember,
                    ),
                    selected_member_id: Some(candidate.member_id),
                };
                Ok(TurnOutcome { state, reply })
            }
            SelectionOutcome::NoNumeral => {
                // The reply might be a cancellation rather than a bad pick.
                let context = self.context_of(&state);
                let extraction = self.extractor.extract(text, &context).await;
                if extraction.intent == ExtractionIntent::Cancel {
                    return Ok(Self::cancelled(state));
                }
                Ok(Self::reprompt(state))
            }
            SelectionOutcome::OutOfRange(_) => Ok(Self::reprompt(state)),
        }
    }

    async fn resolve_message(
        &self,
        mut state: TurnState,
        text: &str,
    ) -> Result<TurnOutcome, ApplicationError> {
        let context = self.context_of(&state);
        let extraction = self.extractor.extract(text, &context).await;

        match extraction.intent {
            ExtractionIntent::Cancel => return Ok(Self::cancelled(state)),
            ExtractionIntent::OutOfScope => {
                state.stop_reason = Some(StopReason::RouterFallback);
                state.advance_turn();
                let reply = TurnReply::text(replies::out_of_scope_text());
                return Ok(TurnOutcome { state, reply });
            }
            ExtractionIntent::Refine => {}
        }

        let mut details = apply(&state.details, &extraction.delta);
        state.pending_question = None;

        let mut result = self.catalog.search(&details, self.policy.top_k).await?;
        let mut disclosure = String::new();
        if result.total_count == 0 {
            let outcome = run_ladder(&self.catalog, &details, self.policy.top_k).await?;
            if outcome.result.total_count > 0 {
                disclosure = replies::render_relaxation(&outcome.applied);
                details = outcome.details;
                result = outcome.result;
            }
        }

        let action = decide(state.turn_index, &details, &state.asked_questions, &result, &self.policy);

        state.candidate_count = result.total_count;
        state.candidates = result.candidates.iter().map(|candidate| candidate.preview()).collect();
        state.summary = details.summary.clone();
        state.details = details;

        let reply = match action {
            TurnAction::Finalize { candidate, reason } => {
                state.stop_reason = Some(reason);
                TurnReply {
                    message: with_disclosure(
                        &disclosure,
                        &replies::render_confirmation(&candidate, reason),
                    ),
                    selected_member_id: Some(candidate.member_id),
                }
            }
            TurnAction::PresentOptions { candidates } => {
                state.awaiting_selection = true;
                state.candidates = candidates.clone();
                TurnReply::text(with_disclosure(&disclosure, &replies::render_options(&candidates)))
            }
            TurnAction::AskQuestion { slot } => {
                state.asked_questions.insert(slot);
                state.pending_question = Some(slot);
                TurnReply::text(with_disclosure(&disclosure, replies::question_text(slot)))
            }
            TurnAction::NoMatch => {
                state.stop_reason = Some(StopReason::RelaxationFailed);
                TurnReply::text(replies::no_match_text())
            }
        };

        state.advance_turn();
        Ok(TurnOutcome { state, reply })
    }

    fn context_of(&self, state: &TurnState) -> ExtractionContext {
        ExtractionContext {
            summary: state.details.summary.clone(),
            pending_question: state.pending_question,
        }
    }

    fn cancelled(mut state: TurnState) -> TurnOutcome {
        state.awaiting_selection = false;
        state.stop_reason = Some(StopReason::UserCancelled);
        state.advance_turn();
        TurnOutcome { state, reply: TurnReply::text(replies::cancelled_text()) }
    }

    /// Unresolved selection attempt: re-list the options, keep the turn index.
    fn reprompt(state: TurnState) -> TurnOutcome {
        let message = format!(
            "{}\n{}",
            replies::reprompt_text(state.candidates.len()),
            replies::render_options(&state.candidates)
        );
        TurnOutcome { state, reply: TurnReply::text(message) }
    }
}

fn with_disclosure(disclosure: &str, body: &str) -> String {
    if disclosure.is_empty() {
        body.to_string()
    } else {
        format!("{disclosure}\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use finda_core::{Lexicon, PolicyConfig, StopReason, TurnState};
    use finda_db::{demo_lexicon, demo_offers, InMemoryCatalogQuery};

    use super::TurnEngine;
    use crate::extractor::RuleBasedExtractor;

    fn engine() -> TurnEngine<InMemoryCatalogQuery, RuleBasedExtractor> {
        TurnEngine::new(
            InMemoryCatalogQuery::new(demo_offers()),
            RuleBasedExtractor::new(demo_lexicon()),
            PolicyConfig::default(),
        )
    }

    #[tokio::test]
    async fn broad_message_asks_a_clarifying_question() {
        let outcome = engine()
            .run_turn(TurnState::new("conv-1"), "I want a kettle")
            .await
            .expect("turn");

        assert_eq!(outcome.state.turn_index, 2);
        assert!(outcome.state.pending_question.is_some());
        assert!(!outcome.state.awaiting_selection);
        assert!(outcome.state.details.keywords.contains(&"kettle".to_string()));
        assert!(outcome.reply.message.ends_with('?'));
    }

    #[tokio::test]
    async fn unique_match_finalizes_immediately() {
        let outcome = engine()
            .run_turn(TurnState::new("conv-1"), "a Pars kettle in Tehran")
            .await
            .expect("turn");

        assert_eq!(outcome.state.stop_reason, Some(StopReason::FoundUniqueMember));
        assert!(outcome.reply.selected_member_id.is_some());
    }

    #[tokio::test]
    async fn empty_catalog_exhausts_relaxation() {
        let engine = TurnEngine::new(
            InMemoryCatalogQuery::new(Vec::new()),
            RuleBasedExtractor::new(Lexicon::default()),
            PolicyConfig::default(),
        );
        let outcome = engine.run_turn(TurnState::new("conv-1"), "kettle").await.expect("turn");

        assert_eq!(outcome.state.stop_reason, Some(StopReason::RelaxationFailed));
    }

    #[tokio::test]
    async fn cancellation_is_terminal() {
        let outcome =
            engine().run_turn(TurnState::new("conv-1"), "forget it, cancel").await.expect("turn");
        assert_eq!(outcome.state.stop_reason, Some(StopReason::UserCancelled));
    }
}
