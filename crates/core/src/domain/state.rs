use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::details::{FieldSlot, MemberDetails};
use crate::domain::member::CandidatePreview;

/// Terminal outcome tags. Setting one ends the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FoundUniqueMember,
    MaxTurnsReached,
    UserCancelled,
    RelaxationFailed,
    RouterFallback,
}

/// Per-conversation dialogue state, persisted between turns and destroyed the
/// moment a terminal stop reason is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    pub conversation_id: String,
    /// 1-based; advances on every action except an unresolved selection attempt.
    pub turn_index: u32,
    pub details: MemberDetails,
    pub asked_questions: BTreeSet<FieldSlot>,
    /// Slot of the question asked last turn, if any. Lets the extractor
    /// resolve a dismissal ("doesn't matter") to the right slot.
    pub pending_question: Option<FieldSlot>,
    pub candidate_count: u64,
    /// Top-K preview of the last search, kept for numeric selection.
    pub candidates: Vec<CandidatePreview>,
    pub awaiting_selection: bool,
    pub stop_reason: Option<StopReason>,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TurnState {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            turn_index: 1,
            details: MemberDetails::default(),
            asked_questions: BTreeSet::new(),
            pending_question: None,
            candidate_count: 0,
            candidates: Vec::new(),
            awaiting_selection: false,
            stop_reason: None,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stop_reason.is_some()
    }

    pub fn advance_turn(&mut self) {
        self.turn_index += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::{StopReason, TurnState};

    #[test]
    fn new_state_starts_at_turn_one_and_is_not_terminal() {
        let state = TurnState::new("conv-1");
        assert_eq!(state.turn_index, 1);
        assert!(!state.is_terminal());
        assert!(!state.awaiting_selection);
        assert!(state.candidates.is_empty());
    }

    #[test]
    fn stop_reason_marks_state_terminal() {
        let mut state = TurnState::new("conv-1");
        state.stop_reason = Some(StopReason::FoundUniqueMember);
        assert!(state.is_terminal());
    }

    #[test]
    fn advance_turn_increments_index_and_touches_timestamp() {
        let mut state = TurnState::new("conv-1");
        let before = state.updated_at;
        state.advance_turn();
        assert_eq!(state.turn_index, 2);
        assert!(state.updated_at >= before);
    }
}
