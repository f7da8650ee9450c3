//! Dialogue policy: decides the next action for a turn.

pub mod questions;
pub mod selection;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::details::{FieldSlot, MemberDetails};
use crate::domain::member::CandidatePreview;
use crate::domain::state::StopReason;
use crate::search::SearchResult;

pub use questions::{next_question, QUESTION_BANK};
pub use selection::{normalize_digits, parse_selection, SelectionOutcome};

/// Fixed policy constants. Tunable at build/config time, never learned.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Hard turn budget; the last allowed turn force-picks the top candidate.
    pub max_turns: u32,
    /// At or below this count, candidates are presented for numeric selection.
    pub presentation_threshold: u64,
    /// Number of candidates previewed and presented.
    pub top_k: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { max_turns: 5, presentation_threshold: 5, top_k: 5 }
    }
}

/// Next action for a non-selection turn, decided from the (possibly relaxed)
/// result set and the turn index.
#[derive(Clone, Debug, PartialEq)]
pub enum TurnAction {
    Finalize { candidate: CandidatePreview, reason: StopReason },
    PresentOptions { candidates: Vec<CandidatePreview> },
    AskQuestion { slot: FieldSlot },
    NoMatch,
}

pub fn decide(
    turn_index: u32,
    details: &MemberDetails,
    asked_questions: &BTreeSet<FieldSlot>,
    result: &SearchResult,
    config: &PolicyConfig,
) -> TurnAction {
    let previews: Vec<CandidatePreview> =
        result.candidates.iter().map(|candidate| candidate.preview()).collect();

    if result.total_count == 0 {
        return TurnAction::NoMatch;
    }
    // A positive count with no candidates means the catalog lied; treat it
    // as no match rather than finalizing on nothing.
    let Some(top) = previews.first().cloned() else {
        return TurnAction::NoMatch;
    };

    if result.total_count == 1 {
        return TurnAction::Finalize { candidate: top, reason: StopReason::FoundUniqueMember };
    }
    if turn_index >= config.max_turns {
        return TurnAction::Finalize { candidate: top, reason: StopReason::MaxTurnsReached };
    }

    match next_question(details, asked_questions) {
        Some(slot) if result.total_count > config.presentation_threshold => {
            TurnAction::AskQuestion { slot }
        }
        _ => TurnAction::PresentOptions { candidates: previews },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{decide, PolicyConfig, TurnAction, QUESTION_BANK};
    use crate::domain::details::{FieldSlot, MemberDetails};
    use crate::domain::member::{BaseProductId, MemberId, MemberOffer, RankedCandidate};
    use crate::domain::state::StopReason;
    use crate::search::SearchResult;

    fn result_with(count: u64) -> SearchResult {
        let candidates = (0..count.min(5))
            .map(|index| RankedCandidate {
                offer: MemberOffer {
                    id: MemberId(format!("m-{index}")),
                    base_product_id: BaseProductId("bp-1".to_string()),
                    name: format!("Offer {index}"),
                    description: String::new(),
                    brand: "Pars".to_string(),
                    category: "kitchen".to_string(),
                    city: "Tehran".to_string(),
                    price: 1_000 + index as i64,
                    shop_score: 4.0,
                    has_warranty: true,
                    attributes: Default::default(),
                },
                relevance: 1.0 - index as f64 * 0.1,
            })
            .collect();
        SearchResult { total_count: count, candidates, distributions: Default::default() }
    }

    #[test]
    fn zero_results_report_no_match() {
        let action = decide(
            1,
            &MemberDetails::default(),
            &BTreeSet::new(),
            &result_with(0),
            &PolicyConfig::default(),
        );
        assert_eq!(action, TurnAction::NoMatch);
    }

    #[test]
    fn count_without_candidates_degrades_to_no_match() {
        let inconsistent =
            SearchResult { total_count: 3, candidates: Vec::new(), distributions: Default::default() };
        let action = decide(
            1,
            &MemberDetails::default(),
            &BTreeSet::new(),
            &inconsistent,
            &PolicyConfig::default(),
        );
        assert_eq!(action, TurnAction::NoMatch);
    }

    #[test]
    fn unique_result_finalizes() {
        let action = decide(
            1,
            &MemberDetails::default(),
            &BTreeSet::new(),
            &result_with(1),
            &PolicyConfig::default(),
        );
        assert!(matches!(
            action,
            TurnAction::Finalize { reason: StopReason::FoundUniqueMember, .. }
        ));
    }

    #[test]
    fn turn_budget_forces_top_pick_even_with_many_candidates() {
        let action = decide(
            5,
            &MemberDetails::default(),
            &BTreeSet::new(),
            &result_with(40),
            &PolicyConfig::default(),
        );
        match action {
            TurnAction::Finalize { candidate, reason } => {
                assert_eq!(reason, StopReason::MaxTurnsReached);
                assert_eq!(candidate.member_id, MemberId("m-0".to_string()));
            }
            other => panic!("expected finalize, got {other:?}"),
        }
    }

    #[test]
    fn small_result_sets_present_options() {
        let action = decide(
            1,
            &MemberDetails::default(),
            &BTreeSet::new(),
            &result_with(4),
            &PolicyConfig::default(),
        );
        match action {
            TurnAction::PresentOptions { candidates } => assert_eq!(candidates.len(), 4),
            other => panic!("expected options, got {other:?}"),
        }
    }

    #[test]
    fn large_result_sets_ask_the_first_bank_question() {
        let action = decide(
            1,
            &MemberDetails::default(),
            &BTreeSet::new(),
            &result_with(12),
            &PolicyConfig::default(),
        );
        assert_eq!(action, TurnAction::AskQuestion { slot: FieldSlot::Scope });
    }

    #[test]
    fn exhausted_question_bank_presents_even_above_threshold() {
        let asked: BTreeSet<_> = QUESTION_BANK.iter().copied().collect();
        let action = decide(
            2,
            &MemberDetails::default(),
            &asked,
            &result_with(12),
            &PolicyConfig::default(),
        );
        assert!(matches!(action, TurnAction::PresentOptions { .. }));
    }
}
