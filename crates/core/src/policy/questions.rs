//! Fixed clarification-question bank.

use std::collections::BTreeSet;

use crate::domain::details::{FieldSlot, MemberDetails};

/// Bank order: broad scope first, then the narrowing slots. Kept as policy
/// data; see DESIGN.md.
pub const QUESTION_BANK: &[FieldSlot] = &[
    FieldSlot::Scope,
    FieldSlot::Brand,
    FieldSlot::City,
    FieldSlot::Price,
    FieldSlot::Warranty,
    FieldSlot::ShopScore,
    FieldSlot::Feature,
];

/// Picks the next unanswered question, skipping slots the user has already
/// answered, dismissed, or been asked.
pub fn next_question(
    details: &MemberDetails,
    asked_questions: &BTreeSet<FieldSlot>,
) -> Option<FieldSlot> {
    QUESTION_BANK
        .iter()
        .copied()
        .find(|slot| {
            !asked_questions.contains(slot)
                && !details.excluded_fields.contains(slot)
                && !details.asked_fields.contains(slot)
                && !slot_answered(details, *slot)
        })
}

fn slot_answered(details: &MemberDetails, slot: FieldSlot) -> bool {
    match slot {
        FieldSlot::Scope => !details.keywords.is_empty() || !details.categories.is_empty(),
        FieldSlot::Brand => !details.brands.is_empty(),
        FieldSlot::Category => !details.categories.is_empty(),
        FieldSlot::City => !details.cities.is_empty(),
        FieldSlot::Price => details.min_price.is_some() || details.max_price.is_some(),
        FieldSlot::Warranty => details.warranty_required.is_some(),
        FieldSlot::ShopScore => details.min_shop_score.is_some(),
        FieldSlot::Feature => !details.product_attributes.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{next_question, QUESTION_BANK};
    use crate::domain::details::{FieldSlot, MemberDetails};

    #[test]
    fn empty_details_ask_scope_first() {
        let details = MemberDetails::default();
        assert_eq!(next_question(&details, &BTreeSet::new()), Some(FieldSlot::Scope));
    }

    #[test]
    fn answered_and_excluded_slots_are_skipped() {
        let mut details = MemberDetails::default();
        details.extend_keywords(["kettle"]);
        details.excluded_fields.insert(FieldSlot::Brand);

        assert_eq!(next_question(&details, &BTreeSet::new()), Some(FieldSlot::City));
    }

    #[test]
    fn previously_asked_questions_are_not_repeated() {
        let mut details = MemberDetails::default();
        details.extend_keywords(["kettle"]);
        let mut asked = BTreeSet::new();
        asked.insert(FieldSlot::Brand);
        asked.insert(FieldSlot::City);

        assert_eq!(next_question(&details, &asked), Some(FieldSlot::Price));
    }

    #[test]
    fn bank_exhaustion_returns_none() {
        let details = MemberDetails::default();
        let asked: BTreeSet<_> = QUESTION_BANK.iter().copied().collect();
        assert_eq!(next_question(&details, &asked), None);
    }
}
