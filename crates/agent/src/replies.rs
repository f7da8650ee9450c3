//! User-facing reply rendering. All strings the engine sends back to the
//! user are produced here so wording stays in one place.

use finda_core::{format_price, CandidatePreview, FieldSlot, MemberId, RelaxStep, StopReason};

/// What the engine says back for one inbound message.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnReply {
    pub message: String,
    /// Set when the turn ends with a chosen member.
    pub selected_member_id: Option<MemberId>,
}

impl TurnReply {
    pub fn text(message: impl Into<String>) -> Self {
        Self { message: message.into(), selected_member_id: None }
    }
}

pub fn question_text(slot: FieldSlot) -> &'static str {
    match slot {
        FieldSlot::Scope => "What kind of product are you looking for?",
        FieldSlot::Brand => "Do you prefer a particular brand?",
        FieldSlot::Category => "Which category should I search in?",
        FieldSlot::City => "Should the seller be in a specific city?",
        FieldSlot::Price => "What price range works for you?",
        FieldSlot::Warranty => "Do you need a warranty?",
        FieldSlot::ShopScore => "Is there a minimum seller score you'd accept?",
        FieldSlot::Feature => "Any specific feature, like a color or size?",
    }
}

pub fn render_options(candidates: &[CandidatePreview]) -> String {
    let mut message = String::from("Here's what I found:\n");
    for (index, candidate) in candidates.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", index + 1, candidate.label));
    }
    message.push_str("Reply with the number of the one you want.");
    message
}

pub fn render_relaxation(applied: &[RelaxStep]) -> String {
    let labels: Vec<&str> = applied.iter().map(RelaxStep::label).collect();
    let joined = match labels.as_slice() {
        [] => return String::new(),
        [only] => (*only).to_string(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    };
    format!("Nothing matched every constraint, so I loosened {joined}.")
}

pub fn render_confirmation(candidate: &CandidatePreview, reason: StopReason) -> String {
    let lead = match reason {
        StopReason::MaxTurnsReached => "We're out of questions, so here's my best match",
        _ => "Found it",
    };
    format!(
        "{lead}: {} from {} in {}, {} toman, seller score {:.1}.",
        candidate.name,
        candidate.brand,
        candidate.city,
        format_price(candidate.price),
        candidate.shop_score
    )
}

pub fn reprompt_text(option_count: usize) -> String {
    format!("Please reply with a number between 1 and {option_count}.")
}

pub fn no_match_text() -> &'static str {
    "I couldn't find anything matching your request, even after loosening the constraints. \
     Try describing the product differently."
}

pub fn cancelled_text() -> &'static str {
    "Okay, I've stopped the search. Message me again any time."
}

pub fn out_of_scope_text() -> &'static str {
    "I can only help with finding products. Let me know what you're shopping for."
}

#[cfg(test)]
mod tests {
    use finda_core::{BaseProductId, CandidatePreview, MemberId, RelaxStep, StopReason};

    use super::{render_confirmation, render_options, render_relaxation, reprompt_text};

    fn preview(index: usize) -> CandidatePreview {
        CandidatePreview {
            member_id: MemberId(format!("m-{index}")),
            base_product_id: BaseProductId("bp-1".to_string()),
            name: format!("Offer {index}"),
            brand: "Pars".to_string(),
            city: "Tehran".to_string(),
            price: 1_250_000,
            shop_score: 4.6,
            relevance: 0.8,
            label: format!("Offer {index} | Pars | Tehran | 1,250,000 | score 4.6"),
        }
    }

    #[test]
    fn options_are_numbered_from_one() {
        let message = render_options(&[preview(0), preview(1)]);
        assert!(message.contains("1. Offer 0"));
        assert!(message.contains("2. Offer 1"));
        assert!(message.contains("Reply with the number"));
    }

    #[test]
    fn relaxation_disclosure_lists_applied_steps() {
        let single = render_relaxation(&[RelaxStep::Keywords]);
        assert!(single.contains("the keywords"));

        let double = render_relaxation(&[RelaxStep::Keywords, RelaxStep::Brand]);
        assert!(double.contains("the keywords and the brand"));

        assert!(render_relaxation(&[]).is_empty());
    }

    #[test]
    fn confirmation_mentions_the_member_and_price() {
        let message = render_confirmation(&preview(3), StopReason::FoundUniqueMember);
        assert!(message.contains("Offer 3"));
        assert!(message.contains("1,250,000"));

        let forced = render_confirmation(&preview(3), StopReason::MaxTurnsReached);
        assert!(forced.contains("best match"));
    }

    #[test]
    fn reprompt_names_the_valid_range() {
        assert_eq!(reprompt_text(4), "Please reply with a number between 1 and 4.");
    }
}
