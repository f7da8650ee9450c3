//! Deterministic rule-based constraint extraction.
//!
//! This is the degraded-mode extractor: it must accept arbitrary user text,
//! never fail, and produce a best-effort [`MemberDelta`]. A model-backed
//! extractor can replace it behind the same interface; this one also backs
//! the test suite so no test depends on a live model.

use crate::domain::details::{FieldSlot, MemberDelta};
use crate::policy::selection::normalize_digits;

/// What the user's message is trying to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionIntent {
    /// Constraint refinement (possibly empty).
    Refine,
    /// Abandon the conversation.
    Cancel,
    /// Message is not about product finding at all. The rule-based parser
    /// never claims this; only a model-backed extractor does.
    OutOfScope,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extraction {
    pub intent: ExtractionIntent,
    pub delta: MemberDelta,
}

impl Extraction {
    pub fn empty() -> Self {
        Self { intent: ExtractionIntent::Refine, delta: MemberDelta::default() }
    }
}

/// Prior-turn context the extractor may use: the state summary and the slot
/// of the question asked last turn (for resolving "doesn't matter").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtractionContext {
    pub summary: Option<String>,
    pub pending_question: Option<FieldSlot>,
}

/// Known catalog dimension values the parser can recognize in free text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lexicon {
    pub brands: Vec<String>,
    pub cities: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RuleBasedParser {
    lexicon: Lexicon,
}

const CANCEL_PHRASES: &[&str] =
    &["cancel", "forget it", "never mind", "stop searching", "انصراف", "بیخیال", "ولش کن"];

const DISMISS_PHRASES: &[&str] =
    &["doesn't matter", "does not matter", "don't care", "no preference", "مهم نیست", "فرقی نداره", "فرقی ندارد"];

const UPPER_BOUND_WORDS: &[&str] =
    &["under", "below", "max", "maximum", "most", "to", "زیر", "حداکثر", "تا"];

const LOWER_BOUND_WORDS: &[&str] =
    &["over", "above", "least", "minimum", "from", "بالای", "حداقل", "از"];

const RANGE_OPENERS: &[&str] = &["between", "از"];
const RANGE_JOINERS: &[&str] = &["and", "to", "تا"];

const SCORE_WORDS: &[&str] = &["star", "stars", "score", "rating", "ستاره", "امتیاز"];

const ATTRIBUTE_NAMES: &[&str] =
    &["color", "colour", "size", "material", "capacity", "رنگ", "سایز", "جنس"];

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "i", "want", "need", "looking", "for", "with", "please", "something",
    "one", "it", "me", "show", "find", "buy", "in", "of", "is", "at", "my", "toman", "tomans",
    "price", "priced", "budget", "about", "around", "that", "this", "and", "or",
    "یک", "من", "میخوام", "می\u{200c}خوام", "لطفا", "دنبال", "هستم", "باشه", "تومان", "تومن",
    "قیمت", "با", "که", "برای",
];

impl RuleBasedParser {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn parse(&self, text: &str, context: &ExtractionContext) -> Extraction {
        let normalized = normalize_digits(text).to_lowercase();

        if contains_any(&normalized, CANCEL_PHRASES) {
            return Extraction { intent: ExtractionIntent::Cancel, delta: MemberDelta::default() };
        }

        let mut delta = MemberDelta::default();

        if contains_any(&normalized, DISMISS_PHRASES) {
            if let Some(slot) = context.pending_question {
                delta.excluded_fields.push(slot);
                return Extraction { intent: ExtractionIntent::Refine, delta };
            }
        }

        let tokens = tokenize(&normalized);

        let (min_price, max_price) = extract_price_bounds(&tokens);
        delta.min_price = min_price;
        delta.max_price = max_price;
        delta.warranty_required = extract_warranty(&normalized);
        delta.min_shop_score = extract_min_score(&tokens);
        delta.brands = match_lexicon(&tokens, &self.lexicon.brands);
        delta.cities = match_lexicon(&tokens, &self.lexicon.cities);

        let mut consumed: Vec<String> = Vec::new();
        consumed.extend(delta.brands.iter().map(|brand| brand.to_lowercase()));
        consumed.extend(delta.cities.iter().map(|city| city.to_lowercase()));

        for (index, token) in tokens.iter().enumerate() {
            if ATTRIBUTE_NAMES.contains(&token.as_str()) {
                if let Some(value) = tokens.get(index + 1) {
                    if !is_numeric(value) && !STOPWORDS.contains(&value.as_str()) {
                        delta.product_attributes.insert(token.clone(), value.clone());
                        consumed.push(token.clone());
                        consumed.push(value.clone());
                    }
                }
            }
        }

        delta.keywords = extract_keywords(&tokens, &consumed);

        Extraction { intent: ExtractionIntent::Refine, delta }
    }
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

fn tokenize(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || matches!(character, '.' | '\u{200c}') {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

/// Parses a money amount token, honoring `k`/`m` suffixes and a following
/// multiplier word ("هزار", "میلیون"). Amounts below 1,000 minor units are
/// not treated as prices.
fn parse_amount(token: &str, next: Option<&str>) -> Option<i64> {
    let (number_part, suffix_multiplier) = if let Some(prefix) = token.strip_suffix('k') {
        (prefix, 1_000.0)
    } else if let Some(prefix) = token.strip_suffix('m') {
        (prefix, 1_000_000.0)
    } else {
        (token, 1.0)
    };

    let amount = number_part.parse::<f64>().ok()?;
    let word_multiplier = match next {
        Some("میلیون") | Some("million") => 1_000_000.0,
        Some("هزار") | Some("thousand") => 1_000.0,
        _ => 1.0,
    };
    let value = (amount * suffix_multiplier * word_multiplier).round() as i64;
    if value < 1_000 {
        return None;
    }
    Some(value)
}

fn extract_price_bounds(tokens: &[String]) -> (Option<i64>, Option<i64>) {
    let mut amounts: Vec<(usize, i64)> = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        if let Some(value) = parse_amount(token, tokens.get(index + 1).map(String::as_str)) {
            amounts.push((index, value));
        }
    }
    if amounts.is_empty() {
        return (None, None);
    }

    // "between A and B" / "از A تا B"
    if amounts.len() >= 2 {
        let (first_index, first) = amounts[0];
        let (second_index, second) = amounts[1];
        let opened = first_index > 0 && RANGE_OPENERS.contains(&tokens[first_index - 1].as_str());
        let joined = tokens[first_index..second_index]
            .iter()
            .any(|token| RANGE_JOINERS.contains(&token.as_str()));
        if opened && joined {
            return (Some(first.min(second)), Some(first.max(second)));
        }
    }

    let (index, value) = amounts[0];
    let context_window =
        tokens[index.saturating_sub(2)..index].iter().map(String::as_str).collect::<Vec<_>>();
    if context_window.iter().any(|word| LOWER_BOUND_WORDS.contains(word)) {
        (Some(value), None)
    } else {
        // Explicit caps ("under", "max") and bare amounts both read as a cap.
        (None, Some(value))
    }
}

fn extract_warranty(text: &str) -> Option<bool> {
    let negated = text.contains("no warranty")
        || text.contains("without warranty")
        || text.contains("بدون گارانتی")
        || text.contains("گارانتی نمیخوام");
    if negated {
        return Some(false);
    }
    if text.contains("warranty") || text.contains("گارانتی") {
        return Some(true);
    }
    None
}

fn extract_min_score(tokens: &[String]) -> Option<f64> {
    for (index, token) in tokens.iter().enumerate() {
        let Ok(value) = token.parse::<f64>() else {
            continue;
        };
        if !(0.0..=5.0).contains(&value) {
            continue;
        }
        let window_start = index.saturating_sub(2);
        let window_end = (index + 2).min(tokens.len() - 1);
        let near_score_word = tokens[window_start..=window_end]
            .iter()
            .any(|neighbor| SCORE_WORDS.contains(&neighbor.as_str()));
        if near_score_word {
            return Some(value);
        }
    }
    None
}

fn match_lexicon(tokens: &[String], known: &[String]) -> Vec<String> {
    let mut matched = Vec::new();
    for value in known {
        let folded = value.to_lowercase();
        if tokens.iter().any(|token| *token == folded) && !matched.contains(value) {
            matched.push(value.clone());
        }
    }
    matched
}

fn is_numeric(token: &str) -> bool {
    token.chars().all(|character| character.is_ascii_digit() || character == '.')
}

fn extract_keywords(tokens: &[String], consumed: &[String]) -> Vec<String> {
    const MAX_KEYWORDS: usize = 8;

    let mut keywords: Vec<String> = Vec::new();
    for token in tokens {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if token.chars().count() < 2
            || is_numeric(token)
            || token.ends_with('k')
                && token[..token.len() - 1].chars().all(|character| character.is_ascii_digit())
            || STOPWORDS.contains(&token.as_str())
            || SCORE_WORDS.contains(&token.as_str())
            || ATTRIBUTE_NAMES.contains(&token.as_str())
            || UPPER_BOUND_WORDS.contains(&token.as_str())
            || LOWER_BOUND_WORDS.contains(&token.as_str())
            || RANGE_OPENERS.contains(&token.as_str())
            || token == "warranty"
            || token == "گارانتی"
            || token == "بدون"
            || token == "million"
            || token == "thousand"
            || token == "میلیون"
            || token == "هزار"
            || consumed.contains(token)
            || keywords.contains(token)
        {
            continue;
        }
        keywords.push(token.clone());
    }
    keywords
}

#[cfg(test)]
mod tests {
    use super::{
        Extraction, ExtractionContext, ExtractionIntent, Lexicon, RuleBasedParser,
    };
    use crate::domain::details::FieldSlot;

    fn parser() -> RuleBasedParser {
        RuleBasedParser::new(Lexicon {
            brands: vec!["Pars".to_string(), "Emersun".to_string()],
            cities: vec!["Tehran".to_string(), "Shiraz".to_string()],
        })
    }

    fn parse(text: &str) -> Extraction {
        parser().parse(text, &ExtractionContext::default())
    }

    #[test]
    fn extracts_keywords_brand_and_city() {
        let extraction = parse("I want a steel kettle from Pars in Tehran");

        assert_eq!(extraction.intent, ExtractionIntent::Refine);
        assert_eq!(extraction.delta.brands, vec!["Pars"]);
        assert_eq!(extraction.delta.cities, vec!["Tehran"]);
        assert_eq!(extraction.delta.keywords, vec!["steel", "kettle"]);
    }

    #[test]
    fn upper_bound_price_phrases_set_max_price() {
        assert_eq!(parse("under 2000000 toman").delta.max_price, Some(2_000_000));
        assert_eq!(parse("max 500k").delta.max_price, Some(500_000));
        assert_eq!(parse("زیر ۲ میلیون تومان").delta.max_price, Some(2_000_000));
    }

    #[test]
    fn lower_bound_price_phrases_set_min_price() {
        assert_eq!(parse("over 1500000").delta.min_price, Some(1_500_000));
        assert_eq!(parse("at least 2m").delta.min_price, Some(2_000_000));
    }

    #[test]
    fn range_phrases_set_both_bounds() {
        let delta = parse("between 500000 and 2000000").delta;
        assert_eq!(delta.min_price, Some(500_000));
        assert_eq!(delta.max_price, Some(2_000_000));

        let delta = parse("از ۵۰۰ هزار تا ۲ میلیون").delta;
        assert_eq!(delta.min_price, Some(500_000));
        assert_eq!(delta.max_price, Some(2_000_000));
    }

    #[test]
    fn warranty_phrases_set_tri_state() {
        assert_eq!(parse("with warranty please").delta.warranty_required, Some(true));
        assert_eq!(parse("no warranty needed").delta.warranty_required, Some(false));
        assert_eq!(parse("بدون گارانتی").delta.warranty_required, Some(false));
        assert_eq!(parse("a kettle").delta.warranty_required, None);
    }

    #[test]
    fn score_threshold_needs_a_score_word_nearby() {
        assert_eq!(parse("at least 4 stars").delta.min_shop_score, Some(4.0));
        assert_eq!(parse("score above 4.5").delta.min_shop_score, Some(4.5));
        assert_eq!(parse("4 of them").delta.min_shop_score, None);
    }

    #[test]
    fn attribute_pairs_are_captured() {
        let delta = parse("color gold capacity 1.7").delta;
        assert_eq!(delta.product_attributes.get("color").map(String::as_str), Some("gold"));
    }

    #[test]
    fn cancel_phrases_switch_intent() {
        assert_eq!(parse("forget it, cancel").intent, ExtractionIntent::Cancel);
        assert_eq!(parse("انصراف").intent, ExtractionIntent::Cancel);
    }

    #[test]
    fn dismissal_excludes_the_pending_question_slot() {
        let context = ExtractionContext {
            summary: None,
            pending_question: Some(FieldSlot::Brand),
        };
        let extraction = parser().parse("doesn't matter", &context);

        assert_eq!(extraction.delta.excluded_fields, vec![FieldSlot::Brand]);
        assert!(extraction.delta.keywords.is_empty());
    }

    #[test]
    fn dismissal_without_pending_question_is_harmless() {
        let extraction = parse("doesn't matter");
        assert!(extraction.delta.excluded_fields.is_empty());
    }

    #[test]
    fn gibberish_produces_keywords_at_worst() {
        let extraction = parse("blorp zzz");
        assert_eq!(extraction.intent, ExtractionIntent::Refine);
        assert!(extraction.delta.min_price.is_none());
    }
}
