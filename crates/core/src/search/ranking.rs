//! Relevance scoring for catalog members.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::domain::details::MemberDetails;
use crate::domain::member::{MemberOffer, RankedCandidate};
use crate::search::{Distributions, PriceBucket, SearchResult, WarrantySplit};

/// Fixed width of the price histogram buckets, in minor units.
pub const PRICE_BUCKET_WIDTH: i64 = 500_000;

/// Number of buckets kept per categorical distribution.
const DISTRIBUTION_TOP: usize = 5;

/// Weights for the relevance components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankingWeights {
    /// Full-text rank against name + description (default: 0.60).
    pub full_text: f64,
    /// Trigram similarity against the member name (default: 0.25).
    pub name_similarity: f64,
    /// Trigram similarity against the serialized attribute blob (default: 0.10).
    pub attribute_similarity: f64,
    /// Normalized seller score (default: 0.05).
    pub shop_score: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self { full_text: 0.60, name_similarity: 0.25, attribute_similarity: 0.10, shop_score: 0.05 }
    }
}

/// Scores one member against the accumulated details. With no keywords or
/// attributes the text terms are zero and ordering degenerates to seller
/// score.
pub fn score_member(offer: &MemberOffer, details: &MemberDetails, weights: &RankingWeights) -> f64 {
    let query_text = details.keywords.join(" ");
    let attribute_query = serialize_attributes(&details.product_attributes);

    let full_text = if details.keywords.is_empty() {
        0.0
    } else {
        let haystack = format!("{} {}", offer.name, offer.description);
        text_rank(&details.keywords, &haystack)
    };
    let name_similarity =
        if query_text.is_empty() { 0.0 } else { trigram_similarity(&query_text, &offer.name) };
    let attribute_similarity = if attribute_query.is_empty() {
        0.0
    } else {
        trigram_similarity(&attribute_query, &offer.attributes_blob())
    };
    let shop_score = (offer.shop_score / 5.0).clamp(0.0, 1.0);

    let total = full_text * weights.full_text
        + name_similarity * weights.name_similarity
        + attribute_similarity * weights.attribute_similarity
        + shop_score * weights.shop_score;

    total.min(1.0)
}

/// Fraction of query tokens present in the haystack.
pub fn text_rank(tokens: &[String], haystack: &str) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let folded = haystack.to_lowercase();
    let hits = tokens.iter().filter(|token| folded.contains(&token.to_lowercase())).count();
    hits as f64 / tokens.len() as f64
}

/// Jaccard similarity over padded character trigrams.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f64 / union as f64
}

fn trigrams(text: &str) -> BTreeSet<[char; 3]> {
    let mut grams = BTreeSet::new();
    for word in text.to_lowercase().split_whitespace() {
        let mut padded: Vec<char> = Vec::with_capacity(word.chars().count() + 3);
        padded.push(' ');
        padded.push(' ');
        padded.extend(word.chars());
        padded.push(' ');
        for window in padded.windows(3) {
            grams.insert([window[0], window[1], window[2]]);
        }
    }
    grams
}

fn serialize_attributes(attributes: &BTreeMap<String, String>) -> String {
    let mut blob = String::new();
    for (name, value) in attributes {
        if !blob.is_empty() {
            blob.push(' ');
        }
        blob.push_str(name);
        blob.push(' ');
        blob.push_str(value);
    }
    blob
}

/// Deterministic candidate ordering: relevance descending, then price
/// ascending, then member id ascending.
pub fn compare_candidates(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.relevance
        .total_cmp(&a.relevance)
        .then_with(|| a.offer.price.cmp(&b.offer.price))
        .then_with(|| a.offer.id.cmp(&b.offer.id))
}

/// Ranks the full matching set and assembles the search result: total count,
/// top-K candidates, and the distributions the question policy consumes.
pub fn build_search_result(
    matching: Vec<MemberOffer>,
    details: &MemberDetails,
    top_k: usize,
    weights: &RankingWeights,
) -> SearchResult {
    let total_count = matching.len() as u64;
    let distributions = build_distributions(&matching);

    let mut candidates: Vec<RankedCandidate> = matching
        .into_iter()
        .map(|offer| {
            let relevance = score_member(&offer, details, weights);
            RankedCandidate { offer, relevance }
        })
        .collect();
    candidates.sort_by(compare_candidates);
    candidates.truncate(top_k);

    SearchResult { total_count, candidates, distributions }
}

fn build_distributions(matching: &[MemberOffer]) -> Distributions {
    let mut brands: HashMap<&str, u64> = HashMap::new();
    let mut cities: HashMap<&str, u64> = HashMap::new();
    let mut buckets: BTreeMap<i64, u64> = BTreeMap::new();
    let mut warranty = WarrantySplit::default();

    for offer in matching {
        *brands.entry(offer.brand.as_str()).or_default() += 1;
        *cities.entry(offer.city.as_str()).or_default() += 1;
        let lower = (offer.price / PRICE_BUCKET_WIDTH) * PRICE_BUCKET_WIDTH;
        *buckets.entry(lower).or_default() += 1;
        if offer.has_warranty {
            warranty.with_warranty += 1;
        } else {
            warranty.without_warranty += 1;
        }
    }

    Distributions {
        brands: top_buckets(brands),
        cities: top_buckets(cities),
        price_histogram: buckets
            .into_iter()
            .map(|(lower, count)| PriceBucket { lower, upper: lower + PRICE_BUCKET_WIDTH, count })
            .collect(),
        warranty,
    }
}

fn top_buckets(counts: HashMap<&str, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> =
        counts.into_iter().map(|(name, count)| (name.to_string(), count)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(DISTRIBUTION_TOP);
    entries
}
