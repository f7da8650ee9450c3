pub mod ranking;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::details::{FieldSlot, MemberDetails};
use crate::domain::member::{MemberOffer, RankedCandidate};

pub use ranking::{build_search_result, RankingWeights, PRICE_BUCKET_WIDTH};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("catalog backend failure: {0}")]
    Backend(String),
}

/// Attribute-frequency distributions over the full matching set, used by the
/// dialogue policy to pick the most discriminating question.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distributions {
    /// Top brand buckets, count descending.
    pub brands: Vec<(String, u64)>,
    /// Top city buckets, count descending.
    pub cities: Vec<(String, u64)>,
    pub price_histogram: Vec<PriceBucket>,
    pub warranty: WarrantySplit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub lower: i64,
    pub upper: i64,
    pub count: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantySplit {
    pub with_warranty: u64,
    pub without_warranty: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total_count: u64,
    pub candidates: Vec<RankedCandidate>,
    pub distributions: Distributions,
}

/// Read-only catalog query contract. Implementations must be deterministic
/// for identical details and catalog snapshot.
#[async_trait]
pub trait CatalogQuery: Send + Sync {
    async fn search(
        &self,
        details: &MemberDetails,
        top_k: usize,
    ) -> Result<SearchResult, SearchError>;
}

/// Hard-filter predicate shared by the in-memory engine and tests. The SQL
/// engine pushes the same conditions into its WHERE clause. A slot present in
/// `excluded_fields` contributes no condition at all.
pub fn matches_filters(offer: &MemberOffer, details: &MemberDetails) -> bool {
    if !details.is_excluded(FieldSlot::Brand)
        && !details.brands.is_empty()
        && !contains_folded(&details.brands, &offer.brand)
    {
        return false;
    }
    if !details.is_excluded(FieldSlot::Category)
        && !details.categories.is_empty()
        && !contains_folded(&details.categories, &offer.category)
    {
        return false;
    }
    if !details.is_excluded(FieldSlot::City)
        && !details.cities.is_empty()
        && !contains_folded(&details.cities, &offer.city)
    {
        return false;
    }
    if !details.is_excluded(FieldSlot::Price) {
        if let Some(min_price) = details.min_price {
            if offer.price < min_price {
                return false;
            }
        }
        if let Some(max_price) = details.max_price {
            if offer.price > max_price {
                return false;
            }
        }
    }
    if !details.is_excluded(FieldSlot::ShopScore) {
        if let Some(min_shop_score) = details.min_shop_score {
            if offer.shop_score < min_shop_score {
                return false;
            }
        }
    }
    if !details.is_excluded(FieldSlot::Warranty) {
        if let Some(required) = details.warranty_required {
            if offer.has_warranty != required {
                return false;
            }
        }
    }
    if !details.keywords.is_empty() {
        // Full-text gate: at least one keyword must hit name or description.
        // Relevance among the hits is ranked separately.
        let haystack = format!("{} {}", offer.name, offer.description).to_lowercase();
        if !details.keywords.iter().any(|keyword| haystack.contains(&keyword.to_lowercase())) {
            return false;
        }
    }
    if !details.is_excluded(FieldSlot::Feature) && !details.product_attributes.is_empty() {
        for (name, value) in &details.product_attributes {
            let matched = offer.attributes.iter().any(|(offer_name, offer_value)| {
                offer_name.eq_ignore_ascii_case(name)
                    && offer_value.to_lowercase() == value.to_lowercase()
            });
            if !matched {
                return false;
            }
        }
    }
    true
}

fn contains_folded(values: &std::collections::BTreeSet<String>, candidate: &str) -> bool {
    let folded = candidate.to_lowercase();
    values.iter().any(|value| value.to_lowercase() == folded)
}
