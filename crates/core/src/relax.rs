//! Constraint-relaxation ladder applied when a search yields zero matches.

use serde::{Deserialize, Serialize};

use crate::domain::details::MemberDetails;
use crate::search::{CatalogQuery, SearchError, SearchResult};

/// One relaxation step. Applying a step clears its field group entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxStep {
    Keywords,
    ProductAttributes,
    PriceRange,
    Brand,
    City,
    Category,
    MinShopScore,
    Warranty,
}

/// Fixed ladder order. Kept as policy data; see DESIGN.md.
pub const LADDER: &[RelaxStep] = &[
    RelaxStep::Keywords,
    RelaxStep::ProductAttributes,
    RelaxStep::PriceRange,
    RelaxStep::Brand,
    RelaxStep::City,
    RelaxStep::Category,
    RelaxStep::MinShopScore,
    RelaxStep::Warranty,
];

impl RelaxStep {
    /// Whether the step has anything to clear in the given details. Steps
    /// with nothing to clear are skipped and not counted as applied.
    pub fn has_value(&self, details: &MemberDetails) -> bool {
        match self {
            Self::Keywords => !details.keywords.is_empty(),
            Self::ProductAttributes => !details.product_attributes.is_empty(),
            Self::PriceRange => details.min_price.is_some() || details.max_price.is_some(),
            Self::Brand => !details.brands.is_empty(),
            Self::City => !details.cities.is_empty(),
            Self::Category => !details.categories.is_empty(),
            Self::MinShopScore => details.min_shop_score.is_some(),
            Self::Warranty => details.warranty_required.is_some(),
        }
    }

    pub fn clear(&self, details: &mut MemberDetails) {
        match self {
            Self::Keywords => details.keywords.clear(),
            Self::ProductAttributes => details.product_attributes.clear(),
            Self::PriceRange => {
                details.min_price = None;
                details.max_price = None;
            }
            Self::Brand => details.brands.clear(),
            Self::City => details.cities.clear(),
            Self::Category => details.categories.clear(),
            Self::MinShopScore => details.min_shop_score = None,
            Self::Warranty => details.warranty_required = None,
        }
    }

    /// Short human label for the disclosure message.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keywords => "the keywords",
            Self::ProductAttributes => "the requested features",
            Self::PriceRange => "the price range",
            Self::Brand => "the brand",
            Self::City => "the city",
            Self::Category => "the category",
            Self::MinShopScore => "the minimum seller score",
            Self::Warranty => "the warranty requirement",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelaxationOutcome {
    pub result: SearchResult,
    /// Steps actually applied, in ladder order.
    pub applied: Vec<RelaxStep>,
    /// Details after relaxation; persisted so the next turn searches the
    /// loosened constraint set.
    pub details: MemberDetails,
}

/// Drops constraints one ladder step at a time, re-running the search after
/// each applied step and stopping at the first step that yields at least one
/// result. Exhausting the ladder returns the last (empty) result.
pub async fn run_ladder<Q>(
    catalog: &Q,
    details: &MemberDetails,
    top_k: usize,
) -> Result<RelaxationOutcome, SearchError>
where
    Q: CatalogQuery + ?Sized,
{
    let mut relaxed = details.clone();
    let mut applied = Vec::new();
    let mut last_result = SearchResult::default();

    for step in LADDER {
        if !step.has_value(&relaxed) {
            continue;
        }
        step.clear(&mut relaxed);
        applied.push(*step);

        let result = catalog.search(&relaxed, top_k).await?;
        if result.total_count > 0 {
            relaxed.summary = Some(relaxed.render_summary());
            return Ok(RelaxationOutcome { result, applied, details: relaxed });
        }
        last_result = result;
    }

    relaxed.summary = Some(relaxed.render_summary());
    Ok(RelaxationOutcome { result: last_result, applied, details: relaxed })
}
