use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Constraint slot identifiers. Used for "already asked" bookkeeping, for
/// explicit "doesn't matter" exclusions, and for the clarification question
/// bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSlot {
    Scope,
    Brand,
    Category,
    City,
    Price,
    Warranty,
    ShopScore,
    Feature,
}

/// Accumulated hard/soft constraints for one conversation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberDetails {
    pub brands: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub cities: BTreeSet<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_shop_score: Option<f64>,
    pub warranty_required: Option<bool>,
    /// Free-text keywords, ordered and de-duplicated.
    pub keywords: Vec<String>,
    pub product_attributes: BTreeMap<String, String>,
    pub asked_fields: BTreeSet<FieldSlot>,
    pub excluded_fields: BTreeSet<FieldSlot>,
    pub summary: Option<String>,
}

/// Per-turn constraint update. Every field is optional/additive; the `drop_*`
/// flags mean "clear the destination first, then overlay".
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberDelta {
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub cities: Vec<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub min_shop_score: Option<f64>,
    pub warranty_required: Option<bool>,
    pub keywords: Vec<String>,
    pub product_attributes: BTreeMap<String, String>,
    pub excluded_fields: Vec<FieldSlot>,
    pub cleared_exclusions: Vec<FieldSlot>,
    pub drop_brands: bool,
    pub drop_categories: bool,
    pub drop_cities: bool,
    pub drop_price_range: bool,
    pub drop_min_shop_score: bool,
    pub drop_warranty: bool,
    pub drop_keywords: bool,
    pub drop_product_attributes: bool,
    pub summary: Option<String>,
}

impl MemberDelta {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl MemberDetails {
    /// A slot in `excluded_fields` is never applied as a hard filter, even if
    /// a later delta sets a value for it.
    pub fn is_excluded(&self, slot: FieldSlot) -> bool {
        self.excluded_fields.contains(&slot)
    }

    pub fn has_text_signal(&self) -> bool {
        !self.keywords.is_empty() || !self.product_attributes.is_empty()
    }

    /// Appends tokens to the keyword list, de-duplicating case-insensitively
    /// while preserving first-seen order.
    pub fn extend_keywords<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen: BTreeSet<String> =
            self.keywords.iter().map(|keyword| keyword.to_lowercase()).collect();
        for token in tokens {
            let token = token.into();
            let folded = token.to_lowercase();
            if folded.is_empty() {
                continue;
            }
            if seen.insert(folded) {
                self.keywords.push(token);
            }
        }
    }

    /// Compact one-line rendering used for lightweight state hydration.
    pub fn render_summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.keywords.is_empty() {
            parts.push(format!("keywords={}", self.keywords.join("/")));
        }
        if !self.brands.is_empty() {
            parts.push(format!("brand={}", join_set(&self.brands)));
        }
        if !self.categories.is_empty() {
            parts.push(format!("category={}", join_set(&self.categories)));
        }
        if !self.cities.is_empty() {
            parts.push(format!("city={}", join_set(&self.cities)));
        }
        match (self.min_price, self.max_price) {
            (Some(min), Some(max)) => parts.push(format!("price={min}..{max}")),
            (Some(min), None) => parts.push(format!("price>={min}")),
            (None, Some(max)) => parts.push(format!("price<={max}")),
            (None, None) => {}
        }
        if let Some(score) = self.min_shop_score {
            parts.push(format!("score>={score:.1}"));
        }
        if let Some(required) = self.warranty_required {
            parts.push(format!("warranty={}", if required { "yes" } else { "no" }));
        }
        for (name, value) in &self.product_attributes {
            parts.push(format!("{name}={value}"));
        }
        parts.join(", ")
    }
}

/// Pure merge of a delta into accumulated details, per the drop-then-overlay
/// rule. Set-valued fields use union in the non-drop path. Slots that receive
/// a value are recorded in `asked_fields` so the question bank skips them.
pub fn apply(details: &MemberDetails, delta: &MemberDelta) -> MemberDetails {
    let mut merged = details.clone();

    for slot in &delta.cleared_exclusions {
        merged.excluded_fields.remove(slot);
    }
    for slot in &delta.excluded_fields {
        merged.excluded_fields.insert(*slot);
        merged.asked_fields.insert(*slot);
    }

    if delta.drop_brands {
        merged.brands.clear();
    }
    if delta.drop_categories {
        merged.categories.clear();
    }
    if delta.drop_cities {
        merged.cities.clear();
    }
    if delta.drop_price_range {
        merged.min_price = None;
        merged.max_price = None;
    }
    if delta.drop_min_shop_score {
        merged.min_shop_score = None;
    }
    if delta.drop_warranty {
        merged.warranty_required = None;
    }
    if delta.drop_keywords {
        merged.keywords.clear();
    }
    if delta.drop_product_attributes {
        merged.product_attributes.clear();
    }

    if !delta.brands.is_empty() {
        merged.brands.extend(delta.brands.iter().cloned());
        merged.asked_fields.insert(FieldSlot::Brand);
    }
    if !delta.categories.is_empty() {
        merged.categories.extend(delta.categories.iter().cloned());
        merged.asked_fields.insert(FieldSlot::Category);
    }
    if !delta.cities.is_empty() {
        merged.cities.extend(delta.cities.iter().cloned());
        merged.asked_fields.insert(FieldSlot::City);
    }
    if delta.min_price.is_some() || delta.max_price.is_some() {
        merged.asked_fields.insert(FieldSlot::Price);
    }
    if let Some(min_price) = delta.min_price {
        merged.min_price = Some(min_price);
    }
    if let Some(max_price) = delta.max_price {
        merged.max_price = Some(max_price);
    }
    if let Some(min_shop_score) = delta.min_shop_score {
        merged.min_shop_score = Some(min_shop_score);
        merged.asked_fields.insert(FieldSlot::ShopScore);
    }
    if let Some(warranty_required) = delta.warranty_required {
        merged.warranty_required = Some(warranty_required);
        merged.asked_fields.insert(FieldSlot::Warranty);
    }
    if !delta.keywords.is_empty() {
        merged.extend_keywords(delta.keywords.iter().cloned());
    }
    if !delta.product_attributes.is_empty() {
        merged.product_attributes.extend(
            delta.product_attributes.iter().map(|(name, value)| (name.clone(), value.clone())),
        );
        merged.asked_fields.insert(FieldSlot::Feature);
    }
    if let Some(summary) = &delta.summary {
        merged.summary = Some(summary.clone());
    } else {
        merged.summary = Some(merged.render_summary());
    }

    merged
}

fn join_set(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::{apply, FieldSlot, MemberDelta, MemberDetails};

    fn details_fixture() -> MemberDetails {
        let mut details = MemberDetails::default();
        details.brands.insert("Pars".to_string());
        details.cities.insert("Tehran".to_string());
        details.min_price = Some(500_000);
        details.max_price = Some(2_000_000);
        details.extend_keywords(["kettle", "steel"]);
        details
    }

    #[test]
    fn non_drop_merge_unions_sets_and_overlays_scalars() {
        let details = details_fixture();
        let delta = MemberDelta {
            brands: vec!["Arj".to_string()],
            max_price: Some(1_800_000),
            warranty_required: Some(true),
            ..MemberDelta::default()
        };

        let merged = apply(&details, &delta);

        assert!(merged.brands.contains("Pars"));
        assert!(merged.brands.contains("Arj"));
        assert_eq!(merged.min_price, Some(500_000));
        assert_eq!(merged.max_price, Some(1_800_000));
        assert_eq!(merged.warranty_required, Some(true));
        assert!(merged.asked_fields.contains(&FieldSlot::Brand));
        assert!(merged.asked_fields.contains(&FieldSlot::Warranty));
    }

    #[test]
    fn drop_price_range_clears_both_bounds_without_replacement() {
        let details = details_fixture();
        let delta = MemberDelta { drop_price_range: true, ..MemberDelta::default() };

        let merged = apply(&details, &delta);

        assert_eq!(merged.min_price, None);
        assert_eq!(merged.max_price, None);
    }

    #[test]
    fn drop_then_overlay_replaces_instead_of_merging() {
        let details = details_fixture();
        let delta = MemberDelta {
            drop_brands: true,
            brands: vec!["Emersun".to_string()],
            ..MemberDelta::default()
        };

        let merged = apply(&details, &delta);

        assert_eq!(merged.brands.len(), 1);
        assert!(merged.brands.contains("Emersun"));
    }

    #[test]
    fn exclusions_accumulate_and_survive_later_value_deltas() {
        let details = MemberDetails::default();
        let exclude = MemberDelta {
            excluded_fields: vec![FieldSlot::Brand],
            ..MemberDelta::default()
        };
        let merged = apply(&details, &exclude);
        assert!(merged.is_excluded(FieldSlot::Brand));

        let set_brand =
            MemberDelta { brands: vec!["Pars".to_string()], ..MemberDelta::default() };
        let merged = apply(&merged, &set_brand);

        // The value is stored but the slot stays excluded until explicitly cleared.
        assert!(merged.is_excluded(FieldSlot::Brand));
        assert!(merged.brands.contains("Pars"));

        let clear = MemberDelta {
            cleared_exclusions: vec![FieldSlot::Brand],
            ..MemberDelta::default()
        };
        let merged = apply(&merged, &clear);
        assert!(!merged.is_excluded(FieldSlot::Brand));
    }

    #[test]
    fn keyword_extension_preserves_order_and_dedupes_case_insensitively() {
        let mut details = MemberDetails::default();
        details.extend_keywords(["Kettle", "steel", "kettle", "Gold"]);
        assert_eq!(details.keywords, vec!["Kettle", "steel", "Gold"]);
    }

    #[test]
    fn drop_flag_with_no_data_is_a_noop_on_empty_details() {
        let details = MemberDetails::default();
        let delta = MemberDelta {
            drop_keywords: true,
            drop_product_attributes: true,
            ..MemberDelta::default()
        };

        let merged = apply(&details, &delta);

        assert!(merged.keywords.is_empty());
        assert!(merged.product_attributes.is_empty());
    }

    #[test]
    fn summary_renders_compact_constraint_line() {
        let mut details = details_fixture();
        details.warranty_required = Some(false);
        let summary = details.render_summary();

        assert!(summary.contains("keywords=kettle/steel"));
        assert!(summary.contains("brand=Pars"));
        assert!(summary.contains("price=500000..2000000"));
        assert!(summary.contains("warranty=no"));
    }

    #[test]
    fn empty_delta_is_detected() {
        assert!(MemberDelta::default().is_empty());
        let delta = MemberDelta { keywords: vec!["fan".to_string()], ..MemberDelta::default() };
        assert!(!delta.is_empty());
    }
}
