use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier of one seller offer ("member") of a base product.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BaseProductId(pub String);

/// One catalog row: a seller's offer of a base product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberOffer {
    pub id: MemberId,
    pub base_product_id: BaseProductId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub city: String,
    /// Price in currency minor units.
    pub price: i64,
    /// Seller score on a 0.0..=5.0 scale.
    pub shop_score: f64,
    pub has_warranty: bool,
    pub attributes: BTreeMap<String, String>,
}

impl MemberOffer {
    /// Serialized attribute blob used by the attribute-similarity ranking term.
    pub fn attributes_blob(&self) -> String {
        let mut blob = String::new();
        for (name, value) in &self.attributes {
            if !blob.is_empty() {
                blob.push(' ');
            }
            blob.push_str(name);
            blob.push(' ');
            blob.push_str(value);
        }
        blob
    }
}

/// A search hit with its precomputed relevance score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub offer: MemberOffer,
    pub relevance: f64,
}

impl RankedCandidate {
    pub fn preview(&self) -> CandidatePreview {
        CandidatePreview {
            member_id: self.offer.id.clone(),
            base_product_id: self.offer.base_product_id.clone(),
            name: self.offer.name.clone(),
            brand: self.offer.brand.clone(),
            city: self.offer.city.clone(),
            price: self.offer.price,
            shop_score: self.offer.shop_score,
            relevance: self.relevance,
            label: render_label(&self.offer),
        }
    }
}

/// Compact candidate view persisted in turn state for numeric selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidatePreview {
    pub member_id: MemberId,
    pub base_product_id: BaseProductId,
    pub name: String,
    pub brand: String,
    pub city: String,
    pub price: i64,
    pub shop_score: f64,
    pub relevance: f64,
    pub label: String,
}

fn render_label(offer: &MemberOffer) -> String {
    format!(
        "{} | {} | {} | {} | score {:.1}",
        offer.name,
        offer.brand,
        offer.city,
        format_price(offer.price),
        offer.shop_score
    )
}

/// Formats a minor-unit price with thousands separators.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, character) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(character);
    }
    if price < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{format_price, BaseProductId, MemberId, MemberOffer, RankedCandidate};

    fn offer_fixture() -> MemberOffer {
        let mut attributes = BTreeMap::new();
        attributes.insert("color".to_string(), "gold".to_string());
        attributes.insert("capacity".to_string(), "1.7l".to_string());
        MemberOffer {
            id: MemberId("m-100".to_string()),
            base_product_id: BaseProductId("bp-kettle".to_string()),
            name: "Steel Kettle 1.7L".to_string(),
            description: "Electric kettle with auto shutoff".to_string(),
            brand: "Pars".to_string(),
            category: "kitchen".to_string(),
            city: "Tehran".to_string(),
            price: 1_250_000,
            shop_score: 4.6,
            has_warranty: true,
            attributes,
        }
    }

    #[test]
    fn attribute_blob_is_ordered_and_space_separated() {
        let offer = offer_fixture();
        assert_eq!(offer.attributes_blob(), "capacity 1.7l color gold");
    }

    #[test]
    fn preview_carries_identifier_and_rendered_label() {
        let candidate = RankedCandidate { offer: offer_fixture(), relevance: 0.82 };
        let preview = candidate.preview();

        assert_eq!(preview.member_id, MemberId("m-100".to_string()));
        assert_eq!(preview.label, "Steel Kettle 1.7L | Pars | Tehran | 1,250,000 | score 4.6");
        assert_eq!(preview.relevance, 0.82);
    }

    #[test]
    fn price_formatting_groups_thousands() {
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(950), "950");
        assert_eq!(format_price(1_000), "1,000");
        assert_eq!(format_price(12_345_678), "12,345,678");
        assert_eq!(format_price(-2_500), "-2,500");
    }
}
