//! Deterministic demo catalog used by the CLI, the chat demo, and tests.

use std::collections::BTreeMap;

use finda_core::{BaseProductId, Lexicon, MemberId, MemberOffer};

use crate::store::RepositoryError;
use crate::DbPool;

struct OfferSeed {
    id: &'static str,
    base_product_id: &'static str,
    name: &'static str,
    description: &'static str,
    brand: &'static str,
    category: &'static str,
    city: &'static str,
    price: i64,
    shop_score: f64,
    has_warranty: bool,
    attributes: &'static [(&'static str, &'static str)],
}

const BASE_PRODUCT_SEEDS: &[(&str, &str, &str)] = &[
    ("bp-kettle", "Electric Kettle", "kitchen"),
    ("bp-vacuum", "Vacuum Cleaner", "appliance"),
    ("bp-fan", "Standing Fan", "appliance"),
    ("bp-toaster", "Toaster", "kitchen"),
];

const OFFER_SEEDS: &[OfferSeed] = &[
    OfferSeed {
        id: "m-01",
        base_product_id: "bp-kettle",
        name: "Pars Steel Kettle 1.7L",
        description: "Electric kettle with auto shutoff",
        brand: "Pars",
        category: "kitchen",
        city: "Tehran",
        price: 950_000,
        shop_score: 4.6,
        has_warranty: true,
        attributes: &[("color", "steel"), ("capacity", "1.7l")],
    },
    OfferSeed {
        id: "m-02",
        base_product_id: "bp-kettle",
        name: "Pars Kettle Classic",
        description: "Compact kettle for small kitchens",
        brand: "Pars",
        category: "kitchen",
        city: "Shiraz",
        price: 780_000,
        shop_score: 4.2,
        has_warranty: false,
        attributes: &[("color", "white")],
    },
    OfferSeed {
        id: "m-03",
        base_product_id: "bp-kettle",
        name: "Emersun Gold Kettle",
        description: "Premium gold finish kettle",
        brand: "Emersun",
        category: "kitchen",
        city: "Tehran",
        price: 1_250_000,
        shop_score: 4.8,
        has_warranty: true,
        attributes: &[("color", "gold")],
    },
    OfferSeed {
        id: "m-04",
        base_product_id: "bp-kettle",
        name: "Emersun Kettle Eco",
        description: "Energy saving kettle",
        brand: "Emersun",
        category: "kitchen",
        city: "Isfahan",
        price: 890_000,
        shop_score: 4.0,
        has_warranty: false,
        attributes: &[("color", "black")],
    },
    OfferSeed {
        id: "m-05",
        base_product_id: "bp-kettle",
        name: "Arj Glass Kettle",
        description: "Borosilicate glass kettle with LED",
        brand: "Arj",
        category: "kitchen",
        city: "Shiraz",
        price: 1_100_000,
        shop_score: 4.4,
        has_warranty: true,
        attributes: &[("color", "clear")],
    },
    OfferSeed {
        id: "m-06",
        base_product_id: "bp-kettle",
        name: "Techno Travel Kettle",
        description: "Foldable travel kettle",
        brand: "Techno",
        category: "kitchen",
        city: "Tehran",
        price: 690_000,
        shop_score: 3.8,
        has_warranty: false,
        attributes: &[("color", "white"), ("capacity", "0.8l")],
    },
    OfferSeed {
        id: "m-07",
        base_product_id: "bp-vacuum",
        name: "Pars Vacuum 2200W",
        description: "Bagged vacuum cleaner",
        brand: "Pars",
        category: "appliance",
        city: "Tehran",
        price: 3_400_000,
        shop_score: 4.5,
        has_warranty: true,
        attributes: &[("color", "red")],
    },
    OfferSeed {
        id: "m-08",
        base_product_id: "bp-vacuum",
        name: "Arj Cyclone Vacuum",
        description: "Bagless cyclonic vacuum",
        brand: "Arj",
        category: "appliance",
        city: "Mashhad",
        price: 4_800_000,
        shop_score: 4.7,
        has_warranty: true,
        attributes: &[("color", "blue")],
    },
    OfferSeed {
        id: "m-09",
        base_product_id: "bp-vacuum",
        name: "Techno Vacuum Lite",
        description: "Lightweight vacuum cleaner",
        brand: "Techno",
        category: "appliance",
        city: "Shiraz",
        price: 2_100_000,
        shop_score: 3.9,
        has_warranty: false,
        attributes: &[("color", "grey")],
    },
    OfferSeed {
        id: "m-10",
        base_product_id: "bp-vacuum",
        name: "Emersun Vacuum Pro",
        description: "High suction vacuum with HEPA filter",
        brand: "Emersun",
        category: "appliance",
        city: "Tehran",
        price: 4_200_000,
        shop_score: 4.9,
        has_warranty: true,
        attributes: &[("color", "black")],
    },
    OfferSeed {
        id: "m-11",
        base_product_id: "bp-fan",
        name: "Pars Standing Fan",
        description: "Three speed standing fan",
        brand: "Pars",
        category: "appliance",
        city: "Isfahan",
        price: 1_600_000,
        shop_score: 4.1,
        has_warranty: true,
        attributes: &[("color", "white")],
    },
    OfferSeed {
        id: "m-12",
        base_product_id: "bp-fan",
        name: "Arj Silent Fan",
        description: "Low noise fan with remote",
        brand: "Arj",
        category: "appliance",
        city: "Tehran",
        price: 1_900_000,
        shop_score: 4.3,
        has_warranty: false,
        attributes: &[("color", "black")],
    },
    OfferSeed {
        id: "m-13",
        base_product_id: "bp-toaster",
        name: "Emersun Toaster Duo",
        description: "Two slice toaster",
        brand: "Emersun",
        category: "kitchen",
        city: "Mashhad",
        price: 850_000,
        shop_score: 4.0,
        has_warranty: false,
        attributes: &[("color", "silver")],
    },
    OfferSeed {
        id: "m-14",
        base_product_id: "bp-toaster",
        name: "Techno Toaster Max",
        description: "Four slice toaster with defrost",
        brand: "Techno",
        category: "kitchen",
        city: "Tabriz",
        price: 1_150_000,
        shop_score: 4.4,
        has_warranty: true,
        attributes: &[("color", "silver")],
    },
];

pub fn demo_offers() -> Vec<MemberOffer> {
    OFFER_SEEDS
        .iter()
        .map(|seed| MemberOffer {
            id: MemberId(seed.id.to_string()),
            base_product_id: BaseProductId(seed.base_product_id.to_string()),
            name: seed.name.to_string(),
            description: seed.description.to_string(),
            brand: seed.brand.to_string(),
            category: seed.category.to_string(),
            city: seed.city.to_string(),
            price: seed.price,
            shop_score: seed.shop_score,
            has_warranty: seed.has_warranty,
            attributes: seed
                .attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect::<BTreeMap<_, _>>(),
        })
        .collect()
}

/// Dimension values the rule-based extractor recognizes in free text.
pub fn demo_lexicon() -> Lexicon {
    Lexicon {
        brands: vec![
            "Pars".to_string(),
            "Emersun".to_string(),
            "Arj".to_string(),
            "Techno".to_string(),
        ],
        cities: vec![
            "Tehran".to_string(),
            "Shiraz".to_string(),
            "Isfahan".to_string(),
            "Mashhad".to_string(),
            "Tabriz".to_string(),
        ],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedSummary {
    pub base_products: u64,
    pub members: u64,
}

/// Seeds the demo catalog, replacing any previous seed rows.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<SeedSummary, RepositoryError> {
    for (id, name, category) in BASE_PRODUCT_SEEDS {
        sqlx::query(
            "INSERT OR REPLACE INTO base_products (id, name, category) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(category)
        .execute(pool)
        .await?;
    }

    for offer in demo_offers() {
        let attributes_json = serde_json::to_string(&offer.attributes)
            .map_err(|error| RepositoryError::Decode(error.to_string()))?;
        sqlx::query(
            "INSERT OR REPLACE INTO members \
             (id, base_product_id, name, description, brand, category, city, price, \
              shop_score, has_warranty, attributes_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&offer.id.0)
        .bind(&offer.base_product_id.0)
        .bind(&offer.name)
        .bind(&offer.description)
        .bind(&offer.brand)
        .bind(&offer.category)
        .bind(&offer.city)
        .bind(offer.price)
        .bind(offer.shop_score)
        .bind(i64::from(offer.has_warranty))
        .bind(attributes_json)
        .execute(pool)
        .await?;
    }

    Ok(SeedSummary {
        base_products: BASE_PRODUCT_SEEDS.len() as u64,
        members: OFFER_SEEDS.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::{demo_offers, seed_demo_catalog};
    use crate::{connect_with_settings, migrations};

    #[test]
    fn demo_catalog_spans_products_brands_and_cities() {
        let offers = demo_offers();
        assert!(offers.len() >= 12);

        let base_products: std::collections::BTreeSet<_> =
            offers.iter().map(|offer| offer.base_product_id.0.as_str()).collect();
        assert!(base_products.len() >= 4);

        assert!(offers.iter().any(|offer| offer.has_warranty));
        assert!(offers.iter().any(|offer| !offer.has_warranty));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        // In-memory SQLite is per-connection, so pin the pool to one.
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let first = seed_demo_catalog(&pool).await.expect("seed");
        let second = seed_demo_catalog(&pool).await.expect("reseed");
        assert_eq!(first, second);

        let row = sqlx::query("SELECT COUNT(*) AS n FROM members")
            .fetch_one(&pool)
            .await
            .expect("count");
        assert_eq!(row.get::<i64, _>("n"), demo_offers().len() as i64);
    }
}
