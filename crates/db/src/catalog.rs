use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::Row;

use finda_core::search::{CatalogQuery, SearchError, SearchResult};
use finda_core::{
    build_search_result, BaseProductId, FieldSlot, Lexicon, MemberDetails, MemberId, MemberOffer,
    RankingWeights,
};

use crate::store::RepositoryError;
use crate::DbPool;

/// Catalog query over SQLite. Hard filters are pushed into the WHERE clause;
/// relevance scoring runs in `finda-core` so this engine ranks identically to
/// the in-memory one.
pub struct SqlCatalogQuery {
    pool: DbPool,
    weights: RankingWeights,
}

impl SqlCatalogQuery {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, weights: RankingWeights::default() }
    }

    pub fn with_weights(pool: DbPool, weights: RankingWeights) -> Self {
        Self { pool, weights }
    }

    async fn fetch_filtered(
        &self,
        details: &MemberDetails,
    ) -> Result<Vec<MemberOffer>, RepositoryError> {
        let mut builder = sqlx::QueryBuilder::new(
            "SELECT id, base_product_id, name, description, brand, category, city, \
             price, shop_score, has_warranty, attributes_json FROM members WHERE 1 = 1",
        );

        if !details.is_excluded(FieldSlot::Brand) && !details.brands.is_empty() {
            builder.push(" AND LOWER(brand) IN (");
            push_folded_values(&mut builder, &details.brands);
            builder.push(")");
        }
        if !details.is_excluded(FieldSlot::Category) && !details.categories.is_empty() {
            builder.push(" AND LOWER(category) IN (");
            push_folded_values(&mut builder, &details.categories);
            builder.push(")");
        }
        if !details.is_excluded(FieldSlot::City) && !details.cities.is_empty() {
            builder.push(" AND LOWER(city) IN (");
            push_folded_values(&mut builder, &details.cities);
            builder.push(")");
        }
        if !details.is_excluded(FieldSlot::Price) {
            if let Some(min_price) = details.min_price {
                builder.push(" AND price >= ").push_bind(min_price);
            }
            if let Some(max_price) = details.max_price {
                builder.push(" AND price <= ").push_bind(max_price);
            }
        }
        if !details.is_excluded(FieldSlot::ShopScore) {
            if let Some(min_shop_score) = details.min_shop_score {
                builder.push(" AND shop_score >= ").push_bind(min_shop_score);
            }
        }
        if !details.is_excluded(FieldSlot::Warranty) {
            if let Some(required) = details.warranty_required {
                builder.push(" AND has_warranty = ").push_bind(i64::from(required));
            }
        }
        if !details.keywords.is_empty() {
            builder.push(" AND (");
            let mut first = true;
            for keyword in &details.keywords {
                if !first {
                    builder.push(" OR ");
                }
                first = false;
                let pattern = format!("%{}%", keyword.to_lowercase());
                builder.push("(LOWER(name) LIKE ").push_bind(pattern.clone());
                builder.push(" OR LOWER(description) LIKE ").push_bind(pattern);
                builder.push(")");
            }
            builder.push(")");
        }
        if !details.is_excluded(FieldSlot::Feature) && !details.product_attributes.is_empty() {
            for (name, value) in &details.product_attributes {
                builder
                    .push(" AND LOWER(COALESCE(json_extract(attributes_json, ")
                    .push_bind(format!("$.{}", name.to_lowercase()))
                    .push("), '')) = ")
                    .push_bind(value.to_lowercase());
            }
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_offer).collect()
    }
}

pub async fn count_members(pool: &DbPool) -> Result<u64, RepositoryError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM members").fetch_one(pool).await?;
    Ok(row.get::<i64, _>("n") as u64)
}

/// Distinct brand and city values from the catalog, for the rule-based
/// extractor's lexicon.
pub async fn load_lexicon(pool: &DbPool) -> Result<Lexicon, RepositoryError> {
    let brand_rows = sqlx::query("SELECT DISTINCT brand FROM members ORDER BY brand")
        .fetch_all(pool)
        .await?;
    let city_rows = sqlx::query("SELECT DISTINCT city FROM members ORDER BY city")
        .fetch_all(pool)
        .await?;

    Ok(Lexicon {
        brands: brand_rows.iter().map(|row| row.get("brand")).collect(),
        cities: city_rows.iter().map(|row| row.get("city")).collect(),
    })
}

fn push_folded_values(
    builder: &mut sqlx::QueryBuilder<'_, sqlx::Sqlite>,
    values: &std::collections::BTreeSet<String>,
) {
    let mut separated = builder.separated(", ");
    for value in values {
        separated.push_bind(value.to_lowercase());
    }
}

fn row_to_offer(row: &sqlx::sqlite::SqliteRow) -> Result<MemberOffer, RepositoryError> {
    let attributes_json: String = row.get("attributes_json");
    let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes_json)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(MemberOffer {
        id: MemberId(row.get("id")),
        base_product_id: BaseProductId(row.get("base_product_id")),
        name: row.get("name"),
        description: row.get("description"),
        brand: row.get("brand"),
        category: row.get("category"),
        city: row.get("city"),
        price: row.get("price"),
        shop_score: row.get("shop_score"),
        has_warranty: row.get::<i64, _>("has_warranty") != 0,
        attributes,
    })
}

#[async_trait]
impl CatalogQuery for SqlCatalogQuery {
    async fn search(
        &self,
        details: &MemberDetails,
        top_k: usize,
    ) -> Result<SearchResult, SearchError> {
        let matching = self
            .fetch_filtered(details)
            .await
            .map_err(|error| SearchError::Backend(error.to_string()))?;
        Ok(build_search_result(matching, details, top_k, &self.weights))
    }
}
