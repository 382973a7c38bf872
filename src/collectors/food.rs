//! Nutrition facts from Open Food Facts, one category page per work item.
//!
//! The API documents 10 requests per minute, hence the 6-second default
//! delay. Pages cannot be probed against the ledger without fetching them,
//! so the probe always reports absent and deduplication happens at the
//! (category, product_name) key on insert.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::collectors::{Collector, StoreSummary};
use crate::config::ApiConfig;
use crate::database_ops::db::Db;
use crate::database_ops::ledger::{insert_food_if_absent, FoodProduct, InsertOutcome, Presence};
use crate::fetch::{FetchClient, FetchFailure, FetchOutcome};
use crate::util::env::env_parse;
use crate::work::{food_category_pages, WorkItem};

const PAGE_FIELDS: &str = "product_name,categories_tags,nutriments,serving_size";

pub struct FoodCollector {
    endpoint: Url,
    page_size: u32,
    delay: Duration,
}

impl FoodCollector {
    pub fn new(api: &ApiConfig) -> Self {
        Self {
            endpoint: api.food_endpoint.clone(),
            page_size: env_parse("FOOD_PAGE_SIZE", 25u32),
            delay: Duration::from_millis(env_parse("FOOD_DELAY_MS", 6_000u64)),
        }
    }
}

/// Normalize one category page into product records. Products without a name
/// are dropped; every nutriment is optional.
pub fn extract_products(category: &str, payload: &Value) -> Vec<FoodProduct> {
    let Some(products) = payload.get("products").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    products
        .iter()
        .filter_map(|product| {
            let product_name = product
                .get("product_name")
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())?
                .to_string();
            let nutriments = product.get("nutriments");
            let nutriment =
                |field: &str| nutriments.and_then(|n| n.get(field)).and_then(|v| v.as_f64());
            Some(FoodProduct {
                category: category.to_string(),
                product_name,
                calories: nutriment("energy-kcal_100g"),
                protein: nutriment("proteins_100g"),
                fat: nutriment("fat_100g"),
                sugar: nutriment("sugars_100g"),
                sodium: nutriment("sodium_100g"),
                serving_size: product
                    .get("serving_size")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
            })
        })
        .collect()
}

#[async_trait]
impl Collector for FoodCollector {
    fn collection(&self) -> &'static str {
        "food"
    }

    fn request_delay(&self) -> Duration {
        self.delay
    }

    fn work_items(&self) -> Vec<WorkItem> {
        food_category_pages()
    }

    async fn probe(&self, _db: &Db, _item: &WorkItem) -> Result<Presence> {
        Ok(Presence::Absent)
    }

    async fn fetch_item(&self, http: &FetchClient, item: &WorkItem) -> FetchOutcome {
        let WorkItem::CategoryPage { category, page } = item else {
            return FetchOutcome::Failure(FetchFailure::Malformed("unexpected work item".into()));
        };
        let url = match self
            .endpoint
            .join(&format!("category/{}.json", urlencoding::encode(category)))
        {
            Ok(url) => url,
            Err(err) => {
                return FetchOutcome::Failure(FetchFailure::Malformed(err.to_string()));
            }
        };
        let query = [
            ("page_size", self.page_size.to_string()),
            ("page", page.to_string()),
            ("fields", PAGE_FIELDS.to_string()),
        ];
        match http.get_json(url, &query).await {
            FetchOutcome::Success(payload) => {
                if extract_products(category, &payload).is_empty() {
                    FetchOutcome::Empty
                } else {
                    FetchOutcome::Success(payload)
                }
            }
            other => other,
        }
    }

    async fn store(
        &self,
        db: &Db,
        item: &WorkItem,
        payload: &Value,
        _presence: Presence,
    ) -> Result<StoreSummary> {
        let WorkItem::CategoryPage { category, .. } = item else {
            return Ok(StoreSummary::default());
        };
        let mut summary = StoreSummary::default();
        for record in extract_products(category, payload) {
            match insert_food_if_absent(db, &record).await? {
                InsertOutcome::Inserted => summary.inserted += 1,
                InsertOutcome::AlreadyPresent => summary.already_present += 1,
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nutriments() {
        let payload = json!({
            "products": [{
                "product_name": "Granola Crunch",
                "nutriments": {
                    "energy-kcal_100g": 450.0,
                    "proteins_100g": 8.5,
                    "sugars_100g": 22.0
                },
                "serving_size": "40g"
            }]
        });
        let records = extract_products("granola-bars", &payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].calories, Some(450.0));
        assert_eq!(records[0].protein, Some(8.5));
        assert_eq!(records[0].fat, None);
        assert_eq!(records[0].serving_size.as_deref(), Some("40g"));
    }

    #[test]
    fn unnamed_products_are_dropped() {
        let payload = json!({
            "products": [
                {"nutriments": {"fat_100g": 1.0}},
                {"product_name": "   "},
                {"product_name": "Juice"}
            ]
        });
        let records = extract_products("juices", &payload);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_name, "Juice");
    }

    #[test]
    fn missing_products_block_is_empty() {
        assert!(extract_products("cereals", &json!({})).is_empty());
    }
}
