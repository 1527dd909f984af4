//! Outbound API clients and the audit trail for their responses.
//!
//! Both clients cache successful upstream responses through the shared
//! [`Cache`] handle: recipe lookups for an hour, product searches for six.
//! Every worker-driven call also lands a timestamped JSON audit file via
//! [`save_api_response`] so upstream payloads can be replayed offline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::debug;

use crate::cache::config::ttl;
use crate::cache::{Cache, CacheParams, build_key};
use crate::domain::recipes::RecipeIngredient;
use crate::infra::error::InfraError;

/// TheMealDB carries up to twenty ingredient/measure column pairs per meal.
const MEALDB_INGREDIENT_SLOTS: usize = 20;

const PRODUCT_PAGE_SIZE: u32 = 5;

fn http_client(timeout: Duration) -> Result<reqwest::Client, InfraError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("ladle/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Client for TheMealDB recipe database.
pub struct TheMealDbClient {
    http: reqwest::Client,
    base_url: String,
    cache: Cache,
}

impl TheMealDbClient {
    /// `base_url` is the host root; the versioned path and API key are
    /// appended here (the free tier uses key `1`).
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        cache: Cache,
    ) -> Result<Self, InfraError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: format!("{}/api/json/v1/{api_key}", base_url.trim_end_matches('/')),
            cache,
        })
    }

    /// Search meals by name. Responses are cached for an hour.
    pub async fn search_by_name(&self, name: &str) -> Result<Value, InfraError> {
        let mut params = CacheParams::new();
        params.insert("name".to_string(), name.to_lowercase());
        let key = build_key("api:themealdb:search", None, &params);

        self.cache
            .get_or_set(&key, Some(ttl::HOUR), || async {
                debug!(name, "querying TheMealDB search");
                let response = self
                    .http
                    .get(format!("{}/search.php", self.base_url))
                    .query(&[("s", name)])
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.json::<Value>().await?)
            })
            .await
    }

    /// Fetch one random meal. Never cached: the point is a different answer
    /// each time.
    pub async fn random_meal(&self) -> Result<Value, InfraError> {
        debug!("querying TheMealDB random");
        let response = self
            .http
            .get(format!("{}/random.php", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

/// Client for the Open Food Facts product search API.
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
    cache: Cache,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: &str, timeout: Duration, cache: Cache) -> Result<Self, InfraError> {
        Ok(Self {
            http: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    /// Search products by free text. Responses are cached for six hours;
    /// the catalog churns slowly.
    pub async fn search(&self, query: &str) -> Result<Value, InfraError> {
        let mut params = CacheParams::new();
        params.insert("query".to_string(), query.to_lowercase());
        let key = build_key("api:openfoodfacts:search", None, &params);

        self.cache
            .get_or_set(&key, Some(ttl::SIX_HOURS), || async {
                debug!(query, "querying Open Food Facts search");
                let page_size = PRODUCT_PAGE_SIZE.to_string();
                let response = self
                    .http
                    .get(format!("{}/search", self.base_url))
                    .query(&[
                        ("search_terms", query),
                        ("page_size", page_size.as_str()),
                        ("json", "1"),
                    ])
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.json::<Value>().await?)
            })
            .await
    }
}

/// Recipe extracted from a TheMealDB meal object, ready for import.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RecipeImport {
    pub name: String,
    pub category: Option<String>,
    pub area: Option<String>,
    pub instructions: Option<String>,
    pub thumbnail: Option<String>,
    pub youtube: Option<String>,
    pub source: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
}

fn non_empty_str(meal: &Value, field: &str) -> Option<String> {
    meal.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flatten one meal object from a TheMealDB response into a [`RecipeImport`].
///
/// The upstream schema spreads ingredients over `strIngredient1..20` and
/// `strMeasure1..20`, padding unused slots with empty strings or nulls.
pub fn extract_recipe(meal: &Value) -> Option<RecipeImport> {
    let name = non_empty_str(meal, "strMeal")?;

    let mut ingredients = Vec::new();
    for slot in 1..=MEALDB_INGREDIENT_SLOTS {
        let Some(ingredient) = non_empty_str(meal, &format!("strIngredient{slot}")) else {
            continue;
        };
        let measure = non_empty_str(meal, &format!("strMeasure{slot}")).unwrap_or_default();
        ingredients.push(RecipeIngredient {
            name: ingredient,
            measure,
        });
    }

    Some(RecipeImport {
        name,
        category: non_empty_str(meal, "strCategory"),
        area: non_empty_str(meal, "strArea"),
        instructions: non_empty_str(meal, "strInstructions"),
        thumbnail: non_empty_str(meal, "strMealThumb"),
        youtube: non_empty_str(meal, "strYoutube"),
        source: non_empty_str(meal, "strSource"),
        ingredients,
    })
}

/// First meal of a TheMealDB response body, if any.
pub fn first_meal(body: &Value) -> Option<&Value> {
    body.get("meals")?.as_array()?.first()
}

/// Persist an upstream response as `{api}_{action}_{YYYYMMDD_HHMMSS}.json`
/// under `dir`, creating the directory if needed. Returns the written path.
pub async fn save_api_response(
    dir: &Path,
    api: &str,
    action: &str,
    data: &Value,
) -> Result<PathBuf, InfraError> {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))?;
    let path = dir.join(format!("{api}_{action}_{stamp}.json"));

    let body = json!({
        "api": api,
        "action": action,
        "data": data,
    });
    let bytes = serde_json::to_vec_pretty(&body)
        .map_err(|err| InfraError::Http {
            message: format!("audit payload serialization failed: {err}"),
        })?;

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(&path, bytes).await?;
    debug!(path = %path.display(), "saved api response");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal_fixture() -> Value {
        json!({
            "strMeal": "Arrabiata",
            "strCategory": "Vegetarian",
            "strArea": "Italian",
            "strInstructions": "Boil pasta. Make sauce.",
            "strMealThumb": "https://example.test/arrabiata.jpg",
            "strYoutube": "",
            "strSource": null,
            "strIngredient1": "penne rigate",
            "strMeasure1": "1 pound",
            "strIngredient2": "olive oil",
            "strMeasure2": "1/4 cup",
            "strIngredient3": "",
            "strMeasure3": "",
            "strIngredient4": null,
            "strMeasure4": null
        })
    }

    #[test]
    fn extract_flattens_ingredient_slots() {
        let recipe = extract_recipe(&meal_fixture()).expect("recipe");
        assert_eq!(recipe.name, "Arrabiata");
        assert_eq!(recipe.category.as_deref(), Some("Vegetarian"));
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].name, "penne rigate");
        assert_eq!(recipe.ingredients[0].measure, "1 pound");
        // Empty string fields read as absent.
        assert!(recipe.youtube.is_none());
        assert!(recipe.source.is_none());
    }

    #[test]
    fn extract_requires_a_name() {
        assert!(extract_recipe(&json!({"strCategory": "Soup"})).is_none());
        assert!(extract_recipe(&json!({"strMeal": "  "})).is_none());
    }

    #[test]
    fn first_meal_handles_null_meals() {
        // TheMealDB returns {"meals": null} for empty search results.
        assert!(first_meal(&json!({"meals": null})).is_none());
        assert!(first_meal(&json!({})).is_none());

        let body = json!({"meals": [{"strMeal": "Soup"}]});
        assert_eq!(first_meal(&body).unwrap()["strMeal"], json!("Soup"));
    }

    #[tokio::test]
    async fn save_api_response_writes_named_audit_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = save_api_response(
            dir.path(),
            "themealdb",
            "search_by_name",
            &json!({"meals": []}),
        )
        .await
        .expect("save");

        let file_name = path.file_name().unwrap().to_string_lossy();
        assert!(file_name.starts_with("themealdb_search_by_name_"));
        assert!(file_name.ends_with(".json"));
        // Stem carries the 15-char timestamp: YYYYMMDD_HHMMSS.
        let stamp = file_name
            .trim_start_matches("themealdb_search_by_name_")
            .trim_end_matches(".json");
        assert_eq!(stamp.len(), 15);

        let raw = tokio::fs::read_to_string(&path).await.expect("read");
        let body: Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(body["api"], json!("themealdb"));
        assert_eq!(body["action"], json!("search_by_name"));
        assert_eq!(body["data"]["meals"], json!([]));
    }

    #[tokio::test]
    async fn save_api_response_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("results");
        let path = save_api_response(&nested, "internal", "health_check", &json!({}))
            .await
            .expect("save");
        assert!(path.starts_with(&nested));
    }
}
