//! AI model and provider catalog.
//!
//! The catalog is a map of provider id to provider record, each holding a
//! map of model id to model record (the `models.dev` `api.json` layout).
//! Unknown fields are ignored and missing ones default, so upstream
//! additions never break parsing.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Catalog;
use crate::error::{Result, ServerError};
use crate::fetch::RemoteSource;

// ============================================================================
// Catalog types
// ============================================================================

/// All providers keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelsCatalog {
    pub providers: BTreeMap<String, Provider>,
}

/// A model provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Provider {
    pub id: String,
    pub name: String,
    /// Environment variables the provider reads credentials from.
    pub env: Vec<String>,
    /// npm package implementing the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npm: Option<String>,
    /// Base API URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    /// Documentation URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub models: BTreeMap<String, Model>,
}

/// A single model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: String,
    pub name: String,
    pub attachment: bool,
    pub reasoning: bool,
    pub tool_call: bool,
    pub temperature: bool,
    pub open_weights: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Modalities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Cost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
}

/// Input and output modalities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modalities {
    pub input: Vec<String>,
    pub output: Vec<String>,
}

/// Price per million tokens, in USD.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cost {
    pub input: f64,
    pub output: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write: Option<f64>,
}

/// Token limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limit {
    pub context: u64,
    pub output: u64,
}

#[async_trait]
impl Catalog for ModelsCatalog {
    const NAME: &'static str = "models catalog";
    const CACHE_FILE: &'static str = "models.json";

    async fn fetch(source: &dyn RemoteSource, url: &str) -> Result<Self> {
        let raw = source.fetch_json(url).await?;
        let mut catalog: ModelsCatalog = serde_json::from_value(raw)
            .map_err(|e| ServerError::fetch(url, format!("unexpected catalog shape: {}", e)))?;
        catalog.normalize();
        Ok(catalog)
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Ordering for model listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelSort {
    /// Provider id, then model id.
    #[default]
    Name,
    /// Newest release first.
    ReleaseDate,
    /// Largest context window first.
    Context,
    /// Cheapest input price first.
    InputCost,
}

impl FromStr for ModelSort {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "release_date" | "release" => Ok(Self::ReleaseDate),
            "context" => Ok(Self::Context),
            "input_cost" | "cost" => Ok(Self::InputCost),
            other => Err(ServerError::invalid_argument(
                "sort_by",
                format!(
                    "expected one of name, release_date, context, input_cost; got '{}'",
                    other
                ),
            )),
        }
    }
}

/// Filters for [`ModelsCatalog::query`].
#[derive(Debug, Clone, Default)]
pub struct ModelQuery {
    pub provider: Option<String>,
    /// Case-insensitive substring of model id or name.
    pub search: Option<String>,
    pub tool_call: Option<bool>,
    pub reasoning: Option<bool>,
    pub attachment: Option<bool>,
    pub open_weights: Option<bool>,
    pub sort: ModelSort,
    pub limit: Option<usize>,
}

impl ModelQuery {
    fn matches(&self, model: &Model) -> bool {
        let flag = |want: Option<bool>, have: bool| want.is_none_or(|w| w == have);

        flag(self.tool_call, model.tool_call)
            && flag(self.reasoning, model.reasoning)
            && flag(self.attachment, model.attachment)
            && flag(self.open_weights, model.open_weights)
            && self.search.as_deref().is_none_or(|needle| {
                let needle = needle.to_lowercase();
                model.id.to_lowercase().contains(&needle)
                    || model.name.to_lowercase().contains(&needle)
            })
    }
}

/// Compact listing row for a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub name: String,
    pub model_count: usize,
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
}

/// Compact listing row for a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub provider: String,
    pub id: String,
    pub name: String,
    pub tool_call: bool,
    pub reasoning: bool,
    pub attachment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
}

impl ModelSummary {
    fn new(provider: &str, model: &Model) -> Self {
        Self {
            provider: provider.to_string(),
            id: model.id.clone(),
            name: model.name.clone(),
            tool_call: model.tool_call,
            reasoning: model.reasoning,
            attachment: model.attachment,
            context: model.limit.as_ref().map(|l| l.context),
            input_cost: model.cost.as_ref().map(|c| c.input),
            output_cost: model.cost.as_ref().map(|c| c.output),
            release_date: model.release_date.clone(),
        }
    }
}

impl ModelsCatalog {
    /// Fill missing ids from their map keys.
    pub fn normalize(&mut self) {
        for (provider_id, provider) in &mut self.providers {
            if provider.id.is_empty() {
                provider.id = provider_id.clone();
            }
            if provider.name.is_empty() {
                provider.name = provider_id.clone();
            }
            for (model_id, model) in &mut provider.models {
                if model.id.is_empty() {
                    model.id = model_id.clone();
                }
                if model.name.is_empty() {
                    model.name = model_id.clone();
                }
            }
        }
    }

    /// Look up a provider by id.
    #[must_use]
    pub fn provider(&self, id: &str) -> Option<&Provider> {
        self.providers.get(id)
    }

    /// Look up a provider, failing with the list of known ids.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::ProviderNotFound` when absent.
    pub fn require_provider(&self, id: &str) -> Result<&Provider> {
        self.provider(id).ok_or_else(|| ServerError::ProviderNotFound {
            provider: id.to_string(),
            available: self.providers.keys().cloned().collect(),
        })
    }

    /// Look up a model under a provider.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::ProviderNotFound` or `ServerError::ModelNotFound`
    /// listing the valid alternatives.
    pub fn require_model(&self, provider_id: &str, model_id: &str) -> Result<&Model> {
        let provider = self.require_provider(provider_id)?;
        provider
            .models
            .get(model_id)
            .ok_or_else(|| ServerError::ModelNotFound {
                provider: provider_id.to_string(),
                model: model_id.to_string(),
                available: provider.models.keys().cloned().collect(),
            })
    }

    /// Provider listing, optionally filtered by a case-insensitive
    /// substring of id or name.
    #[must_use]
    pub fn provider_summaries(&self, search: Option<&str>) -> Vec<ProviderSummary> {
        let needle = search.map(str::to_lowercase);
        self.providers
            .iter()
            .filter(|(id, provider)| {
                needle.as_deref().is_none_or(|n| {
                    id.to_lowercase().contains(n) || provider.name.to_lowercase().contains(n)
                })
            })
            .map(|(id, provider)| ProviderSummary {
                id: id.clone(),
                name: provider.name.clone(),
                model_count: provider.models.len(),
                env: provider.env.clone(),
                doc: provider.doc.clone(),
                api: provider.api.clone(),
            })
            .collect()
    }

    /// Filtered, sorted model listing.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::ProviderNotFound` when the query names an
    /// unknown provider.
    pub fn query(&self, query: &ModelQuery) -> Result<Vec<ModelSummary>> {
        let providers: Vec<(&String, &Provider)> = match &query.provider {
            Some(id) => {
                let provider = self.require_provider(id)?;
                vec![(id, provider)]
            }
            None => self.providers.iter().collect(),
        };

        let mut rows: Vec<ModelSummary> = providers
            .into_iter()
            .flat_map(|(pid, provider)| {
                provider
                    .models
                    .values()
                    .filter(|m| query.matches(m))
                    .map(move |m| ModelSummary::new(pid, m))
            })
            .collect();

        match query.sort {
            ModelSort::Name => {
                rows.sort_by(|a, b| a.provider.cmp(&b.provider).then(a.id.cmp(&b.id)))
            }
            ModelSort::ReleaseDate => rows.sort_by(|a, b| b.release_date.cmp(&a.release_date)),
            ModelSort::Context => rows.sort_by(|a, b| b.context.cmp(&a.context)),
            ModelSort::InputCost => rows.sort_by(|a, b| {
                // Unpriced models sort last
                let key = |r: &ModelSummary| r.input_cost.unwrap_or(f64::INFINITY);
                key(a).total_cmp(&key(b))
            }),
        }

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::sample_models_catalog;
    use crate::testing::MockSource;

    fn catalog() -> ModelsCatalog {
        let mut catalog: ModelsCatalog = serde_json::from_value(sample_models_catalog()).unwrap();
        catalog.normalize();
        catalog
    }

    #[tokio::test]
    async fn test_fetch_parses_and_normalizes() {
        let source = MockSource::new().with_response("u", sample_models_catalog());
        let catalog = ModelsCatalog::fetch(&source, "u").await.unwrap();
        let model = catalog.require_model("openai", "gpt-4o-mini").unwrap();
        // id omitted in the fixture, filled from the key
        assert_eq!(model.id, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_fetch_rejects_wrong_shape() {
        let source = MockSource::new().with_response("u", serde_json::json!([1, 2, 3]));
        let err = ModelsCatalog::fetch(&source, "u").await.unwrap_err();
        assert!(matches!(err, ServerError::Fetch { .. }));
    }

    #[test]
    fn test_unknown_provider_lists_available() {
        match catalog().require_provider("nope") {
            Err(ServerError::ProviderNotFound { available, .. }) => {
                assert_eq!(available, vec!["anthropic", "ollama", "openai"]);
            }
            other => panic!("expected ProviderNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_model_lists_provider_models() {
        match catalog().require_model("anthropic", "claude-1") {
            Err(ServerError::ModelNotFound { available, .. }) => {
                assert!(available.contains(&"claude-sonnet-4".to_string()));
            }
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_query_filters_by_capability() {
        let rows = catalog()
            .query(&ModelQuery {
                reasoning: Some(true),
                ..Default::default()
            })
            .unwrap();
        assert!(!rows.is_empty());
        assert!(rows.iter().all(|r| r.reasoning));
    }

    #[test]
    fn test_query_search_is_case_insensitive() {
        let rows = catalog()
            .query(&ModelQuery {
                search: Some("SONNET".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "claude-sonnet-4");
    }

    #[test]
    fn test_query_sort_by_context_descending() {
        let rows = catalog()
            .query(&ModelQuery {
                sort: ModelSort::Context,
                ..Default::default()
            })
            .unwrap();
        let contexts: Vec<u64> = rows.iter().filter_map(|r| r.context).collect();
        let mut sorted = contexts.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(contexts, sorted);
    }

    #[test]
    fn test_query_sort_by_cost_puts_unpriced_last() {
        let rows = catalog()
            .query(&ModelQuery {
                sort: ModelSort::InputCost,
                ..Default::default()
            })
            .unwrap();
        assert!(rows.last().unwrap().input_cost.is_none());
        assert!(rows[0].input_cost.is_some());
    }

    #[test]
    fn test_query_limit_and_provider() {
        let rows = catalog()
            .query(&ModelQuery {
                provider: Some("anthropic".into()),
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provider, "anthropic");
    }

    #[test]
    fn test_query_unknown_provider_errors() {
        let err = catalog()
            .query(&ModelQuery {
                provider: Some("missing".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ServerError::ProviderNotFound { .. }));
    }

    #[test]
    fn test_provider_summaries_search() {
        let rows = catalog().provider_summaries(Some("open"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "openai");
        assert_eq!(rows[0].model_count, 2);
    }

    #[test]
    fn test_model_sort_from_str() {
        assert_eq!("context".parse::<ModelSort>().unwrap(), ModelSort::Context);
        assert_eq!(
            "release_date".parse::<ModelSort>().unwrap(),
            ModelSort::ReleaseDate
        );
        assert!("popularity".parse::<ModelSort>().is_err());
    }
}
