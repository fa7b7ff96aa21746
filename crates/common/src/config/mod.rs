//! Configuration management for ShopSearch services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Document store connection
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,

    /// Semantic ranker connection
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Field mapping and request defaults for the search pipeline
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster, e.g. http://localhost:9200
    #[serde(default = "default_es_url")]
    pub url: String,

    /// Basic auth user (applied only together with a password)
    pub username: Option<String>,

    /// Basic auth password
    pub password: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_es_timeout")]
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    /// API base URL (for custom endpoints)
    #[serde(default = "default_openai_base")]
    pub api_base: String,

    /// API key for the completion service
    #[serde(default)]
    pub api_key: String,

    /// Model to use
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

/// Everything the pipeline needs to know about index layout.
///
/// Built once at start and shared read-only by every request.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub fields: FieldsConfig,

    #[serde(default)]
    pub nested: NestedConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub request: RequestConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    /// Product documents (index or alias)
    #[serde(default = "default_product_index")]
    pub product_index: String,

    /// Concept vocabulary documents
    #[serde(default = "default_concept_index")]
    pub concept_index: String,

    /// Keyword field holding the lookup terms of a concept
    #[serde(default = "default_search_terms_field")]
    pub search_terms_field: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldsConfig {
    /// Analyzed product name
    #[serde(default = "default_name_field")]
    pub name: String,

    /// Shingled product name for phrase boosting
    #[serde(default = "default_name_shingles_field")]
    pub name_shingles: String,

    /// Exact brand field used by the brand facet
    #[serde(default = "default_brand_keyword_field")]
    pub brand_keyword: String,

    /// Numeric price field used by the price facet
    #[serde(default = "default_price_field")]
    pub price: String,

    /// Sub-field suffix for exact matching on root concept fields
    #[serde(default = "default_keyword_suffix")]
    pub keyword_suffix: String,

    /// Concept type kept by the category-relaxed stage
    #[serde(default = "default_category_type")]
    pub category_type: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NestedConfig {
    /// Nested path of the SKU variants
    #[serde(default = "default_skus_path")]
    pub skus: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Facet name of the brand term counts
    #[serde(default = "default_brand_facet")]
    pub brand: String,

    /// Facet name of the price buckets
    #[serde(default = "default_price_ranges_facet")]
    pub price_ranges: String,

    #[serde(default = "default_cheap_label")]
    pub cheap: String,

    #[serde(default = "default_average_label")]
    pub average: String,

    #[serde(default = "default_expensive_label")]
    pub expensive: String,

    /// Upper bound (exclusive) of the cheap bucket
    #[serde(default = "default_cheap_price")]
    pub cheap_price: f64,

    /// Lower bound (inclusive) of the expensive bucket
    #[serde(default = "default_expensive_price")]
    pub expensive_price: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestConfig {
    /// Page size when the request carries none
    #[serde(default = "default_query_size")]
    pub default_size: u32,

    /// Page number when the request carries none
    #[serde(default)]
    pub default_page: u32,

    /// Upper bound of the candidate pool sent to the semantic ranker
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: u32,

    /// Maximum ids accepted from the semantic ranker
    #[serde(default = "default_max_ranked_ids")]
    pub max_ranked_ids: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_es_url() -> String { "http://localhost:9200".to_string() }
fn default_es_timeout() -> u64 { 10 }
fn default_openai_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_openai_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.0 }
fn default_max_tokens() -> u32 { 512 }
fn default_openai_timeout() -> u64 { 30 }
fn default_product_index() -> String { "products".to_string() }
fn default_concept_index() -> String { "concepts".to_string() }
fn default_search_terms_field() -> String { "search_terms".to_string() }
fn default_name_field() -> String { "name".to_string() }
fn default_name_shingles_field() -> String { "name.shingles".to_string() }
fn default_brand_keyword_field() -> String { "brand.keyword".to_string() }
fn default_price_field() -> String { "price".to_string() }
fn default_keyword_suffix() -> String { "keyword".to_string() }
fn default_category_type() -> String { "category".to_string() }
fn default_skus_path() -> String { "skus".to_string() }
fn default_brand_facet() -> String { "brand".to_string() }
fn default_price_ranges_facet() -> String { "price_ranges".to_string() }
fn default_cheap_label() -> String { "Cheap".to_string() }
fn default_average_label() -> String { "Average".to_string() }
fn default_expensive_label() -> String { "Expensive".to_string() }
fn default_cheap_price() -> f64 { 100.0 }
fn default_expensive_price() -> f64 { 500.0 }
fn default_query_size() -> u32 { 10 }
fn default_candidate_pool_size() -> u32 { 1000 }
fn default_max_ranked_ids() -> usize { 20 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "shopsearch".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // e.g., APP__SEARCH__REQUEST__DEFAULT_SIZE=20
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let request = &self.search.request;
        let aggregation = &self.search.aggregation;

        if request.default_size == 0 {
            return Err(AppError::Configuration {
                message: "search.request.default_size must be greater than zero".to_string(),
            });
        }

        if request.candidate_pool_size == 0 {
            return Err(AppError::Configuration {
                message: "search.request.candidate_pool_size must be greater than zero".to_string(),
            });
        }

        if request.max_ranked_ids == 0 {
            return Err(AppError::Configuration {
                message: "search.request.max_ranked_ids must be greater than zero".to_string(),
            });
        }

        if aggregation.cheap_price >= aggregation.expensive_price {
            return Err(AppError::Configuration {
                message: format!(
                    "price thresholds out of order: cheap_price {} >= expensive_price {}",
                    aggregation.cheap_price, aggregation.expensive_price
                ),
            });
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_es_url(),
            username: None,
            password: None,
            timeout_secs: default_es_timeout(),
        }
    }
}

impl ElasticsearchConfig {
    /// Credentials for basic auth, present only when both parts are non-blank
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.username.as_deref().filter(|u| !u.trim().is_empty())?;
        let pass = self.password.as_deref().filter(|p| !p.trim().is_empty())?;
        Some((user, pass))
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_base(),
            api_key: String::new(),
            model: default_openai_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            product_index: default_product_index(),
            concept_index: default_concept_index(),
            search_terms_field: default_search_terms_field(),
        }
    }
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            name: default_name_field(),
            name_shingles: default_name_shingles_field(),
            brand_keyword: default_brand_keyword_field(),
            price: default_price_field(),
            keyword_suffix: default_keyword_suffix(),
            category_type: default_category_type(),
        }
    }
}

impl Default for NestedConfig {
    fn default() -> Self {
        Self { skus: default_skus_path() }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            brand: default_brand_facet(),
            price_ranges: default_price_ranges_facet(),
            cheap: default_cheap_label(),
            average: default_average_label(),
            expensive: default_expensive_label(),
            cheap_price: default_cheap_price(),
            expensive_price: default_expensive_price(),
        }
    }
}

impl AggregationConfig {
    /// Price bucket labels in their fixed response order
    pub fn price_labels(&self) -> [&str; 3] {
        [&self.cheap, &self.average, &self.expensive]
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_size: default_query_size(),
            default_page: 0,
            candidate_pool_size: default_candidate_pool_size(),
            max_ranked_ids: default_max_ranked_ids(),
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}
