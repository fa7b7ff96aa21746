//! ShopSearch Common Library
//!
//! Shared code for ShopSearch services including:
//! - Configuration management
//! - Error types and handling
//! - Elasticsearch REST client
//! - Chat completion client for the semantic ranker

pub mod config;
pub mod elastic;
pub mod errors;
pub mod llm;

// Re-export commonly used types
pub use config::{AppConfig, SearchConfig};
pub use elastic::ElasticClient;
pub use errors::{AppError, Result};
pub use llm::ChatClient;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
