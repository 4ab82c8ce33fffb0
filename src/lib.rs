//! # Legal-Code Sync & Search Service
//!
//! ## Overview
//! This library keeps a searchable index of legal-code sections synchronized with a
//! durable document store and serves relevance-ranked queries over that index.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `corpus`: Typed, validated representation of the hierarchical input (chapter → section)
//! - `index`: Search-index boundary and the full-rebuild index writer
//! - `store`: Document-store boundary and the upsert-by-natural-key reconciler
//! - `notify`: Fire-and-forget notification to the downstream backend
//! - `query`: Multi-field, fuzzy, phrase-aware search request planning
//! - `gateway`: Query execution and result mapping
//! - `sync`: One synchronization run orchestrating index rebuild and store reconciliation
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Legal-code sections (JSON, chapter → section title → section text), search queries (text)
//! - **Output**: Synchronized index and store, ranked search results with highlighted snippets
//! - **Guarantees**: No duplicate natural keys in the store across repeated runs; partial
//!   record failures never abort a run
//!
//! ## Usage
//! ```rust,no_run
//! use law_search_sync::{Config, Corpus, SyncRun};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config.toml")?;
//!     let run = SyncRun::from_config(&config)?;
//!     let corpus = Corpus::from_json(&serde_json::from_str(r#"{"Chapter 1": {"Definitions": "..."}}"#)?)?;
//!     let report = run.execute(&corpus).await;
//!     println!("Indexed {} sections", report.indexed);
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod corpus;
pub mod index;
pub mod store;
pub mod notify;
pub mod query;
pub mod gateway;
pub mod sync;
pub mod api;

// Re-exports for convenience
pub use config::Config;
pub use corpus::Corpus;
pub use errors::{Result, SyncError};
pub use gateway::{SearchGateway, SearchResult};
pub use sync::{SyncReport, SyncRun};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identifier assigned by the document store on insert
pub type RecordId = Uuid;

/// Flat projection of one (chapter, section) pair submitted to the search index.
///
/// Carries a derived `combined_text` field so the fuzzy query clause has a single
/// target field covering the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Chapter name
    pub chapter: String,
    /// Section title within the chapter
    pub section_title: String,
    /// Full section text (may be empty)
    pub section_content: String,
    /// Concatenation of the three source fields, for fuzzy matching
    #[serde(default)]
    pub combined_text: String,
}

impl IndexRecord {
    /// Build a record from its source coordinates, deriving `combined_text`
    pub fn new(chapter: &str, section_title: &str, section_content: &str) -> Self {
        Self {
            chapter: chapter.to_string(),
            section_title: section_title.to_string(),
            section_content: section_content.to_string(),
            combined_text: format!("{} {} {}", chapter, section_title, section_content),
        }
    }

    /// The natural key identifying this record across index and store
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.chapter, &self.section_title)
    }
}

/// Persisted section record keyed by the natural key (chapter, section_title)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Chapter name
    pub chapter: String,
    /// Section title within the chapter
    pub section_title: String,
    /// Full section text
    pub section_content: String,
}

/// Application state shared across API handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub index: Arc<dyn index::SearchIndex>,
    pub store: Arc<dyn store::DocumentStore>,
    pub gateway: Arc<gateway::SearchGateway>,
    pub notifier: Option<Arc<notify::NotificationClient>>,
}
