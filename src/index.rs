//! # Search Index Module
//!
//! ## Purpose
//! Boundary to the external search index plus the index writer implementing the
//! destructive full-refresh strategy: drop the index, recreate it with the fixed
//! section schema, and bulk-load the flattened corpus.
//!
//! ## Input/Output Specification
//! - **Input**: Corpus of law sections, index configuration
//! - **Output**: Rebuilt index, per-record bulk failures collected with error detail
//! - **Protocol**: Elasticsearch-compatible REST (HEAD/DELETE/PUT index, `_bulk` NDJSON, `_search`)
//!
//! ## Key Features
//! - `SearchIndex` trait at the seam so tests substitute fakes
//! - Bulk submission chunked at a fixed size for throughput
//! - Individual record failures collected, never aborting the batch
//!
//! ## Consistency
//! There is no atomic swap: a query racing a rebuild may observe an empty or
//! partial index. Accepted limitation of the full-refresh strategy.

use crate::config::IndexConfig;
use crate::errors::{Result, SyncError};
use crate::{Corpus, IndexRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a bulk submission: successful count plus collected failures
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkOutcome {
    /// Number of records accepted by the index
    pub indexed: usize,
    /// Records the index rejected, with error detail
    pub failures: Vec<RecordFailure>,
}

/// A single record the index rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Chapter of the failed record
    pub chapter: String,
    /// Section title of the failed record
    pub section_title: String,
    /// Error detail reported by the index
    pub reason: String,
}

/// Raw response of a search execution, mapped by the gateway
#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResponse {
    pub hits: RawHits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHits {
    pub total: RawTotal,
    pub hits: Vec<RawHit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTotal {
    pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_source")]
    pub source: IndexRecord,
    #[serde(rename = "_score")]
    pub score: Option<f32>,
    #[serde(default)]
    pub highlight: HashMap<String, Vec<String>>,
}

/// Consumed capability of the external search index
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Whether an index with this name exists
    async fn index_exists(&self, name: &str) -> Result<bool>;

    /// Delete an index entirely
    async fn delete_index(&self, name: &str) -> Result<()>;

    /// Create an index with the given mapping
    async fn create_index(&self, name: &str, mapping: &Value) -> Result<()>;

    /// Bulk-load records in chunks, collecting per-record failures
    async fn bulk_index(
        &self,
        name: &str,
        records: &[IndexRecord],
        chunk_size: usize,
    ) -> Result<BulkOutcome>;

    /// Execute a search request body against an index
    async fn search(&self, name: &str, body: &Value) -> Result<RawSearchResponse>;
}

/// Fixed schema for law-section records
pub fn section_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "chapter": {"type": "text"},
                "section_title": {"type": "text"},
                "section_content": {"type": "text"},
                "combined_text": {"type": "text"}
            }
        }
    })
}

/// HTTP client for an Elasticsearch-compatible search index
pub struct ElasticIndexClient {
    client: reqwest::Client,
    base_url: String,
}

impl ElasticIndexClient {
    /// Create a new client from index configuration
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SyncError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn index_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    /// Serialize one chunk as NDJSON bulk actions
    fn bulk_body(name: &str, chunk: &[IndexRecord]) -> Result<String> {
        let mut body = String::new();
        for record in chunk {
            let action = json!({"index": {"_index": name}});
            body.push_str(&serde_json::to_string(&action)?);
            body.push('\n');
            body.push_str(&serde_json::to_string(record)?);
            body.push('\n');
        }
        Ok(body)
    }
}

/// Per-item shape of a bulk response
#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<Value>,
}

#[async_trait]
impl SearchIndex for ElasticIndexClient {
    async fn index_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .head(self.index_url(name))
            .send()
            .await
            .map_err(|e| SyncError::IndexUnreachable {
                details: e.to_string(),
            })?;

        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(SyncError::IndexRequestFailed {
                status,
                body: String::new(),
            }),
        }
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.index_url(name))
            .send()
            .await
            .map_err(|e| SyncError::IndexUnreachable {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::IndexRequestFailed { status, body });
        }

        tracing::info!(index = %name, "Deleted existing index");
        Ok(())
    }

    async fn create_index(&self, name: &str, mapping: &Value) -> Result<()> {
        let response = self
            .client
            .put(self.index_url(name))
            .json(mapping)
            .send()
            .await
            .map_err(|e| SyncError::IndexUnreachable {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::IndexRequestFailed { status, body });
        }

        tracing::info!(index = %name, "Created new index");
        Ok(())
    }

    async fn bulk_index(
        &self,
        name: &str,
        records: &[IndexRecord],
        chunk_size: usize,
    ) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for chunk in records.chunks(chunk_size.max(1)) {
            let body = Self::bulk_body(name, chunk)?;

            let response = self
                .client
                .post(format!("{}/_bulk", self.base_url))
                .header("content-type", "application/x-ndjson")
                .body(body)
                .send()
                .await
                .map_err(|e| SyncError::IndexUnreachable {
                    details: e.to_string(),
                })?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(SyncError::IndexRequestFailed { status, body });
            }

            let parsed: BulkResponse =
                response.json().await.map_err(|e| SyncError::Serialization {
                    message: format!("Invalid bulk response: {}", e),
                })?;

            for (record, item) in chunk.iter().zip(parsed.items.iter()) {
                let error = item.get("index").and_then(|action| action.get("error"));
                match error {
                    Some(detail) => {
                        let reason = detail
                            .get("reason")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| detail.to_string());
                        tracing::warn!(
                            chapter = %record.chapter,
                            section = %record.section_title,
                            %reason,
                            "Record rejected by index"
                        );
                        outcome.failures.push(RecordFailure {
                            chapter: record.chapter.clone(),
                            section_title: record.section_title.clone(),
                            reason,
                        });
                    }
                    None => outcome.indexed += 1,
                }
            }
        }

        Ok(outcome)
    }

    async fn search(&self, name: &str, body: &Value) -> Result<RawSearchResponse> {
        let response = self
            .client
            .post(format!("{}/_search", self.index_url(name)))
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::IndexUnreachable {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::IndexRequestFailed { status, body });
        }

        response.json().await.map_err(|e| SyncError::Serialization {
            message: format!("Invalid search response: {}", e),
        })
    }
}

/// Rebuilds the search index from a corpus with the full-refresh strategy
pub struct IndexWriter {
    index: Arc<dyn SearchIndex>,
    index_name: String,
    chunk_size: usize,
}

impl IndexWriter {
    /// Create a writer targeting the configured index
    pub fn new(index: Arc<dyn SearchIndex>, index_name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            index,
            index_name: index_name.into(),
            chunk_size,
        }
    }

    /// Flatten the corpus into index records, chapters then sections in corpus order
    pub fn flatten(corpus: &Corpus) -> Vec<IndexRecord> {
        corpus
            .iter_sections()
            .map(|(chapter, title, content)| IndexRecord::new(chapter, title, content))
            .collect()
    }

    /// Full index rebuild: delete the index if present, recreate it with the
    /// section schema, and bulk-load the flattened corpus.
    ///
    /// Per-record failures are collected in the outcome. Queries racing the
    /// rebuild may observe an empty or partial index.
    pub async fn rebuild(&self, corpus: &Corpus) -> Result<BulkOutcome> {
        if self.index.index_exists(&self.index_name).await? {
            self.index.delete_index(&self.index_name).await?;
        }

        self.index
            .create_index(&self.index_name, &section_mapping())
            .await?;

        let records = Self::flatten(corpus);
        if records.is_empty() {
            tracing::info!(index = %self.index_name, "Corpus empty, index left freshly created");
            return Ok(BulkOutcome::default());
        }

        let outcome = self
            .index
            .bulk_index(&self.index_name, &records, self.chunk_size)
            .await?;

        tracing::info!(
            index = %self.index_name,
            indexed = outcome.indexed,
            failed = outcome.failures.len(),
            "Index rebuild complete"
        );

        Ok(outcome)
    }
}
