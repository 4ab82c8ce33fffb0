//! # Search Gateway Module
//!
//! ## Purpose
//! Executes planned queries against the search index and maps raw hits into the
//! results list served to callers.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text query or planned `SearchRequest`
//! - **Output**: Ordered sequence of ranked `SearchResult`s, possibly empty
//! - **Semantics**: Zero matches is a normal outcome, not an error; transport
//!   and index failures surface as errors distinct from empty results
//!
//! ## Concurrency
//! Query execution is read-only and stateless; concurrent queries share no
//! mutable state.

use crate::errors::Result;
use crate::index::{RawHit, SearchIndex};
use crate::query::{QueryPlanner, SearchRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// One ranked, highlighted search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chapter name
    pub chapter: String,
    /// Section title
    pub section_title: String,
    /// Full section text
    pub section_content: String,
    /// Raw relevance score reported by the index
    pub score: f32,
    /// Per-field highlighted snippets, in index order
    pub highlights: HashMap<String, Vec<String>>,
}

impl SearchResult {
    fn from_hit(hit: RawHit) -> Self {
        Self {
            chapter: hit.source.chapter,
            section_title: hit.source.section_title,
            section_content: hit.source.section_content,
            score: hit.score.unwrap_or(0.0).max(0.0),
            highlights: hit.highlight,
        }
    }
}

/// Read path over the search index
pub struct SearchGateway {
    index: Arc<dyn SearchIndex>,
    index_name: String,
    planner: QueryPlanner,
}

impl SearchGateway {
    pub fn new(index: Arc<dyn SearchIndex>, index_name: impl Into<String>, planner: QueryPlanner) -> Self {
        Self {
            index,
            index_name: index_name.into(),
            planner,
        }
    }

    /// Plan and execute a free-text query in one step
    pub async fn query(&self, query_text: &str) -> Result<Vec<SearchResult>> {
        let request = self.planner.plan(query_text)?;
        self.execute(request).await
    }

    /// Execute a planned request, mapping hits into results.
    ///
    /// Returns `Ok(vec![])` when the index reports zero total matches.
    pub async fn execute(&self, request: SearchRequest) -> Result<Vec<SearchResult>> {
        let response = self.index.search(&self.index_name, &request.body).await?;

        if response.hits.total.value == 0 {
            tracing::debug!(index = %self.index_name, "Query matched no documents");
            return Ok(Vec::new());
        }

        let results = response
            .hits
            .hits
            .into_iter()
            .map(SearchResult::from_hit)
            .collect();

        Ok(results)
    }
}
