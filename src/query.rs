//! # Query Planning Module
//!
//! ## Purpose
//! Turns a free-text user query into a ranked, multi-field, fuzzy, phrase-aware
//! search request with field-importance weighting and match highlighting.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text query string, search tuning configuration
//! - **Output**: `SearchRequest` body ready for execution against the index
//! - **Ranking**: chapter weighted 3x, section_title 2x, section_content 1x
//!
//! ## Query Strategy
//! A disjunctive (`should`, minimum-should-match 1) combination of two clauses,
//! so either alone can satisfy the query:
//! - phrase-prefix across the three source fields with slop, rewarding precise
//!   ordered matches of legal terminology and supporting typeahead-style input
//! - fuzzy AND match against `combined_text`, tolerating minor misspellings of
//!   scattered terms
//!
//! Together they balance precision and recall for legal-text search.

use crate::config::SearchTuningConfig;
use crate::errors::{Result, SyncError};
use serde_json::{json, Value};

/// A planned search request body
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Index-engine request body (query, highlight, size)
    pub body: Value,
}

/// Builds ranked search requests from free-text queries
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    config: SearchTuningConfig,
}

impl QueryPlanner {
    pub fn new(config: SearchTuningConfig) -> Self {
        Self { config }
    }

    /// Plan a search request for a free-text query.
    ///
    /// Returns `InvalidQuery` for queries that are empty or outside the
    /// configured length bounds; shape problems are caught here so execution
    /// failures downstream always mean the index itself misbehaved.
    pub fn plan(&self, query_text: &str) -> Result<SearchRequest> {
        let trimmed = query_text.trim();
        if trimmed.is_empty() || trimmed.len() < self.config.min_query_length {
            return Err(SyncError::InvalidQuery {
                query: query_text.to_string(),
                reason: format!(
                    "query too short: minimum {} characters",
                    self.config.min_query_length
                ),
            });
        }
        if trimmed.len() > self.config.max_query_length {
            return Err(SyncError::InvalidQuery {
                query: query_text.to_string(),
                reason: format!(
                    "query too long: maximum {} characters",
                    self.config.max_query_length
                ),
            });
        }

        let body = json!({
            "query": {
                "bool": {
                    "should": [
                        {
                            "multi_match": {
                                "query": trimmed,
                                "fields": [
                                    "chapter^3",
                                    "section_title^2",
                                    "section_content"
                                ],
                                "type": "phrase_prefix",
                                "slop": self.config.slop
                            }
                        },
                        {
                            "match": {
                                "combined_text": {
                                    "query": trimmed,
                                    "operator": "and",
                                    "fuzziness": "AUTO"
                                }
                            }
                        }
                    ],
                    "minimum_should_match": 1
                }
            },
            "highlight": {
                "fields": {
                    "chapter": {},
                    "section_title": {},
                    "section_content": {}
                },
                "pre_tags": [self.config.highlight_pre_tag],
                "post_tags": [self.config.highlight_post_tag]
            },
            "size": self.config.page_size
        });

        Ok(SearchRequest { body })
    }
}
