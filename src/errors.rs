//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the sync and search service, providing structured
//! error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from corpus parsing, index, store, query and notification code
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Configuration, Corpus, Index, Store, Query, Notification
//!
//! ## Key Features
//! - Hierarchical error types with detailed context
//! - Automatic error conversion and chaining
//! - Category accessor for structured logging
//! - Execution errors kept distinct from the normal "no matches" outcome
//!
//! ## Usage
//! ```rust
//! use law_search_sync::errors::{Result, SyncError};
//!
//! fn plan_operation(query: &str) -> Result<()> {
//!     if query.trim().is_empty() {
//!         return Err(SyncError::InvalidQuery {
//!             query: query.to_string(),
//!             reason: "empty query".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SyncError>;

/// Error types for the sync and search service
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration errors (bad TOML, invalid settings)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed top-level corpus input; fatal before any side effect
    #[error("Invalid corpus: {details}")]
    InvalidCorpus { details: String },

    /// Search index unreachable (transport-level failure)
    #[error("Search index unreachable: {details}")]
    IndexUnreachable { details: String },

    /// Search index rejected a request
    #[error("Index request failed with HTTP {status}: {body}")]
    IndexRequestFailed { status: u16, body: String },

    /// Document store could not be opened
    #[error("Document store unavailable at {db_path}: {reason}")]
    StoreUnavailable { db_path: String, reason: String },

    /// Document store operation failed
    #[error("Store error: {details}")]
    Store { details: String },

    /// Serialization/deserialization errors
    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    /// Invalid search query
    #[error("Invalid search query: {query} - {reason}")]
    InvalidQuery { query: String, reason: String },

    /// Downstream notification failed (logged, never aborts a run)
    #[error("Notification failed: {details}")]
    Notification { details: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SyncError {
    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SyncError::IndexUnreachable { .. }
                | SyncError::StoreUnavailable { .. }
                | SyncError::Notification { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Config { .. } => "configuration",
            SyncError::InvalidCorpus { .. } => "corpus",
            SyncError::IndexUnreachable { .. } | SyncError::IndexRequestFailed { .. } => "index",
            SyncError::StoreUnavailable { .. } | SyncError::Store { .. } => "store",
            SyncError::InvalidQuery { .. } => "query",
            SyncError::Notification { .. } => "notification",
            SyncError::Serialization { .. } | SyncError::Internal { .. } => "internal",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Internal {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization {
            message: format!("JSON serialization error: {}", err),
        }
    }
}

impl From<bincode::Error> for SyncError {
    fn from(err: bincode::Error) -> Self {
        SyncError::Serialization {
            message: format!("Binary serialization error: {}", err),
        }
    }
}

impl From<sled::Error> for SyncError {
    fn from(err: sled::Error) -> Self {
        SyncError::Store {
            details: err.to_string(),
        }
    }
}
