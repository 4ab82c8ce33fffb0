//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the sync and search service, supporting
//! TOML files and environment variable overrides with validation and type-safe access
//! to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, URL presence
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (highest priority)
//! 2. Configuration files
//! 3. Default values (lowest priority)
//!
//! ## Usage
//! ```rust,no_run
//! use law_search_sync::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Index name: {}", config.index.index_name);
//! ```

use crate::errors::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Search index client settings
    pub index: IndexConfig,
    /// Document store settings
    pub store: StoreConfig,
    /// Downstream notification settings
    pub notify: NotifyConfig,
    /// Query planning and ranking behavior
    pub search: SearchTuningConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

/// Search index client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Base URL of the search index HTTP API
    pub base_url: String,
    /// Name of the index holding law sections
    pub index_name: String,
    /// Number of records per bulk request
    pub bulk_chunk_size: usize,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file path
    pub db_path: PathBuf,
}

/// Downstream notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Enable the downstream notification after a sync run
    pub enabled: bool,
    /// Endpoint receiving the processed corpus
    pub endpoint_url: String,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Query planning and ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTuningConfig {
    /// Maximum number of results per query
    pub page_size: usize,
    /// Positions of term reordering tolerated by the phrase-prefix clause
    pub slop: u32,
    /// Marker inserted before a highlighted span
    pub highlight_pre_tag: String,
    /// Marker inserted after a highlighted span
    pub highlight_post_tag: String,
    /// Minimum query length in characters
    pub min_query_length: usize,
    /// Maximum query length in characters
    pub max_query_length: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| SyncError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("LAW_SEARCH_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LAW_SEARCH_PORT") {
            self.server.port = port.parse().map_err(|_| SyncError::Config {
                message: "Invalid port number in LAW_SEARCH_PORT".to_string(),
            })?;
        }
        if let Ok(url) = std::env::var("LAW_SEARCH_INDEX_URL") {
            self.index.base_url = url;
        }
        if let Ok(db_path) = std::env::var("LAW_SEARCH_DB_PATH") {
            self.store.db_path = PathBuf::from(db_path);
        }
        if let Ok(url) = std::env::var("LAW_SEARCH_NOTIFY_URL") {
            self.notify.endpoint_url = url;
        }

        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SyncError::Config {
                message: "server.port cannot be zero".to_string(),
            });
        }

        if self.index.base_url.is_empty() {
            return Err(SyncError::Config {
                message: "index.base_url cannot be empty".to_string(),
            });
        }

        if self.index.index_name.is_empty() {
            return Err(SyncError::Config {
                message: "index.index_name cannot be empty".to_string(),
            });
        }

        if self.index.bulk_chunk_size == 0 {
            return Err(SyncError::Config {
                message: "index.bulk_chunk_size must be greater than zero".to_string(),
            });
        }

        if self.search.page_size == 0 {
            return Err(SyncError::Config {
                message: "search.page_size must be greater than zero".to_string(),
            });
        }

        if self.search.min_query_length > self.search.max_query_length {
            return Err(SyncError::Config {
                message: "search.min_query_length cannot exceed search.max_query_length".to_string(),
            });
        }

        if self.notify.enabled && self.notify.endpoint_url.is_empty() {
            return Err(SyncError::Config {
                message: "notify.endpoint_url cannot be empty when notifications are enabled"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| SyncError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                enable_cors: true,
            },
            index: IndexConfig {
                base_url: "http://localhost:9200".to_string(),
                index_name: "laws_index".to_string(),
                bulk_chunk_size: 500,
                request_timeout_seconds: 30,
            },
            store: StoreConfig {
                db_path: PathBuf::from("./data/law_sections.db"),
            },
            notify: NotifyConfig {
                enabled: false,
                endpoint_url: String::new(),
                request_timeout_seconds: 30,
            },
            search: SearchTuningConfig {
                page_size: 5,
                slop: 2,
                highlight_pre_tag: "<strong>".to_string(),
                highlight_post_tag: "</strong>".to_string(),
                min_query_length: 1,
                max_query_length: 1000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}
