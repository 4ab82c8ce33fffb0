//! # Document Store Module
//!
//! ## Purpose
//! Boundary to the durable document store plus the reconciler that upserts law
//! sections by natural key, guaranteeing no duplicate (chapter, section_title)
//! pairs accumulate over repeated synchronization runs.
//!
//! ## Input/Output Specification
//! - **Input**: Corpus of law sections
//! - **Output**: Per-record reconciliation report (inserted | updated | failed)
//! - **Storage**: Sled embedded database, bincode values, natural-key tree plus id tree
//!
//! ## Key Features
//! - `DocumentStore` trait at the seam so tests substitute fakes
//! - Upsert-by-natural-key: repeated runs over overlapping corpora are idempotent
//! - Per-record independence: one record's failure never blocks the others
//!
//! ## Concurrency
//! The lookup-then-write per record is not transactional. Concurrent runs over
//! overlapping natural keys race (last writer wins); single-writer is assumed
//! as an operational invariant.

use crate::config::StoreConfig;
use crate::errors::{Result, SyncError};
use crate::{Corpus, RecordId, StoreRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Consumed capability of the durable document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up a record by its natural key
    async fn find_by_natural_key(
        &self,
        chapter: &str,
        section_title: &str,
    ) -> Result<Option<StoreRecord>>;

    /// Update only the content of an existing record, preserving its identifier
    async fn update_content(&self, id: &RecordId, section_content: &str) -> Result<()>;

    /// Insert a new record, returning the store-assigned identifier
    async fn insert(
        &self,
        chapter: &str,
        section_title: &str,
        section_content: &str,
    ) -> Result<RecordId>;

    /// Probe basic store connectivity
    async fn health_check(&self) -> Result<()>;
}

/// Sled-backed document store keyed by the natural key
pub struct SledDocumentStore {
    db: sled::Db,
    sections: sled::Tree,
    ids: sled::Tree,
}

impl SledDocumentStore {
    /// Open (or create) the store at the configured path
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = sled::open(&config.db_path).map_err(|e| SyncError::StoreUnavailable {
            db_path: config.db_path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;

        let sections = db.open_tree("sections").map_err(|e| SyncError::StoreUnavailable {
            db_path: config.db_path.to_string_lossy().to_string(),
            reason: format!("Failed to open sections tree: {}", e),
        })?;

        let ids = db.open_tree("ids").map_err(|e| SyncError::StoreUnavailable {
            db_path: config.db_path.to_string_lossy().to_string(),
            reason: format!("Failed to open ids tree: {}", e),
        })?;

        tracing::info!(
            path = %config.db_path.display(),
            sections = sections.len(),
            "Document store opened"
        );

        Ok(Self { db, sections, ids })
    }

    /// Deterministic key bytes for a natural key
    fn natural_key_bytes(chapter: &str, section_title: &str) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&(chapter, section_title))?)
    }

    /// Number of records currently stored
    pub fn record_count(&self) -> usize {
        self.sections.len()
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for SledDocumentStore {
    async fn find_by_natural_key(
        &self,
        chapter: &str,
        section_title: &str,
    ) -> Result<Option<StoreRecord>> {
        let key = Self::natural_key_bytes(chapter, section_title)?;
        match self.sections.get(&key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn update_content(&self, id: &RecordId, section_content: &str) -> Result<()> {
        let key = self
            .ids
            .get(id.as_bytes())?
            .ok_or_else(|| SyncError::Store {
                details: format!("No record with id {}", id),
            })?;

        let bytes = self.sections.get(&key)?.ok_or_else(|| SyncError::Store {
            details: format!("Dangling id entry for {}", id),
        })?;

        let mut record: StoreRecord = bincode::deserialize(&bytes)?;
        record.section_content = section_content.to_string();
        self.sections.insert(&key, bincode::serialize(&record)?)?;

        tracing::debug!(
            chapter = %record.chapter,
            section = %record.section_title,
            "Updated existing section"
        );
        Ok(())
    }

    async fn insert(
        &self,
        chapter: &str,
        section_title: &str,
        section_content: &str,
    ) -> Result<RecordId> {
        let id = Uuid::new_v4();
        let record = StoreRecord {
            id,
            chapter: chapter.to_string(),
            section_title: section_title.to_string(),
            section_content: section_content.to_string(),
        };

        let key = Self::natural_key_bytes(chapter, section_title)?;
        self.sections.insert(&key, bincode::serialize(&record)?)?;
        self.ids.insert(id.as_bytes(), key)?;

        tracing::debug!(chapter = %chapter, section = %section_title, "Inserted new section");
        Ok(id)
    }

    async fn health_check(&self) -> Result<()> {
        let probe_key = b"__health__";
        self.ids.insert(probe_key, b"ok")?;
        if self.ids.get(probe_key)?.is_none() {
            return Err(SyncError::Store {
                details: "Health probe value not found after write".to_string(),
            });
        }
        self.ids.remove(probe_key)?;
        Ok(())
    }
}

/// Action taken for one record during reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    /// No record existed for the natural key; a new one was inserted
    Inserted,
    /// A record existed; only its content was updated in place
    Updated,
    /// The store operation failed; siblings were still processed
    Failed,
}

/// Per-record reconciliation entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileEntry {
    pub chapter: String,
    pub section_title: String,
    pub action: ReconcileAction,
    /// Error detail when the action is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report of one reconciliation pass over a corpus
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

impl ReconcileReport {
    fn record(&mut self, chapter: &str, section_title: &str, action: ReconcileAction, error: Option<String>) {
        match action {
            ReconcileAction::Inserted => self.inserted += 1,
            ReconcileAction::Updated => self.updated += 1,
            ReconcileAction::Failed => self.failed += 1,
        }
        self.entries.push(ReconcileEntry {
            chapter: chapter.to_string(),
            section_title: section_title.to_string(),
            action,
            error,
        });
    }
}

/// Upserts corpus sections into the document store by natural key
pub struct StoreReconciler {
    store: Arc<dyn DocumentStore>,
}

impl StoreReconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Reconcile each (chapter, section_title, section_content) triple against
    /// the store: update content in place when the natural key exists, insert
    /// otherwise. Failures are recorded per entry and never abort the loop, so
    /// re-running with identical input yields only `Updated` actions and the
    /// store never accumulates duplicate natural keys.
    pub async fn reconcile(&self, corpus: &Corpus) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (chapter, section_title, section_content) in corpus.iter_sections() {
            match self.reconcile_one(chapter, section_title, section_content).await {
                Ok(action) => report.record(chapter, section_title, action, None),
                Err(e) => {
                    tracing::error!(
                        chapter = %chapter,
                        section = %section_title,
                        error = %e,
                        "Failed to reconcile section"
                    );
                    report.record(chapter, section_title, ReconcileAction::Failed, Some(e.to_string()));
                }
            }
        }

        tracing::info!(
            inserted = report.inserted,
            updated = report.updated,
            failed = report.failed,
            "Store reconciliation complete"
        );

        report
    }

    async fn reconcile_one(
        &self,
        chapter: &str,
        section_title: &str,
        section_content: &str,
    ) -> Result<ReconcileAction> {
        match self.store.find_by_natural_key(chapter, section_title).await? {
            Some(existing) => {
                self.store.update_content(&existing.id, section_content).await?;
                Ok(ReconcileAction::Updated)
            }
            None => {
                self.store.insert(chapter, section_title, section_content).await?;
                Ok(ReconcileAction::Inserted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn temp_store(dir: &tempfile::TempDir) -> Arc<SledDocumentStore> {
        let config = StoreConfig {
            db_path: PathBuf::from(dir.path()).join("store.db"),
        };
        Arc::new(SledDocumentStore::open(&config).unwrap())
    }

    fn sample_corpus() -> Corpus {
        Corpus::from_json(&json!({
            "Chapter 1": {"Definitions": "means any person...", "Scope": "applies to..."},
            "Chapter 2": {"Penalties": "a fine not exceeding..."}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_run_inserts_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let reconciler = StoreReconciler::new(store.clone());

        let report = reconciler.reconcile(&sample_corpus()).await;
        assert_eq!(report.inserted, 3);
        assert_eq!(report.updated, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let reconciler = StoreReconciler::new(store.clone());
        let corpus = sample_corpus();

        reconciler.reconcile(&corpus).await;
        let second = reconciler.reconcile(&corpus).await;

        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 3);
        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn test_update_preserves_record_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let reconciler = StoreReconciler::new(store.clone());

        reconciler.reconcile(&sample_corpus()).await;
        let before = store
            .find_by_natural_key("Chapter 1", "Definitions")
            .await
            .unwrap()
            .unwrap();

        let changed = Corpus::from_json(&json!({
            "Chapter 1": {"Definitions": "revised wording"}
        }))
        .unwrap();
        reconciler.reconcile(&changed).await;

        let after = store
            .find_by_natural_key("Chapter 1", "Definitions")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.section_content, "revised wording");
    }

    #[tokio::test]
    async fn test_no_duplicate_natural_keys_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let reconciler = StoreReconciler::new(store.clone());

        for _ in 0..3 {
            reconciler.reconcile(&sample_corpus()).await;
        }
        assert_eq!(store.record_count(), 3);
    }

    #[tokio::test]
    async fn test_same_title_in_different_chapters_is_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        let reconciler = StoreReconciler::new(store.clone());

        let corpus = Corpus::from_json(&json!({
            "Chapter 1": {"Definitions": "first"},
            "Chapter 2": {"Definitions": "second"}
        }))
        .unwrap();
        let report = reconciler.reconcile(&corpus).await;

        assert_eq!(report.inserted, 2);
        let one = store.find_by_natural_key("Chapter 1", "Definitions").await.unwrap().unwrap();
        let two = store.find_by_natural_key("Chapter 2", "Definitions").await.unwrap().unwrap();
        assert_ne!(one.id, two.id);
        assert_eq!(one.section_content, "first");
        assert_eq!(two.section_content, "second");
    }

    /// Store that fails every operation touching one poisoned section title
    struct FlakyStore {
        inner: Arc<SledDocumentStore>,
        poison_title: String,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn find_by_natural_key(
            &self,
            chapter: &str,
            section_title: &str,
        ) -> Result<Option<StoreRecord>> {
            if section_title == self.poison_title {
                return Err(SyncError::Store {
                    details: "simulated store failure".to_string(),
                });
            }
            self.inner.find_by_natural_key(chapter, section_title).await
        }

        async fn update_content(&self, id: &RecordId, section_content: &str) -> Result<()> {
            self.inner.update_content(id, section_content).await
        }

        async fn insert(
            &self,
            chapter: &str,
            section_title: &str,
            section_content: &str,
        ) -> Result<RecordId> {
            self.inner.insert(chapter, section_title, section_content).await
        }

        async fn health_check(&self) -> Result<()> {
            self.inner.health_check().await
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_siblings() {
        let dir = tempfile::tempdir().unwrap();
        let inner = temp_store(&dir);
        let store = Arc::new(FlakyStore {
            inner: inner.clone(),
            poison_title: "Scope".to_string(),
        });
        let reconciler = StoreReconciler::new(store);

        let report = reconciler.reconcile(&sample_corpus()).await;
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(inner.record_count(), 2);

        let failed: Vec<_> = report
            .entries
            .iter()
            .filter(|e| e.action == ReconcileAction::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].section_title, "Scope");
        assert!(failed[0].error.as_deref().unwrap().contains("simulated"));
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        assert!(store.health_check().await.is_ok());
    }
}
