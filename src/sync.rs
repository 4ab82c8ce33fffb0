//! # Synchronization Run Module
//!
//! ## Purpose
//! Orchestrates one synchronization run: rebuild the search index and reconcile
//! the document store from the same corpus, then notify the downstream backend.
//!
//! ## Input/Output Specification
//! - **Input**: Validated corpus, constructed index/store/notification clients
//! - **Output**: Structured `SyncReport` with per-record outcomes for both write targets
//! - **Policy**: Both write targets run to completion collecting their own
//!   failures, even when the other side fails; notification failures are logged
//!   and reported, never raised
//!
//! ## Concurrency
//! Index rebuild and store reconciliation have no data dependency and run
//! concurrently; neither blocks the other. Single-writer (one run at a time)
//! is assumed operationally, not enforced with a lock.

use crate::config::Config;
use crate::errors::Result;
use crate::index::{ElasticIndexClient, IndexWriter, RecordFailure, SearchIndex};
use crate::notify::{NotificationClient, NotificationOutcome};
use crate::store::{DocumentStore, ReconcileReport, SledDocumentStore, StoreReconciler};
use crate::Corpus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Structured outcome of one synchronization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall time of the run
    pub duration_ms: u64,
    /// Sections accepted by the search index
    pub indexed: usize,
    /// Per-record bulk failures collected during the rebuild
    pub index_failures: Vec<RecordFailure>,
    /// Hard rebuild failure (index unreachable, create/delete rejected), if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    /// Per-record store reconciliation report
    pub reconcile: ReconcileReport,
    /// Malformed chapter entries dropped at parse time
    pub skipped_chapters: usize,
    /// Malformed section entries dropped at parse time
    pub skipped_sections: usize,
    /// Downstream notification outcome; absent when disabled or unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationOutcome>,
    /// True when both write targets completed without any failure
    pub success: bool,
}

/// One synchronization run over a corpus
pub struct SyncRun {
    writer: IndexWriter,
    reconciler: StoreReconciler,
    notifier: Option<Arc<NotificationClient>>,
}

impl SyncRun {
    /// Assemble a run from already-constructed clients
    pub fn new(
        index: Arc<dyn SearchIndex>,
        store: Arc<dyn DocumentStore>,
        notifier: Option<Arc<NotificationClient>>,
        config: &Config,
    ) -> Self {
        Self {
            writer: IndexWriter::new(
                index,
                config.index.index_name.clone(),
                config.index.bulk_chunk_size,
            ),
            reconciler: StoreReconciler::new(store),
            notifier,
        }
    }

    /// Construct all clients from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let index: Arc<dyn SearchIndex> = Arc::new(ElasticIndexClient::new(&config.index)?);
        let store: Arc<dyn DocumentStore> = Arc::new(SledDocumentStore::open(&config.store)?);
        let notifier = if config.notify.enabled {
            Some(Arc::new(NotificationClient::new(&config.notify)?))
        } else {
            None
        };
        Ok(Self::new(index, store, notifier, config))
    }

    /// Execute the run: rebuild and reconcile concurrently, then notify.
    ///
    /// A hard failure on one write target never prevents the other from
    /// running to completion; per-record failures are collected in the report.
    pub async fn execute(&self, corpus: &Corpus) -> SyncReport {
        let started_at = Utc::now();
        let timer = Instant::now();

        tracing::info!(
            chapters = corpus.chapter_count(),
            sections = corpus.section_count(),
            "Starting synchronization run"
        );

        let (rebuild, reconcile) = tokio::join!(
            self.writer.rebuild(corpus),
            self.reconciler.reconcile(corpus)
        );

        let (indexed, index_failures, index_error) = match rebuild {
            Ok(outcome) => (outcome.indexed, outcome.failures, None),
            Err(e) => {
                tracing::error!(error = %e, "Index rebuild failed");
                (0, Vec::new(), Some(e.to_string()))
            }
        };

        let notification = self.notify(corpus).await;

        let success = index_error.is_none() && index_failures.is_empty() && reconcile.failed == 0;
        let report = SyncReport {
            started_at,
            duration_ms: timer.elapsed().as_millis() as u64,
            indexed,
            index_failures,
            index_error,
            reconcile,
            skipped_chapters: corpus.skipped_chapters(),
            skipped_sections: corpus.skipped_sections(),
            notification,
            success,
        };

        tracing::info!(
            success = report.success,
            indexed = report.indexed,
            inserted = report.reconcile.inserted,
            updated = report.reconcile.updated,
            duration_ms = report.duration_ms,
            "Synchronization run complete"
        );

        report
    }

    /// Notification is fire-and-forget: failures are logged, never raised
    async fn notify(&self, corpus: &Corpus) -> Option<NotificationOutcome> {
        let notifier = self.notifier.as_ref()?;
        match notifier.post_corpus(corpus).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(error = %e, "Downstream notification failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::index::ElasticIndexClient;
    use serde_json::json;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(es: &MockServer, dir: &tempfile::TempDir, notify_url: Option<String>) -> Config {
        let mut config = Config::default();
        config.index.base_url = es.uri();
        config.index.request_timeout_seconds = 5;
        config.store.db_path = PathBuf::from(dir.path()).join("store.db");
        if let Some(url) = notify_url {
            config.notify.enabled = true;
            config.notify.endpoint_url = url;
            config.notify.request_timeout_seconds = 2;
        }
        config
    }

    async fn mount_healthy_index(server: &MockServer, records: usize) {
        Mock::given(method("HEAD"))
            .and(path("/laws_index"))
            .respond_with(ResponseTemplate::new(404))
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/laws_index"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        let items: Vec<_> = (0..records).map(|_| json!({"index": {"status": 201}})).collect();
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"errors": false, "items": items})),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_end_to_end_run() {
        let es = MockServer::start().await;
        let notify = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();

        mount_healthy_index(&es, 1).await;
        Mock::given(method("POST"))
            .and(path("/post/lawSearchTable"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&notify)
            .await;

        let config = config_for(
            &es,
            &dir,
            Some(format!("{}/post/lawSearchTable", notify.uri())),
        );
        let run = SyncRun::from_config(&config).unwrap();

        let corpus =
            Corpus::from_json(&json!({"Chapter 1": {"Definitions": "means any person..."}})).unwrap();
        let report = run.execute(&corpus).await;

        assert!(report.success);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.reconcile.inserted, 1);
        assert_eq!(report.notification.as_ref().unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_notification_failure_never_fails_the_run() {
        let es = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_healthy_index(&es, 1).await;

        // Downstream endpoint is unreachable entirely
        let config = config_for(&es, &dir, Some("http://127.0.0.1:1/post".to_string()));
        let run = SyncRun::from_config(&config).unwrap();

        let corpus = Corpus::from_json(&json!({"C": {"s": "text"}})).unwrap();
        let report = run.execute(&corpus).await;

        assert!(report.success);
        assert!(report.notification.is_none());
    }

    #[tokio::test]
    async fn test_index_failure_does_not_block_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.index.base_url = "http://127.0.0.1:1".to_string();
        config.index.request_timeout_seconds = 1;
        config.store.db_path = PathBuf::from(dir.path()).join("store.db");

        let run = SyncRun::from_config(&config).unwrap();
        let corpus = Corpus::from_json(&json!({"C": {"s1": "a", "s2": "b"}})).unwrap();
        let report = run.execute(&corpus).await;

        assert!(!report.success);
        assert!(report.index_error.is_some());
        // Store reconciliation still ran to completion
        assert_eq!(report.reconcile.inserted, 2);
        assert_eq!(report.reconcile.failed, 0);
    }

    #[tokio::test]
    async fn test_repeated_runs_report_only_updates() {
        let es = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_healthy_index(&es, 2).await;

        let config = config_for(&es, &dir, None);
        let run = SyncRun::from_config(&config).unwrap();
        let corpus = Corpus::from_json(&json!({"C": {"s1": "a", "s2": "b"}})).unwrap();

        let first = run.execute(&corpus).await;
        let second = run.execute(&corpus).await;

        assert_eq!(first.reconcile.inserted, 2);
        assert_eq!(second.reconcile.inserted, 0);
        assert_eq!(second.reconcile.updated, 2);
        assert!(second.success);
    }

    #[tokio::test]
    async fn test_skipped_chapters_surface_in_report() {
        let es = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_healthy_index(&es, 1).await;

        let config = config_for(&es, &dir, None);
        let run = SyncRun::from_config(&config).unwrap();

        let corpus = Corpus::from_json(&json!({
            "Good": {"s": "text"},
            "Bad": "not a mapping"
        }))
        .unwrap();
        let report = run.execute(&corpus).await;

        assert!(report.success);
        assert_eq!(report.skipped_chapters, 1);
        assert_eq!(report.indexed, 1);
        assert_eq!(report.reconcile.inserted, 1);
    }

    #[tokio::test]
    async fn test_notification_skipped_when_disabled() {
        let es = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_healthy_index(&es, 1).await;

        let config = config_for(&es, &dir, None);
        let run = SyncRun::from_config(&config).unwrap();
        let corpus = Corpus::from_json(&json!({"C": {"s": "text"}})).unwrap();
        let report = run.execute(&corpus).await;

        assert!(report.notification.is_none());
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_shared_clients_constructor() {
        let es = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        mount_healthy_index(&es, 1).await;

        let config = config_for(&es, &dir, None);
        let index: Arc<dyn SearchIndex> = Arc::new(ElasticIndexClient::new(&config.index).unwrap());
        let store: Arc<dyn DocumentStore> =
            Arc::new(SledDocumentStore::open(&config.store).unwrap());

        let run = SyncRun::new(index, store, None, &config);
        let corpus = Corpus::from_json(&json!({"C": {"s": "text"}})).unwrap();
        let report = run.execute(&corpus).await;
        assert!(report.success);
    }
}
