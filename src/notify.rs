//! # Downstream Notification Module
//!
//! ## Purpose
//! Pushes a processed corpus to the downstream backend after a synchronization
//! run. Fire-and-forget with respect to the run: a notification failure is
//! logged and reported in the sync report, never raised to the run's caller
//! and never rolling back indexing or storage.
//!
//! ## Input/Output Specification
//! - **Input**: Corpus in its JSON wire shape
//! - **Output**: HTTP status and response body from the downstream consumer

use crate::config::NotifyConfig;
use crate::errors::{Result, SyncError};
use crate::Corpus;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of a downstream notification attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationOutcome {
    /// HTTP status code returned by the downstream consumer
    pub status: u16,
    /// Response body, for diagnostics
    pub body: String,
}

impl NotificationOutcome {
    pub fn accepted(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client posting processed corpora downstream
pub struct NotificationClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl NotificationClient {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| SyncError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    /// POST the corpus to the downstream endpoint and report the outcome
    pub async fn post_corpus(&self, corpus: &Corpus) -> Result<NotificationOutcome> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(&corpus.to_json())
            .send()
            .await
            .map_err(|e| SyncError::Notification {
                details: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        let outcome = NotificationOutcome { status, body };
        if outcome.accepted() {
            tracing::info!(status, "Sent processed corpus to downstream backend");
        } else {
            tracing::error!(status, body = %outcome.body, "Downstream backend rejected corpus");
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> NotificationClient {
        NotificationClient::new(&NotifyConfig {
            enabled: true,
            endpoint_url: format!("{}/post/lawSearchTable", server.uri()),
            request_timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_corpus_wire_shape() {
        let server = MockServer::start().await;
        let payload = json!({"Chapter 1": {"Definitions": "means any person..."}});

        Mock::given(method("POST"))
            .and(path("/post/lawSearchTable"))
            .and(body_json(&payload))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let corpus = Corpus::from_json(&payload).unwrap();
        let outcome = client_for(&server).post_corpus(&corpus).await.unwrap();

        assert!(outcome.accepted());
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.body, "ok");
    }

    #[tokio::test]
    async fn test_rejection_is_reported_not_raised() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let corpus = Corpus::from_json(&json!({"C": {"s": "t"}})).unwrap();
        let outcome = client_for(&server).post_corpus(&corpus).await.unwrap();

        assert!(!outcome.accepted());
        assert_eq!(outcome.status, 503);
    }

    #[tokio::test]
    async fn test_transport_failure_is_notification_error() {
        let client = NotificationClient::new(&NotifyConfig {
            enabled: true,
            endpoint_url: "http://127.0.0.1:1/post".to_string(),
            request_timeout_seconds: 1,
        })
        .unwrap();

        let corpus = Corpus::from_json(&json!({"C": {"s": "t"}})).unwrap();
        let err = client.post_corpus(&corpus).await.unwrap_err();
        assert_eq!(err.category(), "notification");
        assert!(err.is_recoverable());
    }
}
