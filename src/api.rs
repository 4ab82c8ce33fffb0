//! # API Server Module
//!
//! ## Purpose
//! REST API server exposing the search read path and the synchronization write
//! path of the legal-code sync and search service.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with search queries or corpus JSON bodies
//! - **Output**: JSON responses with ranked results, sync reports, system status
//! - **Endpoints**: POST /search, POST /sync, GET /health, GET /
//!
//! ## Key Features
//! - "No matches" returned as an empty result list, never an error status
//! - Invalid queries and malformed corpora rejected with 400 before side effects
//! - CORS support for web frontends

use crate::errors::SyncError;
use crate::gateway::SearchResult;
use crate::sync::SyncRun;
use crate::{AppState, Corpus};
use actix_cors::Cors;
use actix_web::middleware::Condition;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};

/// REST API server over the shared application state
pub struct ApiServer {
    app_state: AppState,
}

/// Search request payload
#[derive(Debug, Deserialize)]
pub struct SearchRequestBody {
    pub query: String,
    pub max_results: Option<usize>,
}

/// Search response payload
#[derive(Debug, Serialize)]
pub struct SearchResponseBody {
    pub results: Vec<SearchResult>,
    pub total_results: usize,
    pub query_time_ms: u64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub components: HealthComponents,
}

/// Component health status
#[derive(Debug, Serialize)]
pub struct HealthComponents {
    pub index: String,
    pub store: String,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server until shutdown
    pub async fn run(self) -> crate::Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;

        tracing::info!("Starting API server on {}", bind_addr);

        let server = HttpServer::new(move || {
            App::new()
                .wrap(Condition::new(enable_cors, Cors::permissive()))
                .app_data(web::Data::new(self.app_state.clone()))
                .route("/search", web::post().to(search_handler))
                .route("/sync", web::post().to(sync_handler))
                .route("/health", web::get().to(health_handler))
                .route("/", web::get().to(index_handler))
        })
        .bind(&bind_addr)
        .map_err(|e| SyncError::Internal {
            message: format!("Failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| SyncError::Internal {
            message: format!("Server error: {}", e),
        })?;

        Ok(())
    }
}

/// Map a service error to an HTTP response, keeping client mistakes at 400
/// and collaborator failures at 502
fn error_response(error: &SyncError) -> HttpResponse {
    let body = serde_json::json!({
        "error": error.category(),
        "message": error.to_string(),
    });
    match error.category() {
        "query" | "corpus" => HttpResponse::BadRequest().json(body),
        "index" | "store" => HttpResponse::BadGateway().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

/// Search endpoint handler
async fn search_handler(
    app_state: web::Data<AppState>,
    request: web::Json<SearchRequestBody>,
) -> ActixResult<HttpResponse> {
    let start_time = std::time::Instant::now();

    match app_state.gateway.query(&request.query).await {
        Ok(mut results) => {
            if let Some(max) = request.max_results {
                results.truncate(max);
            }
            let total_results = results.len();
            Ok(HttpResponse::Ok().json(SearchResponseBody {
                results,
                total_results,
                query_time_ms: start_time.elapsed().as_millis() as u64,
            }))
        }
        Err(e) => {
            tracing::error!(error = %e, category = e.category(), "Search request failed");
            Ok(error_response(&e))
        }
    }
}

/// Synchronization endpoint handler: body is the corpus JSON
async fn sync_handler(
    app_state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> ActixResult<HttpResponse> {
    let corpus = match Corpus::from_json(&body) {
        Ok(corpus) => corpus,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected malformed corpus");
            return Ok(error_response(&e));
        }
    };

    let run = SyncRun::new(
        app_state.index.clone(),
        app_state.store.clone(),
        app_state.notifier.clone(),
        &app_state.config,
    );
    let report = run.execute(&corpus).await;

    Ok(HttpResponse::Ok().json(report))
}

/// Health check endpoint handler
async fn health_handler(app_state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let index_status = match app_state
        .index
        .index_exists(&app_state.config.index.index_name)
        .await
    {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let store_status = match app_state.store.health_check().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let healthy = index_status == "healthy" && store_status == "healthy";
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        components: HealthComponents {
            index: index_status.to_string(),
            store: store_status.to_string(),
        },
    };

    if healthy {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(response))
    }
}

/// Index page handler
async fn index_handler() -> ActixResult<HttpResponse> {
    let html = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Legal-Code Sync &amp; Search</title>
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .header { color: #2c3e50; }
            .endpoint { margin: 20px 0; padding: 15px; background: #f8f9fa; border-radius: 5px; }
            .method { font-weight: bold; color: #27ae60; }
        </style>
    </head>
    <body>
        <h1 class="header">Legal-Code Sync &amp; Search API</h1>
        <p>Synchronizes legal-code sections into a search index and document store, and serves ranked fuzzy search over them.</p>

        <h2>Available Endpoints</h2>

        <div class="endpoint">
            <span class="method">POST</span> /search
            <p>Search law sections with a free-text query. Returns ranked, highlighted results.</p>
        </div>

        <div class="endpoint">
            <span class="method">POST</span> /sync
            <p>Synchronize a corpus (chapter &rarr; section title &rarr; section text) into the index and store.</p>
        </div>

        <div class="endpoint">
            <span class="method">GET</span> /health
            <p>Check the health status of the search index and document store.</p>
        </div>

        <h2>Example Search Request</h2>
        <pre>{
  "query": "trademark infringement",
  "max_results": 5
}</pre>
    </body>
    </html>
    "#;

    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}
