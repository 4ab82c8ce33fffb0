//! # Legal-Code Sync & Search Main Driver
//!
//! ## Purpose
//! Main entry point for the sync and search service. Supports three modes:
//! a one-shot synchronization from a JSON corpus file, a one-shot query, and
//! the long-running API server.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment variables
//! - **Output**: Sync report (JSON), ranked query results, or a running web server
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Run the requested one-shot flow, or
//! 4. Initialize shared clients and start the web API server
//! 5. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use law_search_sync::{
    api::ApiServer,
    config::Config,
    errors::{Result, SyncError},
    gateway::SearchGateway,
    index::{ElasticIndexClient, SearchIndex},
    notify::NotificationClient,
    query::QueryPlanner,
    store::{DocumentStore, SledDocumentStore},
    AppState, Corpus, SyncRun,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("law-search-server")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Legal Search Team")
        .about("Synchronizes legal-code sections into a search index and document store, with ranked fuzzy search")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("sync")
                .long("sync")
                .value_name("FILE")
                .help("Synchronize a JSON corpus file into the index and store, then exit"),
        )
        .arg(
            Arg::new("query")
                .short('q')
                .long("query")
                .value_name("TEXT")
                .help("Run a single search query, print ranked results, then exit"),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let mut config = Config::from_file(config_path)?;

    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    init_logging(&config)?;
    info!("Configuration loaded from: {}", config_path);

    if let Some(corpus_file) = matches.get_one::<String>("sync") {
        return run_sync(&config, corpus_file).await;
    }

    if let Some(query_text) = matches.get_one::<String>("query") {
        return run_query(&config, query_text).await;
    }

    run_server(config).await
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.level))
        .map_err(|_| SyncError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        })?;

    if config.logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}

/// One-shot synchronization from a JSON corpus file
async fn run_sync(config: &Config, corpus_file: &str) -> Result<()> {
    let content = std::fs::read_to_string(corpus_file).map_err(|e| SyncError::Config {
        message: format!("Failed to read corpus file {}: {}", corpus_file, e),
    })?;
    let corpus = Corpus::from_json_str(&content)?;

    info!(
        chapters = corpus.chapter_count(),
        sections = corpus.section_count(),
        "Loaded corpus from {}",
        corpus_file
    );

    let run = SyncRun::from_config(config)?;
    let report = run.execute(&corpus).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        warn!("Synchronization completed with failures");
        std::process::exit(1);
    }
    Ok(())
}

/// One-shot query against the configured index
async fn run_query(config: &Config, query_text: &str) -> Result<()> {
    let index: Arc<dyn SearchIndex> = Arc::new(ElasticIndexClient::new(&config.index)?);
    let gateway = SearchGateway::new(
        index,
        config.index.index_name.clone(),
        QueryPlanner::new(config.search.clone()),
    );

    let results = gateway.query(query_text).await?;

    if results.is_empty() {
        println!("No results found. Try a different search term.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!("Result {}:", i + 1);
        println!("  Chapter:  {}", result.chapter);
        println!("  Section:  {}", result.section_title);
        println!("  Content:  {}", result.section_content);
        println!("  Score:    {:.2}", result.score);
        if !result.highlights.is_empty() {
            println!("  Highlights:");
            for (field, snippets) in &result.highlights {
                for snippet in snippets {
                    println!("    [{}] {}", field, snippet);
                }
            }
        }
        println!();
    }
    Ok(())
}

/// Start the long-running API server
async fn run_server(config: Config) -> Result<()> {
    let config = Arc::new(config);
    let app_state = initialize_components(config.clone()).await?;

    let server = ApiServer::new(app_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server error: {}", e);
        }
    });

    info!(
        "Service started successfully on {}:{}",
        config.server.host, config.server.port
    );

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = server_handle => {
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Service shut down");
    Ok(())
}

/// Initialize all shared clients and verify component health
async fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing components...");

    let store: Arc<dyn DocumentStore> = Arc::new(SledDocumentStore::open(&config.store)?);
    store.health_check().await?;
    info!("Document store is healthy");

    let index: Arc<dyn SearchIndex> = Arc::new(ElasticIndexClient::new(&config.index)?);
    match index.index_exists(&config.index.index_name).await {
        Ok(exists) => info!(index = %config.index.index_name, exists, "Search index reachable"),
        // A sync run recreates the index, so an unreachable index at startup is not fatal
        Err(e) => warn!(error = %e, "Search index unreachable at startup"),
    }

    let gateway = Arc::new(SearchGateway::new(
        index.clone(),
        config.index.index_name.clone(),
        QueryPlanner::new(config.search.clone()),
    ));

    let notifier = if config.notify.enabled {
        Some(Arc::new(NotificationClient::new(&config.notify)?))
    } else {
        None
    };

    Ok(AppState {
        config,
        index,
        store,
        gateway,
        notifier,
    })
}
