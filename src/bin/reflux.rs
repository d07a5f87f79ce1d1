//! Reflux CLI — load a configuration, wire the store/bus, and run the
//! consumer loop plus the HTTP query surface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsonwebtoken::DecodingKey;
use reflux::auth::AuthConfig;
use reflux::bus::InMemoryBus;
use reflux::config::Config;
use reflux::consumer;
use reflux::group::GroupDispatcher;
use reflux::http::{self, AppState};
use reflux::store::{DocumentStore, ElasticStore, InMemoryStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

#[derive(Parser)]
#[command(name = "reflux")]
#[command(version, about = "A configurable materialized-view engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the consumer loop and HTTP query surface from a config file
    Serve {
        /// Path to the JSON configuration document
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Validate a configuration file without starting anything
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    reflux::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let config = Config::load(&config).context("failed to load configuration")?;
            println!("configuration OK: {} topic(s), {} query target(s)", config.events.len(), config.queries.len());
            Ok(())
        }
        Commands::Serve { config } => run_serve(config).await,
    }
}

async fn run_serve(config_path: PathBuf) -> Result<()> {
    let config = Config::load(&config_path).context("failed to load configuration")?;

    tracing::info!(port = config.server_port, "starting reflux");

    // "memory" (or an empty url) runs against the in-process store, used for
    // local runs and demos; any http(s) url is taken as an Elasticsearch
    // cluster and bootstrapped via ensure_index before anything subscribes.
    if config.store_url.is_empty() || config.store_url == "memory" {
        let store = Arc::new(InMemoryStore::new());
        run_with_store(config, store).await
    } else {
        let store = Arc::new(ElasticStore::new(config.store_url.clone(), config.store_retry));
        for (target, mapping) in &config.elastic_mapping {
            store.ensure_index(target, mapping).await.with_context(|| format!("failed to bootstrap index '{target}'"))?;
        }
        run_with_store(config, store).await
    }
}

async fn run_with_store<S: DocumentStore + 'static>(config: Config, store: Arc<S>) -> Result<()> {
    let decoding_key = config
        .jwt_public_key
        .as_ref()
        .map(|pem| DecodingKey::from_rsa_pem(pem.as_bytes()))
        .transpose()
        .context("invalid jwt_public_key")?
        .map(Arc::new);
    let auth = Arc::new(AuthConfig { decoding_key, force_auth: config.force_auth, force_user: config.force_user.clone() });

    let dispatcher = Arc::new(GroupDispatcher::new(store.clone()));
    let bus = InMemoryBus::new();
    let consumer_handles = consumer::run(bus, dispatcher, &config.consumer_group, config.events.clone()).await;

    let query_surface = Arc::new(reflux::query_surface::QuerySurface::new(store, config.queries.clone()));
    let app_state = AppState { query_surface, auth };
    let router = http::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.server_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server_port))?;

    tracing::info!(port = config.server_port, "HTTP query surface listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await
        .context("HTTP server error")?;

    for handle in consumer_handles {
        handle.abort();
    }

    Ok(())
}
