use std::sync::Arc;

use clap::Parser;
use pulse_core::config::DataSourceKind;
use pulse_core::{ChatClient, CompletionError, PulseConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use pulse_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "pulse.toml")]
    config: String,

    /// Check store connectivity and exit
    #[arg(long)]
    health: bool,

    /// Seed the database from the bundled datasets and exit
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match PulseConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    if args.seed {
        return seed(&config).await;
    }

    // Build the configured record store
    let store = match pulse_core::store::create_store(&config.dataset, &config.database).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open record store: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match store.status().await {
            Ok(detail) => println!("✅ Store '{}' reachable: {}", store.name(), detail),
            Err(e) => {
                println!("❌ Store '{}' check failed: {}", store.name(), e);
                std::process::exit(1);
            }
        }
        println!("✅ Pulse health check passed");
        return Ok(());
    }

    // Persona profiles ship with the datasets regardless of store mode
    let personas = match pulse_core::dataset::load_personas(&config.dataset.personas_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to load persona profiles: {}", e);
            std::process::exit(1);
        }
    };

    // Chat proxy is optional: without an API key the endpoint returns 503
    let chat = match ChatClient::new(&config.chat, None) {
        Ok(c) => Some(c),
        Err(CompletionError::MissingApiKey) => {
            tracing::warn!("AZURE_API_KEY not set; POST /chat disabled");
            None
        }
        Err(e) => {
            eprintln!("Failed to build chat client: {}", e);
            std::process::exit(1);
        }
    };

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(HttpState {
        store,
        personas,
        config,
        chat,
    });

    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}

/// Load the bundled datasets and push them into Postgres.
async fn seed(config: &PulseConfig) -> anyhow::Result<()> {
    if config.dataset.source == DataSourceKind::Static {
        tracing::warn!("Seeding targets the database regardless of dataset.source");
    }

    let pool = pulse_core::db::create_pool(&config.database).await?;
    let responses = pulse_core::dataset::load_responses(&config.dataset.responses_path)?;
    let outcomes = pulse_core::dataset::load_outcomes(&config.dataset.outcomes_path)?;

    let report = pulse_ingest::seed_all(&pool, &responses, &outcomes).await?;
    println!(
        "✅ Seeded {} responses and {} outcomes",
        report.responses_inserted, report.outcomes_inserted
    );
    Ok(())
}
