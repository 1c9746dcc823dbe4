mod commands;
mod render;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kpc_client::ApiClient;
use kpc_core::AppConfig;
use kpc_engine::{StaticFallback, SummarizeOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kpc")]
#[command(about = "Compare grocery prices across stores")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List or search products
    Products {
        /// Case-insensitive name filter; blank lists everything
        #[arg(long)]
        query: Option<String>,
        /// Show the N most frequently priced products instead
        #[arg(long, conflicts_with = "query")]
        popular: Option<u32>,
    },
    /// Show every store's offer for one product, cheapest first
    Compare {
        /// Backend product id
        product_id: i64,
    },
    /// Cheapest store per product
    Summary {
        /// Case-insensitive name filter; blank summarizes everything
        #[arg(long)]
        query: Option<String>,
        /// Summarize the N most frequently priced products instead
        #[arg(long, conflicts_with = "query")]
        popular: Option<u32>,
    },
}

/// Everything a command needs, built once from configuration.
pub(crate) struct Session {
    pub client: ApiClient,
    pub fallback: StaticFallback,
    pub options: SummarizeOptions,
    pub cancel: CancellationToken,
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_fallback(config: &AppConfig) -> anyhow::Result<StaticFallback> {
    let Some(path) = &config.fallback_path else {
        return Ok(StaticFallback::builtin());
    };
    let file = kpc_core::load_fallback_file(path)
        .with_context(|| format!("loading fallback table from {}", path.display()))?;
    let fallback = StaticFallback::from_file(&file);
    tracing::info!(
        path = %path.display(),
        products = fallback.len(),
        "loaded fallback table"
    );
    Ok(fallback)
}

/// Cancels `cancel` on the first Ctrl-C.
fn cancel_on_interrupt(cancel: &CancellationToken) {
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("kpc: run `kpc --help` for available commands");
        return Ok(());
    };

    let config = kpc_core::load_app_config()?;
    init_tracing(&config)?;
    tracing::debug!(?config, "configuration loaded");

    let session = Session {
        client: ApiClient::from_config(&config)?,
        fallback: load_fallback(&config)?,
        options: SummarizeOptions::from(&config),
        cancel: CancellationToken::new(),
    };
    cancel_on_interrupt(&session.cancel);

    match command {
        Commands::Products { query, popular } => {
            commands::run_products(&session, query.as_deref(), popular).await
        }
        Commands::Compare { product_id } => commands::run_compare(&session, product_id).await,
        Commands::Summary { query, popular } => {
            commands::run_summary(&session, query.as_deref(), popular).await
        }
    }
}
