use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use semsearch_retrieval::{Ingestor, RetrievalConfig, SearchEngine};
use semsearch_server::{AppState, create_router, logging};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "semsearch",
    version,
    about = "Semantic document search with Precision@5 evaluation"
)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Load a dataset into the record store
    Ingest(IngestArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Path to a TOML configuration file
    #[arg(long, env = "SEMSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Record store directory
    #[arg(long, env = "SEMSEARCH_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

impl ConfigArgs {
    async fn load(&self) -> anyhow::Result<RetrievalConfig> {
        let mut config = match &self.config {
            Some(path) => RetrievalConfig::load(path)
                .await
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => RetrievalConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        Ok(config)
    }
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Address to listen on
    #[arg(long, env = "SEMSEARCH_BIND")]
    bind: Option<SocketAddr>,
}

#[derive(Debug, Args)]
struct IngestArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Directory holding the corpus files
    #[arg(long)]
    data_path: Option<PathBuf>,

    /// Documents per embedding call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Token limit per document
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Remove all indexed records before loading
    #[arg(long)]
    clear: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.json_logs);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Ingest(args) => ingest(args).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = args.config.load().await?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.validate()?;

    let engine = SearchEngine::open(&config)
        .await
        .context("failed to open search engine")?;
    let app = create_router(AppState::new(Arc::new(engine), config.query.top_k));

    let listener = TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn ingest(args: IngestArgs) -> anyhow::Result<()> {
    let mut config = args.config.load().await?;
    if let Some(dataset_dir) = args.data_path {
        config.ingest.dataset_dir = dataset_dir;
    }
    if let Some(batch_size) = args.batch_size {
        config.ingest.batch_size = batch_size;
    }
    if let Some(max_tokens) = args.max_tokens {
        config.ingest.max_tokens = max_tokens;
    }
    config.validate()?;

    let engine = SearchEngine::open(&config)
        .await
        .context("failed to open record store")?;
    let ingestor = Ingestor::new(Arc::clone(engine.embeddings()), Arc::clone(engine.store()));

    let report = ingestor
        .run(&config.ingest.options(args.clear))
        .await
        .with_context(|| {
            format!(
                "failed to ingest {}",
                config.ingest.dataset_dir.display()
            )
        })?;

    let status = engine.status().await;
    println!("Indexed {} documents in {} batches", report.documents_indexed, report.batches);
    println!("Loaded {} queries and {} relevance judgments", report.queries_loaded, report.judgments_loaded);
    if report.truncated > 0 {
        println!("Truncated {} documents", report.truncated);
    }
    let skipped = report.documents_skipped + report.queries_skipped + report.judgments_skipped;
    if skipped > 0 {
        println!("Skipped {skipped} malformed lines");
    }
    println!(
        "Store now holds {} documents, {} judged queries",
        status.indexed_documents, status.judged_queries
    );
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
