use anyhow::Result;
use clap::Parser;
use server::{router, AppState, IndexSummary};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(about = "Serve search queries over a built index directory")]
struct Args {
    /// Index directory written by `indexer build`
    #[arg(long, default_value = "./index")]
    index: String,
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let state = AppState::open(&args.index, std::env::var("ADMIN_TOKEN").ok())?;
    let summary = IndexSummary::of(&state.engine.current());
    tracing::info!(
        index = %args.index,
        documents = summary.documents,
        indexed = summary.indexed,
        edges = summary.edges,
        reload = state.admin_token.is_some(),
        "generation loaded"
    );

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
