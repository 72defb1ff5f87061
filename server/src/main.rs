use anyhow::{Context, Result};
use clap::Parser;
use lexis_server::build_app_with;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "lexis-server")]
#[command(about = "Serve boolean and ranked search over a directory built by lexis-indexer", long_about = None)]
struct Args {
    /// Pipeline output directory (corpus.bin or the lemma listings, plus meta.json)
    #[arg(long, default_value = "./output")]
    index: String,
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    if admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set, POST /reload will reject every request");
    }
    let app = build_app_with(args.index.clone(), admin_token)
        .with_context(|| format!("opening pipeline directory {}", args.index))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, index = %args.index, "serving search");
    axum::serve(listener, app).await?;
    Ok(())
}
