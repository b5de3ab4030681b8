//! portal-server: HTTP auth backend.
//!
//! Usage:
//!   portal-server [--port 3000] [--bind 0.0.0.0] [--data-dir DIR] [--config PATH]
//!
//! Environment variables:
//!   PORTAL_PORT     - Port to listen on (default: 3000)
//!   PORTAL_BIND     - Address to bind (default: 0.0.0.0)
//!   PORTAL_DATA_DIR - Directory holding the JSON blobs (default: ~/.portal/data)
//!   RUST_LOG        - Log filter (default: info)

use clap::Parser;
use portal::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portal-server", about = "Portal signup/login backend")]
struct Args {
    #[arg(long, help = "Path to config file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Port to listen on")]
    port: Option<u16>,

    #[arg(long, help = "Address to bind")]
    bind: Option<String>,

    #[arg(long, value_name = "DIR", help = "Directory holding the JSON blobs")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();
    portal::logging::init("info");

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = dir.to_string_lossy().into_owned();
    }

    portal::server::run(&config).await
}
