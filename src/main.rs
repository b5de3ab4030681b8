use anyhow::Result;
use clap::Parser;
use portal::cli::{self, Context};
use portal::config::Config;
use portal::store::{DynStore, JsonFileStore, MemoryStore};
use portal::{Args, Portal};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Keep the REPL quiet unless RUST_LOG asks for more
    portal::logging::init("warn");

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.to_string_lossy().into_owned();
    }

    let store: DynStore = if args.ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(JsonFileStore::open(config.resolve_data_dir())?)
    };
    let portal = Portal::load(store, &config.admin)?;
    let mut ctx = Context::new(portal);

    if let Some(command) = &args.command {
        cli::run_once(&mut ctx, command);
        return Ok(());
    }

    cli::run_repl(ctx)
}
