use chem_index::context::Context;
use clap::Parser;
use log::{error, info};
use server::error::ServerError;
use server::service::{bind, WEBSOCKET_PATH};
use server::settings::{Args, ServerSettings};
use std::net::SocketAddr;
use std::sync::Arc;

fn init_logging() {
    let debug = std::env::var("DEBUG").map(|v| v == "TRUE").unwrap_or(false);
    let default_filter = if debug { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

async fn run(args: Args) -> Result<(), ServerError> {
    let settings = Arc::new(ServerSettings::from_args(&args)?);

    info!("Loading indices from {:?}", args.data_dir);
    let context = Arc::new(Context::open(&args.data_dir)?);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let (local_addr, server) = bind(addr, context, settings.clone())?;

    info!("Serving at {} ...", local_addr);
    info!(
        "Websocket on {}, assets from {:?}",
        WEBSOCKET_PATH, settings.assets_dir
    );

    server.await?;

    Ok(())
}

#[tokio::main]
pub async fn main() {
    let args = Args::parse();
    init_logging();

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
