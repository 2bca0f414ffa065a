use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod handlers;
mod logic;
mod rooms;
mod state;

use crate::handlers::router;
use crate::rooms::prune_closed;
use crate::state::AppState;

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    bind_addr: IpAddr,
    /// Seconds between sweeps for peers whose socket went away silently.
    #[arg(long, default_value_t = 60)]
    prune_interval_secs: u64,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("sketchboard_server=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let state = AppState::default();
    let sweep_state = state.clone();
    let prune_interval = Duration::from_secs(args.prune_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(prune_interval);
        loop {
            interval.tick().await;
            let pruned = prune_closed(&sweep_state).await;
            if pruned > 0 {
                debug!(pruned, "pruned stale peers");
            }
        }
    });

    let addr = SocketAddr::new(args.bind_addr, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "sketchboard hub listening");
    axum::serve(listener, router(state)).await
}
