use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing::warn;

use apibox_core::config::Config;
use apibox_engine::{Dispatcher, RateLimiter};
use apibox_server::cli::Cli;
use apibox_server::shutdown::{spawn_ctrl_c_handler, ShutdownController, ShutdownEvent};
use apibox_server::{http, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    logging::init_logging(config.debug)?;
    info!(
        listen_port = config.listen_port,
        standalone = config.standalone,
        backing_node = %config.iri_server_url,
        "apibox starting"
    );

    let dispatcher = Arc::new(Dispatcher::new());
    let limiter = Arc::new(RateLimiter::new(config.limit, config.tokens.clone()));
    let http_client = reqwest::Client::new();
    let config = Arc::new(config);

    if config.standalone {
        let worker_dispatcher = dispatcher.clone();
        tokio::spawn(apibox_engine::embedded_worker::run(worker_dispatcher));
        info!("embedded PoW worker started (standalone mode)");
    }

    let state = Arc::new(http::AppState {
        dispatcher,
        limiter,
        config: config.clone(),
        http_client,
    });
    let routes = http::routes(state);

    let shutdown = Arc::new(ShutdownController::new());
    let mut force_rx = spawn_ctrl_c_handler(shutdown);
    let mut graceful_rx = force_rx.clone();

    let addr: SocketAddr = ([0, 0, 0, 0], config.listen_port).into();
    let (_, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async move {
        loop {
            if graceful_rx.changed().await.is_err() {
                return;
            }
            if graceful_rx.borrow().is_some() {
                return;
            }
        }
    });

    tokio::select! {
        _ = server => {}
        _ = async move {
            loop {
                if force_rx.changed().await.is_err() {
                    return;
                }
                if matches!(*force_rx.borrow(), Some(ShutdownEvent::Immediate)) {
                    warn!("forced shutdown requested, exiting immediately");
                    std::process::exit(130);
                }
            }
        } => {}
    }

    info!("apibox shut down cleanly");
    Ok(())
}
