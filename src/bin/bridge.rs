//! Art-Net DMX Bridge
//!
//! Runs a bridge node with in-process virtual DMX buses, one per configured
//! route.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artnet_bridge::{
    config::AppConfig,
    dmx::{BusSet, VirtualBus},
    network::{create_socket, UdpTransport},
    runtime, Node,
};

/// Capacity of the bus change queue
const BUS_CHANGE_QUEUE: usize = 1024;

fn load_config() -> Result<AppConfig> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| AppConfig::default_path().filter(|path| path.exists()));

    match path {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            AppConfig::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        None => {
            tracing::info!("No config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Art-Net DMX Bridge");

    let config = load_config()?;
    config.validate()?;

    // One virtual bus per route
    let (change_tx, change_rx) = bounded(BUS_CHANGE_QUEUE);
    let mut buses = BusSet::new();
    for route in &config.routes {
        buses.insert(route.bus, VirtualBus::with_notifier(route.bus, change_tx.clone()));
    }
    drop(change_tx);
    tracing::info!("Created {} virtual DMX buses", buses.len());

    let socket = Arc::new(create_socket(config.network.socket_addr())?);
    tracing::info!("Listening for Art-Net on {}", config.network.socket_addr());

    let node = Node::new(&config, UdpTransport::new(socket.clone()), buses)?;
    let status = runtime::shared_status(&node);

    #[cfg(feature = "ui")]
    let _web_handle = config.ui.enabled.then(|| {
        artnet_bridge::ui::WebServer::new(&config.ui, status.clone()).start_background()
    });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let node = runtime::run(node, socket, change_rx, status, shutdown).await;

    let stats = node.stats();
    tracing::info!(
        "Bridge stopped: {} frames accepted, {} flushes sent",
        stats.frames_accepted,
        stats.flushes_sent
    );

    Ok(())
}
