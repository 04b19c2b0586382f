//! RAX Relay Server - Entry Point
//!
//! Relays every line a client sends, prefixed with its nickname, to all
//! clients connected on any of the configured ports.

use log::{error, info, warn};
use std::sync::Arc;

use rax_relay_server::config::{RelayConfig, describe_ports, parse_ports};
use rax_relay_server::utils::logging::setup_logging;
use rax_relay_server::Server;

#[tokio::main]
async fn main() {
    setup_logging();

    let config = match RelayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid configuration ({}), using defaults", e);
            RelayConfig::default()
        }
    };

    let ports = parse_ports(std::env::args().skip(1));
    info!("Ports: {}", describe_ports(&ports));

    let server = Arc::new(Server::new(&ports, config));
    if let Err(e) = server.start() {
        error!("Server startup failed: {}", e);
        std::process::exit(1);
    }

    let signal_server = Arc::clone(&server);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for interrupt: {}", e);
            return;
        }
        info!("Interrupt received");
        signal_server.stop().await;
    });

    server.block().await;
    info!("Relay server stopped");
}
