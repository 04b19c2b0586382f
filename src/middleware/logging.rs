//! Logging middleware
//!
//! Lifecycle and broadcast events are reported through a [`RelayObserver`]
//! so the registry never writes to the console itself.

use log::{debug, info};
use std::net::SocketAddr;

/// Receives relay lifecycle events.
pub trait RelayObserver: Send + Sync {
    /// A connection was accepted on `port` and registered.
    fn client_connected(&self, peer: SocketAddr, port: u16) {
        let _ = (peer, port);
    }

    /// A client finished the nickname handshake.
    fn nickname_set(&self, peer: SocketAddr, nickname: &[u8]) {
        let _ = (peer, nickname);
    }

    /// A message is about to be delivered to `recipients` clients.
    fn broadcast(&self, message: &[u8], recipients: usize);

    /// A client left the registry.
    fn client_removed(&self, peer: SocketAddr) {
        let _ = peer;
    }
}

/// Default observer writing every event through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RelayObserver for LogObserver {
    fn client_connected(&self, peer: SocketAddr, port: u16) {
        info!("Client connected: {} on port {}", peer, port);
    }

    fn nickname_set(&self, peer: SocketAddr, nickname: &[u8]) {
        info!("Client {} is now {}", peer, String::from_utf8_lossy(nickname));
    }

    fn broadcast(&self, message: &[u8], recipients: usize) {
        debug!(
            "Broadcast to {} clients: {:?}",
            recipients,
            String::from_utf8_lossy(message)
        );
    }

    fn client_removed(&self, peer: SocketAddr) {
        info!("Client {} disconnected", peer);
    }
}
