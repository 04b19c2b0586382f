use log::{error, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::task::TaskTracker;

use crate::client::ClientRegistry;
use crate::config::RelayConfig;
use crate::error::ServerError;
use crate::middleware::{LogObserver, RelayObserver};
use crate::protocol::SHUTDOWN_NOTICE;
use crate::server::listener::PortListener;

/// Relay server: one listener per port sharing a single client registry.
pub struct Server {
    config: Arc<RelayConfig>,
    listeners: Vec<Arc<PortListener>>,
    registry: ClientRegistry,
    tasks: TaskTracker,
    stopped: AtomicBool,
}

impl Server {
    pub fn new(ports: &[u16], config: RelayConfig) -> Self {
        Self::with_observer(ports, config, Arc::new(LogObserver))
    }

    /// Builds a server whose lifecycle events go to `observer`.
    pub fn with_observer(
        ports: &[u16],
        config: RelayConfig,
        observer: Arc<dyn RelayObserver>,
    ) -> Self {
        let config = Arc::new(config);
        let tasks = TaskTracker::new();
        let registry = ClientRegistry::new(Arc::clone(&config), observer, tasks.clone());

        let mut listeners: Vec<Arc<PortListener>> = Vec::with_capacity(ports.len());
        for &port in ports {
            if listeners.iter().any(|l| l.port() == port) {
                continue;
            }
            listeners.push(Arc::new(PortListener::new(port)));
        }

        Self {
            config,
            listeners,
            registry,
            tasks,
            stopped: AtomicBool::new(false),
        }
    }

    /// Starts every port listener.
    ///
    /// A port that fails to bind is logged and skipped; the call fails only
    /// when no listener could be started.
    pub fn start(&self) -> Result<(), ServerError> {
        let mut started = 0;
        let mut last_error = None;

        for listener in &self.listeners {
            match listener.start(&self.config, self.registry.clone(), &self.tasks) {
                Ok(_) => started += 1,
                Err(e) => {
                    error!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        if started == 0 {
            return Err(last_error.unwrap_or(ServerError::NoListeners));
        }

        info!(
            "Relay server started on {} of {} ports",
            started,
            self.listeners.len()
        );
        Ok(())
    }

    /// Shuts the server down: announces the shutdown to every client, stops
    /// every listener, then stops every remaining client.
    ///
    /// Only the first call does anything, so it is safe to call from a
    /// signal handler racing with other callers.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Relay server is going down");

        self.registry.broadcast(SHUTDOWN_NOTICE, None).await;

        for listener in &self.listeners {
            listener.stop();
        }
        self.registry.stop_all().await;

        self.tasks.close();
    }

    /// Waits until every listener and client task has finished.
    ///
    /// Returns only after `stop` has been called.
    pub async fn block(&self) {
        self.tasks.wait().await;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Addresses of the listeners that are bound.
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.listeners.iter().filter_map(|l| l.local_addr()).collect()
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub async fn client_count(&self) -> usize {
        self.registry.len().await
    }

    pub async fn nicknames(&self) -> Vec<Vec<u8>> {
        self.registry.nicknames().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn loopback() -> RelayConfig {
        RelayConfig {
            bind_address: "127.0.0.1".to_string(),
            ..RelayConfig::default()
        }
    }

    #[test]
    fn repeated_ports_get_one_listener() {
        let server = Server::new(&[9000, 9001, 9000], loopback());
        assert_eq!(server.listeners.len(), 2);
    }

    #[tokio::test]
    async fn start_fails_when_every_port_is_taken() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = Server::new(&[port], loopback());
        assert!(matches!(
            server.start(),
            Err(ServerError::Bind { port: p, .. }) if p == port
        ));
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_unblocks() {
        let server = Server::new(&[0, 0], loopback());
        server.start().unwrap();
        assert_eq!(server.local_addrs().len(), 1);

        server.stop().await;
        server.stop().await;
        assert!(server.is_stopped());
        timeout(Duration::from_secs(5), server.block())
            .await
            .unwrap();
    }
}
