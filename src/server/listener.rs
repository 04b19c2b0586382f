//! Port listener
//!
//! Owns the listening socket for one port and feeds accepted connections
//! into the client registry.

use log::{debug, info};
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::client::ClientRegistry;
use crate::config::RelayConfig;
use crate::error::{ConnectionError, ServerError, report_connection_error};

/// Accept loop for a single port.
pub struct PortListener {
    port: u16,
    local_addr: OnceLock<SocketAddr>,
    shutting_down: AtomicBool,
    cancel: CancellationToken,
}

impl PortListener {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            local_addr: OnceLock::new(),
            shutting_down: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Returns the configured port (0 means "any free port").
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the bound address once `start` has succeeded.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Binds the port with address reuse enabled and spawns the accept loop
    /// on `tasks`.
    ///
    /// Must be called from within a tokio runtime. A listener stopped before
    /// it is started binds, then exits its loop immediately.
    pub fn start(
        self: &Arc<Self>,
        config: &RelayConfig,
        registry: ClientRegistry,
        tasks: &TaskTracker,
    ) -> Result<SocketAddr, ServerError> {
        let listener = bind(config, self.port)?;
        let addr = listener.local_addr().map_err(|source| ServerError::Bind {
            port: self.port,
            source,
        })?;
        let _ = self.local_addr.set(addr);
        info!("Listening on {}", addr);

        let this = Arc::clone(self);
        tasks.spawn(async move {
            if let Err(e) = this.accept_loop(listener, registry).await {
                report_connection_error(&format!("Listener on {}", addr), &e);
            }
        });

        Ok(addr)
    }

    /// Stops accepting. The pending accept is abandoned and the listening
    /// socket is closed when the loop returns. Calling it again is a no-op.
    pub fn stop(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Stopping listener on port {}", self.port);
        self.cancel.cancel();
    }

    async fn accept_loop(
        &self,
        listener: TcpListener,
        registry: ClientRegistry,
    ) -> Result<(), ConnectionError> {
        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ConnectionError::ShutdownInduced),
                result = listener.accept() => result,
            };

            match accepted {
                Ok((stream, peer)) => {
                    registry.register(stream, peer).await;
                }
                Err(e) => return Err(ConnectionError::classify(e, self.is_shutting_down())),
            }
        }
    }
}

fn bind(config: &RelayConfig, port: u16) -> Result<TcpListener, ServerError> {
    let ip: IpAddr = config
        .bind_address
        .trim()
        .parse()
        .map_err(|_| ServerError::InvalidAddress(config.bind_address.clone()))?;
    let addr = SocketAddr::new(ip, port);

    let bind_error = |source| ServerError::Bind { port, source };

    let socket = match addr {
        SocketAddr::V4(_) => TcpSocket::new_v4(),
        SocketAddr::V6(_) => TcpSocket::new_v6(),
    }
    .map_err(bind_error)?;

    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(addr).map_err(bind_error)?;
    socket.listen(config.listen_backlog).map_err(bind_error)
}
