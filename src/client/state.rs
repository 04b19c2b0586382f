//! Module `state`
//!
//! Defines the `Client` handle shared between a connection's own task and
//! the registry: identity, nickname, the write half of the socket and the
//! shutdown machinery used to unblock the task.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::ConnectionError;

/// Registry-assigned identifier, unique for the life of the process.
pub type ClientId = u64;

/// Represents one accepted relay connection.
///
/// The read half of the socket belongs to the connection task; the write
/// half lives here so any broadcaster can send to the client.
pub struct Client {
    id: ClientId,
    peer_addr: SocketAddr,
    port: u16,
    nickname: OnceLock<Vec<u8>>,
    writer: Mutex<Option<OwnedWriteHalf>>,
    shutting_down: AtomicBool,
    cancel: CancellationToken,
}

impl Client {
    pub(crate) fn new(
        id: ClientId,
        peer_addr: SocketAddr,
        port: u16,
        writer: OwnedWriteHalf,
    ) -> Self {
        Self {
            id,
            peer_addr,
            port,
            nickname: OnceLock::new(),
            writer: Mutex::new(Some(writer)),
            shutting_down: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Returns the remote address and source port of the connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the local port the connection was accepted on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the nickname, or `address:port` until the handshake sets it.
    pub fn nickname(&self) -> Vec<u8> {
        match self.nickname.get() {
            Some(nick) => nick.clone(),
            None => self.peer_addr.to_string().into_bytes(),
        }
    }

    pub fn has_nickname(&self) -> bool {
        self.nickname.get().is_some()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Sets the nickname. Only the first call has an effect.
    pub(crate) fn set_nickname(&self, nickname: Vec<u8>) {
        let _ = self.nickname.set(nickname);
    }

    // --------------------
    // I/O
    // --------------------

    /// Writes `message` to the client.
    ///
    /// A pending write is abandoned as soon as the client is stopped.
    pub async fn send(&self, message: &[u8]) -> Result<(), ConnectionError> {
        let mut writer = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ConnectionError::ShutdownInduced),
            guard = self.writer.lock() => guard,
        };

        let Some(stream) = writer.as_mut() else {
            return Err(ConnectionError::ShutdownInduced);
        };

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ConnectionError::ShutdownInduced),
            result = stream.write_all(message) => {
                result.map_err(|e| ConnectionError::classify(e, self.is_shutting_down()))
            }
        }
    }

    /// Tears the connection down.
    ///
    /// Sets the shutting-down flag, cancels the token that any pending read
    /// or write is selected against, then shuts down and drops the write
    /// half. Calling it again is a no-op.
    pub async fn stop(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();

        let mut writer = self.writer.lock().await;
        if let Some(mut stream) = writer.take() {
            let _ = stream.shutdown().await;
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("port", &self.port)
            .field("nickname", &String::from_utf8_lossy(&self.nickname()))
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
