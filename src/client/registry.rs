//! Client registry
//!
//! Tracks every live client, starts its connection task and fans broadcasts
//! out to a snapshot of the registered clients.

use log::{debug, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::client::handler::run_client;
use crate::client::state::{Client, ClientId};
use crate::config::RelayConfig;
use crate::error::ConnectionError;
use crate::middleware::RelayObserver;

/// Registry for tracking active clients.
///
/// Cloning is cheap; every clone refers to the same collection.
#[derive(Clone)]
pub struct ClientRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    clients: Mutex<Clients>,
    next_id: AtomicU64,
    tasks: TaskTracker,
    config: Arc<RelayConfig>,
    observer: Arc<dyn RelayObserver>,
}

#[derive(Default)]
struct Clients {
    entries: Vec<Arc<Client>>,
    // Set once server-wide shutdown starts; later registrations are refused.
    closed: bool,
}

impl ClientRegistry {
    pub fn new(
        config: Arc<RelayConfig>,
        observer: Arc<dyn RelayObserver>,
        tasks: TaskTracker,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                clients: Mutex::new(Clients::default()),
                next_id: AtomicU64::new(1),
                tasks,
                config,
                observer,
            }),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    pub(crate) fn observer(&self) -> &dyn RelayObserver {
        self.inner.observer.as_ref()
    }

    /// Registers an accepted connection and starts its task.
    ///
    /// Returns `None` when the registry is already closed; the stream is
    /// dropped in that case.
    pub async fn register(&self, stream: TcpStream, peer: SocketAddr) -> Option<ClientId> {
        let port = stream.local_addr().map(|addr| addr.port()).unwrap_or_default();

        let mut clients = self.inner.clients.lock().await;
        if clients.closed {
            debug!("Refusing {} on port {}: server is shutting down", peer, port);
            return None;
        }

        let (reader, writer) = stream.into_split();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let client = Arc::new(Client::new(id, peer, port, writer));
        clients.entries.push(Arc::clone(&client));

        self.inner.observer.client_connected(peer, port);
        self.inner.tasks.spawn(run_client(client, reader, self.clone()));

        Some(id)
    }

    /// Stops `client` and removes it from the registry.
    ///
    /// Returns `false` if the client had already been removed.
    pub async fn remove(&self, client: &Arc<Client>) -> bool {
        client.stop().await;

        let mut clients = self.inner.clients.lock().await;
        let Some(index) = clients.entries.iter().position(|c| c.id() == client.id()) else {
            return false;
        };
        clients.entries.remove(index);
        drop(clients);

        self.inner.observer.client_removed(client.peer_addr());
        true
    }

    /// Delivers `message` to every client registered at call time.
    ///
    /// `origin` is the sending client, skipped only when `echo_to_sender` is
    /// off. The registry lock is held just long enough to copy the client
    /// list.
    pub async fn broadcast(&self, message: &[u8], origin: Option<ClientId>) {
        let snapshot = self.snapshot().await;
        let echo = self.inner.config.echo_to_sender;

        let recipients: Vec<Arc<Client>> = snapshot
            .into_iter()
            .filter(|client| echo || origin != Some(client.id()))
            .collect();

        self.inner.observer.broadcast(message, recipients.len());

        for client in &recipients {
            self.deliver(client, message).await;
        }
    }

    /// Sends `message` to one client, removing the client if the write fails.
    pub async fn deliver(&self, client: &Arc<Client>, message: &[u8]) {
        match client.send(message).await {
            Ok(()) => {}
            Err(ConnectionError::ShutdownInduced) => {}
            Err(ConnectionError::ConnectionFault(e)) => {
                warn!("Send to {} failed: {}", client.peer_addr(), e);
                self.remove(client).await;
            }
        }
    }

    /// Closes the registry to new clients and removes every remaining one.
    pub async fn stop_all(&self) {
        let remaining = {
            let mut clients = self.inner.clients.lock().await;
            clients.closed = true;
            clients.entries.clone()
        };

        for client in &remaining {
            self.remove(client).await;
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.clients.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, id: ClientId) -> bool {
        self.inner
            .clients
            .lock()
            .await
            .entries
            .iter()
            .any(|c| c.id() == id)
    }

    /// Returns the nicknames of registered clients in registration order.
    pub async fn nicknames(&self) -> Vec<Vec<u8>> {
        self.snapshot().await.iter().map(|c| c.nickname()).collect()
    }

    async fn snapshot(&self) -> Vec<Arc<Client>> {
        self.inner.clients.lock().await.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::LogObserver;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    fn registry_with(config: RelayConfig) -> ClientRegistry {
        ClientRegistry::new(Arc::new(config), Arc::new(LogObserver), TaskTracker::new())
    }

    /// Connects a remote socket and registers the accepted side.
    async fn connect(registry: &ClientRegistry, listener: &TcpListener) -> (ClientId, TcpStream) {
        let remote = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        let id = registry.register(stream, peer).await.unwrap();
        (id, remote)
    }

    async fn read_exact(stream: &mut TcpStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        timeout(WAIT, stream.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        buf
    }

    async fn handshake(stream: &mut TcpStream, nick: &str) {
        assert_eq!(read_exact(stream, 16).await, b"Type your nick: ");
        stream.write_all(format!("{nick}\n").as_bytes()).await.unwrap();
        let joined = format!("{nick} joined server.\n");
        assert_eq!(read_exact(stream, joined.len()).await, joined.as_bytes());
    }

    async fn entry(registry: &ClientRegistry, id: ClientId) -> Arc<Client> {
        registry
            .snapshot()
            .await
            .into_iter()
            .find(|c| c.id() == id)
            .unwrap()
    }

    #[tokio::test]
    async fn remove_twice_is_a_noop() {
        let registry = registry_with(RelayConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (id, _remote) = connect(&registry, &listener).await;

        let client = entry(&registry, id).await;
        assert!(registry.remove(&client).await);
        assert!(!registry.remove(&client).await);
        assert!(!registry.contains(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn broadcast_without_echo_skips_origin() {
        let registry = registry_with(RelayConfig {
            echo_to_sender: false,
            ..RelayConfig::default()
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let (alice_id, mut alice) = connect(&registry, &listener).await;
        handshake(&mut alice, "alice").await;
        let (_, mut bob) = connect(&registry, &listener).await;
        assert_eq!(read_exact(&mut bob, 16).await, b"Type your nick: ");

        registry.broadcast(b"alice: hi\n", Some(alice_id)).await;
        registry.broadcast(b"notice\n", None).await;

        assert_eq!(read_exact(&mut bob, 10).await, b"alice: hi\n");
        assert_eq!(read_exact(&mut bob, 7).await, b"notice\n");
        assert_eq!(read_exact(&mut alice, 7).await, b"notice\n");
    }

    #[tokio::test]
    async fn failed_delivery_removes_client() {
        let registry = registry_with(RelayConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let remote = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (stream, peer) = listener.accept().await.unwrap();

        // Registered without a connection task so only delivery can remove it.
        let (_reader, writer) = stream.into_split();
        let client = Arc::new(Client::new(99, peer, 0, writer));
        registry.inner.clients.lock().await.entries.push(Arc::clone(&client));

        remote.set_linger(Some(Duration::ZERO)).unwrap();
        drop(remote);

        // The first write may still land in the kernel buffer before the
        // reset is seen; a later one fails.
        for _ in 0..100 {
            registry.deliver(&client, b"anyone there?\n").await;
            if !registry.contains(99).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!registry.contains(99).await);
        assert!(client.is_shutting_down());
        assert!(!registry.remove(&client).await);
    }

    #[tokio::test]
    async fn stop_all_closes_registry() {
        let registry = registry_with(RelayConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_, mut remote) = connect(&registry, &listener).await;

        registry.stop_all().await;
        assert!(registry.is_empty().await);

        let mut rest = Vec::new();
        timeout(WAIT, remote.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();

        let _late = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        assert!(registry.register(stream, peer).await.is_none());
    }
}
