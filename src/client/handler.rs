//! Connection task for a single relay client.

use log::debug;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;

use crate::client::registry::ClientRegistry;
use crate::client::state::Client;
use crate::error::{ConnectionError, report_connection_error};
use crate::protocol::{NICK_PROMPT, parse_nickname, responses};

/// Runs one relay client from nickname prompt to disconnect.
///
/// - Prompts for and reads the nickname, then announces the arrival.
/// - Broadcasts every chunk it reads, prefixed with the nickname.
/// - On EOF removes itself from the registry and announces the departure.
///
/// Faults caused by `stop()` end the task quietly. Any other fault ends only
/// this client, which is removed without a departure announcement.
pub(crate) async fn run_client(
    client: Arc<Client>,
    mut reader: OwnedReadHalf,
    registry: ClientRegistry,
) {
    if let Err(e) = serve(&client, &mut reader, &registry).await {
        report_connection_error(&format!("Client {}", client.peer_addr()), &e);
        if !e.is_shutdown_induced() {
            registry.remove(&client).await;
        }
    }
    debug!("Task for client {} finished", client.peer_addr());
}

async fn serve(
    client: &Arc<Client>,
    reader: &mut OwnedReadHalf,
    registry: &ClientRegistry,
) -> Result<(), ConnectionError> {
    registry.deliver(client, NICK_PROMPT).await;

    let mut buffer = vec![0u8; registry.config().max_nickname_length];
    let n = receive(client, reader, &mut buffer).await?;
    let nickname = parse_nickname(&buffer[..n]);
    client.set_nickname(nickname.clone());
    registry.observer().nickname_set(client.peer_addr(), &nickname);

    registry.broadcast(&responses::joined(&nickname), None).await;

    let mut buffer = vec![0u8; registry.config().read_buffer_size];
    loop {
        let n = receive(client, reader, &mut buffer).await?;
        if n == 0 {
            registry.remove(client).await;
            registry.broadcast(&responses::left(&nickname), None).await;
            return Ok(());
        }

        let message = responses::chat(&nickname, &buffer[..n]);
        registry.broadcast(&message, Some(client.id())).await;
    }
}

/// Reads once from the client, giving up as soon as the client is stopped.
async fn receive(
    client: &Client,
    reader: &mut OwnedReadHalf,
    buffer: &mut [u8],
) -> Result<usize, ConnectionError> {
    if client.is_shutting_down() {
        return Err(ConnectionError::ShutdownInduced);
    }

    tokio::select! {
        _ = client.cancellation().cancelled() => Err(ConnectionError::ShutdownInduced),
        result = reader.read(buffer) => {
            result.map_err(|e| ConnectionError::classify(e, client.is_shutting_down()))
        }
    }
}
