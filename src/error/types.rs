//! Error types
//!
//! Defines the error kinds raised by listeners, client connections and the
//! server controller.

use std::fmt;
use std::io;

/// Errors raised by socket I/O on a listener or client connection.
///
/// Every I/O fault is classified into exactly one of these kinds by checking
/// the owning entity's shutting-down flag at the moment the fault is seen.
#[derive(Debug)]
pub enum ConnectionError {
    /// The fault is a direct consequence of a deliberate `stop()`.
    ShutdownInduced,
    /// The fault happened while the owner was live.
    ConnectionFault(io::Error),
}

impl ConnectionError {
    /// Classifies an I/O error according to the owner's shutting-down flag.
    pub fn classify(err: io::Error, shutting_down: bool) -> Self {
        if shutting_down {
            ConnectionError::ShutdownInduced
        } else {
            ConnectionError::ConnectionFault(err)
        }
    }

    pub fn is_shutdown_induced(&self) -> bool {
        matches!(self, ConnectionError::ShutdownInduced)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ShutdownInduced => write!(f, "Connection closed by shutdown"),
            ConnectionError::ConnectionFault(e) => write!(f, "Connection fault: {}", e),
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::ConnectionFault(e) => Some(e),
            ConnectionError::ShutdownInduced => None,
        }
    }
}

/// Errors raised while configuring or starting the server.
#[derive(Debug)]
pub enum ServerError {
    InvalidAddress(String),
    Bind { port: u16, source: io::Error },
    NoListeners,
    Config(config::ConfigError),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::InvalidAddress(addr) => write!(f, "Invalid bind address: {}", addr),
            ServerError::Bind { port, source } => {
                write!(f, "Failed to bind port {}: {}", port, source)
            }
            ServerError::NoListeners => write!(f, "No port listener could be started"),
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}
