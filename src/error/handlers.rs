//! Error handlers
//!
//! Decides which connection errors reach the log.

use crate::error::types::ConnectionError;
use log::{debug, error};

/// Reports the error that ended a listener or client task.
///
/// Shutdown-induced errors are expected and never surface above `debug`.
pub fn report_connection_error(context: &str, err: &ConnectionError) {
    match err {
        ConnectionError::ShutdownInduced => debug!("{} stopped during shutdown", context),
        ConnectionError::ConnectionFault(e) => error!("{} failed: {}", context, e),
    }
}
