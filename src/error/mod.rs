//! Error handling
//!
//! Defines error types and reporting for the relay server.

pub mod handlers;
pub mod types;

pub use handlers::report_connection_error;
pub use types::*;
