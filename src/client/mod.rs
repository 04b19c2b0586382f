//! Client management system
//!
//! Handles relay connections, the shared client registry and each
//! connection's receive-and-broadcast loop.

pub mod handler;
pub mod registry;
pub mod state;

pub use registry::ClientRegistry;
pub use state::{Client, ClientId};
