//! Server core functionality
//!
//! This module contains the relay server controller and the per-port
//! listeners it drives.

pub mod core;
pub mod listener;

pub use core::Server;
pub use listener::PortListener;
