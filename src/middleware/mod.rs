//! Middleware components
//!
//! Observers hooked into the relay's client lifecycle.

pub mod logging;

pub use logging::{LogObserver, RelayObserver};
