pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod protocol;
pub mod server;
pub mod utils;

pub use config::RelayConfig;
pub use server::Server;
