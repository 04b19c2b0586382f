//! Relay protocol
//!
//! Nickname handshake parsing and the messages broadcast to clients.

pub mod parser;
pub mod responses;

pub use parser::parse_nickname;
pub use responses::{NICK_PROMPT, SHUTDOWN_NOTICE};
