//! Configuration management for RAX Relay Server
//!
//! Holds the relay settings loaded from `relay.toml` with environment
//! overrides, and the port-list handling used by the entry point.

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ServerError;

/// Port used when no valid port is given on the command line.
pub const DEFAULT_PORT: u16 = 23;

/// Relay server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Interface every port listener binds to
    /// Environment: RAX_RELAY_BIND_ADDRESS
    pub bind_address: String,

    /// Size of the single read that receives a client's nickname
    pub max_nickname_length: usize,

    /// Size of each read in a client's receive loop
    pub read_buffer_size: usize,

    /// Backlog passed to `listen()` for each port
    pub listen_backlog: u32,

    /// Deliver broadcasts back to the client that sent them
    /// Environment: RAX_RELAY_ECHO_TO_SENDER
    pub echo_to_sender: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            max_nickname_length: 32,
            read_buffer_size: 1024,
            listen_backlog: 128,
            echo_to_sender: true,
        }
    }
}

impl RelayConfig {
    /// Load configuration from relay.toml (optional) with environment overrides
    pub fn load() -> Result<Self, ServerError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("max_nickname_length", defaults.max_nickname_length as i64)?
            .set_default("read_buffer_size", defaults.read_buffer_size as i64)?
            .set_default("listen_backlog", defaults.listen_backlog as i64)?
            .set_default("echo_to_sender", defaults.echo_to_sender)?
            // Docker production path first, then local development
            .add_source(File::with_name("rax-relay-server/relay").required(false))
            .add_source(File::with_name("relay").required(false))
            .add_source(Environment::with_prefix("RAX_RELAY").try_parsing(true))
            .build()?;

        let config: RelayConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "bind_address cannot be empty".into(),
            ));
        }

        if self.max_nickname_length == 0 {
            return Err(config::ConfigError::Message(
                "max_nickname_length must be greater than 0".into(),
            ));
        }

        if self.read_buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "read_buffer_size must be greater than 0".into(),
            ));
        }

        if self.listen_backlog == 0 {
            return Err(config::ConfigError::Message(
                "listen_backlog must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

/// Turns command-line arguments into the list of ports to listen on.
///
/// Arguments that are not a valid non-zero port are discarded, order is
/// preserved and repeated ports are kept once. An empty result falls back
/// to [`DEFAULT_PORT`].
pub fn parse_ports<I, S>(args: I) -> Vec<u16>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ports = Vec::new();

    for arg in args {
        match arg.as_ref().trim().parse::<u16>() {
            Ok(0) | Err(_) => continue,
            Ok(port) if ports.contains(&port) => continue,
            Ok(port) => ports.push(port),
        }
    }

    if ports.is_empty() {
        ports.push(DEFAULT_PORT);
    }
    ports
}

/// Renders a port list the way the startup banner prints it: a bare number
/// for one port, a bracketed list otherwise.
pub fn describe_ports(ports: &[u16]) -> String {
    match ports {
        [single] => single.to_string(),
        _ => format!("{:?}", ports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_defaults_to_telnet_port() {
        let args: Vec<String> = Vec::new();
        assert_eq!(parse_ports(args), vec![23]);
    }

    #[test]
    fn invalid_arguments_are_discarded() {
        assert_eq!(parse_ports(["80", "x", "8080"]), vec![80, 8080]);
    }

    #[test]
    fn zero_and_out_of_range_are_discarded() {
        assert_eq!(parse_ports(["0", "70000", "-5", "2323"]), vec![2323]);
        assert_eq!(parse_ports(["0"]), vec![23]);
    }

    #[test]
    fn duplicate_ports_keep_first_occurrence() {
        assert_eq!(parse_ports(["9000", "80", "9000"]), vec![9000, 80]);
    }

    #[test]
    fn describe_single_and_many() {
        assert_eq!(describe_ports(&[23]), "23");
        assert_eq!(describe_ports(&[80, 8080]), "[80, 8080]");
    }

    #[test]
    fn default_config_is_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_nickname_length, 32);
        assert_eq!(config.read_buffer_size, 1024);
        assert!(config.echo_to_sender);
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let config = RelayConfig {
            read_buffer_size: 0,
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_error_becomes_server_error() {
        let config = RelayConfig {
            bind_address: " ".to_string(),
            ..RelayConfig::default()
        };
        let err: ServerError = config.validate().unwrap_err().into();
        assert!(matches!(err, ServerError::Config(_)));
        assert!(err.to_string().contains("bind_address cannot be empty"));
    }
}
