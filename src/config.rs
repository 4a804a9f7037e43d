//! Environment-based server configuration.

use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_OUTBOX_CAPACITY: usize = 32;

/// Errors raised by [`Config::from_env`] for malformed values. Unset
/// variables are never an error; they fall back to defaults.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on (`PORT`).
    pub port: u16,
    /// Per-connection outbox capacity in frames (`OUTBOX_CAPACITY`).
    /// A client whose outbox overflows is evicted.
    pub outbox_capacity: usize,
    /// Whether a broadcast is delivered back to its sender
    /// (`ECHO_TO_SENDER`). Defaults to true; clients that do not want
    /// their own messages back must filter on their side.
    pub echo_to_sender: bool,
    /// Directory served for non-WebSocket requests (`STATIC_DIR`).
    pub static_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_var("PORT", DEFAULT_PORT)?;
        let outbox_capacity = parse_var("OUTBOX_CAPACITY", DEFAULT_OUTBOX_CAPACITY)?;
        if outbox_capacity == 0 {
            // A zero-capacity outbox could never accept a frame; every
            // client would be evicted on the first broadcast.
            return Err(ConfigError::Invalid {
                name: "OUTBOX_CAPACITY",
                value: "0".to_string(),
            });
        }
        let echo_to_sender = parse_bool_var("ECHO_TO_SENDER", true)?;
        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static"));

        Ok(Self {
            port,
            outbox_capacity,
            echo_to_sender,
            static_dir,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

fn parse_bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in ["PORT", "OUTBOX_CAPACITY", "ECHO_TO_SENDER", "STATIC_DIR"] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_env_unset() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.outbox_capacity, DEFAULT_OUTBOX_CAPACITY);
        assert!(config.echo_to_sender);
        assert_eq!(config.static_dir, PathBuf::from("static"));
    }

    #[test]
    #[serial]
    fn test_reads_values_from_env() {
        clear_env();
        std::env::set_var("PORT", "9001");
        std::env::set_var("OUTBOX_CAPACITY", "4");
        std::env::set_var("ECHO_TO_SENDER", "false");
        std::env::set_var("STATIC_DIR", "/srv/www");

        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9001);
        assert_eq!(config.outbox_capacity, 4);
        assert!(!config.echo_to_sender);
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_malformed_port() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_zero_outbox_capacity() {
        clear_env();
        std::env::set_var("OUTBOX_CAPACITY", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }
}
