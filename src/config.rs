//! Configuration types for the timer
//!
//! Configuration is an explicit value handed to the components that need it
//! (time formatting, the autosplit listener). It can be loaded from TOML.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Default TCP port for the autosplit protocol
pub const DEFAULT_PORT: u16 = 9991;

/// Precision used when rendering times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// One fractional digit
    Tenths,
    /// Two fractional digits
    #[default]
    Hundredths,
    /// Three fractional digits
    Milliseconds,
    /// Nine fractional digits
    Nanoseconds,
}

impl Accuracy {
    /// Number of fractional digits rendered
    pub fn digits(&self) -> u32 {
        match self {
            Accuracy::Tenths => 1,
            Accuracy::Hundredths => 2,
            Accuracy::Milliseconds => 3,
            Accuracy::Nanoseconds => 9,
        }
    }

    /// Nanoseconds per rendered unit
    pub fn unit_nanos(&self) -> i64 {
        10_i64.pow(9 - self.digits())
    }
}

/// Time formatting options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Fractional precision
    pub accuracy: Accuracy,
    /// Omit leading zero hours and minutes ("1.50" instead of "0:00:01.50")
    pub compact: bool,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Hundredths,
            compact: false,
        }
    }
}

/// Autosplit listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the listening socket on
    pub bind_address: String,
    /// TCP port (0 picks an ephemeral port)
    pub port: u16,
    /// How often blocking accept/read calls wake up to check the stop flag
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            poll_interval_ms: 50,
        }
    }
}

impl ServerConfig {
    /// Config bound to loopback on the given port
    pub fn localhost(port: u16) -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port,
            ..Self::default()
        }
    }

    /// Resolve the bind address and port into a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let text = format!("{}:{}", self.bind_address, self.port);
        text.parse().map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid bind address '{}'", text),
            )
            .into()
        })
    }

    /// Poll interval as a duration, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Top-level timer configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub server: ServerConfig,
    pub format: FormatConfig,
}

impl TimerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded timer config from {}", path.display());
        Ok(config)
    }
}
