//! Configuration for seqdump
//!
//! An optional YAML file provides defaults; command line flags override them.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::event::ProtocolMode;
use crate::ports::PortSpec;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Name of the sequencer client (and of the virtual port)
    #[serde(default = "default_client_name")]
    pub client_name: String,

    /// Source ports: `client:port` or a name fragment
    #[serde(default)]
    pub ports: Vec<String>,

    /// Client protocol: 0 legacy, 1 UMP MIDI 1.0, 2 UMP MIDI 2.0
    #[serde(default)]
    pub ump: u8,

    /// Keep events as received instead of converting them for the client
    #[serde(default)]
    pub raw: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            ports: Vec::new(),
            ump: 0,
            raw: false,
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.protocol_mode()?;
        Ok(config)
    }

    pub fn protocol_mode(&self) -> Result<ProtocolMode> {
        ProtocolMode::from_version(self.ump)
            .with_context(|| format!("Invalid UMP version {} (expected 0, 1 or 2)", self.ump))
    }

    pub fn port_specs(&self) -> Vec<PortSpec> {
        self.ports
            .iter()
            .flat_map(|entry| PortSpec::parse_list(entry))
            .collect()
    }
}

/// Values given on the command line; empty or `None` keeps the file value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ports: Vec<String>,
    pub ump: Option<u8>,
    pub raw: bool,
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn apply(&mut self, overrides: Overrides) {
        if !overrides.ports.is_empty() {
            self.ports = overrides.ports;
        }
        if let Some(ump) = overrides.ump {
            self.ump = ump;
        }
        self.raw |= overrides.raw;
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
    }
}

fn default_client_name() -> String {
    "seqdump".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}
