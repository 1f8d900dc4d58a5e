//! Configuration types for the Rift scenario mock server.

mod listen;

use std::path::Path;

use crate::mock::{Mapping, MappingConfig};
use serde::{Deserialize, Serialize};

pub use listen::{AdminConfig, ListenConfig, DEFAULT_ADMIN_PORT, DEFAULT_MOCK_PORT};

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    /// Mappings registered at startup, in file order
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

impl Config {
    /// Load a YAML (or JSON) config file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {e}", path.display()))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.listen.port != 0 && self.listen.port == self.admin.port {
            anyhow::bail!(
                "Mock and admin listeners cannot share port {}",
                self.listen.port
            );
        }

        self.listen.socket_addr()?;
        self.admin.socket_addr()?;

        // Compile every mapping so a bad rule aborts startup
        for (index, mapping) in self.mappings.iter().enumerate() {
            Mapping::compile(mapping.clone()).map_err(|e| {
                let label = mapping
                    .id
                    .as_deref()
                    .or(mapping.name.as_deref())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{index}"));
                anyhow::anyhow!("Invalid mapping {label}: {e}")
            })?;
        }

        Ok(())
    }
}
