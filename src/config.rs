//! Server configuration.

use std::path::Path;

use serde::Deserialize;

use crate::core::{DEFAULT_ITERATIONS, SimulationError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Trajectories per stochastic simulation.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            iterations: default_iterations(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &Path) -> Result<Self, SimulationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimulationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, SimulationError> {
        let config: Self =
            toml::from_str(content).map_err(|e| SimulationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.iterations == 0 {
            return Err(SimulationError::Config("iterations must be > 0".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(SimulationError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}
