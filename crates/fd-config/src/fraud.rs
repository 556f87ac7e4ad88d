use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::engine::EngineConfig;
use crate::input::InputConfig;
use crate::logging::LoggingConfig;
use crate::metrics::MetricsConfig;
use crate::output::OutputConfig;
use crate::validate;

// ---------------------------------------------------------------------------
// FraudConfig: deserialized from fraud.toml, then validated
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FraudConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl FraudConfig {
    /// Read and parse a `fraud.toml` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }
}

impl FromStr for FraudConfig {
    type Err = anyhow::Error;

    /// Parse a TOML string into a validated [`FraudConfig`].
    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        let config: FraudConfig = toml::from_str(toml_str)?;
        validate::validate(&config)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
