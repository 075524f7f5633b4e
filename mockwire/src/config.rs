//! Runner configuration

use mockwire_di::Stage;
use serde::{Deserialize, Serialize};

/// Injector stage configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageConfig {
    #[default]
    Development,
    Production,
    Tool,
}

impl From<StageConfig> for Stage {
    fn from(config: StageConfig) -> Self {
        match config {
            StageConfig::Development => Stage::Development,
            StageConfig::Production => Stage::Production,
            StageConfig::Tool => Stage::Tool,
        }
    }
}

/// Knobs for [`crate::runner::TestRunner`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Use an empty auto-binding module when a test class declares none;
    /// otherwise fall back to a plain test module that binds nothing
    pub auto_bind_mocks_without_module: bool,
    /// Render the binding report even if the test module does not ask for it
    pub report: bool,
    pub stage: StageConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            auto_bind_mocks_without_module: true,
            report: false,
            stage: StageConfig::default(),
        }
    }
}

#[cfg(feature = "config")]
impl RunnerConfig {
    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| crate::Error::Config(format!("Failed to parse TOML: {}", e)))
    }
}
