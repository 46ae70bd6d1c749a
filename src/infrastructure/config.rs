use serde::Deserialize;
use std::collections::HashMap;

const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "DASHBOARD";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ExportConfig {
    #[serde(default)]
    pub output: OutputSettings,
    /// Replacement default values for the dashboard's constant inputs
    #[serde(default)]
    pub constants: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OutputSettings {
    /// Destination file; stdout when unset
    pub path: Option<String>,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: None,
            pretty: default_pretty(),
        }
    }
}

fn default_pretty() -> bool {
    true
}

/// Load `config/dashboard.*` if present, then apply `DASHBOARD__*` environment overrides
pub fn load_export_config() -> anyhow::Result<ExportConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
