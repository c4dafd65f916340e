use serde::{Deserialize, Serialize};

/// Configuration from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default)]
    pub workspace: WorkspaceInfo,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub funnel: FunnelConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Currency for new projects. Default: see CONFIG_TOML_TEMPLATE in cli/handlers/init.rs
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default = "default_months")]
    pub months_back: u32,
    #[serde(default = "default_months")]
    pub months_forward: u32,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        FunnelConfig {
            months_back: default_months(),
            months_forward: default_months(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive used when RUST_LOG is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: default_log_filter(),
        }
    }
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_months() -> u32 {
    3
}

fn default_log_filter() -> String {
    "siteplan=warn".to_string()
}
