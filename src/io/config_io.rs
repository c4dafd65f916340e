use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::WorkspaceConfig;

/// Name of the directory holding a workspace's config and collections
pub const STORE_DIR: &str = "siteplan";
pub const CONFIG_FILE: &str = "config.toml";

/// Error type for workspace configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a siteplan workspace: no siteplan/ directory found (run `sp init`)")]
    NotAWorkspace,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not serialize config.toml: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Discover the workspace by walking up from `start`, looking for a
/// `siteplan/config.toml`. Returns the `siteplan/` directory.
pub fn discover_workspace(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        let store_dir = current.join(STORE_DIR);
        if store_dir.is_dir() && store_dir.join(CONFIG_FILE).exists() {
            return Ok(store_dir);
        }
        if !current.pop() {
            return Err(ConfigError::NotAWorkspace);
        }
    }
}

pub fn read_config(store_dir: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let path = store_dir.join(CONFIG_FILE);
    let text = fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;
    Ok(toml::from_str(&text)?)
}

pub fn write_config(store_dir: &Path, config: &WorkspaceConfig) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    crate::io::recovery::atomic_write(&store_dir.join(CONFIG_FILE), text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discovers_from_nested_directory() {
        let tmp = TempDir::new().unwrap();
        let store_dir = tmp.path().join(STORE_DIR);
        fs::create_dir_all(&store_dir).unwrap();
        fs::write(store_dir.join(CONFIG_FILE), "").unwrap();
        let nested = tmp.path().join("site/photos");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(discover_workspace(&nested).unwrap(), store_dir);
    }

    #[test]
    fn missing_workspace() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover_workspace(tmp.path()),
            Err(ConfigError::NotAWorkspace)
        ));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "").unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.defaults.currency, "INR");
        assert_eq!(config.funnel.months_back, 3);
        assert_eq!(config.funnel.months_forward, 3);
        assert_eq!(config.log.filter, "siteplan=warn");
    }

    #[test]
    fn partial_config_and_round_trip() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "[workspace]\nname = \"Studio\"\n\n[funnel]\nmonths_back = 6\n",
        )
        .unwrap();
        let mut config = read_config(tmp.path()).unwrap();
        assert_eq!(config.workspace.name, "Studio");
        assert_eq!(config.funnel.months_back, 6);
        assert_eq!(config.funnel.months_forward, 3);

        config.defaults.currency = "EUR".into();
        write_config(tmp.path(), &config).unwrap();
        let again = read_config(tmp.path()).unwrap();
        assert_eq!(again.defaults.currency, "EUR");
        assert_eq!(again.funnel.months_back, 6);
    }
}
