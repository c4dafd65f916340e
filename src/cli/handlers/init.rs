use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::InitArgs;
use crate::io::config_io::{self, CONFIG_FILE, STORE_DIR};
use crate::io::recovery::atomic_write;
use crate::io::store::Collection;

const CONFIG_TOML_TEMPLATE: &str = r##"[workspace]
name = "{name}"

[defaults]
# Currency for new projects
currency = "{currency}"

[funnel]
# Months before the current month shown by `sp funnel`
months_back = 3
# Months from the current month on
months_forward = 3

[log]
# tracing filter used when RUST_LOG is not set, e.g. "siteplan=debug"
filter = "siteplan=warn"
"##;

const EMPTY_COLLECTION: &str = "[]\n";

/// Infer a workspace name from a directory name: hyphens become spaces,
/// words are title-cased.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_config_toml(name: &str, currency: &str) -> String {
    CONFIG_TOML_TEMPLATE
        .replace("{name}", &name.replace('"', "\\\""))
        .replace("{currency}", currency)
}

/// Create `siteplan/` with a config file and empty collections. With
/// `force`, the config is rewritten but existing collections are kept.
pub fn cmd_init(args: InitArgs, workspace_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let base: PathBuf = match workspace_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let store_dir = base.join(STORE_DIR);

    if store_dir.join(CONFIG_FILE).exists() && !args.force {
        return Err("siteplan workspace already exists in ./siteplan/ (use --force to reinitialize)".into());
    }

    if let Some(parent) = base.parent()
        && let Ok(outer) = config_io::discover_workspace(parent)
    {
        eprintln!("Note: enclosing workspace found at {}/", outer.display());
    }

    let name = args.name.unwrap_or_else(|| {
        base.canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|n| n.to_str())
            .map(infer_name)
            .unwrap_or_else(|| "Untitled".to_string())
    });
    let currency = args.currency.unwrap_or_else(|| "INR".to_string());

    fs::create_dir_all(&store_dir)?;
    atomic_write(
        &store_dir.join(CONFIG_FILE),
        render_config_toml(&name, &currency).as_bytes(),
    )?;
    for collection in Collection::ALL {
        let path = store_dir.join(collection.file_name());
        if !path.exists() {
            fs::write(&path, EMPTY_COLLECTION)?;
        }
    }

    tracing::info!(dir = %store_dir.display(), "workspace initialized");
    println!("Initialized siteplan workspace: {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::InitArgs;
    use tempfile::TempDir;

    fn args(name: Option<&str>, force: bool) -> InitArgs {
        InitArgs {
            name: name.map(str::to_string),
            currency: None,
            force,
        }
    }

    #[test]
    fn infers_names() {
        assert_eq!(infer_name("lake-house"), "Lake House");
        assert_eq!(infer_name("studio_north"), "Studio North");
        assert_eq!(infer_name("atelier"), "Atelier");
    }

    #[test]
    fn template_parses_with_defaults() {
        let text = render_config_toml("Studio \"A\"", "EUR");
        let config: crate::model::config::WorkspaceConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.workspace.name, "Studio \"A\"");
        assert_eq!(config.defaults.currency, "EUR");
        assert_eq!(config.funnel.months_back, 3);
        assert_eq!(config.log.filter, "siteplan=warn");
    }

    #[test]
    fn creates_workspace_once() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap();
        cmd_init(args(Some("Test"), false), Some(dir)).unwrap();

        let store_dir = tmp.path().join(STORE_DIR);
        for collection in Collection::ALL {
            let text = fs::read_to_string(store_dir.join(collection.file_name())).unwrap();
            assert_eq!(text, EMPTY_COLLECTION);
        }
        assert_eq!(config_io::read_config(&store_dir).unwrap().workspace.name, "Test");

        assert!(cmd_init(args(None, false), Some(dir)).is_err());
    }

    #[test]
    fn force_keeps_collections() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().to_str().unwrap();
        cmd_init(args(Some("One"), false), Some(dir)).unwrap();
        let tasks = tmp.path().join(STORE_DIR).join("tasks.json");
        fs::write(&tasks, r#"[{"id":"t1","name":"Keep me"}]"#).unwrap();

        cmd_init(args(Some("Two"), true), Some(dir)).unwrap();
        assert!(fs::read_to_string(&tasks).unwrap().contains("Keep me"));
        let config = config_io::read_config(&tmp.path().join(STORE_DIR)).unwrap();
        assert_eq!(config.workspace.name, "Two");
    }
}
