use std::path::PathBuf;

use clap::Parser;
use siteplan::cli::commands::{Cli, Commands};
use siteplan::cli::handlers;
use siteplan::io::config_io;
use siteplan::model::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise the workspace's `[log] filter`, if there is
/// a readable workspace around.
fn init_tracing(workspace_dir: Option<&str>) {
    let fallback = workspace_dir
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .and_then(|start| config_io::discover_workspace(&start).ok())
        .and_then(|store_dir| config_io::read_config(&store_dir).ok())
        .map(|config| config.log.filter)
        .unwrap_or_else(|| LogConfig::default().filter);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.workspace_dir.as_deref());

    let result = match cli.command {
        None => {
            eprintln!("no command given (try `sp --help`)");
            std::process::exit(2);
        }
        Some(Commands::Init(args)) => {
            // Init runs before workspace discovery
            handlers::cmd_init(args, cli.workspace_dir.as_deref())
        }
        Some(_) => handlers::dispatch(cli).await,
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
