use aqms::cli::{self, Cli};
use aqms::config::AppConfig;
use clap::Parser;
use tracing::{error, warn};

mod main_runtime;

use main_runtime::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load_from(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: failed to load configuration ({}), using defaults", e);
            AppConfig::default()
        }
    };
    init_logging(&config.logging);

    if let Err(problems) = config.validate() {
        for problem in &problems {
            error!("Invalid configuration: {}", problem);
        }
        anyhow::bail!("configuration has {} problem(s)", problems.len());
    }

    if let Err(e) = cli::run(&cli, &config).await {
        warn!(error = %e, "Command failed");
        return Err(e.into());
    }

    Ok(())
}
