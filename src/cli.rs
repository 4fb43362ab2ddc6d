use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::coordinator::OrchestrationContext;
use crate::domain::City;
use crate::error::Result;
use crate::services::MonitoringService;

#[derive(Parser, Debug)]
#[command(name = "aqms")]
#[command(author = "AQMS Team")]
#[command(version = "0.1.0")]
#[command(about = "Dhaka / Kolkata transboundary air-quality monitoring", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding default.toml and the per-environment overrides
    #[arg(long, env = "AQMS_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one collection round for a city
    Collect {
        /// dhaka or kolkata
        #[arg(short, long, value_parser = parse_city)]
        city: City,
    },
    /// Run the orchestrator on a context file (built-in demo when omitted)
    Orchestrate {
        /// JSON file with `dhaka` / `kolkata` observations
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Collect both cities, then orchestrate on their aggregates
    Pipeline,
    /// Agent and orchestrator counters
    Status,
}

fn parse_city(raw: &str) -> std::result::Result<City, String> {
    raw.parse::<City>().map_err(|e| e.to_string())
}

/// Read an orchestration context from a JSON file
pub fn load_context(path: &Path) -> Result<OrchestrationContext> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Execute a parsed command and print its result as pretty JSON
pub async fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let mut service = MonitoringService::simulated(config);

    match &cli.command {
        Commands::Collect { city } => print_json(&service.run_collection(*city).await),
        Commands::Orchestrate { input } => {
            let context = match input {
                Some(path) => load_context(path)?,
                None => OrchestrationContext::demo(),
            };
            print_json(&service.run_orchestration(&context).await)
        }
        Commands::Pipeline => print_json(&service.run_pipeline().await),
        Commands::Status => print_json(&service.get_status()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collect_command() {
        let cli = Cli::try_parse_from(["aqms", "collect", "--city", "Kolkata"]).unwrap();
        match cli.command {
            Commands::Collect { city } => assert_eq!(city, City::Kolkata),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.config_dir, PathBuf::from("config"));
    }

    #[test]
    fn test_unknown_city_rejected() {
        assert!(Cli::try_parse_from(["aqms", "collect", "--city", "delhi"]).is_err());
    }

    #[test]
    fn test_load_context_file() {
        let path = std::env::temp_dir().join(format!("aqms_ctx_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"{"dhaka": {"pm25": 139.0, "timestamp": "2025-01-15T08:00:00Z"}}"#,
        )
        .unwrap();
        let ctx = load_context(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(ctx.dhaka.map(|o| o.pm25), Some(139.0));
        assert!(ctx.kolkata.is_none());
    }
}
