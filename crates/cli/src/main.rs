//! Corbel audit CLI
//!
//! A command-line tool for running corbel load-capacity audits against the
//! audit service and inspecting its parameters and health.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use commands::{audit, bounds, status};

const DEFAULT_API_URL: &str = "http://localhost:8501";

/// Corbel audit CLI
#[derive(Parser)]
#[command(name = "corbel")]
#[command(author, version, about = "CLI for the Corbel load-capacity audit service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CORBEL_API_URL env var or the config file)
    #[arg(long, env = "CORBEL_API_URL")]
    pub api_url: Option<String>,

    /// Output format (defaults to the config file setting, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a full audit: predicted load, a/d check and narrative report
    Audit {
        /// Concrete strength f'c (MPa), 21 to 35
        #[arg(long, default_value_t = 28.0)]
        fc: f64,

        /// Section width b (mm), 200 to 400
        #[arg(long, default_value_t = 300.0)]
        b: f64,

        /// Effective depth d (mm), 300 to 600
        #[arg(long, default_value_t = 500.0)]
        d: f64,

        /// Lever arm a (mm), 100 to 500
        #[arg(long, default_value_t = 250.0)]
        a: f64,

        /// Reinforcement ratio rho, 0.0040 to 0.0150
        #[arg(long, default_value_t = 0.01)]
        rho: f64,

        /// Gemini API key for the narrative report
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Show the design parameter bounds
    Bounds,

    /// Show service health and readiness
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = config::Config::load()?;

    let api_url = cli
        .api_url
        .or(file_config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let format = cli
        .format
        .or_else(|| {
            file_config
                .default_format
                .as_deref()
                .and_then(|f| output::OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or_default();

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Audit {
            fc,
            b,
            d,
            a,
            rho,
            api_key,
        } => {
            let parameters = client::DesignParameters { fc, b, d, a, rho };
            audit::run_audit(&client, parameters, api_key, format).await?;
        }
        Commands::Bounds => {
            bounds::show_bounds(&client, format).await?;
        }
        Commands::Status => {
            status::show_status(&client, format).await?;
        }
    }

    Ok(())
}
