use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use probe_client::ReportClient;

use service_probe::config::{
    apply_env_overrides, load_config, validate_config, ConfigError, ProbeConfig,
};
use service_probe::credentials::{CredentialSource, VcapServices};
use service_probe::lifecycle::startup;
use service_probe::observability::logging;
use service_probe::probe::ProbeKind;

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(about = "Operator CLI for service acceptance probes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the report from a running probe process
    Fetch {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Run the probes once against the local bindings and print the summary
    Run {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the probe tags this build knows
    Tags,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { url } => {
            let response = ReportClient::new(&url).fetch().await?;
            println!("HTTP {}", response.status);
            println!("{}", response.body);
            Ok(exit(response.is_pass()))
        }
        Commands::Run { config } => {
            let config = load(config)?;
            logging::init(&config.observability.log_level);

            let source: Arc<dyn CredentialSource> =
                Arc::new(VcapServices::from_env(&config.credentials.env_var)?);
            match startup::run_probes(&config, source).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    Ok(exit(report.passed()))
                }
                Err(e) => {
                    eprintln!("{}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Tags => {
            for kind in ProbeKind::ALL {
                println!("{}", kind);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(path: Option<PathBuf>) -> Result<ProbeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(&path)?,
        None => ProbeConfig::default(),
    };
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())
        .map_err(ConfigError::Validation)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn exit(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
