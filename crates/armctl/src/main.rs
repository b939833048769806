use anyhow::Result;
use armctl_core::Config;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands, OutputFormat};
use connection::ConnectionManager;
use error::ArmctlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<(), ArmctlError> {
    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let mut conn_mgr = ConnectionManager::with_config_path(config, config_path);

    execute_command(cli, &mut conn_mgr).await
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "armctl=warn,armctl_core=warn",
            1 => "armctl=info,armctl_core=info",
            2 => "armctl=debug,armctl_core=debug",
            _ => "armctl=trace,armctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &mut ConnectionManager) -> Result<(), ArmctlError> {
    debug!("Executing command: {}", format_command(&cli.command));
    let profile = cli.profile.as_deref();

    match &cli.command {
        Commands::Run {
            sample,
            target,
            keep_resources,
            template_dir,
            names,
        } => {
            let request = commands::run::RunRequest {
                sample: *sample,
                target,
                keep_resources: *keep_resources,
                template_dir: template_dir.as_ref(),
                names,
            };
            commands::run::handle_run(request, conn_mgr, profile, cli.output).await
        }
        Commands::Cleanup { target } => {
            commands::run::handle_cleanup(target, conn_mgr, profile, cli.output).await
        }
        Commands::Samples => commands::samples::handle_samples(cli.output),
        Commands::Profile(profile_cmd) => {
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output)
        }
        Commands::Version => {
            match cli.output {
                OutputFormat::Json | OutputFormat::Yaml => {
                    let output_data = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    });
                    output::print_output(output_data, cli.output)?;
                }
                OutputFormat::Table => {
                    println!("armctl {}", env!("CARGO_PKG_VERSION"));
                }
            }
            Ok(())
        }
    }
}

fn format_command(command: &Commands) -> String {
    match command {
        Commands::Run { sample, .. } => format!("run {}", sample),
        Commands::Cleanup { .. } => "cleanup".to_string(),
        Commands::Samples => "samples".to_string(),
        Commands::Profile(_) => "profile".to_string(),
        Commands::Version => "version".to_string(),
    }
}
