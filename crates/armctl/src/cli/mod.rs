//! CLI structure and command definitions

use armctl_core::SampleKind;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod profile;

pub use profile::*;

/// Azure Resource Manager provisioning samples
#[derive(Parser, Debug)]
#[command(name = "armctl")]
#[command(version, about = "Provision, verify and clean up Azure Resource Manager samples")]
#[command(long_about = "
Provision, verify and clean up Azure Resource Manager samples

Every sample ensures a resource group, creates and inspects its resources
(waiting for each long-running operation to finish) and then deletes the
group unless resources are kept.

EXAMPLES:
    # List the available samples
    armctl samples

    # Create a MySQL server, read it back and clean up
    AZURE_SUBSCRIPTION_ID=<id> armctl run mysql

    # Keep everything that was created
    armctl run service-bus --subscription <id> --keep-resources

    # Override sample settings
    armctl run container-registry --name registry=myregistry --name replication_location=westeurope

    # Delete the resource group left behind by a kept run
    armctl cleanup --resource-group sample-resource-group

For more help on a specific command, run:
    armctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "ARMCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "ARMCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Human-readable table format
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a provisioning sample end to end
    #[command(after_help = "EXAMPLES:
    # Run with defaults (westus, sample-resource-group)
    armctl run private-dns --subscription <id>

    # Deploy a template from a custom directory
    armctl run deployment --template-dir ./templates

    # Poll every 5 seconds and give up after 10 minutes per operation
    armctl run cdn-endpoint --poll-interval 5 --poll-timeout 600
")]
    Run {
        /// Sample to run
        #[arg(value_enum)]
        sample: SampleKind,

        #[command(flatten)]
        target: TargetArgs,

        /// Keep the resource group and everything in it
        #[arg(
            long,
            env = "KEEP_RESOURCE",
            action = ArgAction::SetTrue,
            value_parser = clap::builder::FalseyValueParser::new()
        )]
        keep_resources: bool,

        /// Directory holding template.json and parameters.json (deployment sample)
        #[arg(long)]
        template_dir: Option<PathBuf>,

        /// Sample setting as key=value (repeatable, see `armctl samples`)
        #[arg(long = "name", value_name = "KEY=VALUE")]
        names: Vec<String>,
    },

    /// Delete the run's resource group
    #[command(after_help = "EXAMPLES:
    # Remove what a kept run left behind
    armctl cleanup --subscription <id> --resource-group sample-resource-group
")]
    Cleanup {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List the available samples and their settings
    #[command(visible_alias = "ls")]
    Samples,

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    #[command(after_help = "EXAMPLES:
    # Create a profile that uses the Azure CLI login
    armctl profile set dev --subscription-id <id> --credential cli

    # Create a service principal profile
    armctl profile set ci --subscription-id <id> --credential client-secret \\
        --tenant-id <tenant> --client-id <client> --client-secret '${AZURE_CLIENT_SECRET}'

    # List all profiles
    armctl profile list
")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver")]
    Version,
}

/// Where a run or cleanup takes place
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Subscription to work in
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID", hide_env_values = true)]
    pub subscription: Option<String>,

    /// Location for the resource group and its resources
    #[arg(long)]
    pub location: Option<String>,

    /// Resource group to create and delete
    #[arg(long)]
    pub resource_group: Option<String>,

    /// Seconds between operation status reads
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Seconds before an operation is abandoned
    #[arg(long, value_name = "SECS")]
    pub poll_timeout: Option<u64>,
}
