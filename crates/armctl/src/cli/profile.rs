//! Profile subcommands

use clap::Subcommand;

/// Profile management commands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add")]
    Set {
        /// Profile name
        name: String,

        /// Subscription to work in
        #[arg(long)]
        subscription_id: Option<String>,

        /// Default location
        #[arg(long)]
        location: Option<String>,

        /// Default resource group
        #[arg(long)]
        resource_group: Option<String>,

        /// Management endpoint (sovereign clouds)
        #[arg(long)]
        management_endpoint: Option<String>,

        /// Where the bearer token comes from
        #[arg(long, value_enum, default_value = "default")]
        credential: CredentialKind,

        /// Tenant id (client-secret credential)
        #[arg(long, required_if_eq("credential", "client-secret"))]
        tenant_id: Option<String>,

        /// Client id (client-secret credential)
        #[arg(long, required_if_eq("credential", "client-secret"))]
        client_id: Option<String>,

        /// Client secret; may reference an environment variable as ${VAR}
        #[arg(long)]
        client_secret: Option<String>,

        /// Bearer token (token credential); may reference ${VAR}
        #[arg(long)]
        token: Option<String>,

        /// Seconds between operation status reads
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Seconds before an operation is abandoned
        #[arg(long)]
        poll_timeout: Option<u64>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },
}

/// Credential source choices for `profile set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CredentialKind {
    /// Environment token, then client secret, then the Azure CLI
    Default,
    /// Azure CLI login
    Cli,
    /// Service principal with a client secret
    ClientSecret,
    /// Pre-issued bearer token
    Token,
}
