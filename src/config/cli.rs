use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the cachewire binary.
#[derive(Debug, Parser)]
#[command(
    name = "cachewire",
    version,
    about = "Resolve cache policies and dispatch cache entry events"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "CACHEWIRE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SettingsOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the full cache plan handed to the cache runtime.
    Plan(PlanArgs),
    /// Print the effective policy for one cache name.
    Resolve(ResolveArgs),
    /// List the names of every planned cache.
    Caches,
    /// Dispatch a JSON file of cache entry events through the registered listeners.
    Dispatch(DispatchArgs),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Toml,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PlanArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Args, Clone)]
pub struct ResolveArgs {
    /// Cache name to resolve; unknown names resolve to the DEFAULT policy.
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Debug, Args, Clone)]
pub struct DispatchArgs {
    /// JSON file holding an array of cache entry events.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SettingsOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the cluster instance name.
    #[arg(long = "cluster-instance-name", value_name = "NAME", global = true)]
    pub cluster_instance_name: Option<String>,

    /// Override the cluster member port.
    #[arg(long = "network-port", value_name = "PORT", global = true)]
    pub network_port: Option<u16>,

    /// Override the advertised public address.
    #[arg(long = "network-public-address", value_name = "ADDR", global = true)]
    pub network_public_address: Option<String>,

    /// Replace the TCP/IP join member list (repeatable).
    #[arg(long = "tcp-ip-member", value_name = "ADDR", global = true)]
    pub tcp_ip_members: Vec<String>,

    /// Toggle the management center integration.
    #[arg(
        long = "management-center-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub management_center_enabled: Option<bool>,

    /// Override the management center URL.
    #[arg(long = "management-center-url", value_name = "URL", global = true)]
    pub management_center_url: Option<String>,
}
