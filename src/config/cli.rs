use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "azure-showcase")]
#[command(about = "Runs one scripted action against each configured cloud service and serves /greetings")]
pub struct CliArgs {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "azure-showcase.toml")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Start the HTTP server without running the startup demos
    #[arg(long)]
    pub skip_demos: bool,

    /// Load and validate the configuration, print a summary and exit
    #[arg(long)]
    pub dry_run: bool,
}
