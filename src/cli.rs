use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "stellar-deck",
    version,
    about = "A terminal console for multi-cluster workload management."
)]
pub struct CliArgs {
    /// Base URL of the platform backend
    #[arg(long)]
    pub api_url: Option<String>,

    /// Bearer token; overrides the stored session
    #[arg(long)]
    pub token: Option<String>,

    /// Namespace used by the services view
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Colour theme (dark or light)
    #[arg(long)]
    pub theme: Option<String>,

    /// Interface language (en, es, de)
    #[arg(long)]
    pub locale: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
