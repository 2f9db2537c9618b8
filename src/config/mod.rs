pub mod credentials;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;

/// Command line of the online run. Flags override the TOML values.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "keyword-etl")]
#[command(about = "Collects keyword metrics per country and scores the phrase list")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "keyword-etl.toml")]
    pub config: String,

    /// Override the export row cap
    #[arg(long)]
    pub row_cap: Option<usize>,

    #[arg(long)]
    pub volume_weight: Option<f64>,

    #[arg(long)]
    pub difficulty_weight: Option<f64>,

    /// Keep the measurement table and skip countries already in it
    #[arg(long)]
    pub resume: bool,

    /// Wipe a non-empty download directory before starting
    #[arg(long)]
    pub force: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}
