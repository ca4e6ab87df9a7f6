use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the pool configuration file.
    #[arg(short, long, default_value = "config/pool.toml")]
    pub config: String,

    /// Override `max_active_containers`.
    #[arg(long)]
    pub max_active: Option<u32>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log directory; console-only when unset.
    #[arg(long)]
    pub log_dir: Option<String>,
}
