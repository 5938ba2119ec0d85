use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "url-history", version, about = "Records chat URLs and reports repeats")]
pub struct Cli {
    /// YAML config file.
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,

    /// SQLite history file, overrides `database` from the config.
    #[arg(short, long, env = "URL_HISTORY_DB")]
    pub database: Option<String>,

    /// Start with built-in defaults when the config file does not exist.
    #[arg(long)]
    pub allow_missing_config: bool,
}
