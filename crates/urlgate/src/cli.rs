use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "urlgate",
    version,
    about = "Category-based redirect helper for web proxies"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "urlgate.yaml")]
    pub config: PathBuf,

    /// Database root directory (overrides config file setting)
    #[arg(short, long)]
    pub db_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the line protocol on stdin/stdout
    Serve {
        /// Answer exactly one request line, then exit
        #[arg(long)]
        single_shot: bool,
    },
    /// Rebuild compiled tables from their plaintext sources
    Build {
        /// Rewrite tables even when they are newer than their sources
        #[arg(short, long)]
        force: bool,
        /// Categories to rebuild (default: every configured category)
        categories: Vec<String>,
    },
}
