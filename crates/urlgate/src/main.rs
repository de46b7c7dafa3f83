mod classify;
mod cli;
mod config;
mod oracle;

use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use category_engine::CategoryStore;
use redirect_proto::{run, LoopOptions};

use crate::classify::BlocklistClassifier;
use crate::cli::{Cli, Command};
use crate::oracle::UnixGroupOracle;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    // Diagnostics go to stderr only; stdout belongs to the line protocol.
    init_tracing(&cfg.logging.level);

    let root = cli.db_dir.unwrap_or_else(|| cfg.database_dir.clone());

    match cli.command {
        Command::Build { force, categories } => {
            let names = if categories.is_empty() {
                cfg.categories.clone()
            } else {
                categories
            };
            CategoryStore::build_tables(&root, &names, force)
                .context("table rebuild failed")?;
            info!(categories = names.len(), "rebuild complete");
            Ok(())
        }

        Command::Serve { single_shot } => {
            // 1. Open the store: freshness-build stale tables, then load
            //    everything read-only for the lifetime of the process.
            let store = CategoryStore::open(&root, &cfg.categories)
                .with_context(|| format!("failed to open category store at {}", root.display()))?;

            // 2. Wire up the default classifier.  Blocked-category names are
            //    validated here, so a bad config dies before the first line.
            let oracle = UnixGroupOracle::new(cfg.group_file.clone());
            let classifier = BlocklistClassifier::new(
                &store,
                cfg.block.clone(),
                cfg.exempt_groups.clone(),
                cfg.block_ip_hosts,
                Box::new(oracle),
            )?;

            if io::stdin().is_terminal() {
                info!("reading request lines from a terminal; end with ctrl-d");
            }
            info!(
                categories = cfg.categories.len(),
                blocked = cfg.block.len(),
                single_shot,
                "serving line protocol on stdin/stdout"
            );

            // 3. Run the lock-step protocol loop until end-of-stream.
            let stdin = io::stdin();
            let stdout = io::stdout();
            let mut input = stdin.lock();
            let mut output = stdout.lock();
            run(
                &mut input,
                &mut output,
                &store,
                &classifier,
                cfg.redirect.as_ref(),
                LoopOptions { single_shot },
            )?;

            info!("input stream closed; shutting down");
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
