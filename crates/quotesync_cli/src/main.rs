//! quotesync command-line entry point.
//!
//! # Responsibility
//! - Build configuration from environment and flags.
//! - Wire the SQLite store, simulated server and reconciler into one `App`.
//! - Run a single command, an interactive shell, or a periodic sync loop.

mod args;
mod shell;

use anyhow::{Context, Result};
use args::{Cli, CliCommand};
use clap::Parser;
use log::info;
use quotesync_core::db::open_db;
use quotesync_core::{
    flush_logging, init_logging, App, AppConfig, Command, QuoteBook, Reconciler, SimulatedServer,
    SqliteKvRepository,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::BufReader;

type CliApp = App<SqliteKvRepository, Arc<SimulatedServer>>;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli.config();

    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).context("failed to initialize logging")?;
    }

    let outcome = run(&cli, &config).await;
    flush_logging();
    outcome
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<ExitCode> {
    let (mut app, server) = build_app(config)?;
    let mut stdout = std::io::stdout();

    match &cli.command {
        CliCommand::Shell => {
            let _mutator = server.spawn_mutator();
            let input = BufReader::new(tokio::io::stdin());
            shell::run(&mut app, input, &mut stdout).await?;
        }
        CliCommand::Watch { ticks, .. } => {
            let _mutator = server.spawn_mutator();
            watch(&mut app, config, *ticks, &mut stdout).await?;
        }
        other => {
            let Some(command) = other.to_core() else {
                return Ok(ExitCode::SUCCESS);
            };
            let response = app.dispatch(command).await;
            shell::render(&response, &mut stdout)?;
            if !response.ok {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn build_app(config: &AppConfig) -> Result<(CliApp, Arc<SimulatedServer>)> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    let repo = SqliteKvRepository::begin_session(conn).context("failed to start session")?;
    let book = QuoteBook::load(repo);

    let server = Arc::new(SimulatedServer::new(config.server.clone()));
    let rng = match config.server.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!(
        "event=cli_start module=cli status=ok quotes={} db={}",
        book.len(),
        config.db_path.display()
    );

    let app = App::new(book, Reconciler::new(Arc::clone(&server)), rng);
    Ok((app, server))
}

/// Syncs every `sync_interval` and prints each outcome.
async fn watch(
    app: &mut CliApp,
    config: &AppConfig,
    ticks: Option<u64>,
    out: &mut impl Write,
) -> Result<()> {
    let mut ticker = tokio::time::interval(config.sync_interval);
    let mut done = 0u64;
    loop {
        ticker.tick().await;
        let response = app.dispatch(Command::Sync { push_local: true }).await;
        shell::render(&response, out)?;
        out.flush()?;

        done += 1;
        if ticks.is_some_and(|limit| done >= limit) {
            return Ok(());
        }
    }
}
