//! Command-line surface.

use clap::{Parser, Subcommand, ValueEnum};
use quotesync_core::{AppConfig, Command, Resolution};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "quotesync", version, about = "Quote collection with simulated remote sync")]
pub struct Cli {
    /// SQLite file holding durable state (overrides QUOTESYNC_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Absolute directory for rolling log files (overrides QUOTESYNC_LOG_DIR)
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error (overrides QUOTESYNC_LOG_LEVEL)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Seed for the simulated server RNG (overrides QUOTESYNC_SEED)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Chance that a simulated fetch/push fails, 0.0..=1.0
    #[arg(long, global = true)]
    pub failure_probability: Option<f64>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Show a random quote from the active category
    Show,
    /// Add a quote
    Add { text: String, category: String },
    /// List categories and the active filter
    Categories,
    /// List every quote
    List,
    /// Select a category filter (`all` clears it) and show a quote
    Filter { category: String },
    /// Export quotes as pretty JSON into a directory
    Export {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Import quotes from a JSON file
    Import { path: PathBuf },
    /// Reconcile with the simulated server
    Sync {
        /// Skip pushing local quotes to the server
        #[arg(long)]
        no_push: bool,
    },
    /// List conflicts found by the last sync in this process
    Conflicts,
    /// Show the last viewed quote of this session
    Last,
    /// Show sync status and counters
    Status,
    /// Interactive session keeping the server and conflicts alive
    Shell,
    /// Sync periodically until interrupted
    Watch {
        /// Seconds between syncs (overrides QUOTESYNC_SYNC_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
        /// Stop after this many syncs
        #[arg(long)]
        ticks: Option<u64>,
    },
}

/// Resolution names accepted by the shell `resolve` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolutionArg {
    Server,
    Local,
}

impl From<ResolutionArg> for Resolution {
    fn from(value: ResolutionArg) -> Self {
        match value {
            ResolutionArg::Server => Resolution::AcceptServer,
            ResolutionArg::Local => Resolution::KeepLocal,
        }
    }
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::from_env();
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(seed) = self.seed {
            config.server.seed = Some(seed);
        }
        if let Some(p) = self.failure_probability {
            config.server.failure_probability = p;
        }
        if let CliCommand::Watch {
            interval: Some(secs),
            ..
        } = self.command
        {
            config.sync_interval = Duration::from_secs(secs);
        }
        config.normalized()
    }
}

impl CliCommand {
    /// Maps one-shot subcommands onto core commands.
    ///
    /// Returns `None` for `shell` and `watch`, which drive their own loops.
    pub fn to_core(&self) -> Option<Command> {
        let command = match self {
            Self::Show => Command::ShowRandom,
            Self::Add { text, category } => Command::AddQuote {
                text: text.clone(),
                category: category.clone(),
            },
            Self::Categories => Command::ListCategories,
            Self::List => Command::ListQuotes,
            Self::Filter { category } => Command::SetFilter(category.clone()),
            Self::Export { dir } => Command::Export { dir: dir.clone() },
            Self::Import { path } => Command::Import { path: path.clone() },
            Self::Sync { no_push } => Command::Sync {
                push_local: !no_push,
            },
            Self::Conflicts => Command::ListConflicts,
            Self::Last => Command::LastViewed,
            Self::Status => Command::Status,
            Self::Shell | Self::Watch { .. } => return None,
        };
        Some(command)
    }
}
