//! Interactive line-oriented session.
//!
//! One `App` lives for the whole session, so the simulated server keeps
//! mutating in the background and conflicts survive between commands.

use crate::args::ResolutionArg;
use clap::ValueEnum;
use quotesync_core::{App, Command, CommandResponse, KvRepository, QuoteRemote};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use std::path::PathBuf;

pub const HELP: &str = "\
commands:
  show                         random quote from the active category
  add <text> | <category>      add a quote
  categories | list            list categories / quotes
  filter <category|all>        select a category
  export [dir]                 write quotes-<timestamp>.json
  import <path>                merge quotes from a JSON file
  sync [--no-push]             reconcile with the server
  conflicts                    list pending conflicts
  resolve <index> <server|local>
  accept-all | keep-local      resolve every conflict at once
  status | last                sync status / last viewed quote
  help | quit";

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellInput {
    Run(Command),
    Help,
    Quit,
    Empty,
}

/// Parses one input line.
///
/// # Errors
/// Returns a usage message for unknown commands or missing arguments.
pub fn parse_line(line: &str) -> Result<ShellInput, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ShellInput::Empty);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => return Ok(ShellInput::Help),
        "quit" | "exit" => return Ok(ShellInput::Quit),
        "show" | "next" => Command::ShowRandom,
        "add" => {
            let (text, category) = rest
                .split_once('|')
                .ok_or_else(|| "usage: add <text> | <category>".to_string())?;
            Command::AddQuote {
                text: text.trim().to_string(),
                category: category.trim().to_string(),
            }
        }
        "categories" => Command::ListCategories,
        "list" => Command::ListQuotes,
        "filter" if !rest.is_empty() => Command::SetFilter(rest.to_string()),
        "filter" => return Err("usage: filter <category|all>".to_string()),
        "export" => Command::Export {
            dir: PathBuf::from(if rest.is_empty() { "." } else { rest }),
        },
        "import" if !rest.is_empty() => Command::Import {
            path: PathBuf::from(rest),
        },
        "import" => return Err("usage: import <path>".to_string()),
        "sync" => Command::Sync {
            push_local: rest != "--no-push",
        },
        "conflicts" => Command::ListConflicts,
        "resolve" => parse_resolve(rest)?,
        "accept-all" => Command::AcceptAllServer,
        "keep-local" => Command::KeepAllLocal,
        "status" => Command::Status,
        "last" => Command::LastViewed,
        other => return Err(format!("unknown command `{other}`; type `help`")),
    };
    Ok(ShellInput::Run(command))
}

fn parse_resolve(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "usage: resolve <index> <server|local>";
    let mut parts = rest.split_whitespace();
    let index = parts
        .next()
        .and_then(|raw| raw.trim_start_matches('#').parse::<usize>().ok())
        .ok_or_else(|| USAGE.to_string())?;
    let resolution = parts
        .next()
        .and_then(|raw| ResolutionArg::from_str(raw, true).ok())
        .ok_or_else(|| USAGE.to_string())?;
    Ok(Command::Resolve {
        index,
        resolution: resolution.into(),
    })
}

/// Renders a response the same way for every front end.
pub fn render(response: &CommandResponse, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", response.message)?;
    for line in &response.lines {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

/// Reads commands from `input` until EOF or `quit`.
pub async fn run<K: KvRepository, R: QuoteRemote>(
    app: &mut App<K, R>,
    input: impl AsyncBufRead + Unpin,
    out: &mut impl Write,
) -> std::io::Result<()> {
    writeln!(out, "quotesync shell; type `help` for commands")?;
    out.flush()?;
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(ShellInput::Run(command)) => render(&app.dispatch(command).await, out)?,
            Ok(ShellInput::Help) => writeln!(out, "{HELP}")?,
            Ok(ShellInput::Quit) => break,
            Ok(ShellInput::Empty) => {}
            Err(usage) => writeln!(out, "{usage}")?,
        }
        out.flush()?;
    }
    Ok(())
}
