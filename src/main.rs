use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reversi_mailbox::source::SourceKind;
use reversi_mailbox::{MatchConfig, Outcome, run_configured};

/// Play one game of Reversi between two mailbox peers.
#[derive(Debug, Parser)]
#[command(name = "reversi-mailbox", version)]
struct Cli {
    /// JSON match configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Move source for black
    #[arg(long, value_enum)]
    black: Option<SourceKind>,

    /// Move source for white
    #[arg(long, value_enum)]
    white: Option<SourceKind>,

    /// Seed for random move sources
    #[arg(long)]
    seed: Option<u64>,

    /// Mailbox re-check interval in milliseconds
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Give up when a peer waits longer than this many milliseconds
    #[arg(long)]
    turn_timeout_ms: Option<u64>,

    /// Log filter, e.g. `debug` or `reversi_mailbox=trace`; defaults to RUST_LOG, then `info`
    #[arg(long)]
    log: Option<String>,

    /// Print the match report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn match_config(&self) -> anyhow::Result<MatchConfig> {
        let mut config = match &self.config {
            Some(path) => MatchConfig::load(path).context("loading match config")?,
            None => MatchConfig::default(),
        };
        if let Some(black) = self.black {
            config.black = black;
        }
        if let Some(white) = self.white {
            config.white = white;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(poll_ms) = self.poll_ms {
            config.poll_interval_ms = poll_ms;
        }
        if self.turn_timeout_ms.is_some() {
            config.turn_timeout_ms = self.turn_timeout_ms;
        }
        Ok(config)
    }
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.match_config()?;
    tracing::debug!("[CONFIG] {:?}", config);

    let report = run_configured(&config).context("running match")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("encoding match report")?
        );
        return Ok(());
    }

    let (black, white) = report.black.board.count();
    println!("{}", report.black.board);
    println!("black {black}, white {white}");
    match report.outcome {
        Outcome::Winner(color) => println!("winner: {color}"),
        Outcome::Draw => println!("draw"),
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
