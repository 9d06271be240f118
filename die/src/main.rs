//! Entry point for the die TUI. Parses args, spawns the engine loops, runs
//! the terminal UI.

mod app;
mod beeps;
mod ui;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use die_core::kill::{SysProcessOps, TerminationEngine};
use die_core::snapshot::{Collector, SNAPSHOT_INTERVAL};
use die_core::state::Shared;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

enum Cli {
    Run(ParsedArgs),
    Help(String),
    Version,
}

struct ParsedArgs {
    interval: Duration,
}

fn usage(prog: &str) -> String {
    format!(
        "die {VERSION} - process exterminator\n\
         Usage: {prog} [--interval SECS|-i SECS] [--version|-v] [--help|-h]\n\
         Keys: Up/Down navigate, K kill, T kill tree, / filter, R refresh, Q quit"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "die".into());
    let mut interval = SNAPSHOT_INTERVAL;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Cli::Help(usage(&prog))),
            "-v" | "--version" => return Ok(Cli::Version),
            "-i" | "--interval" => {
                let Some(v) = it.next() else {
                    return Err(usage(&prog));
                };
                interval = parse_interval(&v).ok_or_else(|| usage(&prog))?;
            }
            _ if arg.starts_with("--interval=") => {
                let v = arg.split_once('=').map(|(_, v)| v).unwrap_or("");
                interval = parse_interval(v).ok_or_else(|| usage(&prog))?;
            }
            _ => return Err(usage(&prog)),
        }
    }
    Ok(Cli::Run(ParsedArgs { interval }))
}

fn parse_interval(v: &str) -> Option<Duration> {
    let secs: f64 = v.parse().ok()?;
    if secs.is_finite() && secs > 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(Cli::Help(text)) => {
            println!("{text}");
            return Ok(());
        }
        Ok(Cli::Version) => {
            println!("{VERSION}");
            return Ok(());
        }
        Ok(Cli::Run(parsed)) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    // Silent by default; RUST_LOG opens it up (redirect stderr to a file, the
    // terminal is in raw mode).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let shared = Arc::new(Shared::new());
    let own_pid = sysinfo::get_current_pid().map(|p| p.as_u32()).unwrap_or(0);

    let sampler = tokio::spawn(Collector::new(parsed.interval).run(Arc::clone(&shared)));
    let killer = tokio::spawn(
        TerminationEngine::new(SysProcessOps::new(), own_pid).run(Arc::clone(&shared)),
    );
    let beeper = tokio::spawn(beeps::run(Arc::clone(&shared)));

    let mut app = app::App::new();
    let res = app.run(Arc::clone(&shared)).await;

    // Cooperative shutdown: the loops observe the flag within one bounded wait.
    shared.shutdown();
    let _ = tokio::time::timeout(Duration::from_secs(2), async {
        let _ = sampler.await;
        let _ = killer.await;
        let _ = beeper.await;
    })
    .await;

    res
}
