//! schedsim: run the single-CPU scheduler simulation.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use schedsim::sweep::{run_sweep, write_table, SWEEP_QUANTA, SWEEP_SEEDS};
use schedsim::{simulate, Burst, PolicyKind, Runtime, SimConfig, SimFormat};

/// Simulate SRTF or round-robin scheduling of synthetic CPU/I-O workloads.
#[derive(Parser)]
#[command(name = "schedsim")]
struct Cli {
    /// Round-robin time quantum in ticks (ignored by SRTF).
    /// Defaults to 5 for RR and 1 for SRTF.
    quantum: Option<Burst>,

    /// PRNG seed. Defaults to 82.
    seed: Option<u32>,

    /// Scheduling policy.
    #[arg(short, long, value_enum, env = "SCHEDSIM_POLICY")]
    policy: Option<PolicyKind>,

    /// Number of simulated workers.
    #[arg(short, long)]
    workers: Option<usize>,

    /// Real milliseconds between ticks (0 runs ticks back to back).
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,

    /// Step workers on the dispatcher thread instead of one thread each.
    #[arg(long)]
    inline: bool,

    /// Load settings from a TOML file; command-line values take precedence.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Fail if the run has not finished after this many ticks.
    #[arg(long, value_name = "TICKS")]
    max_ticks: Option<u64>,

    /// Run every quantum in 1..=5 against seeds 42, 52, 62, 72, 82 and
    /// print a table of mean wait times.
    #[arg(long)]
    sweep: bool,

    /// Print only the final report, not the tick-by-tick trace.
    #[arg(short, long)]
    quiet: bool,

    /// Enable verbose logging to stderr. Repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.sweep {
        let rows = run_sweep(&config, &SWEEP_QUANTA, &SWEEP_SEEDS)?;
        writeln!(out, "[sweep] policy {}", config.policy)?;
        write_table(&rows, &mut out)?;
        return Ok(());
    }

    writeln!(
        out,
        "[init] simulation start ({}), quantum: {}, seed: {}, workers: {}",
        config.policy,
        config.effective_quantum(),
        config.seed,
        config.nr_workers()
    )?;
    // Flushed so the header is visible while paced ticks run.
    out.flush()?;

    let result = simulate(config)?;

    if !cli.quiet {
        result.trace.write_to(&mut out)?;
        writeln!(out)?;
    }
    result.report.write_to(&mut out)?;
    writeln!(out, "[kernel] all workers reaped, shutting down")?;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };

    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(quantum) = cli.quantum {
        config.quantum = Some(quantum);
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if let Some(ms) = cli.tick_ms {
        config.tick_interval_ms = ms;
    }
    if cli.inline {
        config.runtime = Runtime::Inline;
    }
    if let Some(ticks) = cli.max_ticks {
        config.max_ticks = Some(ticks);
    }

    config.validate().context("invalid arguments")?;
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .event_format(SimFormat)
        .try_init();
}
