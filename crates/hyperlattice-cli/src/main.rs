// ─────────────────────────────────────────────────────────────────────
// Hyperlattice — Command-Line Driver
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Runs the configured number of time steps, sweeps the dimension
//! range, and prints one table row per dimension.
//!
//! Exit codes: `0` success, `1` argument-parse or simulation error.

mod cli;
mod table;

use std::io::IsTerminal;
use std::process;

use clap::Parser;
use log::{error, info};
use tracing_subscriber::filter::LevelFilter;

use hyperlattice_core::EnergyCalculator;
use hyperlattice_types::LatticeResult;

use crate::cli::{parse_exit_code, Cli};
use crate::table::render_table;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Nothing left to report to if stdout/stderr are gone.
            e.print().ok();
            process::exit(parse_exit_code(&e));
        }
    };

    let level = if cli.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        error!("simulation failed: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> LatticeResult<()> {
    let config = cli.build_config()?;
    let mut calc = EnergyCalculator::new(config)?;
    info!(
        "lattice d={} V={} d_max={} threads={}",
        calc.current_dimension(),
        calc.num_vertices(),
        calc.max_dimensions(),
        calc.threads()
    );

    for _ in 0..cli.timesteps {
        calc.advance_cycle()?;
    }
    if cli.timesteps > 0 {
        let evolved = calc.compute()?;
        info!(
            "after {} steps: t={:.4} observable={:e}",
            cli.timesteps,
            calc.simulation_time(),
            evolved.observable
        );
    }

    let start = cli.start.unwrap_or(1);
    let end = cli.end.unwrap_or(calc.max_dimensions());
    let rows = calc.compute_batch(start, end)?;
    print!("{}", render_table(&rows, std::io::stdout().is_terminal()));
    Ok(())
}
