//! rbackup CLI: list, skeleton, slice, copy, or run every phase.

use anyhow::Result;
use clap::Parser;
use rbackup::engine::arg_parser::Cli;
use rbackup::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
