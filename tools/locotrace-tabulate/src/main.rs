// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! locotrace-tabulate - turn a vehicle log into a fixed-width table
//!
//! Reads `<log>` (one record per line, sampled every `<period_ms>`) and
//! writes `<log>.xyz`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Tabulate a locotrace vehicle log
#[derive(Parser, Debug)]
#[command(name = "locotrace-tabulate")]
#[command(version = "0.1.0")]
#[command(about = "Convert a locotrace vehicle log into an aligned table (<log>.xyz)")]
struct Args {
    /// Vehicle log written by the file sink
    log: PathBuf,

    /// Sampling period the log was recorded with, in milliseconds
    period_ms: u64,

    /// Also print the table to stdout
    #[arg(short, long)]
    print: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let (path, table) =
        locotrace::tabulate_file(&args.log, Duration::from_millis(args.period_ms))
            .with_context(|| format!("Failed to tabulate {}", args.log.display()))?;

    if args.print {
        print!("{}", table);
    }
    eprintln!(
        "Wrote {} row(s) to {} ({} line(s) skipped)",
        table.rows().len(),
        path.display(),
        table.skipped()
    );
    Ok(())
}
