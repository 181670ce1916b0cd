// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-width table view of a recorded vehicle log.
//!
//! Each log line is one encoded record. The table splits `position` into
//! `x`/`y`/`z`, adds `time`, `distance` and `acceleration` derived from the
//! sampling period, and right-aligns every column.

use crate::record::Record;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Column order used before any log-specific key.
pub const DEFAULT_COLUMNS: [&str; 19] = [
    "vehicle",
    "plate",
    "weight",
    "x",
    "y",
    "z",
    "grade",
    "time",
    "distance",
    "speed",
    "rpm",
    "gear1",
    "gear2",
    "throttle",
    "force",
    "acceleration",
    "reverser",
    "boiler_p",
    "chest_p",
];

/// Placeholder for a cell the row has no value for.
pub const MISSING: &str = "--";

/// Extension appended to the log path for the table.
pub const TABLE_EXTENSION: &str = "xyz";

/// Tabulation errors.
#[derive(Debug, Error)]
pub enum TabulateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("sampling period must be greater than zero")]
    InvalidPeriod,
}

/// A parsed log, ready to print.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    widths: HashMap<String, usize>,
    rows: Vec<Record>,
    skipped: usize,
}

impl Table {
    /// Build a table from log text sampled every `period`.
    ///
    /// Lines that are not a JSON object of strings are skipped.
    pub fn from_log(log: &str, period: Duration) -> Result<Self, TabulateError> {
        if period.is_zero() {
            return Err(TabulateError::InvalidPeriod);
        }
        let period_s = period.as_secs_f64();

        let mut table = Table {
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            widths: DEFAULT_COLUMNS.iter().map(|c| (c.to_string(), c.len())).collect(),
            rows: Vec::new(),
            skipped: 0,
        };
        let mut distance = 0.0_f64;
        let mut previous_speed: Option<f64> = None;

        for line in log.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Ok(entry) = serde_json::from_str::<Record>(line) else {
                table.skipped += 1;
                continue;
            };

            let mut row = Record::new();
            for (key, value) in entry.iter() {
                if key == "position" {
                    if let Some([x, y, z]) = parse_position(value) {
                        row.insert("x", fixed(x));
                        row.insert("y", fixed(y));
                        row.insert("z", fixed(z));
                    }
                } else {
                    row.insert(key, value);
                }
            }

            row.insert("time", fixed(table.rows.len() as f64 * period_s));

            let speed = entry.get("speed").and_then(|s| s.trim().parse::<f64>().ok());
            if let Some(speed) = speed {
                row.insert("distance", fixed(distance));
                distance += period_s * speed;
                if let Some(previous) = previous_speed {
                    row.insert("acceleration", fixed((speed - previous) / period_s));
                }
            }
            previous_speed = speed;

            table.add_row(row);
        }

        Ok(table)
    }

    fn add_row(&mut self, row: Record) {
        for (key, value) in row.iter() {
            let width = value.chars().count();
            match self.widths.get_mut(key) {
                Some(current) => *current = (*current).max(width),
                None => {
                    // Earlier rows render the placeholder in a late column.
                    let mut initial = width.max(key.chars().count());
                    if !self.rows.is_empty() {
                        initial = initial.max(MISSING.len());
                    }
                    self.columns.push(key.to_string());
                    self.widths.insert(key.to_string(), initial);
                }
            }
        }
        for column in &self.columns {
            if !row.contains_key(column) {
                if let Some(current) = self.widths.get_mut(column) {
                    *current = (*current).max(MISSING.len());
                }
            }
        }
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Lines that could not be parsed.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Write the header and every row.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self)
    }

    fn write_line(
        &self,
        f: &mut fmt::Formatter<'_>,
        cell: impl Fn(&str) -> String,
    ) -> fmt::Result {
        for column in &self.columns {
            let width = self.widths.get(column).copied().unwrap_or(0);
            write!(f, " {:>width$}", cell(column), width = width)?;
        }
        writeln!(f)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_line(f, |column| column.to_string())?;
        for row in &self.rows {
            self.write_line(f, |column| row.get(column).unwrap_or(MISSING).to_string())?;
        }
        Ok(())
    }
}

/// `%8.3f` formatting.
fn fixed(value: f64) -> String {
    format!("{:8.3}", value)
}

/// Parse `(x, y, z)`.
fn parse_position(text: &str) -> Option<[f64; 3]> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<f64>());
    let xyz = [parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?];
    parts.next().is_none().then_some(xyz)
}

/// Path of the table written for `log`.
pub fn table_path(log: &Path) -> PathBuf {
    let mut name = log.as_os_str().to_os_string();
    name.push(".");
    name.push(TABLE_EXTENSION);
    PathBuf::from(name)
}

/// Tabulate `log` into `<log>.xyz`. Returns the table path and the table.
pub fn tabulate_file(log: &Path, period: Duration) -> Result<(PathBuf, Table), TabulateError> {
    let content = std::fs::read_to_string(log)?;
    let table = Table::from_log(&content, period)?;

    let path = table_path(log);
    let mut out = io::BufWriter::new(std::fs::File::create(&path)?);
    table.write_to(&mut out)?;
    out.flush()?;

    tracing::debug!(
        rows = table.rows().len(),
        skipped = table.skipped(),
        path = %path.display(),
        "table written"
    );
    Ok((path, table))
}
