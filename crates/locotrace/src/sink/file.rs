// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-vehicle append-only line files.
//!
//! One file is open at a time. When a record arrives for a different vehicle
//! the open file is flushed and closed and the new vehicle's file is opened in
//! append mode, so returning to an earlier vehicle continues its file.

use super::{Sink, SinkError};
use crate::record::Record;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Counters for the file sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSinkStats {
    /// Files opened, one per rotation.
    pub opens: u64,
    /// Lines accepted into the write buffer.
    pub lines: u64,
    /// Accepted lines discarded because the buffer could not be written out.
    pub lost: u64,
}

struct OpenFile {
    stem: String,
    path: PathBuf,
    writer: BufWriter<File>,
    /// Lines accepted since the file was opened and not yet known to be on disk.
    unflushed: u64,
}

/// Line sink rotating on vehicle change.
pub struct FileSink {
    directory: PathBuf,
    current: Option<OpenFile>,
    stats: FileSinkStats,
}

impl FileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            current: None,
            stats: FileSinkStats::default(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Switch output directory. The open file, if any, is closed first.
    pub fn set_directory(&mut self, directory: &Path) {
        if self.directory == directory {
            return;
        }
        if let Err(e) = self.close_current() {
            tracing::warn!(error = %e, "failed to flush file before directory change");
        }
        self.directory = directory.to_path_buf();
    }

    /// Path of the currently open file.
    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|f| f.path.as_path())
    }

    pub fn stats(&self) -> FileSinkStats {
        self.stats
    }

    /// Target path for `record`: `{dir}/{plate}_{vehicle}` or `{dir}/{vehicle}`.
    pub fn path_for(&self, record: &Record) -> Result<PathBuf, SinkError> {
        Ok(self.directory.join(file_stem(record)?))
    }

    fn close_current(&mut self) -> std::io::Result<()> {
        match self.current.take() {
            Some(mut open) => {
                tracing::debug!(path = %open.path.display(), "closing vehicle log");
                let flushed = open.writer.flush();
                if flushed.is_err() {
                    self.stats.lost += open.unflushed;
                }
                flushed
            }
            None => Ok(()),
        }
    }

    fn open(&mut self, stem: String) -> Result<&mut OpenFile, SinkError> {
        if let Err(e) = self.close_current() {
            tracing::warn!(error = %e, "failed to flush previous vehicle log");
        }

        std::fs::create_dir_all(&self.directory)?;
        let path = self.directory.join(&stem);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.stats.opens += 1;
        tracing::info!(path = %path.display(), "opened vehicle log");

        Ok(self.current.insert(OpenFile {
            stem,
            path,
            writer: BufWriter::new(file),
            unflushed: 0,
        }))
    }
}

impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn deliver(&mut self, record: &Record, payload: &[u8]) -> Result<(), SinkError> {
        let stem = file_stem(record)?;

        let open = match self.current.take() {
            Some(open) if open.stem == stem => self.current.insert(open),
            previous => {
                self.current = previous;
                self.open(stem)?
            }
        };

        let written = open
            .writer
            .write_all(payload)
            .and_then(|()| open.writer.write_all(b"\n"));
        if let Err(e) = written {
            // Drop the handle; the next record reopens the file.
            let lost = open.unflushed;
            self.current = None;
            self.stats.lost += lost;
            tracing::warn!(lost, "vehicle log write failed, buffered lines discarded");
            return Err(e.into());
        }

        open.unflushed += 1;
        self.stats.lines += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(self.close_current()?)
    }
}

fn file_stem(record: &Record) -> Result<String, SinkError> {
    let vehicle = record.vehicle().ok_or(SinkError::MissingVehicle)?;
    let vehicle = sanitize_component(vehicle);
    Ok(match record.plate() {
        Some(plate) if !plate.is_empty() => format!("{}_{}", sanitize_component(plate), vehicle),
        _ => vehicle,
    })
}

/// Make `raw` safe to use as a single file name.
///
/// Path separators and NUL become `_`; a name made only of dots (or empty)
/// is replaced with underscores so it cannot address a parent directory.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}
