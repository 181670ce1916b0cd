// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record delivery: UDP datagrams and per-vehicle line files.

mod file;
mod network;

pub use file::{sanitize_component, FileSink, FileSinkStats};
pub use network::NetworkSink;

use crate::config::ExporterConfig;
use crate::record::Record;
use thiserror::Error;

/// Delivery errors. None of these is fatal to the scheduler.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot resolve {target}: {reason}")]
    Resolve { target: String, reason: String },

    #[error("record has no vehicle key")]
    MissingVehicle,

    #[error("network transport unavailable")]
    Unavailable,
}

/// A delivery target for encoded records.
pub trait Sink: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Deliver one encoded record.
    fn deliver(&mut self, record: &Record, payload: &[u8]) -> Result<(), SinkError>;

    /// Release held resources.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Both sinks, dispatched according to the configuration snapshot.
pub struct SinkSet {
    network: NetworkSink,
    file: FileSink,
}

impl SinkSet {
    /// Create the sinks for `config`.
    ///
    /// The UDP socket is bound here; failure leaves the network sink
    /// unavailable for the lifetime of the set while file output keeps working.
    pub fn new(config: &ExporterConfig) -> Self {
        Self::with_sinks(
            NetworkSink::bind(&config.udp_host, config.udp_port),
            FileSink::new(&config.directory),
        )
    }

    pub fn with_sinks(network: NetworkSink, file: FileSink) -> Self {
        Self { network, file }
    }

    /// Send `payload` to every sink enabled in `config`.
    ///
    /// Each sink fails on its own: an error is logged and counted, and the
    /// remaining sinks still run. Returns the number of failures.
    pub fn dispatch(&mut self, config: &ExporterConfig, record: &Record, payload: &[u8]) -> usize {
        let mut failures = 0;

        if config.send_udp {
            self.network.set_target(&config.udp_host, config.udp_port);
            failures += usize::from(!deliver_to(&mut self.network, record, payload));
        }
        if config.write_to_file {
            self.file.set_directory(&config.directory);
            failures += usize::from(!deliver_to(&mut self.file, record, payload));
        }

        failures
    }

    /// Close both sinks, logging failures.
    pub fn close_all(&mut self) {
        let sinks: [&mut dyn Sink; 2] = [&mut self.network, &mut self.file];
        for sink in sinks {
            if let Err(e) = sink.close() {
                tracing::warn!(sink = sink.name(), error = %e, "failed to close sink");
            }
        }
    }

    /// Resolve the UDP target again on the next send if the last lookup failed.
    pub fn retry_network_target(&mut self) {
        self.network.retry_resolution();
    }

    pub fn network(&self) -> &NetworkSink {
        &self.network
    }

    pub fn file(&self) -> &FileSink {
        &self.file
    }
}

fn deliver_to(sink: &mut dyn Sink, record: &Record, payload: &[u8]) -> bool {
    match sink.deliver(record, payload) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                sink = sink.name(),
                vehicle = record.vehicle().unwrap_or("-"),
                error = %e,
                "delivery failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::encode;

    fn record(vehicle: &str) -> Record {
        [("vehicle", vehicle), ("speed", "1")].into_iter().collect()
    }

    #[test]
    fn test_dispatch_respects_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExporterConfig::builder().file_output(dir.path()).build();
        let mut sinks = SinkSet::with_sinks(NetworkSink::unavailable(), FileSink::new(dir.path()));

        let rec = record("A");
        let payload = encode(&rec).unwrap();

        // UDP off: the unavailable network sink is never touched.
        assert_eq!(sinks.dispatch(&config, &rec, &payload), 0);
        assert_eq!(sinks.file().stats().lines, 1);

        let config = ExporterConfig::builder().no_file_output().build();
        assert_eq!(sinks.dispatch(&config, &rec, &payload), 0);
        assert_eq!(sinks.file().stats().lines, 1);
    }

    #[test]
    fn test_network_failure_does_not_block_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExporterConfig::builder()
            .file_output(dir.path())
            .udp("127.0.0.1", 9)
            .build();
        let mut sinks = SinkSet::with_sinks(NetworkSink::unavailable(), FileSink::new(dir.path()));

        let rec = record("A");
        let payload = encode(&rec).unwrap();
        assert_eq!(sinks.dispatch(&config, &rec, &payload), 1);
        sinks.close_all();

        let content = std::fs::read_to_string(dir.path().join("A")).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[test]
    fn test_file_failure_does_not_block_network() {
        let receiver = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let dir = tempfile::tempdir().unwrap();
        let config = ExporterConfig::builder()
            .file_output(dir.path())
            .udp("127.0.0.1", port)
            .build();
        let mut sinks = SinkSet::new(&config);

        // No vehicle key: the file sink cannot pick a path.
        let rec: Record = [("speed", "3")].into_iter().collect();
        let payload = encode(&rec).unwrap();
        assert_eq!(sinks.dispatch(&config, &rec, &payload), 1);

        let mut buf = [0u8; 512];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], payload.as_slice());
    }
}
