// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fire-and-forget UDP sink.

use super::{Sink, SinkError};
use crate::record::Record;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};

/// How long a failed lookup is reused before the target is resolved again.
pub const RESOLVE_RETRY: Duration = Duration::from_secs(5);

/// Cached lookup for the current `(host, port)`.
#[derive(Debug, Clone)]
enum Resolution {
    Pending,
    Resolved(SocketAddr),
    Failed { reason: String, at: Instant },
}

/// One datagram per record, no acknowledgement.
pub struct NetworkSink {
    socket: Option<UdpSocket>,
    host: String,
    port: u16,
    resolution: Resolution,
    lookups: u64,
    datagrams: u64,
}

impl NetworkSink {
    /// Bind an ephemeral IPv4 socket targeting `host:port`.
    ///
    /// A bind failure is logged and yields an unavailable sink.
    pub fn bind(host: &str, port: u16) -> Self {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(socket) => Some(socket),
            Err(e) => {
                tracing::error!(error = %e, "failed to create UDP socket, network output disabled");
                None
            }
        };
        Self::with_socket(socket, host, port)
    }

    /// A sink whose transport could not be created.
    pub fn unavailable() -> Self {
        Self::with_socket(None, "", 0)
    }

    fn with_socket(socket: Option<UdpSocket>, host: &str, port: u16) -> Self {
        Self {
            socket,
            host: host.to_string(),
            port,
            resolution: Resolution::Pending,
            lookups: 0,
            datagrams: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.socket.is_some()
    }

    /// Retarget the sink. The cached lookup survives when nothing changed.
    pub fn set_target(&mut self, host: &str, port: u16) {
        if self.host != host || self.port != port {
            self.host = host.to_string();
            self.port = port;
            self.resolution = Resolution::Pending;
        }
    }

    /// Forget a failed lookup so the next send resolves again.
    pub fn retry_resolution(&mut self) {
        if let Resolution::Failed { .. } = self.resolution {
            self.resolution = Resolution::Pending;
        }
    }

    pub fn target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// Datagrams handed to the OS so far.
    pub fn datagrams(&self) -> u64 {
        self.datagrams
    }

    /// Name lookups performed so far.
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    fn resolve(&mut self) -> Result<SocketAddr, SinkError> {
        if let Resolution::Failed { at, .. } = &self.resolution {
            if at.elapsed() >= RESOLVE_RETRY {
                self.resolution = Resolution::Pending;
            }
        }
        if let Resolution::Pending = self.resolution {
            self.lookups += 1;
            self.resolution = lookup(&self.host, self.port);
            match &self.resolution {
                Resolution::Resolved(addr) => {
                    tracing::debug!(host = %self.host, port = self.port, %addr, "UDP target resolved")
                }
                Resolution::Failed { reason, .. } => {
                    tracing::warn!(host = %self.host, port = self.port, %reason, "UDP target unresolvable")
                }
                Resolution::Pending => {}
            }
        }
        match &self.resolution {
            Resolution::Resolved(addr) => Ok(*addr),
            Resolution::Failed { reason, .. } => Err(SinkError::Resolve {
                target: format!("{}:{}", self.host, self.port),
                reason: reason.clone(),
            }),
            Resolution::Pending => Err(SinkError::Unavailable),
        }
    }
}

/// Resolve preferring IPv4, since the socket is bound to an IPv4 wildcard.
fn lookup(host: &str, port: u16) -> Resolution {
    match (host, port).to_socket_addrs() {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            match addrs.iter().find(|a| a.is_ipv4()).or(addrs.first()) {
                Some(addr) => Resolution::Resolved(*addr),
                None => failed("no addresses".into()),
            }
        }
        Err(e) => failed(e.to_string()),
    }
}

fn failed(reason: String) -> Resolution {
    Resolution::Failed {
        reason,
        at: Instant::now(),
    }
}

impl Sink for NetworkSink {
    fn name(&self) -> &'static str {
        "udp"
    }

    fn deliver(&mut self, _record: &Record, payload: &[u8]) -> Result<(), SinkError> {
        if self.socket.is_none() {
            return Err(SinkError::Unavailable);
        }
        let addr = self.resolve()?;
        let socket = self.socket.as_ref().ok_or(SinkError::Unavailable)?;
        socket.send_to(payload, addr)?;
        self.datagrams += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.socket = None;
        self.resolution = Resolution::Pending;
        Ok(())
    }
}
