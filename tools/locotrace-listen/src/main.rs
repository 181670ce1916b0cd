// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! locotrace-listen - print locotrace datagrams as they arrive
//!
//! Binds a UDP socket and prints every datagram on its own line.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::io::{self, ErrorKind, Write};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 0x10000;

/// Print locotrace UDP datagrams
#[derive(Parser, Debug)]
#[command(name = "locotrace-listen")]
#[command(version = "0.1.0")]
#[command(about = "Print every locotrace datagram received on HOST:PORT")]
struct Args {
    /// Address to bind
    host: String,

    /// Port to bind
    port: u16,

    /// Stop after this many datagrams (0 = unlimited)
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Prefix each line with the local receive time and sender
    #[arg(short, long)]
    timestamps: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let socket = UdpSocket::bind((args.host.as_str(), args.port))
        .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;
    // Wake up periodically to notice Ctrl+C.
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .context("Failed to set socket timeout")?;

    println!("Bound");

    let received = listen(&socket, &running, &args)?;
    eprintln!("Received {} datagram(s)", received);
    Ok(())
}

fn listen(socket: &UdpSocket, running: &AtomicBool, args: &Args) -> Result<u64> {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut received = 0u64;
    let stdout = io::stdout();

    while running.load(Ordering::SeqCst) {
        if args.count > 0 && received >= args.count {
            break;
        }

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("Receive failed"),
        };
        received += 1;

        let text = String::from_utf8_lossy(&buf[..len]);
        let mut out = stdout.lock();
        if args.timestamps {
            writeln!(
                out,
                "{} {} {}",
                Local::now().format("%H:%M:%S%.3f"),
                from,
                text
            )?;
        } else {
            writeln!(out, "{}", text)?;
        }
        out.flush()?;
    }

    Ok(received)
}
