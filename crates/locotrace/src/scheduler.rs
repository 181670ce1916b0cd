// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timer-driven sampling loop.
//!
//! A single named worker thread ticks at the configured interval. Each tick
//! resolves the observed vehicle, collects a record, encodes it and hands it
//! to the sinks. Restarting the timer joins the previous worker first, so at
//! most one tick ever runs and a tick in flight finishes on the configuration
//! snapshot it started with.
//!
//! Lifecycle mirrors the host plugin hooks:
//!
//! | Hook         | Call                              |
//! |--------------|-----------------------------------|
//! | load         | [`Scheduler::new`]                |
//! | enable       | [`Scheduler::enable`]             |
//! | save / apply | [`Scheduler::configure`]          |
//! | disable      | [`Scheduler::disable`]            |
//! | unload       | [`Scheduler::shutdown`] or drop   |

use crate::collector::collect;
use crate::config::{ConfigError, ExporterConfig};
use crate::record::encode;
use crate::sink::SinkSet;
use crate::vehicle::{Vehicle, VehicleHost};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use thiserror::Error;

/// Scheduler errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("failed to spawn sampling thread: {0}")]
    Spawn(std::io::Error),

    #[error("scheduler has been shut down")]
    ShutDown,
}

/// Timer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Ticks executed.
    pub ticks: u64,
    /// Ticks with no observed vehicle.
    pub idle_ticks: u64,
    /// Records produced and dispatched.
    pub records: u64,
    /// Individual sink deliveries that failed.
    pub sink_failures: u64,
    /// Ticks aborted by a panic.
    pub panics: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    idle_ticks: AtomicU64,
    records: AtomicU64,
    sink_failures: AtomicU64,
    panics: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            idle_ticks: self.idle_ticks.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}

/// Log at info when the configuration asks for verbose ticks, trace otherwise.
macro_rules! tick_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::info!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// State shared with the worker thread.
struct Shared {
    host: Arc<dyn VehicleHost>,
    config: RwLock<Arc<ExporterConfig>>,
    sinks: Mutex<SinkSet>,
    /// Held for a whole tick, so timer and manual ticks never overlap.
    tick_lock: Mutex<()>,
    running: AtomicBool,
    counters: Counters,
}

impl Shared {
    fn config(&self) -> Arc<ExporterConfig> {
        self.config.read().clone()
    }

    /// Run one tick, containing any panic raised by the host or a sink.
    fn guarded_tick(&self) {
        let _serial = self.tick_lock.lock();
        if catch_unwind(AssertUnwindSafe(|| self.tick())).is_err() {
            self.counters.panics.fetch_add(1, Ordering::Relaxed);
            tracing::error!("sampling tick panicked, continuing with next tick");
        }
    }

    fn tick(&self) {
        let config = self.config();
        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
        tick_log!(config.debug, "tick");

        let Some(vehicle) = self.resolve_observed(config.debug) else {
            self.counters.idle_ticks.fetch_add(1, Ordering::Relaxed);
            tick_log!(config.debug, "no observed vehicle");
            return;
        };

        let record = collect(vehicle.as_ref(), &config);
        let payload = match encode(&record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode record");
                return;
            }
        };
        tick_log!(
            config.debug,
            payload = %String::from_utf8_lossy(&payload),
            "record encoded"
        );

        let failures = self.sinks.lock().dispatch(&config, &record, &payload);
        self.counters.records.fetch_add(1, Ordering::Relaxed);
        self.counters
            .sink_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
    }

    /// Scan the host's vehicles for the one currently driven.
    fn resolve_observed(&self, verbose: bool) -> Option<Arc<dyn Vehicle>> {
        let wanted = self.host.observed_id()?;
        for vehicle in self.host.vehicles() {
            let id = vehicle.id();
            tick_log!(verbose, vehicle = %id, "candidate");
            if id == wanted {
                tick_log!(verbose, vehicle = %id, "observed vehicle");
                return Some(vehicle);
            }
        }
        None
    }
}

/// Worker thread plus its stop channel.
///
/// Dropping the sender disconnects the channel, which wakes the worker's
/// `recv_timeout`; the thread is then joined.
struct TimerHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TimerHandle {
    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!("sampling thread terminated abnormally");
            }
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodic sampler.
pub struct Scheduler {
    shared: Arc<Shared>,
    timer: Mutex<Option<TimerHandle>>,
    closed: AtomicBool,
}

impl Scheduler {
    /// Create the scheduler and its sinks. The timer is not started.
    pub fn new(host: Arc<dyn VehicleHost>, config: ExporterConfig) -> Self {
        let sinks = SinkSet::new(&config);
        Self::with_sinks(host, config, sinks)
    }

    /// Create the scheduler around prepared sinks.
    pub fn with_sinks(host: Arc<dyn VehicleHost>, config: ExporterConfig, sinks: SinkSet) -> Self {
        Self {
            shared: Arc::new(Shared {
                host,
                config: RwLock::new(Arc::new(config)),
                sinks: Mutex::new(sinks),
                tick_lock: Mutex::new(()),
                running: AtomicBool::new(false),
                counters: Counters::default(),
            }),
            timer: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Apply `config` and (re)start the timer.
    ///
    /// Any running timer is stopped first. When `config.active` is false the
    /// scheduler ends up stopped.
    pub fn enable(&self, config: ExporterConfig) -> Result<(), SchedulerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }
        config.validate()?;

        let mut timer = self.timer.lock();
        if let Some(mut previous) = timer.take() {
            previous.stop();
        }
        self.shared.running.store(false, Ordering::Release);

        let interval = config.interval();
        let active = config.active;
        *self.shared.config.write() = Arc::new(config);
        // Apply gives an unresolvable UDP target another chance.
        self.shared.sinks.lock().retry_network_target();

        if !active {
            tracing::info!("sampling inactive, timer not started");
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let shared = Arc::clone(&self.shared);
        self.shared.running.store(true, Ordering::Release);

        let spawned = std::thread::Builder::new()
            .name("locotrace-sampler".into())
            .spawn(move || {
                let mut next = Instant::now() + interval;
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                        Err(mpsc::RecvTimeoutError::Timeout) => {}
                    }

                    shared.guarded_tick();

                    if !shared.config.read().active {
                        tracing::info!("sampling deactivated, stopping timer");
                        break;
                    }

                    // Skip missed periods instead of bursting to catch up.
                    next += interval;
                    let now = Instant::now();
                    if next < now {
                        next = now + interval;
                    }
                }
                shared.running.store(false, Ordering::Release);
            });

        match spawned {
            Ok(thread) => {
                tracing::info!(interval_ms = interval.as_millis() as u64, "sampling timer started");
                *timer = Some(TimerHandle {
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                });
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(SchedulerError::Spawn(e))
            }
        }
    }

    /// Save/apply: same as [`Scheduler::enable`] with the new settings.
    pub fn configure(&self, config: ExporterConfig) -> Result<(), SchedulerError> {
        tracing::debug!("applying new configuration");
        self.enable(config)
    }

    /// Replace the configuration without restarting the timer.
    ///
    /// The next tick picks it up. A changed interval only applies after the
    /// next [`Scheduler::configure`]. Clearing `active` stops the timer after
    /// the next tick.
    pub fn update_config(&self, config: ExporterConfig) -> Result<(), SchedulerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SchedulerError::ShutDown);
        }
        config.validate()?;
        *self.shared.config.write() = Arc::new(config);
        Ok(())
    }

    /// Stop the timer. Sinks stay open.
    pub fn disable(&self) {
        let mut timer = self.timer.lock();
        if let Some(mut handle) = timer.take() {
            handle.stop();
            tracing::info!("sampling timer stopped");
        }
        self.shared.running.store(false, Ordering::Release);
    }

    /// Stop the timer and release the socket and any open file.
    ///
    /// Idempotent. Later `enable` calls fail with [`SchedulerError::ShutDown`].
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.disable();
        self.shared.sinks.lock().close_all();
        tracing::info!("scheduler shut down");
    }

    pub fn state(&self) -> SchedulerState {
        if self.shared.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.counters.snapshot()
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<ExporterConfig> {
        self.shared.config()
    }

    /// Run a single tick on the calling thread.
    ///
    /// Waits for a timer tick in flight to finish first.
    pub fn tick_now(&self) {
        self.shared.guarded_tick();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
