// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! locotrace: train simulator telemetry exporter
//!
//! Samples the vehicle the player is driving at a fixed interval and exports
//! each sample as one JSON object.
//!
//! # Features
//!
//! - **Field catalog**: generic, diesel-like and steam-like readouts, each
//!   behind its own toggle
//! - **Derived values**: train weight, bogie grade, mass-weighted train grade
//! - **UDP output**: one datagram per sample, fire-and-forget
//! - **File output**: one line per sample in a per-vehicle file, rotated when
//!   the driven vehicle changes
//! - **Tabulation**: turn a recorded vehicle log into a fixed-width table
//!
//! # Example
//!
//! ```rust,ignore
//! use locotrace::{ExporterConfig, Scheduler, ScriptedHost};
//! use std::sync::Arc;
//!
//! let host = Arc::new(ScriptedHost::from_file("scenario.yaml".as_ref())?);
//! let config = ExporterConfig::builder()
//!     .active(true)
//!     .interval_ms(100)
//!     .udp("localhost", 10000)
//!     .build();
//!
//! let scheduler = Scheduler::new(host, config.clone());
//! scheduler.enable(config)?;
//! ```

pub mod catalog;
pub mod collector;
pub mod config;
pub mod record;
pub mod scheduler;
pub mod sim;
pub mod sink;
pub mod tabulate;
pub mod vehicle;

pub use catalog::{FieldCategory, FieldDescriptor, FieldFlag, CATALOG};
pub use collector::collect;
pub use config::{ConfigError, ExporterConfig, ExporterConfigBuilder, FieldSelection};
pub use record::{decode, encode, Record};
pub use scheduler::{Scheduler, SchedulerError, SchedulerState, SchedulerStats};
pub use sim::{ScenarioError, ScriptedHost, ScriptedVehicle};
pub use sink::{FileSink, FileSinkStats, NetworkSink, Sink, SinkError, SinkSet};
pub use tabulate::{tabulate_file, Table, TabulateError};
pub use vehicle::{Bogies, CoupledCar, GearboxSlot, Vec3, Vehicle, VehicleHost};
