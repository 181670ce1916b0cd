// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::unreadable_literal)] // Masses in kilograms

//! End-to-end pipeline tests
//!
//! Drive the scheduler against a scripted host with real sockets and files.

use locotrace::{
    decode, CoupledCar, ExporterConfig, FieldFlag, FieldSelection, Scheduler, SchedulerState,
    ScriptedHost, ScriptedVehicle, Table,
};
use std::collections::BTreeMap;
use std::net::UdpSocket;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn loco(id: &str, plate: &str, speed: f64) -> ScriptedVehicle {
    ScriptedVehicle {
        plate: Some(plate.into()),
        speed,
        cars: vec![
            CoupledCar {
                mass: 40000.0,
                bogies: None,
            },
            CoupledCar {
                mass: 38000.0,
                bogies: None,
            },
        ],
        ..ScriptedVehicle::new(id)
    }
}

fn speed_and_weight() -> FieldSelection {
    FieldSelection::none()
        .with(FieldFlag::Speed, true)
        .with(FieldFlag::Weight, true)
}

fn receiver() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("bind receiver");
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set timeout");
    let port = socket.local_addr().expect("local addr").port();
    (socket, port)
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

fn read_lines(path: &Path) -> Vec<BTreeMap<String, String>> {
    std::fs::read_to_string(path)
        .expect("read vehicle log")
        .lines()
        .map(|l| decode(l.as_bytes()).expect("decode line"))
        .collect()
}

#[test]
fn test_example_record_over_udp_and_file() {
    let (rx, port) = receiver();
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(ScriptedHost::new(
        vec![loco("L-001", "DE2", 12.5)],
        Some("L-001".into()),
    ));
    let config = ExporterConfig::builder()
        .active(true)
        .interval_ms(1000)
        .file_output(dir.path())
        .udp("127.0.0.1", port)
        .fields(speed_and_weight())
        .build();

    let scheduler = Scheduler::new(host, config);
    scheduler.tick_now();

    let mut buf = [0u8; 2048];
    let n = rx.recv(&mut buf).unwrap();
    let datagram = decode(&buf[..n]).unwrap();

    let expected: BTreeMap<String, String> = [
        ("vehicle", "L-001"),
        ("speed", "12.5"),
        ("weight", "78000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(datagram, expected);

    scheduler.shutdown();
    // Plate is not enabled, so the file is keyed by vehicle only.
    assert_eq!(read_lines(&dir.path().join("L-001")), vec![expected]);
    assert_eq!(scheduler.stats().sink_failures, 0);
}

#[test]
fn test_unresolvable_host_does_not_block_file() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(ScriptedHost::new(
        vec![loco("L-001", "DE2", 3.0)],
        Some("L-001".into()),
    ));
    let config = ExporterConfig::builder()
        .active(true)
        .interval_ms(10)
        .file_output(dir.path())
        .udp("no-such-host.invalid", 10000)
        .fields(speed_and_weight().with(FieldFlag::CarType, true))
        .build();

    let scheduler = Scheduler::new(host, config.clone());
    scheduler.enable(config).unwrap();
    assert!(wait_for(|| scheduler.stats().records >= 3));
    assert_eq!(scheduler.state(), SchedulerState::Running);
    scheduler.shutdown();

    let stats = scheduler.stats();
    assert_eq!(stats.sink_failures, stats.records);
    assert_eq!(stats.panics, 0);

    let lines = read_lines(&dir.path().join("DE2_L-001"));
    assert_eq!(lines.len() as u64, stats.records);
    assert!(lines.iter().all(|l| l["plate"] == "DE2"));
}

#[test]
fn test_rotation_follows_driven_vehicle() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(ScriptedHost::new(
        vec![loco("A", "DE2", 1.0), loco("B", "S282", 2.0)],
        Some("A".into()),
    ));
    let config = ExporterConfig::builder()
        .active(true)
        .file_output(dir.path())
        .fields(speed_and_weight().with(FieldFlag::CarType, true))
        .build();
    let scheduler = Scheduler::new(host.clone(), config);

    for observed in ["A", "A", "B", "A"] {
        host.set_observed(Some(observed));
        scheduler.tick_now();
    }
    // Player leaves the cab: no record, no rotation.
    host.set_observed(None);
    scheduler.tick_now();
    scheduler.shutdown();

    let a = read_lines(&dir.path().join("DE2_A"));
    let b = read_lines(&dir.path().join("S282_B"));
    assert_eq!(a.len(), 3);
    assert_eq!(b.len(), 1);
    assert!(a.iter().all(|l| l["vehicle"] == "A"));
    assert_eq!(b[0]["speed"], "2");

    let stats = scheduler.stats();
    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.idle_ticks, 1);
    assert_eq!(stats.records, 4);
}

#[test]
fn test_host_updates_show_up_in_samples() {
    let (rx, port) = receiver();
    let host = Arc::new(ScriptedHost::new(
        vec![loco("A", "DE2", 1.0)],
        Some("A".into()),
    ));
    let config = ExporterConfig::builder()
        .active(true)
        .no_file_output()
        .udp("127.0.0.1", port)
        .fields(FieldSelection::none().with(FieldFlag::Speed, true))
        .build();
    let scheduler = Scheduler::new(host.clone(), config);

    scheduler.tick_now();
    host.update("A", |v| v.speed = 4.5);
    scheduler.tick_now();

    let mut buf = [0u8; 512];
    let n = rx.recv(&mut buf).unwrap();
    assert_eq!(decode(&buf[..n]).unwrap()["speed"], "1");
    let n = rx.recv(&mut buf).unwrap();
    assert_eq!(decode(&buf[..n]).unwrap()["speed"], "4.5");
}

#[test]
fn test_recorded_log_tabulates() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(ScriptedHost::new(
        vec![ScriptedVehicle {
            position: Some(locotrace::Vec3::new(0.0, 100.0, 0.0)),
            ..loco("A", "DE2", 10.0)
        }],
        Some("A".into()),
    ));
    let config = ExporterConfig::builder()
        .active(true)
        .interval_ms(100)
        .file_output(dir.path())
        .build();
    let scheduler = Scheduler::new(host.clone(), config);

    for _ in 0..3 {
        scheduler.tick_now();
        host.step(Duration::from_millis(100));
    }
    scheduler.shutdown();

    let log = std::fs::read_to_string(dir.path().join("DE2_A")).unwrap();
    let table = Table::from_log(&log, Duration::from_millis(100)).unwrap();
    let rows = table.rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(table.skipped(), 0);
    assert_eq!(rows[2].get("x"), Some("   2.000"));
    assert_eq!(rows[2].get("y"), Some(" 100.000"));
    assert_eq!(rows[2].get("distance"), Some("   2.000"));
    assert_eq!(rows[2].get("acceleration"), Some("   0.000"));
}

#[test]
fn test_shipped_samples_load() {
    let config = ExporterConfig::from_yaml(include_str!("../../../config/locotrace.yaml"))
        .expect("sample config");
    assert!(config.active);
    assert!(config.fields.gear_state);

    let scenario = locotrace::sim::Scenario::from_yaml(include_str!("../../../config/scenario.yaml"))
        .expect("sample scenario");
    let host = ScriptedHost::from_scenario(scenario);
    let observed = locotrace::VehicleHost::observed(&host).expect("observed vehicle");
    let record = locotrace::collect(observed.as_ref(), &config);

    assert_eq!(record.vehicle(), Some("L-001"));
    assert_eq!(record.get("weight"), Some("78000"));
    assert_eq!(record.get("gear1"), Some("2"));
    assert!(!record.contains_key("gear2"));
    assert!(record.contains_key("train_grade"));
}
