// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only view of the host simulation.
//!
//! The simulator owns every vehicle; the exporter only reads from it. Every
//! accessor backed by an optional subsystem (traction controller, cab
//! indicators, gearbox controls, mass controller) returns `Option` so that an
//! absent subsystem is simply "no value".

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// World-space position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Distance to `other` in the horizontal (x/z) plane.
    pub fn planar_distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Front and rear bogie positions of one car.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bogies {
    pub front: Vec3,
    pub rear: Vec3,
}

impl Bogies {
    pub const fn new(front: Vec3, rear: Vec3) -> Self {
        Self { front, rear }
    }

    /// Track grade under the car: rise over horizontal bogie separation.
    ///
    /// Returns `None` when the bogies share a plan position, since the ratio
    /// is undefined there.
    pub fn grade(&self) -> Option<f64> {
        let grade = (self.front.y - self.rear.y) / self.front.planar_distance(&self.rear);
        grade.is_finite().then_some(grade)
    }
}

/// Per-car snapshot of a member of the coupled set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoupledCar {
    /// Total mass in kilograms (cargo included).
    pub mass: f64,
    /// Bogie positions, when the car has loaded bogies.
    #[serde(default)]
    pub bogies: Option<Bogies>,
}

/// Which of the two gearbox levers to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GearboxSlot {
    A,
    B,
}

/// Accessors for one live vehicle.
pub trait Vehicle: Send + Sync {
    /// Stable unique identifier (the simulator's car GUID).
    fn id(&self) -> String;

    /// Car-type label painted on the plates.
    fn plate(&self) -> Option<String>;

    /// Traction force generated by the drive controller.
    fn traction_force(&self) -> Option<f64>;

    /// Speed along the vehicle's forward axis.
    fn forward_speed(&self) -> f64;

    /// Throttle lever position.
    fn throttle(&self) -> Option<f64>;

    /// Position with the world origin shift removed.
    fn world_position(&self) -> Option<Vec3>;

    /// This vehicle's own bogies.
    fn bogies(&self) -> Option<Bogies>;

    /// Every car mechanically joined to this one, including itself.
    fn coupled_cars(&self) -> Vec<CoupledCar>;

    /// Engine RPM indicator (diesel-like engines).
    fn engine_rpm(&self) -> Option<f64>;

    /// Turbine / drivetrain RPM meter (diesel-like engines).
    fn turbine_rpm(&self) -> Option<f64>;

    /// Gearbox lever value, if the control resolves.
    fn gearbox(&self, slot: GearboxSlot) -> Option<f64>;

    /// Reverser position (steam-like engines).
    fn reverser(&self) -> Option<f64>;

    /// Boiler pressure gauge (steam-like engines).
    fn boiler_pressure(&self) -> Option<f64>;

    /// Steam-chest pressure gauge (steam-like engines).
    fn chest_pressure(&self) -> Option<f64>;
}

/// The simulation as seen by the exporter.
pub trait VehicleHost: Send + Sync {
    /// All currently managed locomotives.
    fn vehicles(&self) -> Vec<Arc<dyn Vehicle>>;

    /// Identifier of the vehicle the player is currently driving.
    fn observed_id(&self) -> Option<String>;

    /// Resolve the observed vehicle by scanning the managed collection.
    fn observed(&self) -> Option<Arc<dyn Vehicle>> {
        let wanted = self.observed_id()?;
        self.vehicles().into_iter().find(|v| v.id() == wanted)
    }
}
