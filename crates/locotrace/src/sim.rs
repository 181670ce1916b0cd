// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scripted in-memory host.
//!
//! Stands in for the simulator: vehicles come from a YAML scenario and can be
//! mutated between ticks. The `locotrace` binary and the test suites drive
//! the pipeline through it.
//!
//! ```yaml
//! observed: L-001
//! vehicles:
//!   - id: L-001
//!     plate: DE2
//!     speed: 12.5
//!     position: { x: 0.0, y: 110.0, z: 0.0 }
//!     cars:
//!       - mass: 40000
//!       - mass: 38000
//!     diesel: { rpm: 900, drive_rpm: 1400 }
//! ```

use crate::vehicle::{Bogies, CoupledCar, GearboxSlot, Vec3, Vehicle, VehicleHost};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Scenario loading errors.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("duplicate vehicle id '{0}'")]
    DuplicateId(String),

    #[error("observed vehicle '{0}' is not in the scenario")]
    UnknownObserved(String),
}

/// Diesel-like engine readouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DieselReadout {
    pub rpm: f64,
    pub drive_rpm: f64,
    /// `None` when the gearbox control does not resolve.
    pub gear1: Option<f64>,
    pub gear2: Option<f64>,
}

/// Steam-like engine readouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteamReadout {
    pub reverser: f64,
    pub boiler_pressure: f64,
    pub chest_pressure: f64,
}

/// A vehicle with fixed readouts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedVehicle {
    pub id: String,
    pub plate: Option<String>,
    pub force: Option<f64>,
    pub speed: f64,
    pub throttle: Option<f64>,
    pub position: Option<Vec3>,
    pub bogies: Option<Bogies>,
    /// Coupled set, this vehicle included.
    pub cars: Vec<CoupledCar>,
    pub diesel: Option<DieselReadout>,
    pub steam: Option<SteamReadout>,
}

impl ScriptedVehicle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Move along +x at the current speed for `dt`.
    pub fn advance(&mut self, dt: Duration) {
        let dx = self.speed * dt.as_secs_f64();
        if !dx.is_finite() || dx == 0.0 {
            return;
        }
        if let Some(position) = self.position.as_mut() {
            position.x += dx;
        }
        if let Some(bogies) = self.bogies.as_mut() {
            bogies.front.x += dx;
            bogies.rear.x += dx;
        }
    }
}

impl Vehicle for ScriptedVehicle {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn plate(&self) -> Option<String> {
        self.plate.clone()
    }

    fn traction_force(&self) -> Option<f64> {
        self.force
    }

    fn forward_speed(&self) -> f64 {
        self.speed
    }

    fn throttle(&self) -> Option<f64> {
        self.throttle
    }

    fn world_position(&self) -> Option<Vec3> {
        self.position
    }

    fn bogies(&self) -> Option<Bogies> {
        self.bogies
    }

    fn coupled_cars(&self) -> Vec<CoupledCar> {
        self.cars.clone()
    }

    fn engine_rpm(&self) -> Option<f64> {
        self.diesel.as_ref().map(|d| d.rpm)
    }

    fn turbine_rpm(&self) -> Option<f64> {
        self.diesel.as_ref().map(|d| d.drive_rpm)
    }

    fn gearbox(&self, slot: GearboxSlot) -> Option<f64> {
        let diesel = self.diesel.as_ref()?;
        match slot {
            GearboxSlot::A => diesel.gear1,
            GearboxSlot::B => diesel.gear2,
        }
    }

    fn reverser(&self) -> Option<f64> {
        self.steam.as_ref().map(|s| s.reverser)
    }

    fn boiler_pressure(&self) -> Option<f64> {
        self.steam.as_ref().map(|s| s.boiler_pressure)
    }

    fn chest_pressure(&self) -> Option<f64> {
        self.steam.as_ref().map(|s| s.chest_pressure)
    }
}

/// Scenario file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub observed: Option<String>,
    pub vehicles: Vec<ScriptedVehicle>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        let mut seen = HashSet::new();
        for vehicle in &self.vehicles {
            if !seen.insert(vehicle.id.as_str()) {
                return Err(ScenarioError::DuplicateId(vehicle.id.clone()));
            }
        }
        if let Some(observed) = &self.observed {
            if !seen.contains(observed.as_str()) {
                return Err(ScenarioError::UnknownObserved(observed.clone()));
            }
        }
        Ok(())
    }
}

/// Thread-safe scripted host.
#[derive(Default)]
pub struct ScriptedHost {
    vehicles: RwLock<Vec<Arc<ScriptedVehicle>>>,
    observed: RwLock<Option<String>>,
}

impl ScriptedHost {
    pub fn new(vehicles: Vec<ScriptedVehicle>, observed: Option<String>) -> Self {
        Self {
            vehicles: RwLock::new(vehicles.into_iter().map(Arc::new).collect()),
            observed: RwLock::new(observed),
        }
    }

    pub fn from_scenario(scenario: Scenario) -> Self {
        Self::new(scenario.vehicles, scenario.observed)
    }

    /// Load a scenario file.
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        Ok(Self::from_scenario(Scenario::from_file(path)?))
    }

    /// Change which vehicle the player is driving. `None` means on foot.
    pub fn set_observed(&self, id: Option<&str>) {
        *self.observed.write() = id.map(str::to_string);
    }

    /// Add a vehicle, replacing any with the same id.
    pub fn insert(&self, vehicle: ScriptedVehicle) {
        let mut vehicles = self.vehicles.write();
        vehicles.retain(|v| v.id != vehicle.id);
        vehicles.push(Arc::new(vehicle));
    }

    /// Remove a vehicle. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let mut vehicles = self.vehicles.write();
        let before = vehicles.len();
        vehicles.retain(|v| v.id != id);
        vehicles.len() != before
    }

    /// Mutate one vehicle's readouts. Returns whether it existed.
    ///
    /// Handles already given out keep the previous readouts.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut ScriptedVehicle)) -> bool {
        let mut vehicles = self.vehicles.write();
        match vehicles.iter_mut().find(|v| v.id == id) {
            Some(slot) => {
                f(Arc::make_mut(slot));
                true
            }
            None => false,
        }
    }

    /// Advance every vehicle by `dt`.
    pub fn step(&self, dt: Duration) {
        for vehicle in self.vehicles.write().iter_mut() {
            Arc::make_mut(vehicle).advance(dt);
        }
    }
}

impl VehicleHost for ScriptedHost {
    fn vehicles(&self) -> Vec<Arc<dyn Vehicle>> {
        self.vehicles
            .read()
            .iter()
            .map(|v| Arc::clone(v) as Arc<dyn Vehicle>)
            .collect()
    }

    fn observed_id(&self) -> Option<String> {
        self.observed.read().clone()
    }
}
