// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Static catalog of exportable fields.
//!
//! Each entry names its record key, the engine family it belongs to, the
//! toggle that enables it and a total extractor returning `None` whenever the
//! backing data is unavailable.

use crate::vehicle::{CoupledCar, GearboxSlot, Vec3, Vehicle};

/// Engine family a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    /// Attemptable on every vehicle.
    Generic,
    /// Diesel-like engines (RPM meters, gearboxes).
    EngineA,
    /// Steam-like engines (reverser, pressures).
    EngineB,
}

/// Configuration toggle enabling a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldFlag {
    CarType,
    Position,
    Grade,
    TrainGrade,
    Speed,
    Weight,
    Throttle,
    Force,
    Rpm,
    DriveRpm,
    GearState,
    Reverser,
    BoilerPressure,
    ChestPressure,
}

impl FieldFlag {
    pub const ALL: [FieldFlag; 14] = [
        FieldFlag::CarType,
        FieldFlag::Position,
        FieldFlag::Grade,
        FieldFlag::TrainGrade,
        FieldFlag::Speed,
        FieldFlag::Weight,
        FieldFlag::Throttle,
        FieldFlag::Force,
        FieldFlag::Rpm,
        FieldFlag::DriveRpm,
        FieldFlag::GearState,
        FieldFlag::Reverser,
        FieldFlag::BoilerPressure,
        FieldFlag::ChestPressure,
    ];
}

/// Extractor signature: a total function from vehicle to optional text value.
pub type Extractor = fn(&dyn Vehicle) -> Option<String>;

/// Description of one exportable field.
#[derive(Clone, Copy)]
pub struct FieldDescriptor {
    /// Record key.
    pub key: &'static str,
    /// Engine family.
    pub category: FieldCategory,
    /// Toggle enabling the field; `None` means always attempted.
    pub enabled_by: Option<FieldFlag>,
    /// Value extractor.
    pub extract: Extractor,
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("category", &self.category)
            .field("enabled_by", &self.enabled_by)
            .finish()
    }
}

pub const KEY_VEHICLE: &str = "vehicle";
pub const KEY_PLATE: &str = "plate";

/// Every exportable field, `vehicle` first.
pub static CATALOG: [FieldDescriptor; 16] = [
    // Generic
    FieldDescriptor {
        key: KEY_VEHICLE,
        category: FieldCategory::Generic,
        enabled_by: None,
        extract: |v| Some(v.id()),
    },
    FieldDescriptor {
        key: "force",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::Force),
        extract: |v| v.traction_force().and_then(format_number),
    },
    FieldDescriptor {
        key: "speed",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::Speed),
        extract: |v| format_number(v.forward_speed()),
    },
    FieldDescriptor {
        key: "weight",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::Weight),
        extract: |v| train_weight(&v.coupled_cars()).and_then(format_number),
    },
    FieldDescriptor {
        key: KEY_PLATE,
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::CarType),
        extract: |v| v.plate(),
    },
    FieldDescriptor {
        key: "position",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::Position),
        extract: |v| v.world_position().and_then(format_vec3),
    },
    FieldDescriptor {
        key: "grade",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::Grade),
        extract: |v| v.bogies().and_then(|b| b.grade()).and_then(format_number),
    },
    FieldDescriptor {
        key: "train_grade",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::TrainGrade),
        extract: |v| train_grade(&v.coupled_cars()).and_then(format_number),
    },
    FieldDescriptor {
        key: "throttle",
        category: FieldCategory::Generic,
        enabled_by: Some(FieldFlag::Throttle),
        extract: |v| v.throttle().and_then(format_number),
    },
    // Diesel-like
    FieldDescriptor {
        key: "rpm",
        category: FieldCategory::EngineA,
        enabled_by: Some(FieldFlag::Rpm),
        extract: |v| v.engine_rpm().and_then(format_number),
    },
    FieldDescriptor {
        key: "drive_rpm",
        category: FieldCategory::EngineA,
        enabled_by: Some(FieldFlag::DriveRpm),
        extract: |v| v.turbine_rpm().and_then(format_number),
    },
    FieldDescriptor {
        key: "gear1",
        category: FieldCategory::EngineA,
        enabled_by: Some(FieldFlag::GearState),
        extract: |v| v.gearbox(GearboxSlot::A).and_then(format_number),
    },
    FieldDescriptor {
        key: "gear2",
        category: FieldCategory::EngineA,
        enabled_by: Some(FieldFlag::GearState),
        extract: |v| v.gearbox(GearboxSlot::B).and_then(format_number),
    },
    // Steam-like
    FieldDescriptor {
        key: "reverser",
        category: FieldCategory::EngineB,
        enabled_by: Some(FieldFlag::Reverser),
        extract: |v| v.reverser().and_then(format_number),
    },
    FieldDescriptor {
        key: "boiler_p",
        category: FieldCategory::EngineB,
        enabled_by: Some(FieldFlag::BoilerPressure),
        extract: |v| v.boiler_pressure().and_then(format_number),
    },
    FieldDescriptor {
        key: "chest_p",
        category: FieldCategory::EngineB,
        enabled_by: Some(FieldFlag::ChestPressure),
        extract: |v| v.chest_pressure().and_then(format_number),
    },
];

/// Look up a descriptor by record key.
pub fn descriptor(key: &str) -> Option<&'static FieldDescriptor> {
    CATALOG.iter().find(|d| d.key == key)
}

/// Render a number the same way regardless of locale.
///
/// Uses the shortest representation that parses back to the same value and
/// never emits grouping separators. Non-finite values have no rendering.
pub fn format_number(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    // Normalise negative zero so it does not leak into the record as "-0".
    let value = if value == 0.0 { 0.0 } else { value };
    Some(value.to_string())
}

/// Render a position as `(x, y, z)`.
pub fn format_vec3(v: Vec3) -> Option<String> {
    Some(format!(
        "({}, {}, {})",
        format_number(v.x)?,
        format_number(v.y)?,
        format_number(v.z)?
    ))
}

/// Unweighted mass sum over the coupled set; `None` for an empty set.
pub fn train_weight(cars: &[CoupledCar]) -> Option<f64> {
    if cars.is_empty() {
        return None;
    }
    Some(cars.iter().map(|c| c.mass).sum())
}

/// Mass-weighted average grade over the coupled set.
///
/// Cars whose own grade is undefined contribute neither mass nor grade.
/// `None` when no car contributes, which covers the empty set.
pub fn train_grade(cars: &[CoupledCar]) -> Option<f64> {
    let (mass, weighted) = cars
        .iter()
        .filter_map(|car| {
            let grade = car.bogies?.grade()?;
            Some((car.mass, car.mass * grade))
        })
        .fold((0.0_f64, 0.0_f64), |(m, w), (cm, cw)| (m + cm, w + cw));

    if mass == 0.0 {
        return None;
    }
    let grade = weighted / mass;
    grade.is_finite().then_some(grade)
}
