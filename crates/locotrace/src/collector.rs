// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builds a [`Record`] from the observed vehicle.

use crate::catalog::CATALOG;
use crate::config::ExporterConfig;
use crate::record::Record;
use crate::vehicle::Vehicle;

/// Sample every enabled catalog field from `vehicle`.
///
/// Fields whose source is unavailable are left out; the collector never
/// fails on missing data. `vehicle` always comes first. Fields of both engine
/// families are attempted, so a vehicle carrying both subsystems reports both.
pub fn collect(vehicle: &dyn Vehicle, config: &ExporterConfig) -> Record {
    let mut record = Record::new();

    for field in CATALOG.iter() {
        let enabled = field
            .enabled_by
            .is_none_or(|flag| config.fields.is_enabled(flag));
        if !enabled {
            continue;
        }
        match (field.extract)(vehicle) {
            Some(value) => record.insert(field.key, value),
            None => tracing::trace!(field = field.key, "field unavailable, skipped"),
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldCategory, FieldFlag};
    use crate::config::FieldSelection;
    use crate::sim::{DieselReadout, ScriptedVehicle, SteamReadout};
    use crate::vehicle::{Bogies, CoupledCar, Vec3};

    fn config_with(fields: FieldSelection) -> ExporterConfig {
        ExporterConfig::builder().active(true).fields(fields).build()
    }

    fn flat_car(mass: f64) -> CoupledCar {
        CoupledCar { mass, bogies: None }
    }

    fn climbing_car(mass: f64) -> CoupledCar {
        CoupledCar {
            mass,
            bogies: Some(Bogies::new(
                Vec3::new(10.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
            )),
        }
    }

    fn everything() -> ScriptedVehicle {
        ScriptedVehicle {
            id: "L-042".into(),
            plate: Some("DH4".into()),
            force: Some(120000.0),
            speed: 8.25,
            throttle: Some(0.75),
            position: Some(Vec3::new(100.0, 12.0, -40.5)),
            bogies: Some(Bogies::new(
                Vec3::new(10.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
            )),
            cars: vec![climbing_car(60000.0), climbing_car(20000.0)],
            diesel: Some(DieselReadout {
                rpm: 850.0,
                drive_rpm: 1200.0,
                gear1: Some(2.0),
                gear2: Some(1.0),
            }),
            steam: Some(SteamReadout {
                reverser: 0.5,
                boiler_pressure: 14.0,
                chest_pressure: 9.5,
            }),
        }
    }

    #[test]
    fn test_end_to_end_example() {
        let vehicle = ScriptedVehicle {
            id: "L-001".into(),
            speed: 12.5,
            cars: vec![flat_car(40000.0), flat_car(38000.0)],
            ..Default::default()
        };
        let fields = FieldSelection::none()
            .with(FieldFlag::Speed, true)
            .with(FieldFlag::Weight, true);
        let config = ExporterConfig::builder()
            .active(true)
            .interval_ms(1000)
            .fields(fields)
            .build();

        let record = collect(&vehicle, &config);

        let entries: Vec<(&str, &str)> = record.iter().collect();
        assert_eq!(
            entries,
            vec![("vehicle", "L-001"), ("speed", "12.5"), ("weight", "78000")]
        );
    }

    #[test]
    fn test_vehicle_always_first() {
        let record = collect(&everything(), &config_with(FieldSelection::all()));
        assert_eq!(record.keys().next(), Some("vehicle"));

        let record = collect(&everything(), &config_with(FieldSelection::none()));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["vehicle"]);
    }

    #[test]
    fn test_disabled_field_never_present() {
        let vehicle = everything();
        for flag in FieldFlag::ALL {
            let config = config_with(FieldSelection::all().with(flag, false));
            let record = collect(&vehicle, &config);
            for field in CATALOG.iter().filter(|d| d.enabled_by == Some(flag)) {
                assert!(
                    !record.contains_key(field.key),
                    "{} present with {:?} disabled",
                    field.key,
                    flag
                );
            }
        }
    }

    #[test]
    fn test_all_fields_when_everything_available() {
        let record = collect(&everything(), &config_with(FieldSelection::all()));
        for field in CATALOG.iter() {
            assert!(record.contains_key(field.key), "{} missing", field.key);
        }
        assert_eq!(record.get("position"), Some("(100, 12, -40.5)"));
        assert_eq!(record.get("grade"), Some("0.1"));
        let train_grade: f64 = record.get("train_grade").unwrap().parse().unwrap();
        assert!((train_grade - 0.1).abs() < 1e-12);
        assert_eq!(record.get("weight"), Some("80000"));
        assert_eq!(record.get("plate"), Some("DH4"));
        assert_eq!(record.get("gear1"), Some("2"));
        assert_eq!(record.get("boiler_p"), Some("14"));
    }

    #[test]
    fn test_missing_subsystems_are_omitted() {
        let vehicle = ScriptedVehicle {
            id: "S-7".into(),
            speed: 1.0,
            ..Default::default()
        };
        let record = collect(&vehicle, &config_with(FieldSelection::all()));

        for field in CATALOG.iter() {
            match field.category {
                FieldCategory::EngineA | FieldCategory::EngineB => {
                    assert!(!record.contains_key(field.key), "{} present", field.key)
                }
                FieldCategory::Generic => {}
            }
        }
        for key in ["force", "throttle", "plate", "position", "grade", "train_grade", "weight"] {
            assert!(!record.contains_key(key), "{} present", key);
        }
        assert!(record.iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn test_unresolved_gearbox_is_omitted() {
        let mut vehicle = everything();
        vehicle.steam = None;
        if let Some(diesel) = vehicle.diesel.as_mut() {
            diesel.gear2 = None;
        }

        let record = collect(&vehicle, &config_with(FieldSelection::all()));
        assert_eq!(record.get("gear1"), Some("2"));
        assert!(!record.contains_key("gear2"));
        assert!(record.contains_key("rpm"));
        assert!(!record.contains_key("reverser"));
    }

    #[test]
    fn test_train_grade_single_car() {
        let bogies = Bogies::new(Vec3::new(0.0, 0.0, 20.0), Vec3::new(0.0, 1.0, 0.0));
        let vehicle = ScriptedVehicle {
            id: "L-9".into(),
            bogies: Some(bogies),
            cars: vec![CoupledCar {
                mass: 50000.0,
                bogies: Some(bogies),
            }],
            ..Default::default()
        };
        let fields = FieldSelection::none()
            .with(FieldFlag::Grade, true)
            .with(FieldFlag::TrainGrade, true);
        let record = collect(&vehicle, &config_with(fields));

        assert_eq!(record.get("grade"), Some("-0.05"));
        assert_eq!(record.get("train_grade"), record.get("grade"));
    }

    #[test]
    fn test_non_finite_readout_is_omitted() {
        let vehicle = ScriptedVehicle {
            id: "L-1".into(),
            speed: f64::NAN,
            throttle: Some(f64::INFINITY),
            ..Default::default()
        };
        let record = collect(&vehicle, &config_with(FieldSelection::all()));
        assert!(!record.contains_key("speed"));
        assert!(!record.contains_key("throttle"));
    }
}
