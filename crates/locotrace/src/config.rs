// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Exporter configuration (YAML).

use crate::catalog::FieldFlag;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default sampling period in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Default UDP endpoint.
pub const DEFAULT_UDP_HOST: &str = "localhost";
pub const DEFAULT_UDP_PORT: u16 = 10000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level exporter configuration.
///
/// One snapshot is used for the whole of a tick; swapping it takes effect on
/// the next tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Sampling enabled.
    pub active: bool,
    /// Sampling period in milliseconds.
    pub interval_ms: u64,
    /// Log every tick step at info level.
    pub debug: bool,

    /// Append records to per-vehicle files.
    pub write_to_file: bool,
    /// Directory holding the per-vehicle files.
    pub directory: PathBuf,

    /// Send each record as a UDP datagram.
    pub send_udp: bool,
    pub udp_host: String,
    pub udp_port: u16,

    /// Which optional fields to sample.
    pub fields: FieldSelection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            active: false,
            interval_ms: DEFAULT_INTERVAL_MS,
            debug: false,
            write_to_file: true,
            directory: default_directory(),
            send_udp: false,
            udp_host: DEFAULT_UDP_HOST.to_string(),
            udp_port: DEFAULT_UDP_PORT,
            fields: FieldSelection::default(),
        }
    }
}

/// Platform default output directory.
pub fn default_directory() -> PathBuf {
    std::env::temp_dir().join("locotrace")
}

impl ExporterConfig {
    /// Create a new builder.
    pub fn builder() -> ExporterConfigBuilder {
        ExporterConfigBuilder::default()
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serialize back to YAML (the host persists settings this way).
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "interval_ms must be greater than zero".into(),
            ));
        }
        if self.send_udp {
            if self.udp_host.trim().is_empty() {
                return Err(ConfigError::Invalid("udp_host is empty".into()));
            }
            if self.udp_port == 0 {
                return Err(ConfigError::Invalid("udp_port must be non-zero".into()));
            }
        }
        Ok(())
    }

    /// Sampling period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Per-field toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelection {
    // All locomotives
    pub car_type: bool,
    pub position: bool,
    pub grade: bool,
    pub train_grade: bool,
    pub speed: bool,
    pub weight: bool,
    pub throttle: bool,
    pub force: bool,
    // Diesel engines
    pub rpm: bool,
    pub drive_rpm: bool,
    pub gear_state: bool,
    // Steam engines
    pub reverser: bool,
    pub boiler_pressure: bool,
    pub chest_pressure: bool,
}

impl Default for FieldSelection {
    fn default() -> Self {
        Self {
            car_type: true,
            position: true,
            grade: false,
            train_grade: false,
            speed: true,
            weight: true,
            throttle: false,
            force: false,
            rpm: true,
            drive_rpm: true,
            gear_state: false,
            reverser: false,
            boiler_pressure: false,
            chest_pressure: false,
        }
    }
}

impl FieldSelection {
    /// Every toggle off.
    pub fn none() -> Self {
        Self {
            car_type: false,
            position: false,
            grade: false,
            train_grade: false,
            speed: false,
            weight: false,
            throttle: false,
            force: false,
            rpm: false,
            drive_rpm: false,
            gear_state: false,
            reverser: false,
            boiler_pressure: false,
            chest_pressure: false,
        }
    }

    /// Every toggle on.
    pub fn all() -> Self {
        let mut selection = Self::none();
        for flag in FieldFlag::ALL {
            selection.set(flag, true);
        }
        selection
    }

    /// Whether `flag` is switched on.
    pub fn is_enabled(&self, flag: FieldFlag) -> bool {
        match flag {
            FieldFlag::CarType => self.car_type,
            FieldFlag::Position => self.position,
            FieldFlag::Grade => self.grade,
            FieldFlag::TrainGrade => self.train_grade,
            FieldFlag::Speed => self.speed,
            FieldFlag::Weight => self.weight,
            FieldFlag::Throttle => self.throttle,
            FieldFlag::Force => self.force,
            FieldFlag::Rpm => self.rpm,
            FieldFlag::DriveRpm => self.drive_rpm,
            FieldFlag::GearState => self.gear_state,
            FieldFlag::Reverser => self.reverser,
            FieldFlag::BoilerPressure => self.boiler_pressure,
            FieldFlag::ChestPressure => self.chest_pressure,
        }
    }

    /// Switch `flag` on or off.
    pub fn set(&mut self, flag: FieldFlag, enabled: bool) {
        let slot = match flag {
            FieldFlag::CarType => &mut self.car_type,
            FieldFlag::Position => &mut self.position,
            FieldFlag::Grade => &mut self.grade,
            FieldFlag::TrainGrade => &mut self.train_grade,
            FieldFlag::Speed => &mut self.speed,
            FieldFlag::Weight => &mut self.weight,
            FieldFlag::Throttle => &mut self.throttle,
            FieldFlag::Force => &mut self.force,
            FieldFlag::Rpm => &mut self.rpm,
            FieldFlag::DriveRpm => &mut self.drive_rpm,
            FieldFlag::GearState => &mut self.gear_state,
            FieldFlag::Reverser => &mut self.reverser,
            FieldFlag::BoilerPressure => &mut self.boiler_pressure,
            FieldFlag::ChestPressure => &mut self.chest_pressure,
        };
        *slot = enabled;
    }

    /// Builder-style variant of [`FieldSelection::set`].
    pub fn with(mut self, flag: FieldFlag, enabled: bool) -> Self {
        self.set(flag, enabled);
        self
    }
}

/// Builder for ExporterConfig.
#[derive(Debug, Default)]
pub struct ExporterConfigBuilder {
    active: Option<bool>,
    interval_ms: Option<u64>,
    debug: Option<bool>,
    write_to_file: Option<bool>,
    directory: Option<PathBuf>,
    udp: Option<(bool, String, u16)>,
    fields: Option<FieldSelection>,
}

impl ExporterConfigBuilder {
    /// Enable or disable sampling.
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Set sampling period in milliseconds.
    pub fn interval_ms(mut self, ms: u64) -> Self {
        self.interval_ms = Some(ms);
        self
    }

    /// Enable verbose per-tick logging.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Write per-vehicle files under `directory`.
    pub fn file_output(mut self, directory: impl Into<PathBuf>) -> Self {
        self.write_to_file = Some(true);
        self.directory = Some(directory.into());
        self
    }

    /// Disable file output.
    pub fn no_file_output(mut self) -> Self {
        self.write_to_file = Some(false);
        self
    }

    /// Send datagrams to `host:port`.
    pub fn udp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.udp = Some((true, host.into(), port));
        self
    }

    /// Set field toggles.
    pub fn fields(mut self, fields: FieldSelection) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ExporterConfig {
        let defaults = ExporterConfig::default();
        let (send_udp, udp_host, udp_port) = self
            .udp
            .unwrap_or((defaults.send_udp, defaults.udp_host, defaults.udp_port));

        ExporterConfig {
            active: self.active.unwrap_or(defaults.active),
            interval_ms: self.interval_ms.unwrap_or(defaults.interval_ms),
            debug: self.debug.unwrap_or(defaults.debug),
            write_to_file: self.write_to_file.unwrap_or(defaults.write_to_file),
            directory: self.directory.unwrap_or(defaults.directory),
            send_udp,
            udp_host,
            udp_port,
            fields: self.fields.unwrap_or(defaults.fields),
        }
    }
}
