use crate::calibration::ForwardAxis;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use std::path::Path;
use thiserror::Error;
use uom::si::{
    f64::{Length, Time},
    length::meter,
    time::second,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serde")]
    #[error("could not parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationConfig {
    /// Scene axis the device camera looks down before rotation.
    pub forward_axis: ForwardAxis,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RecalibrationConfig {
    /// Grab increments at or below this many radians are ignored.
    pub threshold_rad: f64,

    /// Gamepad button indices that count as a grab.
    pub grab_buttons: Vec<usize>,
}

impl Default for RecalibrationConfig {
    fn default() -> Self {
        Self {
            threshold_rad: 0.001,
            grab_buttons: vec![0, 1],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneConfig {
    /// Flights farther than this from the origin are not placed.
    pub max_range_m: f64,

    /// How far ahead projected trajectories reach.
    pub trajectory_horizon_s: f64,

    /// Number of points per projected trajectory.
    pub trajectory_steps: usize,
}

impl SceneConfig {
    pub fn max_range(&self) -> Length {
        Length::new::<meter>(self.max_range_m)
    }

    pub fn trajectory_horizon(&self) -> Time {
        Time::new::<second>(self.trajectory_horizon_s)
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            max_range_m: 200_000.0,
            trajectory_horizon_s: 60.0,
            trajectory_steps: 6,
        }
    }
}

/// Tunables for one session.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    pub calibration: CalibrationConfig,
    pub recalibration: RecalibrationConfig,
    pub scene: SceneConfig,
}

impl Config {
    /// Checks every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.recalibration.threshold_rad;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::Invalid {
                field: "recalibration.threshold_rad",
                reason: "must be a finite, non-negative angle",
            });
        }

        if self.recalibration.grab_buttons.is_empty() {
            return Err(ConfigError::Invalid {
                field: "recalibration.grab_buttons",
                reason: "at least one button is needed to grab",
            });
        }

        let range = self.scene.max_range_m;
        if !range.is_finite() || range <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "scene.max_range_m",
                reason: "must be a finite, positive distance",
            });
        }

        let horizon = self.scene.trajectory_horizon_s;
        if !horizon.is_finite() || horizon < 0.0 {
            return Err(ConfigError::Invalid {
                field: "scene.trajectory_horizon_s",
                reason: "must be a finite, non-negative duration",
            });
        }

        Ok(())
    }

    /// Parses and validates a JSON config.
    #[cfg(feature = "serde")]
    pub fn from_json(serialized: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(serialized)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config from `path`.
    #[cfg(feature = "serde")]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(?path, "loaded config");
        Ok(config)
    }
}
