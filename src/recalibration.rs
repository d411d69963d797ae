//! Manual drift correction through a controller grab gesture.
//!
//! While a grab button is held, the scene follows the controller's yaw
//! relative to where the grab started. Releasing keeps the last offset.

use crate::{
    config::RecalibrationConfig,
    rotation::RotationSink,
    yaw::{RotationOffset, wrap_signed, yaw_of},
};
use nalgebra::{Point3, UnitQuaternion};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use uom::si::{angle::radian, f64::Angle};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    #[error("controller pose is not available this frame")]
    PoseUnavailable,

    #[error("controller gamepad is not available this frame")]
    GamepadUnavailable,

    #[error("controller read failed: {0}")]
    Read(String),

    #[error("controller read panicked: {0}")]
    Panicked(String),
}

/// Position and orientation of a tracked controller in the local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerPose {
    pub position: Point3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

impl ControllerPose {
    pub fn from_yaw(yaw: Angle) -> Self {
        Self {
            position: Point3::origin(),
            orientation: crate::yaw::yaw_rotation(yaw),
        }
    }

    /// Rotation about the vertical axis, pitch and roll removed.
    pub fn yaw(&self) -> Angle {
        yaw_of(&self.orientation)
    }
}

/// One entry of a gamepad-style button array.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GamepadButton {
    pub pressed: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: f64,
}

impl GamepadButton {
    pub fn pressed() -> Self {
        Self {
            pressed: true,
            value: 1.0,
        }
    }
}

/// A tracked XR controller.
pub trait XrController {
    fn pose(&self) -> Result<ControllerPose, ControllerError>;

    fn buttons(&self) -> Result<Vec<GamepadButton>, ControllerError>;
}

/// Controller state read once per frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerReading {
    pub yaw: Angle,
    pub grab_pressed: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum GrabGesture {
    #[default]
    Idle,
    Active {
        initial_controller_yaw: Angle,
        rotation_at_grab_start: RotationOffset,
    },
}

impl GrabGesture {
    pub fn is_active(&self) -> bool {
        matches!(self, GrabGesture::Active { .. })
    }
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq)]
pub enum GrabOutcome {
    /// No controller, or a flight is selected.
    Skipped,
    /// Nothing held, nothing to do.
    Idle,
    Started,
    Rotated(Angle),
    /// Held, but the change was under the noise floor.
    Held,
    Released,
    /// The controller could not be read; nothing changed.
    Failed(ControllerError),
}

/// Grab gesture tracker for manual recalibration.
#[derive(Clone, Debug)]
pub struct ManualRecalibration {
    gesture: GrabGesture,
    threshold: Angle,
    grab_buttons: Vec<usize>,
}

impl ManualRecalibration {
    pub fn new(config: &RecalibrationConfig) -> Self {
        Self {
            gesture: GrabGesture::Idle,
            threshold: Angle::new::<radian>(config.threshold_rad.abs()),
            grab_buttons: config.grab_buttons.clone(),
        }
    }

    pub fn gesture(&self) -> GrabGesture {
        self.gesture
    }

    /// Runs one frame of the gesture.
    ///
    /// A missing controller or a selected flight leaves all state untouched.
    /// Controller failures, including panics inside the controller, are
    /// logged and treated as no update for this frame.
    pub fn tick(
        &mut self,
        controller: Option<&dyn XrController>,
        flight_selected: bool,
        sink: &mut impl RotationSink,
    ) -> GrabOutcome {
        let Some(controller) = controller else {
            return GrabOutcome::Skipped;
        };
        if flight_selected {
            return GrabOutcome::Skipped;
        }

        match self.read(controller) {
            Ok(reading) => self.advance(reading, sink),
            Err(err) => {
                tracing::warn!(error = %err, "skipping recalibration frame");
                GrabOutcome::Failed(err)
            }
        }
    }

    fn read(&self, controller: &dyn XrController) -> Result<ControllerReading, ControllerError> {
        let read = panic::catch_unwind(AssertUnwindSafe(|| -> Result<_, ControllerError> {
            let buttons = controller.buttons()?;
            let grab_pressed = self
                .grab_buttons
                .iter()
                .any(|&index| buttons.get(index).is_some_and(|button| button.pressed));

            let pose = controller.pose()?;
            Ok(ControllerReading {
                yaw: pose.yaw(),
                grab_pressed,
            })
        }));

        match read {
            Ok(reading) => reading,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ControllerError::Panicked(message))
            }
        }
    }

    /// Steps the gesture state machine with an already-read controller state.
    pub fn advance(&mut self, reading: ControllerReading, sink: &mut impl RotationSink) -> GrabOutcome {
        if !reading.yaw.is_finite() {
            tracing::warn!("ignoring non-finite controller yaw");
            return GrabOutcome::Failed(ControllerError::Read("non-finite yaw".to_string()));
        }

        match (self.gesture, reading.grab_pressed) {
            (GrabGesture::Idle, false) => GrabOutcome::Idle,
            (GrabGesture::Idle, true) => {
                let rotation_at_grab_start = sink.rotation_offset();
                self.gesture = GrabGesture::Active {
                    initial_controller_yaw: reading.yaw,
                    rotation_at_grab_start,
                };
                tracing::debug!(
                    controller_yaw_rad = reading.yaw.get::<radian>(),
                    offset_rad = rotation_at_grab_start.radians(),
                    "grab started"
                );
                GrabOutcome::Started
            }
            (
                GrabGesture::Active {
                    initial_controller_yaw,
                    rotation_at_grab_start,
                },
                true,
            ) => {
                let raw_delta = wrap_signed(reading.yaw - initial_controller_yaw);
                let target = rotation_at_grab_start.into_inner() + raw_delta;
                let increment = wrap_signed(target - sink.rotation_offset().into_inner());

                if increment.abs() > self.threshold {
                    let offset = sink.rotate_by(increment);
                    tracing::debug!(
                        increment_rad = increment.get::<radian>(),
                        offset_rad = offset.radians(),
                        "scene rotated by grab"
                    );
                    GrabOutcome::Rotated(increment)
                } else {
                    GrabOutcome::Held
                }
            }
            (GrabGesture::Active { .. }, false) => {
                self.gesture = GrabGesture::Idle;
                tracing::debug!(offset_rad = sink.rotation_offset().radians(), "grab released");
                GrabOutcome::Released
            }
        }
    }
}

impl Default for ManualRecalibration {
    fn default() -> Self {
        Self::new(&RecalibrationConfig::default())
    }
}
