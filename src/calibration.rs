//! One-shot alignment of the scene with true north.
//!
//! The first usable heading sample after a session starts rotates the scene so
//! that the direction the device camera faces lines up with the sampled
//! compass bearing. Later samples are ignored; drift is corrected by hand
//! through [`crate::recalibration`].

use crate::{
    heading::HeadingSample,
    rotation::RotationSink,
    subscription::Subscription,
    yaw::RotationOffset,
};
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uom::{
    ConstZero,
    si::{angle::degree, f64::Angle},
};

/// The scene axis the device camera looks down before any rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ForwardAxis {
    /// North in the local frame. The WebXR camera convention.
    #[default]
    NegativeZ,
    /// East in the local frame.
    PositiveX,
    /// South in the local frame.
    PositiveZ,
    /// West in the local frame.
    NegativeX,
}

impl ForwardAxis {
    /// Compass bearing of the axis in the unrotated local frame.
    pub fn scene_bearing(&self) -> Angle {
        Angle::new::<degree>(match self {
            ForwardAxis::NegativeZ => 0.0,
            ForwardAxis::PositiveX => 90.0,
            ForwardAxis::PositiveZ => 180.0,
            ForwardAxis::NegativeX => 270.0,
        })
    }

    /// Term added to a device bearing to obtain the scene yaw.
    ///
    /// A yaw of `t` about +Y moves a direction at bearing `b` to `b - t`. The
    /// sampled bearing must land on the forward axis, so `t = b - forward`.
    pub fn correction(&self) -> Angle {
        -self.scene_bearing()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationState {
    Uncalibrated,
    Calibrated {
        bearing: Angle,
        at: DateTime<Utc>,
    },
}

/// Sets the rotation offset from the first heading sample it sees.
#[derive(Debug)]
pub struct CalibrationController {
    state: CalibrationState,
    forward_axis: ForwardAxis,
    listener: Option<Subscription>,
}

impl CalibrationController {
    pub fn new(forward_axis: ForwardAxis) -> Self {
        Self {
            state: CalibrationState::Uncalibrated,
            forward_axis,
            listener: None,
        }
    }

    /// Holds the one-shot orientation listener until the first sample lands.
    ///
    /// A listener handed over after calibration is released immediately.
    pub fn arm(&mut self, listener: Subscription) {
        match self.state {
            CalibrationState::Uncalibrated => self.listener = Some(listener),
            CalibrationState::Calibrated { .. } => listener.release(),
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated { .. })
    }

    pub fn is_armed(&self) -> bool {
        self.listener.is_some()
    }

    /// The offset that aligns the scene for a device facing `bearing`.
    pub fn offset_for(&self, bearing: Angle) -> RotationOffset {
        RotationOffset::from_angle_wrapped(bearing + self.forward_axis.correction())
            .unwrap_or_default()
    }

    /// Handles a heading sample.
    ///
    /// Only the first sample after the controller is created or reset writes
    /// the offset. The calibrated flag and the offset are written together
    /// and the listener is released before returning, so a second sample
    /// arriving in the same turn is always rejected.
    ///
    /// Returns `true` if the sample calibrated the scene.
    pub fn on_heading(&mut self, sample: &HeadingSample, sink: &mut impl RotationSink) -> bool {
        if self.is_calibrated() {
            return false;
        }

        let offset = self.offset_for(sample.bearing());
        sink.set_rotation_offset(offset);
        self.state = CalibrationState::Calibrated {
            bearing: sample.bearing(),
            at: sample.timestamp(),
        };

        if let Some(listener) = self.listener.take() {
            listener.release();
        }

        tracing::info!(
            bearing_deg = sample.bearing().get::<degree>(),
            offset_deg = offset.into_inner().get::<degree>(),
            source = ?sample.source(),
            "scene calibrated to north"
        );

        true
    }

    /// Returns to the uncalibrated state so the next sample calibrates again.
    ///
    /// The current offset is left in place until that sample arrives.
    pub fn reset(&mut self, listener: Subscription) {
        tracing::info!("calibration reset");
        self.state = CalibrationState::Uncalibrated;
        self.arm(listener);
    }

    /// Releases the one-shot listener without calibrating.
    pub fn disarm(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.release();
        }
    }
}

impl Default for CalibrationController {
    fn default() -> Self {
        Self::new(ForwardAxis::default())
    }
}

impl CalibrationState {
    /// Bearing the scene was calibrated against, zero when uncalibrated.
    pub fn bearing(&self) -> Angle {
        match self {
            CalibrationState::Uncalibrated => Angle::ZERO,
            CalibrationState::Calibrated { bearing, .. } => *bearing,
        }
    }
}
