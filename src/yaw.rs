use nalgebra::UnitQuaternion;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use uom::si::{angle::radian, f64::Angle};

/// Wraps `angle` onto (-180, 180] degrees.
///
/// Uses a single euclidean remainder so repeated wrapping never accumulates
/// error beyond the rounding of one floating point operation.
pub fn wrap_signed(angle: Angle) -> Angle {
    let turn = wrap_radians(angle.get::<radian>());
    let wrapped = match turn > PI {
        true => turn - TAU,
        false => turn,
    };

    Angle::new::<radian>(wrapped)
}

/// Wraps `angle` onto [0, 360) degrees.
pub fn wrap_unsigned(angle: Angle) -> Angle {
    Angle::new::<radian>(wrap_radians(angle.get::<radian>()))
}

fn wrap_radians(value: f64) -> f64 {
    let turn = value.rem_euclid(TAU);

    // rem_euclid rounds tiny negative inputs up to exactly TAU.
    match turn >= TAU {
        true => 0.0,
        false => turn,
    }
}

/// Returns the rotation of `orientation` about the vertical (+Y) axis.
///
/// Follows the YXZ intrinsic order used by WebXR scene graphs: yaw is taken
/// first, so pitch and roll do not leak into the result.
pub fn yaw_of(orientation: &UnitQuaternion<f64>) -> Angle {
    let q = orientation.quaternion();
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    let m13 = 2.0 * (x * z + w * y);
    let m33 = 1.0 - 2.0 * (x * x + y * y);
    Angle::new::<radian>(m13.atan2(m33))
}

/// Returns a rotation of `yaw` about the vertical (+Y) axis.
pub fn yaw_rotation(yaw: Angle) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), yaw.get::<radian>())
}

/// The yaw correction applied to the scene relative to sensor-reported north.
///
/// The stored angle is always finite and wrapped onto (-180, 180] degrees.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotationOffset {
    angle: Angle,
}

impl RotationOffset {
    /// An offset of zero, the unrotated scene.
    pub fn zero() -> Self {
        Self {
            angle: Angle::new::<radian>(0.0),
        }
    }

    /// Creates a `RotationOffset` from `angle` wrapping onto (-180, 180].
    ///
    /// Returns `None` if `angle` is not finite.
    pub fn from_angle_wrapped(angle: Angle) -> Option<Self> {
        if !angle.is_finite() {
            return None;
        }

        Some(Self {
            angle: wrap_signed(angle),
        })
    }

    /// Returns the offset after rotating by `delta`.
    ///
    /// `delta` is normalized onto (-180, 180] before it is summed. Returns
    /// `None` if `delta` is not finite.
    pub fn rotated(self, delta: Angle) -> Option<Self> {
        if !delta.is_finite() {
            return None;
        }

        Self::from_angle_wrapped(self.angle + wrap_signed(delta))
    }

    pub fn into_inner(self) -> Angle {
        self.angle
    }

    pub fn radians(&self) -> f64 {
        self.angle.get::<radian>()
    }
}

impl Default for RotationOffset {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<RotationOffset> for Angle {
    fn from(offset: RotationOffset) -> Self {
        offset.angle
    }
}
