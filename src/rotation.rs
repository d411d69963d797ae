use crate::yaw::RotationOffset;
use uom::si::f64::Angle;

/// Read access to the session's rotation offset.
pub trait RotationSource {
    fn rotation_offset(&self) -> RotationOffset;
}

/// Write access to the session's rotation offset.
///
/// Only the calibration components hold this.
pub trait RotationSink: RotationSource {
    fn set_rotation_offset(&mut self, offset: RotationOffset);

    /// Adds `delta` to the offset. Non-finite deltas are ignored.
    ///
    /// Returns the resulting offset.
    fn rotate_by(&mut self, delta: Angle) -> RotationOffset {
        if let Some(offset) = self.rotation_offset().rotated(delta) {
            self.set_rotation_offset(offset);
        }
        self.rotation_offset()
    }
}

/// Owner of the rotation offset for one AR/VR session.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationState {
    offset: RotationOffset,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RotationSource for RotationState {
    fn rotation_offset(&self) -> RotationOffset {
        self.offset
    }
}

impl RotationSink for RotationState {
    fn set_rotation_offset(&mut self, offset: RotationOffset) {
        self.offset = offset;
    }
}

impl<T: RotationSource + ?Sized> RotationSource for &T {
    fn rotation_offset(&self) -> RotationOffset {
        (**self).rotation_offset()
    }
}
