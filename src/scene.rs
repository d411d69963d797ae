//! Per-frame output for the renderer.
//!
//! All flights hang off a single group node. The rotation offset is applied
//! to that node only, so every flight turns rigidly with it.

use crate::{
    flight::{FlightId, FlightLayer},
    geodesy::LocalPosition,
    heading::{CompassPoint, HeadingSample},
    rotation::RotationSource,
    yaw::{RotationOffset, yaw_rotation},
};
use nalgebra::{Point3, UnitQuaternion};
use uom::si::f64::Angle;

/// A level compass rose whose yaw tracks the rotation offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompassIndicator {
    pub visible: bool,
    pub yaw: Angle,
}

impl CompassIndicator {
    pub fn world_rotation(&self) -> UnitQuaternion<f64> {
        yaw_rotation(self.yaw)
    }

    /// Rotation to give the indicator when it is a child of a node with
    /// world rotation `parent`, e.g. the camera.
    ///
    /// Pitch and roll of the parent cancel out so the indicator stays level.
    pub fn local_rotation(&self, parent: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        parent.inverse() * self.world_rotation()
    }
}

/// Latest heading rounded for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadingDisplay {
    pub degrees: u16,
    pub point: CompassPoint,
}

impl From<&HeadingSample> for HeadingDisplay {
    fn from(sample: &HeadingSample) -> Self {
        Self {
            degrees: sample.display_degrees(),
            point: sample.compass_point(),
        }
    }
}

/// A flight as the renderer sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct FlightNode {
    pub id: FlightId,
    pub local: LocalPosition,
    pub trajectory: Vec<LocalPosition>,
    pub selected: bool,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub rotation_offset: RotationOffset,
    /// Rotation of the group node holding every flight.
    pub group_rotation: UnitQuaternion<f64>,
    pub flights: Vec<FlightNode>,
    pub compass: CompassIndicator,
    pub heading: Option<HeadingDisplay>,
}

impl Frame {
    /// Where `local` ends up once the group rotation is applied.
    pub fn world_position(&self, local: &LocalPosition) -> Point3<f64> {
        let [x, y, z] = local.as_meters();
        self.group_rotation * Point3::new(x, y, z)
    }
}

/// Builds the frame from a read-only view of the rotation offset.
pub fn compose(
    rotation: &impl RotationSource,
    flights: &FlightLayer,
    selected: Option<&FlightId>,
    heading: Option<&HeadingSample>,
) -> Frame {
    let rotation_offset = rotation.rotation_offset();
    let yaw = rotation_offset.into_inner();

    Frame {
        rotation_offset,
        group_rotation: yaw_rotation(yaw),
        flights: flights
            .iter()
            .map(|placed| FlightNode {
                id: placed.id().clone(),
                local: placed.local,
                trajectory: placed.trajectory.clone(),
                selected: selected == Some(placed.id()),
            })
            .collect(),
        compass: CompassIndicator {
            visible: selected.is_none(),
            yaw,
        },
        heading: heading.map(HeadingDisplay::from),
    }
}
