//! North-aligned placement of live aircraft in an AR/VR scene.
//!
//! Flight positions are projected onto the tangent plane of the user, and a
//! single yaw offset aligns that plane with what the device camera sees. The
//! offset is set once from the first compass reading and nudged afterwards
//! by grabbing and turning a controller.

pub mod backdrop;
pub mod calibration;
pub mod config;
pub mod error;
pub mod flight;
pub mod geodesy;
pub mod heading;
pub mod recalibration;
pub mod rotation;
pub mod scene;
pub mod session;
pub mod subscription;
pub mod yaw;

pub mod prelude {
    pub use crate::{
        backdrop::{Backdrop, BackdropStatus, MediaError},
        calibration::{CalibrationController, CalibrationState, ForwardAxis},
        config::Config,
        error::Error,
        flight::{FlightId, FlightLayer, PlacedFlight, ProcessedFlight},
        geodesy::{GeoPoint, LocalPosition, bearing, distance, elevation_angle, to_local_position},
        heading::{CompassPoint, HeadingSample, HeadingSampler, OrientationEvent},
        recalibration::{
            ControllerError, ControllerPose, GamepadButton, GrabOutcome, ManualRecalibration,
            XrController,
        },
        rotation::{RotationSink, RotationSource, RotationState},
        scene::{CompassIndicator, Frame},
        session::Session,
        subscription::Subscription,
        yaw::RotationOffset,
    };
}
