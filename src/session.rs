//! The state of one AR/VR session and the callbacks that drive it.

use crate::{
    backdrop::Backdrop,
    calibration::CalibrationController,
    config::Config,
    error::Error,
    flight::{FlightId, FlightLayer, ProcessedFlight, RefreshSummary},
    geodesy::GeoPoint,
    heading::{HeadingSample, HeadingSampler, OrientationEvent},
    recalibration::{GrabOutcome, ManualRecalibration, XrController},
    rotation::{RotationSource, RotationState},
    scene::{self, Frame},
    subscription::Subscription,
};
use chrono::{DateTime, Utc};
use uom::si::angle::degree;

/// Owns the rotation offset and every subscription of a session.
///
/// Orientation callbacks and render ticks run on the same thread, so each
/// call here is atomic with respect to the others. Dropping the session
/// releases every subscription it holds.
#[derive(Debug)]
pub struct Session {
    rotation: RotationState,
    sampler: HeadingSampler,
    calibration: CalibrationController,
    recalibration: ManualRecalibration,
    flights: FlightLayer,
    selected: Option<FlightId>,
    backdrop: Backdrop,
    listeners: Vec<Subscription>,
    last_grab: GrabOutcome,
}

impl Session {
    /// Starts an uncalibrated session around `origin`.
    pub fn new(origin: GeoPoint, config: &Config) -> Result<Self, Error> {
        config.validate()?;

        tracing::info!(
            latitude = origin.latitude().get::<degree>(),
            longitude = origin.longitude().get::<degree>(),
            forward_axis = ?config.calibration.forward_axis,
            "session started"
        );

        Ok(Self {
            rotation: RotationState::new(),
            sampler: HeadingSampler::new(),
            calibration: CalibrationController::new(config.calibration.forward_axis),
            recalibration: ManualRecalibration::new(&config.recalibration),
            flights: FlightLayer::new(
                origin,
                config.scene.max_range(),
                config.scene.trajectory_horizon(),
                config.scene.trajectory_steps,
            ),
            selected: None,
            backdrop: Backdrop::new(),
            listeners: Vec::new(),
            last_grab: GrabOutcome::Skipped,
        })
    }

    /// Keeps a long-lived listener until teardown.
    pub fn listen(&mut self, listener: Subscription) {
        self.listeners.push(listener);
    }

    /// Hands the one-shot calibration listener to the session.
    pub fn arm_calibration(&mut self, listener: Subscription) {
        self.calibration.arm(listener);
    }

    /// Orientation event callback.
    ///
    /// Returns the derived sample, or `None` if the event had no usable
    /// heading.
    pub fn handle_orientation(
        &mut self,
        event: &OrientationEvent,
        at: DateTime<Utc>,
    ) -> Option<HeadingSample> {
        let sample = self.sampler.sample(event, at)?;
        self.calibration.on_heading(&sample, &mut self.rotation);
        Some(sample)
    }

    /// Lets the next heading sample calibrate the scene again.
    pub fn recalibrate(&mut self, listener: Subscription) {
        self.calibration.reset(listener);
    }

    /// Replaces the flights with a fresh batch from the data feed.
    ///
    /// A selected flight missing from the batch is deselected.
    pub fn update_flights(
        &mut self,
        flights: impl IntoIterator<Item = ProcessedFlight>,
    ) -> RefreshSummary {
        let summary = self.flights.refresh(flights);

        let vanished = self
            .selected
            .as_ref()
            .is_some_and(|id| !self.flights.contains(id));
        if let Some(id) = self.selected.take_if(|_| vanished) {
            tracing::debug!(%id, "selected flight left the scene");
        }

        summary
    }

    /// Selects a placed flight. Unknown ids are ignored.
    pub fn select(&mut self, id: &FlightId) -> bool {
        if !self.flights.contains(id) {
            return false;
        }

        self.selected = Some(id.clone());
        true
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&FlightId> {
        self.selected.as_ref()
    }

    /// Render loop tick.
    pub fn tick(&mut self, controller: Option<&dyn XrController>) -> Frame {
        self.last_grab =
            self.recalibration
                .tick(controller, self.selected.is_some(), &mut self.rotation);

        scene::compose(
            &self.rotation,
            &self.flights,
            self.selected.as_ref(),
            self.sampler.latest(),
        )
    }

    /// Read-only view of the rotation offset.
    pub fn rotation(&self) -> &impl RotationSource {
        &self.rotation
    }

    pub fn calibration(&self) -> &CalibrationController {
        &self.calibration
    }

    pub fn recalibration(&self) -> &ManualRecalibration {
        &self.recalibration
    }

    pub fn last_grab(&self) -> &GrabOutcome {
        &self.last_grab
    }

    pub fn flights(&self) -> &FlightLayer {
        &self.flights
    }

    pub fn backdrop(&self) -> &Backdrop {
        &self.backdrop
    }

    pub fn backdrop_mut(&mut self) -> &mut Backdrop {
        &mut self.backdrop
    }

    /// Ends the session, releasing every subscription.
    pub fn teardown(mut self) {
        self.release_all();
        tracing::info!("session torn down");
    }

    fn release_all(&mut self) {
        self.calibration.disarm();
        self.backdrop.stop();
        for listener in self.listeners.drain(..) {
            listener.release();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release_all();
    }
}
