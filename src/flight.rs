//! Flights placed in the local frame of the user origin.

use crate::geodesy::{
    GeoError, GeoPoint, LocalPosition, bearing, destination, distance, elevation_angle,
    to_local_position,
};
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use uom::si::{
    angle::degree,
    f64::{Angle, Length, Time, Velocity},
    length::meter,
    velocity::meter_per_second,
};

/// Unique identifier of a flight in the data feed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct FlightId(String);

impl FlightId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FlightId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A flight record as supplied by the data feed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "RawFlight", into = "RawFlight")
)]
pub struct ProcessedFlight {
    pub id: FlightId,
    pub position: GeoPoint,
    /// Track over ground, clockwise from true north.
    pub heading: Angle,
    pub ground_speed: Velocity,
    pub on_ground: bool,
    pub callsign: Option<String>,
}

impl ProcessedFlight {
    /// An airborne flight from plain numbers, degrees and meters per second.
    pub fn airborne(
        id: &str,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        heading_deg: f64,
        ground_speed_mps: f64,
    ) -> Result<Self, GeoError> {
        Ok(Self {
            id: FlightId::from(id),
            position: GeoPoint::from_degrees(latitude, longitude, altitude)?,
            heading: finite_heading(heading_deg)?,
            ground_speed: Velocity::new::<meter_per_second>(ground_speed_mps),
            on_ground: false,
            callsign: None,
        })
    }

    /// Where the flight will be after `elapsed` at its current track and speed.
    ///
    /// Flights on the ground, or without a usable track, are not projected.
    pub fn projected(&self, elapsed: Time) -> GeoPoint {
        if self.on_ground || !self.heading.is_finite() {
            return self.position;
        }

        let range: Length = self.ground_speed * elapsed;
        if !range.is_finite() || range.get::<meter>() <= 0.0 {
            return self.position;
        }

        destination(&self.position, self.heading, range).unwrap_or(self.position)
    }
}

fn finite_heading(degrees: f64) -> Result<Angle, GeoError> {
    match degrees.is_finite() {
        true => Ok(Angle::new::<degree>(degrees)),
        false => Err(GeoError::HeadingNotFinite { degrees }),
    }
}

#[cfg(feature = "serde")]
#[derive(Clone, Serialize, Deserialize)]
struct RawFlight {
    id: FlightId,
    position: GeoPoint,
    #[serde(default)]
    heading_deg: f64,
    #[serde(default)]
    ground_speed_mps: f64,
    #[serde(default)]
    on_ground: bool,
    #[serde(default)]
    callsign: Option<String>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawFlight> for ProcessedFlight {
    type Error = GeoError;

    fn try_from(raw: RawFlight) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            position: raw.position,
            heading: finite_heading(raw.heading_deg)?,
            ground_speed: Velocity::new::<meter_per_second>(raw.ground_speed_mps),
            on_ground: raw.on_ground,
            callsign: raw.callsign,
        })
    }
}

#[cfg(feature = "serde")]
impl From<ProcessedFlight> for RawFlight {
    fn from(flight: ProcessedFlight) -> Self {
        Self {
            id: flight.id,
            position: flight.position,
            heading_deg: flight.heading.get::<degree>(),
            ground_speed_mps: flight.ground_speed.get::<meter_per_second>(),
            on_ground: flight.on_ground,
            callsign: flight.callsign,
        }
    }
}

/// A flight with its geometry relative to the user origin.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedFlight {
    pub flight: ProcessedFlight,
    pub local: LocalPosition,
    pub distance: Length,
    pub bearing: Angle,
    pub elevation: Angle,
    /// Projected future positions, nearest first. Empty on the ground.
    pub trajectory: Vec<LocalPosition>,
}

impl PlacedFlight {
    pub fn id(&self) -> &FlightId {
        &self.flight.id
    }
}

/// Counts from a single [`FlightLayer::refresh`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub placed: usize,
    pub out_of_range: usize,
}

/// The set of flights currently placed around the user origin.
#[derive(Clone, Debug)]
pub struct FlightLayer {
    origin: GeoPoint,
    max_range: Length,
    horizon: Time,
    steps: usize,
    placed: BTreeMap<FlightId, PlacedFlight>,
}

impl FlightLayer {
    pub fn new(origin: GeoPoint, max_range: Length, horizon: Time, steps: usize) -> Self {
        Self {
            origin,
            max_range,
            horizon,
            steps,
            placed: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> &GeoPoint {
        &self.origin
    }

    /// Replaces every placed flight with `flights`.
    ///
    /// When an id appears more than once the last record wins. Flights beyond
    /// the working radius are dropped.
    pub fn refresh(&mut self, flights: impl IntoIterator<Item = ProcessedFlight>) -> RefreshSummary {
        let latest: BTreeMap<FlightId, ProcessedFlight> = flights
            .into_iter()
            .map(|flight| (flight.id.clone(), flight))
            .collect();
        let received = latest.len();

        let placed: Vec<PlacedFlight> = latest
            .into_values()
            .collect::<Vec<_>>()
            .into_par_iter()
            .filter_map(|flight| self.place(flight))
            .collect();

        let summary = RefreshSummary {
            placed: placed.len(),
            out_of_range: received - placed.len(),
        };

        self.placed = placed
            .into_iter()
            .map(|placed| (placed.id().clone(), placed))
            .collect();

        tracing::debug!(
            placed = summary.placed,
            out_of_range = summary.out_of_range,
            "flight layer refreshed"
        );
        summary
    }

    fn place(&self, flight: ProcessedFlight) -> Option<PlacedFlight> {
        let range = distance(&self.origin, &flight.position);
        if range > self.max_range {
            tracing::debug!(
                id = %flight.id,
                distance_m = range.get::<meter>(),
                "flight beyond working radius"
            );
            return None;
        }

        let trajectory = match flight.on_ground || self.steps == 0 {
            true => Vec::new(),
            false => (1..=self.steps)
                .map(|step| self.horizon * (step as f64 / self.steps as f64))
                .map(|elapsed| to_local_position(&self.origin, &flight.projected(elapsed)))
                .collect(),
        };

        Some(PlacedFlight {
            local: to_local_position(&self.origin, &flight.position),
            distance: range,
            bearing: bearing(&self.origin, &flight.position),
            elevation: elevation_angle(&self.origin, &flight.position),
            trajectory,
            flight,
        })
    }

    pub fn get(&self, id: &FlightId) -> Option<&PlacedFlight> {
        self.placed.get(id)
    }

    pub fn contains(&self, id: &FlightId) -> bool {
        self.placed.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedFlight> {
        self.placed.values()
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use uom::si::{length::kilometer, time::second};

    fn layer() -> FlightLayer {
        let origin = GeoPoint::from_degrees(50.0755, 14.4378, 200.0).unwrap();
        FlightLayer::new(
            origin,
            Length::new::<kilometer>(200.0),
            Time::new::<second>(60.0),
            3,
        )
    }

    #[test]
    fn latest_record_wins() {
        let mut layer = layer();
        let summary = layer.refresh(vec![
            ProcessedFlight::airborne("abc", 50.1, 14.5, 8000.0, 90.0, 200.0).unwrap(),
            ProcessedFlight::airborne("abc", 50.2, 14.5, 9000.0, 90.0, 200.0).unwrap(),
        ]);

        assert_eq!(summary.placed, 1);
        let placed = layer.get(&FlightId::from("abc")).unwrap();
        assert_relative_eq!(placed.flight.position.latitude().get::<degree>(), 50.2, epsilon = 1e-9);
    }

    #[test]
    fn refresh_replaces_previous_set() {
        let mut layer = layer();
        layer.refresh(vec![ProcessedFlight::airborne("a", 50.1, 14.5, 8000.0, 0.0, 0.0).unwrap()]);
        layer.refresh(vec![ProcessedFlight::airborne("b", 50.1, 14.5, 8000.0, 0.0, 0.0).unwrap()]);

        assert!(!layer.contains(&FlightId::from("a")));
        assert!(layer.contains(&FlightId::from("b")));
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn far_flights_are_dropped() {
        let mut layer = layer();
        let summary = layer.refresh(vec![
            ProcessedFlight::airborne("near", 50.2, 14.5, 8000.0, 0.0, 0.0).unwrap(),
            ProcessedFlight::airborne("far", 40.0, 14.5, 8000.0, 0.0, 0.0).unwrap(),
        ]);

        assert_eq!(summary, RefreshSummary { placed: 1, out_of_range: 1 });
        assert!(layer.contains(&FlightId::from("near")));
    }

    #[test]
    fn placement_matches_geodesy() {
        let mut layer = layer();
        let record = ProcessedFlight::airborne("abc", 50.10, 14.50, 8000.0, 0.0, 0.0).unwrap();
        layer.refresh(vec![record.clone()]);

        let placed = layer.get(&record.id).unwrap();
        assert_eq!(placed.local, to_local_position(layer.origin(), &record.position));
        assert_eq!(placed.distance, distance(layer.origin(), &record.position));
        assert!(placed.elevation.get::<degree>() > 0.0);
    }

    #[test]
    fn trajectory_moves_along_heading() {
        let mut layer = layer();
        let record = ProcessedFlight::airborne("abc", 50.10, 14.50, 8000.0, 90.0, 250.0).unwrap();
        layer.refresh(vec![record.clone()]);

        let placed = layer.get(&record.id).unwrap();
        assert_eq!(placed.trajectory.len(), 3);

        // Due east at 250 m/s for 20 s steps.
        let mut previous = placed.local;
        for point in &placed.trajectory {
            assert_relative_eq!(
                (point.east() - previous.east()).get::<meter>(),
                5000.0,
                max_relative = 1e-2
            );
            previous = *point;
        }
    }

    #[test]
    fn grounded_flights_have_no_trajectory() {
        let mut layer = layer();
        let mut record = ProcessedFlight::airborne("abc", 50.10, 14.26, 300.0, 90.0, 10.0).unwrap();
        record.on_ground = true;
        layer.refresh(vec![record.clone()]);

        assert!(layer.get(&record.id).unwrap().trajectory.is_empty());
        assert_eq!(record.projected(Time::new::<second>(60.0)), record.position);
    }

    #[test]
    fn unusable_heading_is_rejected() {
        assert!(matches!(
            ProcessedFlight::airborne("x", 50.1, 14.5, 8000.0, f64::NAN, 200.0),
            Err(GeoError::HeadingNotFinite { .. })
        ));
    }

    #[test]
    fn unusable_heading_holds_position() {
        let mut layer = layer();
        let mut record = ProcessedFlight::airborne("x", 50.1, 14.5, 8000.0, 0.0, 200.0).unwrap();
        record.heading = Angle::new::<degree>(f64::NAN);
        layer.refresh(vec![record.clone()]);

        let placed = layer.get(&record.id).unwrap();
        assert_eq!(placed.trajectory.len(), 3);
        for point in &placed.trajectory {
            assert!(point.as_meters().iter().all(|m| m.is_finite()));
            assert_eq!(*point, placed.local);
        }
    }

    #[test]
    fn empty_refresh_clears_layer() {
        let mut layer = layer();
        layer.refresh(vec![ProcessedFlight::airborne("a", 50.1, 14.5, 8000.0, 0.0, 0.0).unwrap()]);
        layer.refresh(Vec::new());
        assert!(layer.is_empty());
    }
}
