use crate::yaw::wrap_unsigned;
use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use uom::si::{angle::degree, f64::Angle};

/// A raw device orientation event as delivered by the platform.
///
/// Angles are in degrees. Either field may be missing on any given event.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrientationEvent {
    /// Rotation about the device's vertical axis, counter-clockwise from north.
    pub alpha: Option<f64>,

    /// Platform compass heading, clockwise from north.
    pub webkit_compass_heading: Option<f64>,
}

impl OrientationEvent {
    pub fn from_alpha(alpha: f64) -> Self {
        Self {
            alpha: Some(alpha),
            webkit_compass_heading: None,
        }
    }

    pub fn from_compass(heading: f64) -> Self {
        Self {
            alpha: None,
            webkit_compass_heading: Some(heading),
        }
    }
}

/// Describes which field of an [`OrientationEvent`] produced a bearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HeadingSource {
    PlatformCompass,
    GenericOrientation,
}

/// A compass bearing derived from a single orientation event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeadingSample {
    /// Clockwise from true north on [0, 360).
    bearing: Angle,
    source: HeadingSource,
    timestamp: DateTime<Utc>,
}

impl HeadingSample {
    /// Normalizes `event` into a sample.
    ///
    /// The platform compass wins when present. Returns `None` if neither field
    /// carries a finite angle.
    pub fn from_event(event: &OrientationEvent, timestamp: DateTime<Utc>) -> Option<Self> {
        let (bearing, source) = match (event.webkit_compass_heading, event.alpha) {
            (Some(heading), _) if heading.is_finite() => (heading, HeadingSource::PlatformCompass),
            (_, Some(alpha)) if alpha.is_finite() => {
                (360.0 - alpha, HeadingSource::GenericOrientation)
            }
            _ => return None,
        };

        Some(Self {
            bearing: wrap_unsigned(Angle::new::<degree>(bearing)),
            source,
            timestamp,
        })
    }

    pub fn bearing(&self) -> Angle {
        self.bearing
    }

    pub fn source(&self) -> HeadingSource {
        self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Bearing rounded to a whole degree for display.
    pub fn display_degrees(&self) -> u16 {
        (self.bearing.get::<degree>().round() as u16) % 360
    }

    pub fn compass_point(&self) -> CompassPoint {
        CompassPoint::from_bearing(self.bearing)
    }
}

/// The eight principal compass directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompassPoint {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CompassPoint {
    const ALL: [CompassPoint; 8] = [
        CompassPoint::N,
        CompassPoint::NE,
        CompassPoint::E,
        CompassPoint::SE,
        CompassPoint::S,
        CompassPoint::SW,
        CompassPoint::W,
        CompassPoint::NW,
    ];

    /// Nearest compass point to `bearing`.
    pub fn from_bearing(bearing: Angle) -> Self {
        let sector = (wrap_unsigned(bearing).get::<degree>() / 45.0).round() as usize;
        Self::ALL[sector % Self::ALL.len()]
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompassPoint::N => "N",
            CompassPoint::NE => "NE",
            CompassPoint::E => "E",
            CompassPoint::SE => "SE",
            CompassPoint::S => "S",
            CompassPoint::SW => "SW",
            CompassPoint::W => "W",
            CompassPoint::NW => "NW",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Turns raw orientation events into heading samples and remembers the
/// latest one for user feedback.
#[derive(Clone, Debug, Default)]
pub struct HeadingSampler {
    latest: Option<HeadingSample>,
}

impl HeadingSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples `event`, superseding the previous sample when it is usable.
    pub fn sample(
        &mut self,
        event: &OrientationEvent,
        timestamp: DateTime<Utc>,
    ) -> Option<HeadingSample> {
        let sample = HeadingSample::from_event(event, timestamp)?;
        self.latest = Some(sample);
        Some(sample)
    }

    pub fn latest(&self) -> Option<&HeadingSample> {
        self.latest.as_ref()
    }
}
