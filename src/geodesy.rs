//! Great-circle geometry on a spherical earth and projection onto the local
//! tangent plane of a user origin.

use crate::yaw::{wrap_signed, wrap_unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use sguaba::{
    Coordinate, Vector,
    math::RigidBodyTransform,
    system,
    systems::{Ecef, Wgs84},
};
use thiserror::Error;
use uom::{
    ConstZero,
    si::{
        angle::{degree, radian},
        f64::{Angle, Length},
        length::meter,
    },
};

/// Mean earth radius (IUGG) in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Lowest altitude accepted for a [`GeoPoint`] in meters.
pub const MIN_ALTITUDE_M: f64 = -500.0;

// Absorbs rounding from the degree to radian round trip in `uom`.
const BOUND_SLACK_DEG: f64 = 1e-9;

system!(struct OriginEnu using ENU);

#[derive(Debug, Error, PartialEq)]
pub enum GeoError {
    #[error("expected latitude in range [-90, 90] degrees but got: {degrees}")]
    LatitudeOutOfBounds { degrees: f64 },
    #[error("expected longitude in range [-180, 180] degrees but got: {degrees}")]
    LongitudeOutOfBounds { degrees: f64 },
    #[error("expected altitude of at least -500 meters but got: {meters}")]
    AltitudeOutOfBounds { meters: f64 },
    #[error("expected a finite heading but got: {degrees}")]
    HeadingNotFinite { degrees: f64 },
}

/// A position on the earth described by latitude, longitude and altitude.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "RawGeoPoint", into = "RawGeoPoint")
)]
pub struct GeoPoint(Wgs84);

impl GeoPoint {
    /// Creates a new `GeoPoint`.
    ///
    /// Fails if a component is outside its valid range or not finite.
    pub fn new(latitude: Angle, longitude: Angle, altitude: Length) -> Result<Self, GeoError> {
        let lat = latitude.get::<degree>();
        let out_of_bounds = GeoError::LatitudeOutOfBounds { degrees: lat };
        if !(lat.abs() <= 90.0 + BOUND_SLACK_DEG) {
            return Err(out_of_bounds);
        }

        let lon = longitude.get::<degree>();
        if !(lon.abs() <= 180.0 + BOUND_SLACK_DEG) {
            return Err(GeoError::LongitudeOutOfBounds { degrees: lon });
        }

        let alt = altitude.get::<meter>();
        if !alt.is_finite() || alt < MIN_ALTITUDE_M {
            return Err(GeoError::AltitudeOutOfBounds { meters: alt });
        }

        let position = Wgs84::builder()
            .latitude(latitude)
            .ok_or(out_of_bounds)?
            .longitude(longitude)
            .altitude(altitude)
            .build();

        Ok(Self(position))
    }

    /// Creates a new `GeoPoint` from degrees and meters.
    pub fn from_degrees(latitude: f64, longitude: f64, altitude: f64) -> Result<Self, GeoError> {
        Self::new(
            Angle::new::<degree>(latitude),
            Angle::new::<degree>(longitude),
            Length::new::<meter>(altitude),
        )
    }

    pub fn latitude(&self) -> Angle {
        self.0.latitude()
    }

    pub fn longitude(&self) -> Angle {
        self.0.longitude()
    }

    pub fn altitude(&self) -> Length {
        self.0.altitude()
    }

    /// Earth centered coordinates on the reference sphere.
    fn to_ecef(self) -> Coordinate<Ecef> {
        Coordinate::<Ecef>::from_spherical(
            Length::new::<meter>(EARTH_RADIUS_M) + self.altitude(),
            Angle::new::<degree>(90.0) - self.latitude(),
            self.longitude(),
        )
    }
}

#[cfg(feature = "serde")]
#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        Self::from_degrees(raw.latitude, raw.longitude, raw.altitude)
    }
}

#[cfg(feature = "serde")]
impl From<GeoPoint> for RawGeoPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            latitude: point.latitude().get::<degree>(),
            longitude: point.longitude().get::<degree>(),
            altitude: point.altitude().get::<meter>(),
        }
    }
}

/// A position in the tangent plane of a user origin.
///
/// Axes are right-handed: +X east, +Y up and +Z south. A camera looking down
/// -Z therefore looks north before any rotation offset is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocalPosition {
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

impl LocalPosition {
    pub fn origin() -> Self {
        Self {
            x: Length::ZERO,
            y: Length::ZERO,
            z: Length::ZERO,
        }
    }

    pub fn east(&self) -> Length {
        self.x
    }

    pub fn north(&self) -> Length {
        -self.z
    }

    pub fn up(&self) -> Length {
        self.y
    }

    /// Length of the projection onto the horizontal plane.
    pub fn horizontal_distance(&self) -> Length {
        self.x.hypot(self.z)
    }

    /// Compass bearing of the horizontal projection, or `None` at the origin.
    pub fn horizontal_bearing(&self) -> Option<Angle> {
        if self.x == Length::ZERO && self.z == Length::ZERO {
            return None;
        }

        Some(wrap_unsigned(self.east().atan2(self.north())))
    }

    /// Returns the position as meters in scene axis order.
    pub fn as_meters(&self) -> [f64; 3] {
        [
            self.x.get::<meter>(),
            self.y.get::<meter>(),
            self.z.get::<meter>(),
        ]
    }
}

/// Great-circle distance between `a` and `b` using the haversine formula.
///
/// Altitude does not contribute.
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> Length {
    let lat_a = a.latitude().get::<radian>();
    let lat_b = b.latitude().get::<radian>();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude() - a.longitude()).get::<radian>();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());

    Length::new::<meter>(EARTH_RADIUS_M * c)
}

/// Initial compass bearing of the great circle from `from` towards `to`.
///
/// Returns zero when the points coincide.
pub fn bearing(from: &GeoPoint, to: &GeoPoint) -> Angle {
    let lat_from = from.latitude().get::<radian>();
    let lat_to = to.latitude().get::<radian>();
    let d_lon = (to.longitude() - from.longitude()).get::<radian>();

    let y = d_lon.sin() * lat_to.cos();
    let x = lat_from.cos() * lat_to.sin() - lat_from.sin() * lat_to.cos() * d_lon.cos();

    if distance(from, to) == Length::ZERO || (x == 0.0 && y == 0.0) {
        return Angle::ZERO;
    }

    wrap_unsigned(Angle::new::<radian>(y.atan2(x)))
}

/// Angle of `target` above the horizontal plane of `origin`.
///
/// Positive when `target` is higher than `origin`.
pub fn elevation_angle(origin: &GeoPoint, target: &GeoPoint) -> Angle {
    let rise = target.altitude() - origin.altitude();
    rise.atan2(distance(origin, target))
}

/// Projects `target` into the tangent plane at `origin`.
///
/// Both points are placed on the reference sphere in earth centered
/// coordinates and moved into an east-north-up frame at `origin`, so the
/// projection is continuous across the antimeridian and near the poles.
/// Results are meaningful within a few hundred kilometers of `origin`.
pub fn to_local_position(origin: &GeoPoint, target: &GeoPoint) -> LocalPosition {
    // SAFETY: The ECEF to ENU rotation only depends on the latitude and longitude of `origin`,
    // and the translation puts the origin of OriginEnu at `origin` on the reference sphere.
    let ecef_to_enu = unsafe {
        let rotation = RigidBodyTransform::<Ecef, OriginEnu>::ecef_to_enu_at(&origin.0).rotation();
        RigidBodyTransform::new(Vector::from(origin.to_ecef()), rotation)
    };
    let enu = ecef_to_enu.transform(target.to_ecef());

    LocalPosition {
        x: enu.enu_east(),
        y: enu.enu_up(),
        z: -enu.enu_north(),
    }
}

/// The point reached by travelling `range` along the great circle leaving
/// `start` at `heading`. Altitude is kept.
///
/// Fails if `heading` is not finite or `range` does not lead to a valid point.
pub fn destination(start: &GeoPoint, heading: Angle, range: Length) -> Result<GeoPoint, GeoError> {
    if !heading.is_finite() {
        return Err(GeoError::HeadingNotFinite {
            degrees: heading.get::<degree>(),
        });
    }

    let delta = range.get::<meter>() / EARTH_RADIUS_M;
    let theta = heading.get::<radian>();
    let lat = start.latitude().get::<radian>();
    let lon = start.longitude().get::<radian>();

    let sin_lat_dest =
        (lat.sin() * delta.cos() + lat.cos() * delta.sin() * theta.cos()).clamp(-1.0, 1.0);
    let lat_dest = sin_lat_dest.asin();
    let lon_dest = lon
        + (theta.sin() * delta.sin() * lat.cos()).atan2(delta.cos() - lat.sin() * sin_lat_dest);

    GeoPoint::new(
        Angle::new::<radian>(lat_dest),
        wrap_signed(Angle::new::<radian>(lon_dest)),
        start.altitude(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::quickcheck;
    use rstest::rstest;

    fn p(lat: f64, lon: f64, alt: f64) -> GeoPoint {
        GeoPoint::from_degrees(lat, lon, alt).expect("test point is valid")
    }

    /// Maps quickcheck seeds onto valid coordinates.
    fn seeded(lat_seed: i16, lon_seed: i16) -> GeoPoint {
        p(
            lat_seed as f64 * 89.0 / 32768.0,
            lon_seed as f64 * 180.0 / 32768.0,
            0.0,
        )
    }

    quickcheck! {
        fn distance_symmetric(a: (i16, i16), b: (i16, i16)) -> bool {
            let a = seeded(a.0, a.1);
            let b = seeded(b.0, b.1);
            distance(&a, &b) == distance(&b, &a)
        }

        fn distance_positive_for_distinct(a: (i16, i16), b: (i16, i16)) -> bool {
            let pa = seeded(a.0, a.1);
            let pb = seeded(b.0, b.1);
            match a == b {
                true => distance(&pa, &pb) == Length::ZERO,
                false => distance(&pa, &pb) > Length::ZERO,
            }
        }

        fn triangle_inequality(a: (i16, i16), b: (i16, i16), c: (i16, i16)) -> bool {
            let (a, b, c) = (seeded(a.0, a.1), seeded(b.0, b.1), seeded(c.0, c.1));
            let direct = distance(&a, &c).get::<meter>();
            let detour = (distance(&a, &b) + distance(&b, &c)).get::<meter>();
            direct <= detour + 1e-3
        }

        fn bearing_in_range(a: (i16, i16), b: (i16, i16)) -> bool {
            let deg = bearing(&seeded(a.0, a.1), &seeded(b.0, b.1)).get::<degree>();
            (0.0..360.0).contains(&deg)
        }
    }

    #[rstest]
    #[case(91.0, 0.0, 0.0)]
    #[case(-90.5, 0.0, 0.0)]
    #[case(0.0, 180.1, 0.0)]
    #[case(0.0, -181.0, 0.0)]
    #[case(0.0, 0.0, -501.0)]
    #[case(f64::NAN, 0.0, 0.0)]
    #[case(0.0, 0.0, f64::INFINITY)]
    fn invalid_geo_point(#[case] lat: f64, #[case] lon: f64, #[case] alt: f64) {
        assert!(GeoPoint::from_degrees(lat, lon, alt).is_err());
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = p(50.0755, 14.4378, 200.0);
        assert_eq!(distance(&a, &a), Length::ZERO);
    }

    #[test]
    fn bearing_to_self_is_zero() {
        let a = p(-33.86, 151.21, 0.0);
        assert_eq!(bearing(&a, &a), Angle::ZERO);
    }

    #[rstest]
    #[case(p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), 0.0)]
    #[case(p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), 90.0)]
    #[case(p(0.0, 0.0, 0.0), p(-1.0, 0.0, 0.0), 180.0)]
    #[case(p(0.0, 0.0, 0.0), p(0.0, -1.0, 0.0), 270.0)]
    #[case(p(0.0, 179.9, 0.0), p(0.0, -179.9, 0.0), 90.0)]
    fn cardinal_bearings(#[case] from: GeoPoint, #[case] to: GeoPoint, #[case] expected: f64) {
        assert_relative_eq!(bearing(&from, &to).get::<degree>(), expected, epsilon = 1e-9);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance(&p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0));
        assert_relative_eq!(d.get::<meter>(), 111_195.08, epsilon = 1.0);
    }

    #[test]
    fn elevation_sign_follows_altitude() {
        let ground = p(47.0, 8.0, 400.0);
        let aloft = p(47.05, 8.05, 3000.0);
        assert!(elevation_angle(&ground, &aloft) > Angle::ZERO);
        assert!(elevation_angle(&aloft, &ground) < Angle::ZERO);
    }

    #[test]
    fn elevation_straight_up() {
        let ground = p(47.0, 8.0, 0.0);
        let above = p(47.0, 8.0, 1000.0);
        assert_relative_eq!(
            elevation_angle(&ground, &above).get::<degree>(),
            90.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn local_position_axes() {
        let origin = p(10.0, 20.0, 0.0);

        let north = to_local_position(&origin, &p(10.01, 20.0, 0.0));
        assert!(north.z < Length::ZERO);
        assert!(north.x.abs().get::<meter>() < 1e-6);

        let east = to_local_position(&origin, &p(10.0, 20.01, 0.0));
        assert!(east.x > Length::ZERO);

        let up = to_local_position(&origin, &p(10.0, 20.0, 100.0));
        assert_relative_eq!(up.y.get::<meter>(), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn local_position_continuous_across_antimeridian() {
        let origin = p(0.0, 179.99, 0.0);
        let west = to_local_position(&origin, &p(0.0, 179.98, 0.0));
        let east = to_local_position(&origin, &p(0.0, -179.99, 0.0));

        assert!(west.x < Length::ZERO);
        assert!(east.x > Length::ZERO);
        assert_relative_eq!(
            east.x.get::<meter>(),
            -west.x.get::<meter>() * 2.0,
            max_relative = 1e-3
        );
    }

    #[test]
    fn destination_matches_distance_and_bearing() {
        let start = p(50.0755, 14.4378, 200.0);
        let heading = Angle::new::<degree>(58.0);
        let range = Length::new::<meter>(25_000.0);
        let end = destination(&start, heading, range).unwrap();

        assert_relative_eq!(distance(&start, &end).get::<meter>(), 25_000.0, epsilon = 1e-3);
        assert_relative_eq!(bearing(&start, &end).get::<degree>(), 58.0, epsilon = 1e-6);
        assert_eq!(end.altitude(), start.altitude());
    }

    #[test]
    fn destination_wraps_longitude() {
        let start = p(0.0, 179.9, 0.0);
        let end = destination(&start, Angle::new::<degree>(90.0), Length::new::<meter>(50_000.0))
            .unwrap();
        assert!(end.longitude() < Angle::ZERO);
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn destination_rejects_unusable_heading(#[case] heading: f64) {
        let start = p(50.1, 14.5, 8000.0);
        let end = destination(&start, Angle::new::<degree>(heading), Length::new::<meter>(1000.0));
        assert!(matches!(end, Err(GeoError::HeadingNotFinite { .. })));
    }

    #[test]
    fn local_position_at_equator_stays_on_sphere() {
        // One degree north along the meridian, where the sphere and the
        // ellipsoid differ the most.
        let origin = p(0.0, 0.0, 0.0);
        let target = p(1.0, 0.0, 0.0);
        let local = to_local_position(&origin, &target);

        assert_relative_eq!(
            local.horizontal_distance().get::<meter>(),
            distance(&origin, &target).get::<meter>(),
            max_relative = 1e-4
        );
        assert!(local.x.abs().get::<meter>() < 1e-6);
    }
}
