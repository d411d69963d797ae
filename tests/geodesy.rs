use approx::assert_relative_eq;
use quickcheck::quickcheck;
use rstest::rstest;
use skyview::{
    geodesy::{GeoPoint, bearing, destination, distance, elevation_angle, to_local_position},
    yaw::wrap_signed,
};
use uom::ConstZero;
use uom::si::{
    angle::degree,
    f64::{Angle, Length},
    length::{kilometer, meter},
};

fn p(lat: f64, lon: f64, alt: f64) -> GeoPoint {
    GeoPoint::from_degrees(lat, lon, alt).expect("test point is valid")
}

/// Builds an origin and a target within the 200 km working radius.
fn pair(seed: (i16, i16, u16, u16, u16)) -> (GeoPoint, GeoPoint, Length) {
    let (lat, lon, heading, range, alt) = seed;
    let origin = p(
        lat as f64 * 80.0 / 32768.0,
        lon as f64 * 180.0 / 32768.0,
        200.0,
    );
    let range = Length::new::<meter>(100.0 + range as f64 / u16::MAX as f64 * 199_900.0);
    let heading = Angle::new::<degree>(heading as f64 / u16::MAX as f64 * 360.0);
    let start = p(
        origin.latitude().get::<degree>(),
        origin.longitude().get::<degree>(),
        alt as f64 / u16::MAX as f64 * 12_000.0,
    );

    let target = destination(&start, heading, range).expect("heading is finite");
    (origin, target, range)
}

quickcheck! {
    fn local_magnitude_matches_distance(seed: (i16, i16, u16, u16, u16)) -> bool {
        let (origin, target, _) = pair(seed);
        let horizontal = to_local_position(&origin, &target).horizontal_distance();
        let great_circle = distance(&origin, &target);
        ((horizontal - great_circle) / great_circle).value.abs() < 0.005
    }

    fn local_direction_matches_bearing(seed: (i16, i16, u16, u16, u16)) -> bool {
        let (origin, target, _) = pair(seed);
        let Some(local) = to_local_position(&origin, &target).horizontal_bearing() else {
            return false;
        };
        let error = wrap_signed(local - bearing(&origin, &target));
        error.get::<degree>().abs() < 1e-6
    }

    fn destination_lands_at_range(seed: (i16, i16, u16, u16, u16)) -> bool {
        let (origin, target, range) = pair(seed);
        (distance(&origin, &target) - range).get::<meter>().abs() < 1e-3
    }
}

#[test]
fn prague_scenario() {
    let origin = p(50.0755, 14.4378, 200.0);
    let target = p(50.10, 14.50, 8000.0);

    let range = distance(&origin, &target);
    assert_relative_eq!(range.get::<kilometer>(), 5.207, epsilon = 0.01);

    let elevation = elevation_angle(&origin, &target).get::<degree>();
    assert!(elevation > 0.0);
    assert_relative_eq!(elevation, 56.27, epsilon = 0.05);

    let heading = bearing(&origin, &target).get::<degree>();
    assert!(0.0 < heading && heading < 90.0);

    let local = to_local_position(&origin, &target);
    assert!(local.east() > Length::ZERO);
    assert!(local.north() > Length::ZERO);
    assert!(local.up() > Length::ZERO);
}

#[rstest]
#[case(p(0.0, 179.99, 0.0), p(0.0, -179.99, 0.0))]
#[case(p(89.5, 0.0, 0.0), p(89.5, 180.0, 0.0))]
#[case(p(-60.0, -179.999, 0.0), p(-60.0, 179.999, 0.0))]
fn no_seams_within_working_radius(#[case] origin: GeoPoint, #[case] target: GeoPoint) {
    let local = to_local_position(&origin, &target);
    assert_relative_eq!(
        local.horizontal_distance().get::<meter>(),
        distance(&origin, &target).get::<meter>(),
        max_relative = 5e-3
    );
    assert!(local.horizontal_distance() < Length::new::<kilometer>(200.0));
}

#[test]
fn small_moves_give_small_local_changes() {
    let origin = p(47.0, 8.0, 400.0);
    let mut previous = to_local_position(&origin, &p(47.0, 8.0, 400.0));
    for step in 1..=1000 {
        let target = p(47.0 + step as f64 * 1e-4, 8.0 + step as f64 * 1e-4, 400.0);
        let local = to_local_position(&origin, &target);
        let jump = (local.x - previous.x).abs() + (local.z - previous.z).abs();
        assert!(jump < Length::new::<meter>(25.0));
        previous = local;
    }
}
