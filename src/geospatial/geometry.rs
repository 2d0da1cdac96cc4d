//! Encoded polyline helpers: decoding step geometry, sampling waypoints and
//! encoding the start/end path for the elevation lookup.

use geo_types::Coord;

use crate::Result;
use crate::error::RouteError;
use crate::models::Coordinates;

/// Google encodes polylines with 5 decimal digits
const PRECISION: u32 = 5;

/// Decode an encoded polyline into waypoints
pub fn decode(encoded: &str) -> Result<Vec<Coordinates>> {
    let line = polyline::decode_polyline(encoded, PRECISION).map_err(|e| {
        RouteError::upstream("Google Directions API", format!("undecodable polyline: {e}"))
    })?;

    Ok(line
        .coords()
        .map(|c| Coordinates::new(c.y, c.x))
        .collect())
}

/// Encode waypoints as a polyline (used for `path=enc:` parameters)
pub fn encode(points: &[Coordinates]) -> Result<String> {
    polyline::encode_coordinates(
        points.iter().map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        }),
        PRECISION,
    )
    .map_err(|e| RouteError::general(format!("Failed to encode path: {e}")))
}

/// Keep every `stride`-th point, starting with the first
#[must_use]
pub fn sample_every(points: &[Coordinates], stride: usize) -> Vec<Coordinates> {
    points.iter().step_by(stride.max(1)).copied().collect()
}

/// Pick up to `count` waypoints spread evenly over `waypoints`.
///
/// The last waypoint is always part of the selection; a count of one yields
/// only the last waypoint.
#[must_use]
pub fn spread(waypoints: &[Coordinates], count: usize) -> Vec<Coordinates> {
    let len = waypoints.len();
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if count >= len {
        return waypoints.to_vec();
    }
    if count == 1 {
        return vec![waypoints[len - 1]];
    }

    let step = (len - 1) as f64 / (count - 1) as f64;
    (0..count)
        .map(|i| waypoints[((i as f64 * step).round() as usize).min(len - 1)])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn line(n: usize) -> Vec<Coordinates> {
        (0..n).map(|i| Coordinates::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode(SAMPLE).unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[0].latitude - 38.5).abs() < 1e-6);
        assert!((points[0].longitude + 120.2).abs() < 1e-6);
        assert!((points[2].latitude - 43.252).abs() < 1e-6);
        assert!((points[2].longitude + 126.453).abs() < 1e-6);
    }

    #[test]
    fn test_encode_matches_reference_polyline() {
        let points = vec![
            Coordinates::new(38.5, -120.2),
            Coordinates::new(40.7, -120.95),
            Coordinates::new(43.252, -126.453),
        ];
        assert_eq!(encode(&points).unwrap(), SAMPLE);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(20, 1)]
    #[case(21, 2)]
    #[case(45, 3)]
    fn test_sample_every_twentieth(#[case] points: usize, #[case] expected: usize) {
        let sampled = sample_every(&line(points), 20);
        assert_eq!(sampled.len(), expected);
        for (i, p) in sampled.iter().enumerate() {
            assert_eq!(p.latitude, (i * 20) as f64);
        }
    }

    #[test]
    fn test_spread_single_uses_last_waypoint() {
        let picked = spread(&line(7), 1);
        assert_eq!(picked, vec![Coordinates::new(6.0, 0.0)]);
    }

    #[test]
    fn test_spread_includes_both_ends() {
        let picked = spread(&line(11), 3);
        let lats: Vec<f64> = picked.iter().map(|p| p.latitude).collect();
        assert_eq!(lats, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn test_spread_with_fewer_waypoints_than_requested() {
        assert_eq!(spread(&line(2), 5).len(), 2);
        assert!(spread(&[], 5).is_empty());
    }
}
