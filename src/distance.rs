//! Cumulative-distance normalization.
//!
//! Segments arrive with whatever distance values their source assigned:
//! routing results start at zero, recorded tracks carry distances from the
//! original recording, reversed tracks count backwards. Normalization
//! rewrites every point's cumulative distance so the concatenated route
//! starts at zero, accumulates by great-circle distance between consecutive
//! points, and is continuous across segment boundaries: the first point of
//! segment *i+1* reads exactly the last distance of segment *i*.

use crate::geo_utils::haversine_distance;
use crate::{GpsPoint, RoutePoint, RouteSegment};

/// Rewrite cumulative distances of one point sequence, starting at `start`
/// meters. Returns the distance at the last point (`start` itself for empty
/// or single-point input).
pub fn normalize_points(points: &mut [RoutePoint], start: f64) -> f64 {
    let mut cumulative = start;
    let mut prev: Option<GpsPoint> = None;

    for point in points.iter_mut() {
        if let Some(prev) = prev {
            cumulative += haversine_distance(&prev, &point.position);
        }
        point.distance = cumulative;
        prev = Some(point.position);
    }

    cumulative
}

/// Rewrite cumulative distances across an ordered segment list.
///
/// Unresolved slots (`None`) are skipped: the segments present are treated
/// as one concatenation, so the route stays monotonic up to and past a gap.
/// Empty input is a no-op.
pub fn normalize_segments(segments: &mut [Option<RouteSegment>]) {
    let mut carry = 0.0;
    for slot in segments.iter_mut() {
        if let Some(segment) = slot {
            carry = normalize_points(&mut segment.points, carry);
        }
    }
}
