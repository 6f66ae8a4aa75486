//! Elevation smoothing and aggregate statistics.
//!
//! Raw elevation samples carry GPS and sampling noise; accumulating raw
//! deltas would count that noise as real climbing. Statistics are therefore
//! computed over a smoothed sequence: each point's elevation becomes a
//! weighted average of itself and its immediate neighbors.

use serde::{Deserialize, Serialize};

use crate::RoutePoint;

/// Sequences shorter than this are returned unchanged by [`smooth`].
pub const MIN_SMOOTHING_POINTS: usize = 3;

/// Aggregate elevation statistics for a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    /// Sum of positive elevation deltas between consecutive smoothed points.
    pub total_gain: f64,
    /// Sum of absolute negative deltas between consecutive smoothed points.
    pub total_loss: f64,
    pub max_elevation: f64,
    pub min_elevation: f64,
}

impl ElevationStats {
    /// The defined result for an empty route.
    pub fn zero() -> Self {
        Self {
            total_gain: 0.0,
            total_loss: 0.0,
            max_elevation: 0.0,
            min_elevation: 0.0,
        }
    }
}

/// Smooth an elevation sequence with a three-point weighted window.
///
/// Interior points use weights (1, 2, 1) over (previous, self, next); the
/// two edge points use an asymmetric (2, 1) window with their single
/// neighbor. Positions and distances are untouched. Sequences shorter than
/// [`MIN_SMOOTHING_POINTS`] are returned unchanged.
pub fn smooth(points: &[RoutePoint]) -> Vec<RoutePoint> {
    if points.len() < MIN_SMOOTHING_POINTS {
        return points.to_vec();
    }

    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let elevation = if i == 0 {
                (2.0 * points[0].elevation + points[1].elevation) / 3.0
            } else if i == last {
                (points[last - 1].elevation + 2.0 * points[last].elevation) / 3.0
            } else {
                (points[i - 1].elevation + 2.0 * points[i].elevation + points[i + 1].elevation)
                    / 4.0
            };
            RoutePoint { elevation, ..*p }
        })
        .collect()
}

/// Compute statistics over the smoothed version of `points`.
///
/// Empty input yields [`ElevationStats::zero`]; this is the defined default,
/// not an error.
pub fn stats(points: &[RoutePoint]) -> ElevationStats {
    stats_smoothed(&smooth(points))
}

/// Compute statistics over an already-smoothed sequence.
///
/// Callers that cache the smoothed profile use this to avoid smoothing
/// twice; the result is identical to [`stats`] on the raw sequence.
pub fn stats_smoothed(points: &[RoutePoint]) -> ElevationStats {
    if points.is_empty() {
        return ElevationStats::zero();
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    let mut max = f64::MIN;
    let mut min = f64::MAX;

    for p in points {
        max = max.max(p.elevation);
        min = min.min(p.elevation);
    }
    for w in points.windows(2) {
        let delta = w[1].elevation - w[0].elevation;
        if delta > 0.0 {
            gain += delta;
        } else {
            loss += -delta;
        }
    }

    ElevationStats {
        total_gain: gain,
        total_loss: loss,
        max_elevation: max,
        min_elevation: min,
    }
}

/// A distance/elevation series ready for chart consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationProfile {
    pub samples: Vec<ProfileSample>,
}

/// One point of the elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    /// Cumulative distance from the route start, in meters.
    pub distance: f64,
    /// Smoothed elevation in meters.
    pub elevation: f64,
}

impl ElevationProfile {
    /// Project a (smoothed) point sequence onto the distance/elevation plane.
    pub fn from_points(points: &[RoutePoint]) -> Self {
        Self {
            samples: points
                .iter()
                .map(|p| ProfileSample {
                    distance: p.distance,
                    elevation: p.elevation,
                })
                .collect(),
        }
    }
}
