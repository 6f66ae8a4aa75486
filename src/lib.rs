//! # Route Planner
//!
//! Incremental route composition and elevation analysis for interactive
//! ride planning.
//!
//! This library provides:
//! - Incremental reconciliation of a waypoint list against its resolved
//!   route segments (only changed spans are re-requested)
//! - Stitching of routed spans and recorded track segments into one
//!   continuous route with monotonic cumulative distance
//! - Elevation smoothing and gain/loss statistics
//! - Catalog filtering of candidate track segments (difficulty, surface,
//!   tire ratings) with spatial viewport queries
//! - Bounded undo/redo over waypoint edits
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel catalog filtering with rayon
//! - **`http`** - Enable HTTP clients for routing/elevation collaborators
//! - **`persistence`** - Enable SQLite storage for saved routes
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_planner::{GpsPoint, RoutePoint, Waypoint};
//! use route_planner::builder::{self, SpanResolver};
//! use route_planner::error::Result;
//!
//! // A resolver that draws straight lines at a constant grade. Real hosts
//! // back this with a routing service and an elevation service.
//! struct StraightLine;
//!
//! impl SpanResolver for StraightLine {
//!     fn route_between(&mut self, from: GpsPoint, to: GpsPoint) -> Result<Vec<RoutePoint>> {
//!         Ok(vec![RoutePoint::new(from, 10.0), RoutePoint::new(to, 12.0)])
//!     }
//!     fn track_points(&mut self, track_id: u64) -> Result<Vec<RoutePoint>> {
//!         Err(route_planner::RoutePlanError::TrackNotFound { track_id })
//!     }
//! }
//!
//! let a = Waypoint::user(51.5074, -0.1278);
//! let b = Waypoint::user(51.5090, -0.1300);
//! let (segments, failures) = builder::reconcile(&[], &[], &[a, b], &mut StraightLine);
//! assert_eq!(segments.len(), 1);
//! assert!(failures.is_empty());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, RoutePlanError};

// Geographic utilities (haversine distance, polyline length)
pub mod geo_utils;

// Cumulative-distance normalization across segment boundaries
pub mod distance;
pub use distance::normalize_segments;

// Elevation smoothing and statistics
pub mod elevation;
pub use elevation::{ElevationProfile, ElevationStats};

// Catalog item filtering (difficulty, surface, tire ratings)
pub mod filter;
pub use filter::{SurfaceType, TireRating, TrackFilter};

// Route-level descriptive attributes derived from track segments
pub mod features;
pub use features::{median_difficulty, RouteFeatures};

// Bounded undo/redo over waypoint snapshots
pub mod history;
pub use history::EditHistory;

// Track catalog with spatial index and filtered queries
pub mod catalog;
pub use catalog::TrackCatalog;

// Incremental span diffing and segment resolution
pub mod builder;
pub use builder::{SpanFailure, SpanKind, SpanRequest, SpanResolver};

// Stateful planner engine (waypoint edits, generation-guarded commits)
pub mod engine;
pub use engine::{
    with_planner, PendingReconcile, PlannerConfig, PlannerStats, RoutePlanner, RouteSnapshot,
    RouteSummary, PLANNER,
};

// HTTP clients for routing and elevation collaborators
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{ElevationClient, HttpSpanResolver, RoutingClient};

// SQLite persistence for saved routes
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::RouteStore;

// ============================================================================
// Core Types
// ============================================================================

/// Identifier of a recorded track in the catalog.
pub type TrackId = u64;

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use route_planner::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a track or viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Compute bounds from GPS points. Returns `None` for empty input.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Whether two bounding boxes overlap.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lng <= other.max_lng
            && self.max_lng >= other.min_lng
    }
}

/// The role a waypoint plays in the route.
///
/// User waypoints are placed by clicking the map. Track boundaries are
/// inserted in start/end pairs when a recorded track is imported into the
/// route; the span between them resolves to that track's geometry instead
/// of a routing-service result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaypointKind {
    User,
    TrackStart(TrackId),
    TrackEnd(TrackId),
}

/// A single ordered point the user placed or that bounds an imported track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: GpsPoint,
    pub kind: WaypointKind,
}

impl Waypoint {
    /// Create a user-placed waypoint.
    pub fn user(latitude: f64, longitude: f64) -> Self {
        Self {
            position: GpsPoint::new(latitude, longitude),
            kind: WaypointKind::User,
        }
    }

    /// Create the starting boundary waypoint of an imported track.
    pub fn track_start(position: GpsPoint, track_id: TrackId) -> Self {
        Self {
            position,
            kind: WaypointKind::TrackStart(track_id),
        }
    }

    /// Create the ending boundary waypoint of an imported track.
    pub fn track_end(position: GpsPoint, track_id: TrackId) -> Self {
        Self {
            position,
            kind: WaypointKind::TrackEnd(track_id),
        }
    }

    /// The track this waypoint bounds, if it is a boundary waypoint.
    pub fn track_boundary(&self) -> Option<TrackId> {
        match self.kind {
            WaypointKind::User => None,
            WaypointKind::TrackStart(id) | WaypointKind::TrackEnd(id) => Some(id),
        }
    }
}

/// One sampled point of the resolved route.
///
/// `distance` is the cumulative distance in meters from the start of the
/// whole route; it is rewritten by [`distance::normalize_segments`] so that
/// it is continuous and non-decreasing across segment boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub position: GpsPoint,
    pub elevation: f64,
    pub distance: f64,
}

impl RoutePoint {
    /// Create a route point with zero cumulative distance.
    pub fn new(position: GpsPoint, elevation: f64) -> Self {
        Self {
            position,
            elevation,
            distance: 0.0,
        }
    }
}

/// How the geometry of a segment was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Produced by the routing service between two consecutive waypoints.
    Routed,
    /// A recorded track from the catalog, possibly traversed in reverse.
    Track { track_id: TrackId, reversed: bool },
}

/// The resolved path between two consecutive waypoints.
///
/// Segments are never mutated in place. Reversing a track segment replaces
/// the whole value so that reuse diffing stays sound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub kind: SegmentKind,
    pub points: Vec<RoutePoint>,
}

impl RouteSegment {
    /// Create a routed segment from resolved points.
    pub fn routed(points: Vec<RoutePoint>) -> Self {
        Self {
            kind: SegmentKind::Routed,
            points,
        }
    }

    /// Create a track segment. `points` must already be in travel order.
    pub fn track(track_id: TrackId, reversed: bool, points: Vec<RoutePoint>) -> Self {
        Self {
            kind: SegmentKind::Track { track_id, reversed },
            points,
        }
    }

    /// The catalog track this segment references, if any.
    pub fn track_id(&self) -> Option<TrackId> {
        match self.kind {
            SegmentKind::Routed => None,
            SegmentKind::Track { track_id, .. } => Some(track_id),
        }
    }

    /// Cumulative distance at the end of this segment, in meters.
    pub fn end_distance(&self) -> f64 {
        self.points.last().map(|p| p.distance).unwrap_or(0.0)
    }
}

/// Read-only descriptive record about a candidate recorded track.
///
/// Supplied by the catalog service; the planner only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCatalogItem {
    pub id: TrackId,
    pub name: String,
    /// Difficulty level, 1 (easy) to 5 (hard).
    pub difficulty: u8,
    pub surfaces: std::collections::BTreeSet<SurfaceType>,
    pub tire_dry: TireRating,
    pub tire_wet: TireRating,
    pub bounds: Bounds,
}

/// A recorded track: its catalog metadata plus the recorded point samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackData {
    pub item: TrackCatalogItem,
    pub points: Vec<RoutePoint>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            GpsPoint::new(51.50, -0.13),
            GpsPoint::new(51.52, -0.10),
            GpsPoint::new(51.51, -0.15),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.52);
        assert_eq!(bounds.min_lng, -0.15);
        assert_eq!(bounds.max_lng, -0.10);

        let center = bounds.center();
        assert!((center.latitude - 51.51).abs() < 1e-9);

        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds {
            min_lat: 0.0,
            max_lat: 1.0,
            min_lng: 0.0,
            max_lng: 1.0,
        };
        let b = Bounds {
            min_lat: 0.5,
            max_lat: 1.5,
            min_lng: 0.5,
            max_lng: 1.5,
        };
        let c = Bounds {
            min_lat: 2.0,
            max_lat: 3.0,
            min_lng: 2.0,
            max_lng: 3.0,
        };
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_waypoint_track_boundary() {
        let user = Waypoint::user(51.5, -0.1);
        assert_eq!(user.track_boundary(), None);

        let start = Waypoint::track_start(GpsPoint::new(51.5, -0.1), 7);
        let end = Waypoint::track_end(GpsPoint::new(51.6, -0.2), 7);
        assert_eq!(start.track_boundary(), Some(7));
        assert_eq!(end.track_boundary(), Some(7));
        assert_ne!(start.kind, end.kind);
    }

    #[test]
    fn test_segment_accessors() {
        let seg = RouteSegment::track(3, true, vec![]);
        assert_eq!(seg.track_id(), Some(3));
        assert_eq!(seg.end_distance(), 0.0);

        let routed = RouteSegment::routed(vec![
            RoutePoint::new(GpsPoint::new(51.5, -0.1), 10.0),
            RoutePoint {
                position: GpsPoint::new(51.6, -0.2),
                elevation: 12.0,
                distance: 250.0,
            },
        ]);
        assert_eq!(routed.track_id(), None);
        assert_eq!(routed.end_distance(), 250.0);
    }
}
