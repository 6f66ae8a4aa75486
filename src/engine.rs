//! # Route Planner Engine
//!
//! Stateful planner that owns the editor session: the waypoint list, the
//! segment list resolved for it, the track catalog, the undo/redo history,
//! and the lazily cached elevation profile.
//!
//! ## Architecture
//!
//! There is one logical writer. Waypoint edits mutate only the waypoint
//! list; the segment list is brought back in sync by reconciliation, which
//! reuses every span whose endpoints are unchanged and requests the rest
//! from the injected collaborators. Routing lookups are asynchronous and
//! may complete out of order, so every reconciliation carries a generation
//! number: a result committed with a stale generation is silently dropped,
//! never a corrupting write.

use std::sync::Mutex;

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::builder::{self, SpanFailure, SpanKind, SpanRequest, SpanResolver};
use crate::catalog::TrackCatalog;
use crate::distance;
use crate::elevation::{self, ElevationProfile, ElevationStats};
use crate::error::{Result, RoutePlanError};
use crate::features::{self, RouteFeatures};
use crate::filter::TrackFilter;
use crate::history::{EditHistory, DEFAULT_HISTORY_DEPTH};
use crate::{
    Bounds, GpsPoint, RoutePoint, RouteSegment, SegmentKind, TrackCatalogItem, TrackData, TrackId,
    Waypoint, WaypointKind,
};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for a planner session.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Maximum number of undo steps kept.
    pub history_depth: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

// ============================================================================
// Snapshots & summaries
// ============================================================================

/// Serializable snapshot of a route, as exchanged with the persistence
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    pub waypoints: Vec<Waypoint>,
    pub segments: Vec<Option<RouteSegment>>,
    pub name: Option<String>,
    pub comments: Option<String>,
}

/// Save-time summary of the current route.
///
/// `difficulty` is the median of track-segment difficulties, deliberately
/// a different contract from the worst-case [`RouteFeatures::difficulty`]
/// used for live display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub name: Option<String>,
    pub comments: Option<String>,
    pub total_distance: f64,
    pub elevation: ElevationStats,
    pub difficulty: Option<f64>,
    pub features: Option<RouteFeatures>,
}

/// A reconciliation in progress: the generation guarding its commits plus
/// the spans the host must resolve asynchronously.
#[derive(Debug, Clone)]
pub struct PendingReconcile {
    pub generation: u64,
    pub requests: Vec<SpanRequest>,
}

/// Planner statistics for monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerStats {
    pub waypoint_count: u32,
    pub span_count: u32,
    pub resolved_spans: u32,
    pub track_segments: u32,
    pub catalog_size: u32,
    pub generation: u64,
    pub undo_depth: u32,
}

// ============================================================================
// Route Planner
// ============================================================================

/// The stateful route planner.
pub struct RoutePlanner {
    /// Waypoints as currently edited by the user.
    waypoints: Vec<Waypoint>,
    /// The waypoint list the current segment list was resolved for.
    routed_waypoints: Vec<Waypoint>,
    /// One slot per span of `routed_waypoints`; `None` = unresolved.
    segments: Vec<Option<RouteSegment>>,

    catalog: TrackCatalog,
    filter: TrackFilter,
    history: EditHistory,

    // Async guard
    generation: u64,
    failures: Vec<SpanFailure>,

    // Elevation profile cache
    profile_dirty: bool,
    smoothed: Vec<RoutePoint>,
    stats: ElevationStats,

    name: Option<String>,
    comments: Option<String>,
}

impl RoutePlanner {
    /// Create a planner with default configuration.
    pub fn new() -> Self {
        Self::with_config(PlannerConfig::default())
    }

    /// Create a planner with custom configuration.
    pub fn with_config(config: PlannerConfig) -> Self {
        Self {
            waypoints: Vec::new(),
            routed_waypoints: Vec::new(),
            segments: Vec::new(),
            catalog: TrackCatalog::new(),
            filter: TrackFilter::default(),
            history: EditHistory::with_capacity(config.history_depth),
            generation: 0,
            failures: Vec::new(),
            profile_dirty: false,
            smoothed: Vec::new(),
            stats: ElevationStats::zero(),
            name: None,
            comments: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn segments(&self) -> &[Option<RouteSegment>] {
        &self.segments
    }

    /// Span failures reported by the most recent reconciliation.
    pub fn failures(&self) -> &[SpanFailure] {
        &self.failures
    }

    /// Current reconciliation generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn catalog(&self) -> &TrackCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut TrackCatalog {
        &mut self.catalog
    }

    pub fn filter(&self) -> &TrackFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TrackFilter) {
        self.filter = filter;
    }

    /// Candidate tracks for the map view: in the viewport and passing the
    /// session filter.
    pub fn candidate_tracks(&mut self, viewport: &Bounds) -> Vec<TrackId> {
        self.catalog.matching_in_viewport(viewport, &self.filter)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn comments(&self) -> Option<&str> {
        self.comments.as_deref()
    }

    pub fn set_comments(&mut self, comments: Option<String>) {
        self.comments = comments;
    }

    // ========================================================================
    // Waypoint Edits
    // ========================================================================

    /// Append a user waypoint at the end of the route.
    pub fn add_waypoint(&mut self, position: GpsPoint) {
        self.history.record(&self.waypoints);
        self.waypoints.push(Waypoint {
            position,
            kind: WaypointKind::User,
        });
    }

    /// Insert a user waypoint before `index` (clamped to the list length).
    pub fn insert_waypoint(&mut self, index: usize, position: GpsPoint) {
        self.history.record(&self.waypoints);
        let index = index.min(self.waypoints.len());
        self.waypoints.insert(
            index,
            Waypoint {
                position,
                kind: WaypointKind::User,
            },
        );
    }

    /// Move an existing waypoint. Returns `false` if `index` is out of range.
    pub fn move_waypoint(&mut self, index: usize, position: GpsPoint) -> bool {
        if index >= self.waypoints.len() {
            return false;
        }
        self.history.record(&self.waypoints);
        self.waypoints[index].position = position;
        true
    }

    /// Remove a waypoint. Returns `false` if `index` is out of range.
    pub fn remove_waypoint(&mut self, index: usize) -> bool {
        if index >= self.waypoints.len() {
            return false;
        }
        self.history.record(&self.waypoints);
        self.waypoints.remove(index);
        true
    }

    /// Remove all waypoints and segments. The edit is undoable; in-flight
    /// span results are invalidated.
    pub fn clear(&mut self) {
        self.history.record(&self.waypoints);
        self.waypoints.clear();
        self.routed_waypoints.clear();
        self.segments.clear();
        self.failures.clear();
        self.generation += 1;
        self.profile_dirty = true;
        info!("[RoutePlanner] cleared");
    }

    /// Import a recorded track: store it in the catalog and append its
    /// boundary waypoint pair to the route. The span between the pair will
    /// resolve to the track itself on the next reconcile; the span
    /// connecting it to any preceding waypoint is routed normally.
    pub fn import_track(&mut self, track: TrackData) {
        let track_id = track.item.id;
        let endpoints = match (track.points.first(), track.points.last()) {
            (Some(first), Some(last)) => Some((first.position, last.position)),
            _ => None,
        };

        let positions: Vec<GpsPoint> = track.points.iter().map(|p| p.position).collect();
        self.catalog.insert(track);

        if let Some((start, end)) = endpoints {
            self.history.record(&self.waypoints);
            self.waypoints.push(Waypoint::track_start(start, track_id));
            self.waypoints.push(Waypoint::track_end(end, track_id));
            info!(
                "[RoutePlanner] imported track {} ({:.0} m)",
                track_id,
                crate::geo_utils::polyline_length(&positions)
            );
        } else {
            warn!("[RoutePlanner] track {} has no points, catalog only", track_id);
        }
    }

    /// Flip the travel direction of a resolved track segment.
    ///
    /// This is a replace-in-list operation producing a new segment value
    /// (and swapping the boundary waypoints to match), so reuse diffing
    /// never sees a half-mutated segment.
    pub fn reverse_track_segment(&mut self, span_index: usize) -> Result<()> {
        let (track_id, reversed, mut points) = {
            let slot = self
                .segments
                .get(span_index)
                .ok_or_else(|| RoutePlanError::InvalidSpan {
                    span_index,
                    message: "no such span".to_string(),
                })?;
            let segment = slot.as_ref().ok_or_else(|| RoutePlanError::InvalidSpan {
                span_index,
                message: "span is unresolved".to_string(),
            })?;
            match segment.kind {
                SegmentKind::Track { track_id, reversed } => {
                    (track_id, reversed, segment.points.clone())
                }
                SegmentKind::Routed => {
                    return Err(RoutePlanError::InvalidSpan {
                        span_index,
                        message: "not a track segment".to_string(),
                    })
                }
            }
        };

        self.history.record(&self.waypoints);

        // Keep boundary order consistent with the new orientation so a
        // later reconcile classifies this span the same way.
        if self.waypoints.len() > span_index + 1
            && self.waypoints[span_index] == self.routed_waypoints[span_index]
            && self.waypoints[span_index + 1] == self.routed_waypoints[span_index + 1]
        {
            self.waypoints.swap(span_index, span_index + 1);
        }
        self.routed_waypoints.swap(span_index, span_index + 1);

        points.reverse();
        self.segments[span_index] = Some(RouteSegment::track(track_id, !reversed, points));
        distance::normalize_segments(&mut self.segments);
        self.profile_dirty = true;
        Ok(())
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Diff the edited waypoint list against the resolved route.
    ///
    /// Reused spans keep their segments; track spans resolve immediately
    /// from the catalog; the returned requests are the routed spans (and
    /// any track missing from the catalog) the host must resolve and
    /// commit. Starting a new reconciliation invalidates all results still
    /// in flight for earlier ones.
    pub fn begin_reconcile(&mut self) -> PendingReconcile {
        let plan = builder::plan(&self.routed_waypoints, &self.segments, &self.waypoints);

        self.generation += 1;
        self.routed_waypoints = self.waypoints.clone();
        self.segments = plan.segments;
        self.failures.clear();
        self.profile_dirty = true;

        let mut pending = Vec::new();
        for request in plan.requests {
            match request.kind {
                SpanKind::Track { track_id, .. } if self.catalog.get(track_id).is_some() => {
                    let result = self.resolve_track_request(&request);
                    self.apply_result(request.span_index, result);
                }
                _ => pending.push(request),
            }
        }

        distance::normalize_segments(&mut self.segments);
        debug!(
            "[RoutePlanner] reconcile generation {}: {} spans pending",
            self.generation,
            pending.len()
        );

        PendingReconcile {
            generation: self.generation,
            requests: pending,
        }
    }

    /// Commit one resolved span. Returns `false` when the result belongs to
    /// an invalidated reconciliation and was dropped.
    pub fn commit_span(
        &mut self,
        generation: u64,
        span_index: usize,
        result: Result<RouteSegment>,
    ) -> bool {
        if generation != self.generation {
            debug!(
                "[RoutePlanner] dropping stale result for span {} (generation {}, current {})",
                span_index, generation, self.generation
            );
            return false;
        }
        if span_index >= self.segments.len() {
            warn!("[RoutePlanner] commit for unknown span {}", span_index);
            return false;
        }

        self.apply_result(span_index, result);
        distance::normalize_segments(&mut self.segments);
        true
    }

    /// Reconcile synchronously, resolving every pending span through the
    /// given resolver. Returns the failures of this reconciliation.
    pub fn reconcile_with<R: SpanResolver + ?Sized>(&mut self, resolver: &mut R) -> &[SpanFailure] {
        let pending = self.begin_reconcile();
        for request in pending.requests {
            let result = builder::resolve_request(&request, resolver);
            self.commit_span(pending.generation, request.span_index, result);
        }
        &self.failures
    }

    fn resolve_track_request(&self, request: &SpanRequest) -> Result<RouteSegment> {
        match request.kind {
            SpanKind::Track { track_id, reversed } => {
                let data = self
                    .catalog
                    .get(track_id)
                    .ok_or(RoutePlanError::TrackNotFound { track_id })?;
                let mut points = data.points.clone();
                if reversed {
                    points.reverse();
                }
                Ok(RouteSegment::track(track_id, reversed, points))
            }
            SpanKind::Routed { .. } => Err(RoutePlanError::Internal {
                message: "routed span cannot resolve from catalog".to_string(),
            }),
        }
    }

    fn apply_result(&mut self, span_index: usize, result: Result<RouteSegment>) {
        match result {
            Ok(segment) => self.segments[span_index] = Some(segment),
            Err(error) => {
                warn!("[RoutePlanner] span {} failed: {}", span_index, error);
                self.failures.push(SpanFailure { span_index, error });
            }
        }
        self.profile_dirty = true;
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Restore the waypoint list to the previous snapshot. Returns `false`
    /// when there is nothing to undo. Run a reconcile afterwards to bring
    /// the segment list back in sync (unchanged spans are reused).
    pub fn undo(&mut self) -> bool {
        if let Some(snapshot) = self.history.undo(&self.waypoints) {
            self.waypoints = snapshot;
            true
        } else {
            false
        }
    }

    /// Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        if let Some(snapshot) = self.history.redo(&self.waypoints) {
            self.waypoints = snapshot;
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ========================================================================
    // Elevation Profile
    // ========================================================================

    fn ensure_profile(&mut self) {
        if !self.profile_dirty {
            return;
        }
        let points = self.route_points();
        self.smoothed = elevation::smooth(&points);
        self.stats = elevation::stats_smoothed(&self.smoothed);
        self.profile_dirty = false;
    }

    /// All resolved route points in order, with normalized distances.
    pub fn route_points(&self) -> Vec<RoutePoint> {
        self.segments
            .iter()
            .flatten()
            .flat_map(|s| s.points.iter().copied())
            .collect()
    }

    /// Smoothed distance/elevation series for chart display.
    pub fn elevation_profile(&mut self) -> ElevationProfile {
        self.ensure_profile();
        ElevationProfile::from_points(&self.smoothed)
    }

    /// Gain/loss/min/max over the smoothed profile.
    pub fn elevation_stats(&mut self) -> ElevationStats {
        self.ensure_profile();
        self.stats
    }

    /// Total route distance in meters, up to the last resolved segment.
    pub fn total_distance(&self) -> f64 {
        self.segments
            .iter()
            .flatten()
            .last()
            .map(|s| s.end_distance())
            .unwrap_or(0.0)
    }

    // ========================================================================
    // Features & Summary
    // ========================================================================

    /// Catalog items of the track segments currently in the route, in
    /// route order.
    pub fn track_items(&self) -> Vec<&TrackCatalogItem> {
        self.segments
            .iter()
            .flatten()
            .filter_map(|s| s.track_id())
            .filter_map(|id| self.catalog.item(id))
            .collect()
    }

    /// Live worst-case features. `None` for a route without track segments.
    pub fn features(&self) -> Option<RouteFeatures> {
        features::aggregate(&self.track_items())
    }

    /// Save-time summary (median difficulty, smoothed elevation stats).
    pub fn summary(&mut self) -> RouteSummary {
        self.ensure_profile();
        let difficulties: Vec<u8> = self.track_items().iter().map(|i| i.difficulty).collect();
        RouteSummary {
            name: self.name.clone(),
            comments: self.comments.clone(),
            total_distance: self.total_distance(),
            elevation: self.stats,
            difficulty: features::median_difficulty(&difficulties),
            features: self.features(),
        }
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Snapshot the current route for the persistence collaborator.
    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            waypoints: self.waypoints.clone(),
            segments: self.segments.clone(),
            name: self.name.clone(),
            comments: self.comments.clone(),
        }
    }

    /// Replace the current route with a saved snapshot. Undoable; pending
    /// span results are invalidated.
    pub fn restore(&mut self, snapshot: RouteSnapshot) {
        self.history.record(&self.waypoints);
        self.waypoints = snapshot.waypoints.clone();
        self.routed_waypoints = snapshot.waypoints;
        self.segments = snapshot.segments;
        self.name = snapshot.name;
        self.comments = snapshot.comments;
        self.failures.clear();
        self.generation += 1;
        self.profile_dirty = true;
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Planner statistics for monitoring.
    pub fn stats(&self) -> PlannerStats {
        PlannerStats {
            waypoint_count: self.waypoints.len() as u32,
            span_count: self.segments.len() as u32,
            resolved_spans: self.segments.iter().flatten().count() as u32,
            track_segments: self
                .segments
                .iter()
                .flatten()
                .filter(|s| s.track_id().is_some())
                .count() as u32,
            catalog_size: self.catalog.len() as u32,
            generation: self.generation,
            undo_depth: self.history.len() as u32,
        }
    }
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global planner instance for embedding hosts that want a single shared
/// editor session.
pub static PLANNER: Lazy<Mutex<RoutePlanner>> = Lazy::new(|| Mutex::new(RoutePlanner::new()));

/// Get a lock on the global planner.
pub fn with_planner<F, R>(f: F) -> R
where
    F: FnOnce(&mut RoutePlanner) -> R,
{
    let mut planner = PLANNER.lock().unwrap();
    f(&mut planner)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SurfaceType, TireRating};

    struct MockResolver {
        route_calls: usize,
    }

    impl MockResolver {
        fn new() -> Self {
            Self { route_calls: 0 }
        }
    }

    impl SpanResolver for MockResolver {
        fn route_between(&mut self, from: GpsPoint, to: GpsPoint) -> Result<Vec<RoutePoint>> {
            self.route_calls += 1;
            Ok(vec![RoutePoint::new(from, 20.0), RoutePoint::new(to, 30.0)])
        }

        fn track_points(&mut self, track_id: TrackId) -> Result<Vec<RoutePoint>> {
            Err(RoutePlanError::TrackNotFound { track_id })
        }
    }

    fn sample_track(id: TrackId, difficulty: u8, tire: TireRating) -> TrackData {
        let points = vec![
            RoutePoint::new(GpsPoint::new(51.60, -0.20), 100.0),
            RoutePoint::new(GpsPoint::new(51.61, -0.21), 110.0),
            RoutePoint::new(GpsPoint::new(51.62, -0.22), 105.0),
        ];
        let positions: Vec<GpsPoint> = points.iter().map(|p| p.position).collect();
        TrackData {
            item: TrackCatalogItem {
                id,
                name: format!("track-{}", id),
                difficulty,
                surfaces: [SurfaceType::Gravel].into_iter().collect(),
                tire_dry: tire,
                tire_wet: tire,
                bounds: Bounds::from_points(&positions).unwrap(),
            },
            points,
        }
    }

    #[test]
    fn test_add_and_reconcile() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.reconcile_with(&mut resolver);

        assert_eq!(planner.segments().len(), 1);
        assert!(planner.failures().is_empty());
        assert_eq!(resolver.route_calls, 1);

        // Appending reuses the resolved span.
        planner.add_waypoint(GpsPoint::new(51.52, -0.12));
        planner.reconcile_with(&mut resolver);
        assert_eq!(planner.segments().len(), 2);
        assert_eq!(resolver.route_calls, 2);
    }

    #[test]
    fn test_import_track_resolves_from_catalog() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.import_track(sample_track(7, 3, TireRating::Knobs));
        planner.reconcile_with(&mut resolver);

        // Spans: user->start (routed), start->end (track from catalog).
        assert_eq!(planner.segments().len(), 2);
        assert!(planner.failures().is_empty());
        assert_eq!(resolver.route_calls, 1);
        assert_eq!(planner.segments()[1].as_ref().unwrap().track_id(), Some(7));
        assert_eq!(planner.stats().track_segments, 1);

        // The imported track also shows up as a browsable candidate.
        let viewport = Bounds {
            min_lat: 51.0,
            max_lat: 52.0,
            min_lng: -1.0,
            max_lng: 0.0,
        };
        assert_eq!(planner.candidate_tracks(&viewport), vec![7]);
    }

    #[test]
    fn test_stale_commit_is_dropped() {
        let mut planner = RoutePlanner::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        let first = planner.begin_reconcile();
        assert_eq!(first.requests.len(), 1);

        // A new edit starts a newer reconciliation before the first span
        // resolves.
        planner.add_waypoint(GpsPoint::new(51.52, -0.12));
        let second = planner.begin_reconcile();
        assert!(second.generation > first.generation);

        // The late result for the invalidated reconciliation is a no-op.
        let stale = RouteSegment::routed(vec![
            RoutePoint::new(GpsPoint::new(0.0, 0.0), 0.0),
            RoutePoint::new(GpsPoint::new(1.0, 1.0), 0.0),
        ]);
        assert!(!planner.commit_span(first.generation, 0, Ok(stale)));
        assert!(planner.segments()[0].is_none());

        // Results for the current reconciliation land, in any order.
        for request in second.requests.iter().rev() {
            let segment = RouteSegment::routed(vec![
                RoutePoint::new(GpsPoint::new(51.50, -0.10), 10.0),
                RoutePoint::new(GpsPoint::new(51.51, -0.11), 12.0),
            ]);
            assert!(planner.commit_span(second.generation, request.span_index, Ok(segment)));
        }
        assert!(planner.segments().iter().all(|s| s.is_some()));
    }

    #[test]
    fn test_failed_span_is_reported_not_fatal() {
        let mut planner = RoutePlanner::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        let pending = planner.begin_reconcile();

        let error = RoutePlanError::HttpError {
            message: "gateway timeout".to_string(),
            status_code: Some(504),
        };
        assert!(planner.commit_span(pending.generation, 0, Err(error)));

        assert_eq!(planner.failures().len(), 1);
        assert!(planner.segments()[0].is_none());
        assert_eq!(planner.total_distance(), 0.0);
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut planner = RoutePlanner::new();
        assert!(!planner.can_undo());
        assert!(!planner.undo());

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        assert_eq!(planner.waypoints().len(), 2);

        assert!(planner.undo());
        assert_eq!(planner.waypoints().len(), 1);
        assert!(planner.can_redo());

        assert!(planner.redo());
        assert_eq!(planner.waypoints().len(), 2);
        assert!(!planner.can_redo());
    }

    #[test]
    fn test_undo_then_reconcile_truncates() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.add_waypoint(GpsPoint::new(51.52, -0.12));
        planner.reconcile_with(&mut resolver);
        assert_eq!(resolver.route_calls, 2);

        planner.undo();
        planner.reconcile_with(&mut resolver);

        assert_eq!(planner.segments().len(), 1);
        assert_eq!(resolver.route_calls, 2); // prefix reused, nothing re-fetched
    }

    #[test]
    fn test_reverse_track_segment_replaces_value() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.import_track(sample_track(7, 3, TireRating::Knobs));
        planner.reconcile_with(&mut resolver);
        assert_eq!(planner.segments().len(), 1);

        let before = planner.segments()[0].clone().unwrap();
        planner.reverse_track_segment(0).unwrap();
        let after = planner.segments()[0].clone().unwrap();

        assert_eq!(
            after.kind,
            SegmentKind::Track {
                track_id: 7,
                reversed: true
            }
        );
        assert_eq!(
            after.points.first().unwrap().position,
            before.points.last().unwrap().position
        );
        // Distances were re-normalized for the new direction.
        assert_eq!(after.points[0].distance, 0.0);

        // Reconciling again keeps the reversed segment (boundary order was
        // swapped along with the value).
        planner.reconcile_with(&mut resolver);
        assert_eq!(planner.segments()[0].as_ref().unwrap().kind, after.kind);
        assert_eq!(resolver.route_calls, 0);
    }

    #[test]
    fn test_reverse_rejects_non_track_spans() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.reconcile_with(&mut resolver);

        assert!(planner.reverse_track_segment(0).is_err());
        assert!(planner.reverse_track_segment(5).is_err());
    }

    #[test]
    fn test_features_and_summary() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        // Routed-only route has no derivable features.
        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.reconcile_with(&mut resolver);
        assert!(planner.features().is_none());
        assert_eq!(planner.summary().difficulty, None);

        planner.import_track(sample_track(1, 2, TireRating::Slick));
        planner.import_track(sample_track(2, 4, TireRating::Knobs));
        planner.reconcile_with(&mut resolver);

        let features = planner.features().unwrap();
        assert_eq!(features.difficulty, 4); // live display: worst case
        assert_eq!(features.tire_dry, TireRating::Knobs);

        let summary = planner.summary();
        assert_eq!(summary.difficulty, Some(3.0)); // save time: median of [2, 4]
        assert!(summary.total_distance > 0.0);
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.reconcile_with(&mut resolver);
        planner.set_name(Some("Morning loop".to_string()));

        let snapshot = planner.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let decoded: RouteSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, snapshot);

        let mut restored = RoutePlanner::new();
        restored.restore(decoded);
        assert_eq!(restored.waypoints(), planner.waypoints());
        assert_eq!(restored.segments(), planner.segments());
        assert_eq!(restored.name(), Some("Morning loop"));

        // Restored segments are reused as-is by the next reconcile.
        let mut counting = MockResolver::new();
        restored.reconcile_with(&mut counting);
        assert_eq!(counting.route_calls, 0);
    }

    #[test]
    fn test_elevation_profile_cached_until_change() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.add_waypoint(GpsPoint::new(51.52, -0.12));
        planner.reconcile_with(&mut resolver);

        let stats = planner.elevation_stats();
        assert!(stats.max_elevation >= stats.min_elevation);
        let profile = planner.elevation_profile();
        assert_eq!(profile.samples.len(), planner.route_points().len());

        // Distances in the profile are monotonic.
        for w in profile.samples.windows(2) {
            assert!(w[1].distance >= w[0].distance);
        }
    }

    #[test]
    fn test_clear_resets_route() {
        let mut planner = RoutePlanner::new();
        let mut resolver = MockResolver::new();

        planner.add_waypoint(GpsPoint::new(51.50, -0.10));
        planner.add_waypoint(GpsPoint::new(51.51, -0.11));
        planner.reconcile_with(&mut resolver);
        let generation = planner.generation();

        planner.clear();
        assert!(planner.waypoints().is_empty());
        assert!(planner.segments().is_empty());
        assert!(planner.generation() > generation);

        // Clear is undoable.
        assert!(planner.undo());
        assert_eq!(planner.waypoints().len(), 2);
    }

    #[test]
    fn test_with_planner_singleton() {
        with_planner(|p| p.clear());
        let count = with_planner(|p| {
            p.add_waypoint(GpsPoint::new(51.50, -0.10));
            p.waypoints().len()
        });
        assert_eq!(count, 1);
        with_planner(|p| p.clear());
    }
}
