//! Incremental span diffing and segment resolution.
//!
//! Every time the waypoint list changes, the builder compares the new list
//! against the previous one pairwise from the start. Spans in the longest
//! common prefix keep their existing segment untouched; everything from the
//! first point of divergence onward is re-resolved, because a routing or
//! track result is only valid for its exact endpoint pair. Appending a
//! waypoint therefore never re-requests already-resolved spans, and
//! removing the last waypoint is a pure truncation.

use log::{debug, warn};

use crate::distance;
use crate::error::{Result, RoutePlanError};
use crate::{GpsPoint, RoutePoint, RouteSegment, TrackId, Waypoint, WaypointKind};

/// Injected segment-resolution collaborator.
///
/// `route_between` is backed by a routing service (plus elevation sampling
/// when the polyline lacks it); `track_points` by the track catalog
/// service. Returned distances are raw; normalization rewrites them.
pub trait SpanResolver {
    fn route_between(&mut self, from: GpsPoint, to: GpsPoint) -> Result<Vec<RoutePoint>>;
    fn track_points(&mut self, track_id: TrackId) -> Result<Vec<RoutePoint>>;
}

/// What a span resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpanKind {
    /// Delegate to the routing service between two positions.
    Routed { from: GpsPoint, to: GpsPoint },
    /// Use a recorded track, in the orientation given by its boundary order.
    Track { track_id: TrackId, reversed: bool },
}

/// A span that must be (re)resolved, identified by its index in the
/// segment list.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRequest {
    pub span_index: usize,
    pub kind: SpanKind,
}

/// A span whose resolution failed. The route remains usable around the gap.
#[derive(Debug, Clone)]
pub struct SpanFailure {
    pub span_index: usize,
    pub error: RoutePlanError,
}

/// Result of planning a reconciliation: reused segments in place, one
/// request per unresolved slot.
#[derive(Debug, Clone)]
pub struct ReconcilePlan {
    pub segments: Vec<Option<RouteSegment>>,
    pub requests: Vec<SpanRequest>,
}

/// Number of leading spans whose endpoint pairs are identical in both
/// waypoint lists.
pub fn common_span_prefix(old: &[Waypoint], new: &[Waypoint]) -> usize {
    let old_spans = old.len().saturating_sub(1);
    let new_spans = new.len().saturating_sub(1);
    let limit = old_spans.min(new_spans);

    let mut shared = 0;
    while shared < limit && old[shared] == new[shared] && old[shared + 1] == new[shared + 1] {
        shared += 1;
    }
    shared
}

/// Decide how the span between two consecutive waypoints resolves.
///
/// A span bounded by the start and end waypoints of the same track becomes
/// that track, reversed when the end boundary comes first. Every other
/// pairing goes to the routing service.
pub fn classify_span(from: &Waypoint, to: &Waypoint) -> SpanKind {
    match (from.kind, to.kind) {
        (WaypointKind::TrackStart(a), WaypointKind::TrackEnd(b)) if a == b => SpanKind::Track {
            track_id: a,
            reversed: false,
        },
        (WaypointKind::TrackEnd(a), WaypointKind::TrackStart(b)) if a == b => SpanKind::Track {
            track_id: a,
            reversed: true,
        },
        _ => SpanKind::Routed {
            from: from.position,
            to: to.position,
        },
    }
}

/// Compute the minimal segment-list delta for a waypoint-list change.
///
/// Reused spans carry their old segment over; every other slot (including
/// a reused span whose previous resolution failed) produces a request.
/// Fewer than two waypoints yields an empty plan.
pub fn plan(
    old_waypoints: &[Waypoint],
    old_segments: &[Option<RouteSegment>],
    new_waypoints: &[Waypoint],
) -> ReconcilePlan {
    let span_count = new_waypoints.len().saturating_sub(1);
    let mut segments: Vec<Option<RouteSegment>> = vec![None; span_count];
    let mut requests = Vec::new();

    if span_count == 0 {
        return ReconcilePlan { segments, requests };
    }

    let reused = common_span_prefix(old_waypoints, new_waypoints).min(old_segments.len());
    segments[..reused].clone_from_slice(&old_segments[..reused]);

    for (i, slot) in segments.iter_mut().enumerate() {
        if slot.is_none() {
            requests.push(SpanRequest {
                span_index: i,
                kind: classify_span(&new_waypoints[i], &new_waypoints[i + 1]),
            });
        }
    }

    debug!(
        "[RouteBuilder] {} spans: {} reused, {} to resolve",
        span_count,
        span_count - requests.len(),
        requests.len()
    );

    ReconcilePlan { segments, requests }
}

/// Resolve a single span request against the injected resolver.
pub fn resolve_request<R: SpanResolver + ?Sized>(
    request: &SpanRequest,
    resolver: &mut R,
) -> Result<RouteSegment> {
    match request.kind {
        SpanKind::Routed { from, to } => {
            let points = resolver
                .route_between(from, to)
                .map_err(|e| RoutePlanError::span_failure(request.span_index, e))?;
            Ok(RouteSegment::routed(points))
        }
        SpanKind::Track { track_id, reversed } => {
            let mut points = resolver.track_points(track_id).map_err(|e| match e {
                err @ RoutePlanError::TrackNotFound { .. } => err,
                other => RoutePlanError::span_failure(request.span_index, other),
            })?;
            if reversed {
                points.reverse();
            }
            Ok(RouteSegment::track(track_id, reversed, points))
        }
    }
}

/// Reconcile a waypoint-list change synchronously.
///
/// Plans the delta, resolves every request through `resolver`, and
/// normalizes cumulative distances before returning. A failed span leaves
/// its slot empty and is reported in the failure list; the rest of the
/// route is unaffected.
pub fn reconcile<R: SpanResolver + ?Sized>(
    old_waypoints: &[Waypoint],
    old_segments: &[Option<RouteSegment>],
    new_waypoints: &[Waypoint],
    resolver: &mut R,
) -> (Vec<Option<RouteSegment>>, Vec<SpanFailure>) {
    let ReconcilePlan {
        mut segments,
        requests,
    } = plan(old_waypoints, old_segments, new_waypoints);

    let mut failures = Vec::new();
    for request in &requests {
        match resolve_request(request, resolver) {
            Ok(segment) => segments[request.span_index] = Some(segment),
            Err(error) => {
                warn!("[RouteBuilder] span {} failed: {}", request.span_index, error);
                failures.push(SpanFailure {
                    span_index: request.span_index,
                    error,
                });
            }
        }
    }

    distance::normalize_segments(&mut segments);
    (segments, failures)
}
