//! Unified error handling for the route-planner library.
//!
//! Pure components (distance normalization, elevation analysis, filtering,
//! feature aggregation) have a defined output for every input and never
//! return errors. Only the paths that talk to external collaborators
//! (routing, track lookup, elevation sampling, storage) can fail, and those
//! failures are per-span and non-fatal to the rest of the route.

use std::fmt;

use crate::TrackId;

/// Unified error type for route-planner operations.
#[derive(Debug, Clone)]
pub enum RoutePlanError {
    /// Routing or track lookup failed for one span of the route.
    /// The route remains usable up to the last successfully resolved span.
    SpanResolutionFailed { span_index: usize, message: String },
    /// A track referenced by a waypoint pair is not in the catalog and the
    /// catalog collaborator could not supply it.
    TrackNotFound { track_id: TrackId },
    /// A track span was requested with mismatched boundary waypoints.
    InvalidSpan { span_index: usize, message: String },
    /// HTTP/API error from a routing or elevation collaborator.
    HttpError {
        message: String,
        status_code: Option<u16>,
    },
    /// Persistence/storage error.
    PersistenceError { message: String },
    /// Generic internal error.
    Internal { message: String },
}

impl fmt::Display for RoutePlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePlanError::SpanResolutionFailed {
                span_index,
                message,
            } => {
                write!(f, "Span {} could not be resolved: {}", span_index, message)
            }
            RoutePlanError::TrackNotFound { track_id } => {
                write!(f, "Track {} not found in catalog", track_id)
            }
            RoutePlanError::InvalidSpan {
                span_index,
                message,
            } => {
                write!(f, "Span {} is invalid: {}", span_index, message)
            }
            RoutePlanError::HttpError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "HTTP error ({}): {}", code, message)
                } else {
                    write!(f, "HTTP error: {}", message)
                }
            }
            RoutePlanError::PersistenceError { message } => {
                write!(f, "Persistence error: {}", message)
            }
            RoutePlanError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RoutePlanError {}

/// Result type alias for route-planner operations.
pub type Result<T> = std::result::Result<T, RoutePlanError>;

impl RoutePlanError {
    /// Wrap any displayable error as a span-resolution failure.
    pub fn span_failure<E: fmt::Display>(span_index: usize, err: E) -> Self {
        RoutePlanError::SpanResolutionFailed {
            span_index,
            message: err.to_string(),
        }
    }
}
