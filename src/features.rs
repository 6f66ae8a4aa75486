//! Route-level descriptive attributes derived from the track segments
//! currently in the route.
//!
//! Two distinct aggregation contracts exist and are deliberately kept
//! apart. The live per-edit display uses worst-case aggregation
//! ([`aggregate`]): the hardest portion governs rider preparation, and a
//! single rough span dictates tire choice for the entire ride. The
//! save-time summary instead reports the median of segment difficulties
//! ([`median_difficulty`]).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::filter::{SurfaceType, TireRating};
use crate::TrackCatalogItem;

/// Worst-case descriptive attributes of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFeatures {
    /// Maximum difficulty across track segments.
    pub difficulty: u8,
    /// Union of all surface tags.
    pub surfaces: BTreeSet<SurfaceType>,
    /// Most conservative dry-tire recommendation.
    pub tire_dry: TireRating,
    /// Most conservative wet-tire recommendation.
    pub tire_wet: TireRating,
}

/// Aggregate worst-case features from the track segments in a route.
///
/// Returns `None` when the route contains no track segments; a route made
/// only of routing-service spans has no derivable surface/difficulty/tire
/// attributes. This is a defined state, not an error.
pub fn aggregate(items: &[&TrackCatalogItem]) -> Option<RouteFeatures> {
    let first = items.first()?;

    let mut features = RouteFeatures {
        difficulty: first.difficulty,
        surfaces: first.surfaces.clone(),
        tire_dry: first.tire_dry,
        tire_wet: first.tire_wet,
    };

    for item in &items[1..] {
        features.difficulty = features.difficulty.max(item.difficulty);
        features.surfaces.extend(item.surfaces.iter().copied());
        features.tire_dry = features.tire_dry.max(item.tire_dry);
        features.tire_wet = features.tire_wet.max(item.tire_wet);
    }

    Some(features)
}

/// Median difficulty across the track segments of a route, for the
/// save-time summary. Even counts average the two middle values.
///
/// # Example
/// ```
/// use route_planner::median_difficulty;
/// assert_eq!(median_difficulty(&[2, 4, 5]), Some(4.0));
/// assert_eq!(median_difficulty(&[2, 4]), Some(3.0));
/// assert_eq!(median_difficulty(&[]), None);
/// ```
pub fn median_difficulty(difficulties: &[u8]) -> Option<f64> {
    if difficulties.is_empty() {
        return None;
    }

    let mut sorted = difficulties.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid] as f64)
    } else {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    }
}
