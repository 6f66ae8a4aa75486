//! Catalog item filtering.
//!
//! A filter combines a difficulty range with three allow-sets (surface
//! types, dry-tire ratings, wet-tire ratings). All conditions are
//! conjunctive; an empty allow-set means "no constraint on this dimension",
//! not "nothing passes".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::TrackCatalogItem;

/// Lowest difficulty level a track can carry.
pub const MIN_DIFFICULTY: u8 = 1;
/// Highest difficulty level a track can carry.
pub const MAX_DIFFICULTY: u8 = 5;

/// Surface tags a recorded track can be labeled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurfaceType {
    Asphalt,
    Cobblestone,
    Gravel,
    ForestRoad,
    Singletrail,
    Sand,
}

/// Tire recommendation, ordered by conservativeness.
///
/// The derived `Ord` is the conservativeness ordering: `Slick < SemiSlick <
/// Knobs`. Picking the maximum across segments yields the safest
/// recommendation for the whole route.
///
/// # Example
/// ```
/// use route_planner::TireRating;
/// assert!(TireRating::Slick < TireRating::SemiSlick);
/// assert!(TireRating::SemiSlick < TireRating::Knobs);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TireRating {
    Slick,
    SemiSlick,
    Knobs,
}

/// User-selected constraints for browsing the track catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFilter {
    pub difficulty_min: u8,
    pub difficulty_max: u8,
    /// Allowed surface tags; a track passes if it has at least one of them.
    /// Empty = unconstrained.
    pub surfaces: BTreeSet<SurfaceType>,
    /// Allowed dry-tire ratings. Empty = unconstrained.
    pub tire_dry: BTreeSet<TireRating>,
    /// Allowed wet-tire ratings. Empty = unconstrained.
    pub tire_wet: BTreeSet<TireRating>,
}

impl Default for TrackFilter {
    fn default() -> Self {
        Self {
            difficulty_min: MIN_DIFFICULTY,
            difficulty_max: MAX_DIFFICULTY,
            surfaces: BTreeSet::new(),
            tire_dry: BTreeSet::new(),
            tire_wet: BTreeSet::new(),
        }
    }
}

impl TrackFilter {
    /// Whether a catalog item satisfies every dimension of this filter.
    pub fn passes(&self, item: &TrackCatalogItem) -> bool {
        if item.difficulty < self.difficulty_min || item.difficulty > self.difficulty_max {
            return false;
        }
        if !self.surfaces.is_empty() && self.surfaces.is_disjoint(&item.surfaces) {
            return false;
        }
        if !self.tire_dry.is_empty() && !self.tire_dry.contains(&item.tire_dry) {
            return false;
        }
        if !self.tire_wet.is_empty() && !self.tire_wet.contains(&item.tire_wet) {
            return false;
        }
        true
    }
}
