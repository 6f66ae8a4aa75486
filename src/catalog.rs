//! Track catalog with spatial indexing and filtered queries.
//!
//! The catalog holds the recorded tracks available for import: metadata for
//! browsing plus the recorded point samples used when a track is inserted
//! into the route. An R-tree over item bounds answers "which tracks are in
//! this viewport", and combines with [`TrackFilter`] to produce the
//! candidate list a map UI shows.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::filter::TrackFilter;
use crate::{Bounds, TrackCatalogItem, TrackData, TrackId};

/// Bounds wrapper for R-tree spatial indexing.
#[derive(Debug, Clone)]
struct TrackBounds {
    track_id: TrackId,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

impl RTreeObject for TrackBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// In-memory store of candidate recorded tracks.
#[derive(Debug, Default)]
pub struct TrackCatalog {
    tracks: HashMap<TrackId, TrackData>,
    spatial_index: RTree<TrackBounds>,
    spatial_dirty: bool,
}

impl TrackCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a track. The spatial index is rebuilt lazily on
    /// the next viewport query.
    pub fn insert(&mut self, track: TrackData) {
        self.tracks.insert(track.item.id, track);
        self.spatial_dirty = true;
    }

    /// Remove a track. Returns the removed data, if present.
    pub fn remove(&mut self, track_id: TrackId) -> Option<TrackData> {
        let removed = self.tracks.remove(&track_id);
        if removed.is_some() {
            self.spatial_dirty = true;
        }
        removed
    }

    /// Get a track with its recorded points.
    pub fn get(&self, track_id: TrackId) -> Option<&TrackData> {
        self.tracks.get(&track_id)
    }

    /// Get a track's catalog metadata.
    pub fn item(&self, track_id: TrackId) -> Option<&TrackCatalogItem> {
        self.tracks.get(&track_id).map(|t| &t.item)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// All track ids currently in the catalog.
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.keys().copied().collect()
    }

    fn ensure_spatial_index(&mut self) {
        if !self.spatial_dirty {
            return;
        }

        let bounds: Vec<TrackBounds> = self
            .tracks
            .values()
            .map(|t| TrackBounds {
                track_id: t.item.id,
                min_lat: t.item.bounds.min_lat,
                max_lat: t.item.bounds.max_lat,
                min_lng: t.item.bounds.min_lng,
                max_lng: t.item.bounds.max_lng,
            })
            .collect();

        self.spatial_index = RTree::bulk_load(bounds);
        self.spatial_dirty = false;
    }

    /// Track ids whose bounds intersect the viewport.
    pub fn in_viewport(&mut self, viewport: &Bounds) -> Vec<TrackId> {
        self.ensure_spatial_index();

        let search = AABB::from_corners(
            [viewport.min_lng, viewport.min_lat],
            [viewport.max_lng, viewport.max_lat],
        );

        self.spatial_index
            .locate_in_envelope_intersecting(&search)
            .map(|b| b.track_id)
            .collect()
    }

    /// All catalog items passing the filter.
    pub fn matching(&self, filter: &TrackFilter) -> Vec<&TrackCatalogItem> {
        self.tracks
            .values()
            .map(|t| &t.item)
            .filter(|item| filter.passes(item))
            .collect()
    }

    /// Track ids passing the filter, evaluated in parallel. Worth it for
    /// catalogs with thousands of entries.
    #[cfg(feature = "parallel")]
    pub fn matching_par(&self, filter: &TrackFilter) -> Vec<TrackId> {
        self.tracks
            .par_iter()
            .filter(|(_, t)| filter.passes(&t.item))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Track ids in the viewport that also pass the filter: the candidate
    /// list shown while browsing the map.
    pub fn matching_in_viewport(&mut self, viewport: &Bounds, filter: &TrackFilter) -> Vec<TrackId> {
        self.in_viewport(viewport)
            .into_iter()
            .filter(|id| {
                self.tracks
                    .get(id)
                    .map(|t| filter.passes(&t.item))
                    .unwrap_or(false)
            })
            .collect()
    }
}
