//! Spatial index for fast district lookups.

use geo::{BoundingRect, MultiPolygon};
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;
use tracing::info;

use super::ring::multipolygon_contains;
use super::GeometryStore;
use crate::models::GeoPoint;

/// Wrapper for R-tree indexing of district boundaries
#[derive(Clone)]
pub struct IndexedDistrict {
    pub name: Arc<str>,
    pub geometry: Arc<MultiPolygon<f64>>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedDistrict {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedDistrict {
    pub fn new(name: &str, geometry: Arc<MultiPolygon<f64>>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            name: Arc::from(name),
            geometry,
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        })
    }
}

/// Point → district lookup over a `GeometryStore`
pub struct DistrictIndex {
    tree: RTree<IndexedDistrict>,
}

impl DistrictIndex {
    pub fn build(store: &GeometryStore) -> Self {
        let indexed: Vec<IndexedDistrict> = store
            .iter()
            .filter_map(|(name, geometry)| IndexedDistrict::new(name, Arc::clone(geometry)))
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("District index built with {} entries", tree.size());
        Self { tree }
    }

    /// Name of the district containing a point, if any
    pub fn lookup(&self, point: GeoPoint) -> Option<&str> {
        let query_envelope = AABB::from_point([point.lon, point.lat]);

        // Envelope candidates first, then exact containment
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .find(|d| multipolygon_contains(&d.geometry, point.to_coord()))
            .map(|d| d.name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
