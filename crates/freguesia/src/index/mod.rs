//! Point-containment indexing over polygon sets.
//!
//! One index type serves every polygon dataset in the system: parish sets per
//! region, statistical subsections per municipality, and the land-use and
//! fire-risk covers per parish. An R-tree over feature envelopes narrows each
//! query to a handful of candidates, and an exact point-in-polygon test picks
//! the enclosing feature. Exactness only; no nearest-match at this layer.

use geo::{BoundingRect, Contains};
use geo_types::{MultiPolygon, Point};
use rstar::{AABB, RTree, RTreeObject};
use tracing::trace;

/// One indexed polygon feature with its payload.
#[derive(Debug, Clone)]
pub struct IndexedFeature<P> {
    envelope: AABB<[f64; 2]>,
    geometry: MultiPolygon<f64>,
    payload: P,
}

impl<P> IndexedFeature<P> {
    #[must_use]
    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    #[must_use]
    pub fn payload(&self) -> &P {
        &self.payload
    }
}

impl<P> RTreeObject for IndexedFeature<P> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Read-only containment index, built once and queried concurrently.
#[derive(Debug)]
pub struct SpatialIndex<P> {
    tree: RTree<IndexedFeature<P>>,
}

impl<P> SpatialIndex<P> {
    /// Build the index from polygon/payload pairs. Features with an empty
    /// geometry (no bounding rectangle) are dropped.
    pub fn build(features: impl IntoIterator<Item = (MultiPolygon<f64>, P)>) -> Self {
        let objects = features
            .into_iter()
            .filter_map(|(geometry, payload)| {
                let rect = geometry.bounding_rect()?;
                Some(IndexedFeature {
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    geometry,
                    payload,
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(objects),
        }
    }

    /// The single feature whose polygon contains `point`, or none.
    ///
    /// Envelope candidates come from the R-tree; the exact containment test
    /// decides. Disjoint inputs admit at most one enclosing feature, so the
    /// first exact hit wins.
    pub fn locate(&self, point: Point<f64>) -> Option<&IndexedFeature<P>> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let hit = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .find(|feature| feature.geometry.contains(&point));
        trace!(x = point.x(), y = point.y(), hit = hit.is_some(), "containment query");
        hit
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use geo_types::{LineString, Polygon, point};

    use super::*;

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
            vec![],
        )])
    }

    #[test]
    fn locates_enclosing_feature() {
        let index = SpatialIndex::build(vec![
            (square(0.0, 0.0, 10.0, 10.0), "a"),
            (square(20.0, 0.0, 30.0, 10.0), "b"),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.locate(point!(x: 5.0, y: 5.0)).map(|f| *f.payload()), Some("a"));
        assert_eq!(index.locate(point!(x: 25.0, y: 5.0)).map(|f| *f.payload()), Some("b"));
    }

    #[test]
    fn misses_outside_every_polygon() {
        let index = SpatialIndex::build(vec![(square(0.0, 0.0, 10.0, 10.0), ())]);
        assert!(index.locate(point!(x: 15.0, y: 5.0)).is_none());
    }

    #[test]
    fn envelope_hit_polygon_miss() {
        // A point inside the bounding box but outside the triangle itself.
        let triangle = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        )]);
        let index = SpatialIndex::build(vec![(triangle, ())]);
        assert!(index.locate(point!(x: 9.0, y: 9.0)).is_none());
        assert!(index.locate(point!(x: 1.0, y: 1.0)).is_some());
    }

    #[test]
    fn hole_excludes_containment() {
        let holed = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![LineString::from(vec![
                (4.0, 4.0),
                (6.0, 4.0),
                (6.0, 6.0),
                (4.0, 6.0),
                (4.0, 4.0),
            ])],
        )]);
        let index = SpatialIndex::build(vec![(holed, ())]);
        assert!(index.locate(point!(x: 5.0, y: 5.0)).is_none());
        assert!(index.locate(point!(x: 2.0, y: 2.0)).is_some());
    }

    #[test]
    fn empty_geometry_is_dropped() {
        let empty = MultiPolygon::<f64>(vec![]);
        let index = SpatialIndex::build(vec![(empty, ())]);
        assert!(index.is_empty());
    }
}
