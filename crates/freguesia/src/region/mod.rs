//! The region registry: every administrative territory with its native CRS
//! and its parish containment index, loaded once at startup and read-only
//! afterwards.
//!
//! Each region is digitized in its own projected grid, so a query point must
//! be pushed through the region's forward transform before any containment
//! test. Regions are kept in a fixed, stable order (mainland first, island
//! groups after); the registry walks them in that order and stops at the
//! first enclosing parish.

use ahash::AHashMap;
use freguesia_datasets::crs::CrsDefinition;
use freguesia_datasets::{DatasetStore, ParishProperties, RegionData};
use geo_types::Point;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::index::{IndexedFeature, SpatialIndex};

/// One administrative territory: name, native CRS, parish index.
#[derive(Debug)]
pub struct Region {
    name: String,
    crs_definition: String,
    crs: CrsDefinition,
    index: SpatialIndex<ParishProperties>,
}

impl Region {
    fn from_data(data: RegionData) -> Self {
        let index = SpatialIndex::build(
            data.parishes
                .into_iter()
                .map(|parish| (parish.geometry, parish.properties)),
        );
        Self {
            name: data.name,
            crs_definition: data.crs_definition,
            crs: data.crs,
            index,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn crs_definition(&self) -> &str {
        &self.crs_definition
    }

    /// Whether planar units in this region's grid are metres.
    #[must_use]
    pub fn is_metric(&self) -> bool {
        self.crs.is_metric()
    }

    #[must_use]
    pub fn parish_count(&self) -> usize {
        self.index.len()
    }

    /// WGS84 (lat, lon) degrees into this region's native plane.
    #[must_use]
    pub fn project(&self, lat: f64, lon: f64) -> Point<f64> {
        let (x, y) = self.crs.forward(lon, lat);
        Point::new(x, y)
    }

    /// The parish containing the given WGS84 point, if any.
    #[must_use]
    pub fn locate(&self, lat: f64, lon: f64) -> Option<&IndexedFeature<ParishProperties>> {
        self.index.locate(self.project(lat, lon))
    }
}

/// A direct containment hit: the region and the enclosing parish feature.
#[derive(Debug, Clone, Copy)]
pub struct RegionMatch<'a> {
    pub region: &'a Region,
    pub parish: &'a IndexedFeature<ParishProperties>,
}

/// All regions in fixed resolution order.
#[derive(Debug)]
pub struct RegionRegistry {
    regions: Vec<Region>,
    by_name: AHashMap<String, usize>,
}

impl RegionRegistry {
    /// Load every region artifact from the store and build its index.
    #[instrument(name = "Build region registry", level = "info", skip(store))]
    pub fn from_store(store: &DatasetStore) -> Result<Self> {
        let regions: Vec<Region> = store
            .load_regions()?
            .into_iter()
            .map(Region::from_data)
            .collect();
        for region in &regions {
            debug!(
                region = region.name(),
                parishes = region.parish_count(),
                metric = region.is_metric(),
                "region indexed"
            );
        }
        let by_name = regions
            .iter()
            .enumerate()
            .map(|(i, region)| (region.name().to_string(), i))
            .collect();
        Ok(Self { regions, by_name })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    /// Look a region up by its dataset name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Region> {
        self.by_name.get(name).map(|&i| &self.regions[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[must_use]
    pub fn parish_count(&self) -> usize {
        self.regions.iter().map(Region::parish_count).sum()
    }

    /// Direct lookup: first region whose parish set contains the point.
    #[must_use]
    pub fn locate(&self, lat: f64, lon: f64) -> Option<RegionMatch<'_>> {
        self.regions.iter().find_map(|region| {
            region
                .locate(lat, lon)
                .map(|parish| RegionMatch { region, parish })
        })
    }
}
