//! Core coordinate resolution functionality.
//!
//! This module provides the main [`CoordinateResolver`] interface for mapping
//! WGS84 coordinates onto the Portuguese administrative hierarchy. It combines
//! per-region spatial indexes with a concurrent auxiliary enrichment cascade.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use freguesia::{CoordinateResolver, ResolveOptions};
//!
//! # async fn demo() -> Result<(), freguesia::error::FreguesiaError> {
//! let resolver = CoordinateResolver::open_default()?;
//!
//! // Hierarchy only, synchronous
//! let hit = resolver.resolve_hierarchy(40.1053, -8.4906)?;
//! println!("{} / {} / {}", hit.district, hit.municipality, hit.parish);
//!
//! // Full resolution with auxiliary enrichment
//! let located = resolver.resolve(40.1053, -8.4906, &ResolveOptions::default()).await?;
//! if let Some(altitude) = located.auxiliary.altitude_m {
//!     println!("altitude: {altitude} m");
//! }
//! # Ok(())
//! # }
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use freguesia_datasets::DatasetStore;
use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    cascade::{self, AuxiliaryRecord, ReverseGeocoder},
    config::ResolveOptions,
    error::Result,
    region::RegionRegistry,
    resolve::{self, ResolutionResult},
};

const EXTERNAL_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// A fully resolved coordinate: administrative hierarchy plus whichever
/// auxiliary attributes could be derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub resolution: ResolutionResult,
    pub auxiliary: AuxiliaryRecord,
}

/// The main resolver that maps coordinates onto administrative areas.
///
/// This struct loads every region dataset up front, builds one R-tree per
/// region, and keeps a [`DatasetStore`] handle for the auxiliary datasets
/// that are read lazily per query.
///
/// # Examples
///
/// ```rust,no_run
/// use freguesia::CoordinateResolver;
///
/// let resolver = CoordinateResolver::open_default()?;
/// let hit = resolver.resolve_hierarchy(38.7369, -9.1427)?;
/// println!("parish: {}", hit.parish);
/// # Ok::<(), freguesia::error::FreguesiaError>(())
/// ```
#[derive(Clone)]
pub struct CoordinateResolver {
    registry: Arc<RegionRegistry>,
    store: DatasetStore,
    http: reqwest::Client,
}

impl CoordinateResolver {
    /// Create a resolver from an opened dataset store.
    ///
    /// Loads every region under `regions/` and builds the spatial indexes.
    /// Fails when the store holds no region datasets.
    #[instrument(name = "Initialize CoordinateResolver", level = "info", skip(store))]
    pub fn new(store: DatasetStore) -> Result<Self> {
        let registry = RegionRegistry::from_store(&store)?;
        let http = reqwest::Client::builder()
            .connect_timeout(EXTERNAL_CONNECT_TIMEOUT)
            .build()?;
        info!(
            regions = registry.len(),
            parishes = registry.parish_count(),
            "coordinate resolver ready"
        );
        Ok(Self {
            registry: Arc::new(registry),
            store,
            http,
        })
    }

    /// Create a resolver over the default dataset directory.
    ///
    /// Honors the `FREGUESIA_DATA_DIR` environment variable.
    pub fn open_default() -> Result<Self> {
        Self::new(DatasetStore::open_default())
    }

    /// Start building a resolver with custom configuration.
    #[must_use]
    pub fn builder() -> CoordinateResolverBuilder {
        CoordinateResolverBuilder::new()
    }

    /// Get information about the resolver's loaded datasets.
    pub fn info(&self) -> ResolverInfo {
        ResolverInfo {
            dataset_root: self.store.root().to_path_buf(),
            regions: self
                .registry
                .iter()
                .map(|region| RegionInfo {
                    name: region.name().to_string(),
                    parishes: region.parish_count(),
                    metric: region.is_metric(),
                })
                .collect(),
        }
    }

    /// The region registry backing this resolver.
    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// The dataset store backing this resolver.
    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Resolve the administrative hierarchy for one coordinate.
    ///
    /// Runs the direct containment lookup first and falls back to the
    /// probe ring when the point sits just outside every polygon. Returns
    /// [`FreguesiaError::NotResolvable`](crate::error::FreguesiaError::NotResolvable)
    /// when no parish is within reach.
    pub fn resolve_hierarchy(&self, lat: f64, lon: f64) -> Result<ResolutionResult> {
        self.resolve_hierarchy_with(lat, lon, &ResolveOptions::default())
    }

    /// Resolve the hierarchy with custom probe tuning.
    pub fn resolve_hierarchy_with(
        &self,
        lat: f64,
        lon: f64,
        options: &ResolveOptions,
    ) -> Result<ResolutionResult> {
        resolve::resolve_hierarchy(
            &self.registry,
            lat,
            lon,
            options.probe_radius_m,
            &options.probe_bearings,
        )
    }

    /// Resolve one coordinate fully: hierarchy plus the auxiliary cascade.
    ///
    /// The hierarchy is mandatory and its failure fails the whole call.
    /// Every auxiliary branch degrades to `None` on its own, so a missing
    /// dataset never loses the administrative result.
    #[instrument(name = "Resolve coordinate", level = "debug", skip(self, options))]
    pub async fn resolve(
        &self,
        lat: f64,
        lon: f64,
        options: &ResolveOptions,
    ) -> Result<ResolvedLocation> {
        let resolution = self.resolve_hierarchy_with(lat, lon, options)?;

        if !options.include_details {
            return Ok(ResolvedLocation {
                resolution,
                auxiliary: AuxiliaryRecord::default(),
            });
        }

        let geocoder = if options.use_external_services {
            options.geocoder_url.as_ref().map(|url| {
                ReverseGeocoder::new(self.http.clone(), url.clone(), options.external_timeout)
            })
        } else {
            None
        };

        let auxiliary = cascade::aggregate(
            &self.store,
            geocoder.as_ref(),
            resolution.code.as_ref(),
            lat,
            lon,
            options,
        )
        .await;

        Ok(ResolvedLocation {
            resolution,
            auxiliary,
        })
    }
}

/// Information about one loaded region.
#[derive(Debug, Clone)]
pub struct RegionInfo {
    pub name: String,
    pub parishes: usize,
    pub metric: bool,
}

/// Information about a `CoordinateResolver`'s loaded datasets.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    pub dataset_root: PathBuf,
    pub regions: Vec<RegionInfo>,
}

impl ResolverInfo {
    /// Get a human-readable summary of the resolver.
    pub fn summary(&self) -> String {
        format!(
            "CoordinateResolver over {} with {} regions and {} parishes",
            self.dataset_root.display(),
            self.regions.len(),
            self.total_parishes()
        )
    }

    /// Get the total number of indexed parishes across all regions.
    pub fn total_parishes(&self) -> usize {
        self.regions.iter().map(|region| region.parishes).sum()
    }
}

// === Builder Pattern (Optional) ===

/// Builder for creating `CoordinateResolver` with custom configuration.
#[derive(Debug, Clone)]
pub struct CoordinateResolverBuilder {
    dataset_root: Option<PathBuf>,
}

impl CoordinateResolverBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self { dataset_root: None }
    }

    /// Set the dataset root directory.
    #[must_use]
    pub fn dataset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.dataset_root = Some(root.into());
        self
    }

    /// Build the `CoordinateResolver`.
    pub fn build(self) -> Result<CoordinateResolver> {
        let store = match self.dataset_root {
            Some(root) => DatasetStore::new(root),
            None => DatasetStore::open_default(),
        };
        CoordinateResolver::new(store)
    }
}

impl Default for CoordinateResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use freguesia_datasets::test_data::{
        self, ANOBRA_CENTER, ANOBRA_DICOFRE, OPEN_SEA, TestDataConfig,
    };

    use super::*;

    #[test]
    fn test_resolver_creation_from_fixture() {
        let dir = test_data::write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let resolver = CoordinateResolver::builder()
            .dataset_root(dir.path())
            .build()
            .unwrap();

        let info = resolver.info();
        assert_eq!(info.regions.len(), 2);
        assert!(info.summary().contains("2 regions"));
        assert_eq!(info.total_parishes(), 4);
    }

    #[test]
    fn test_resolver_fails_without_regions() {
        let dir = tempfile::tempdir().unwrap();
        let result = CoordinateResolver::builder()
            .dataset_root(dir.path())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_hierarchy_resolution() {
        let dir = test_data::write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let resolver = CoordinateResolver::builder()
            .dataset_root(dir.path())
            .build()
            .unwrap();

        let (lat, lon) = ANOBRA_CENTER;
        let hit = resolver.resolve_hierarchy(lat, lon).unwrap();
        assert_eq!(hit.parish, "Anobra");
        assert_eq!(hit.code.as_ref().unwrap().as_str(), ANOBRA_DICOFRE);
    }

    #[tokio::test]
    async fn test_resolve_without_details_skips_cascade() {
        let dir = test_data::write_fixture_tree(&TestDataConfig::sample()).unwrap();
        let resolver = CoordinateResolver::builder()
            .dataset_root(dir.path())
            .build()
            .unwrap();

        let options = ResolveOptions::builder().include_details(false).build();
        let (lat, lon) = ANOBRA_CENTER;
        let located = resolver.resolve(lat, lon, &options).await.unwrap();

        assert_eq!(located.resolution.parish, "Anobra");
        assert_eq!(located.auxiliary, AuxiliaryRecord::default());
    }

    #[tokio::test]
    async fn test_resolve_open_sea_is_not_resolvable() {
        let dir = test_data::write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let resolver = CoordinateResolver::builder()
            .dataset_root(dir.path())
            .build()
            .unwrap();

        let (lat, lon) = OPEN_SEA;
        let err = resolver
            .resolve(lat, lon, &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_resolvable());
    }
}
