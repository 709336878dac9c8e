//! Freguesia - Coordinate to Administrative Hierarchy Resolution
//!
//! Freguesia maps WGS84 coordinates onto the Portuguese administrative
//! hierarchy (district, municipality, parish) using official boundary
//! datasets, and enriches each hit with census subsection, nearest address,
//! land use class, fire risk and altitude where those datasets are present.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use freguesia::{CoordinateResolver, ResolveOptions};
//!
//! # async fn demo() -> Result<(), freguesia::error::FreguesiaError> {
//! let resolver = CoordinateResolver::open_default()?;
//!
//! // Administrative hierarchy only
//! let hit = resolver.resolve_hierarchy(40.1053, -8.4906)?;
//! println!("{} > {} > {}", hit.district, hit.municipality, hit.parish);
//!
//! // Full resolution with the auxiliary cascade
//! let located = resolver
//!     .resolve(40.1053, -8.4906, &ResolveOptions::default())
//!     .await?;
//! if let Some(land_use) = &located.auxiliary.land_use {
//!     println!("land use: {}", land_use.label);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Multi-region lookup**: Mainland and island regions each carry their
//!   own projected CRS and spatial index
//! - **Probe fallback**: Coordinates just outside every boundary (beaches,
//!   estuaries, GPS noise) snap to the nearest parish within 100 m
//! - **Signed boundary distance**: Probe hits report how far outside the
//!   matched parish the original point sits
//! - **Partial-failure tolerance**: Every auxiliary dataset degrades to
//!   `None` on its own without losing the administrative result
//! - **Offline by default**: The external reverse geocoder is opt-in and
//!   never consulted unless enabled
//!
//! # Data
//!
//! Datasets are read from `./freguesia_data` or the directory named by the
//! `FREGUESIA_DATA_DIR` environment variable. See [`freguesia_datasets`]
//! for the expected layout.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod cascade;
mod code;
mod config;
mod core;
pub mod error;
mod index;
mod region;
mod resolve;

pub use self::core::{
    CoordinateResolver, CoordinateResolverBuilder, RegionInfo, ResolvedLocation, ResolverInfo,
};

pub use cascade::{
    AddressInfo, AddressSource, AuxiliaryRecord, FireRiskInfo, LandUseInfo, SubsectionInfo,
};
pub use code::CompositeCode;
pub use config::{ResolveOptions, ResolveOptionsBuilder};
pub use error::FreguesiaError;
// Re-export the dataset subcrate
pub use freguesia_datasets as datasets;
pub use freguesia_datasets::DatasetStore;
pub use index::{IndexedFeature, SpatialIndex};
pub use region::{Region, RegionMatch, RegionRegistry};
pub use resolve::{ResolutionResult, haversine_distance_m, probe_ring, signed_distance};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for the Freguesia library.
///
/// This sets up structured logging with configurable levels and filtering.
/// Call this once at the start of your application to enable detailed
/// logging output from Freguesia operations.
///
/// # Arguments
///
/// * `level` - The minimum log level to display
///
/// # Examples
///
/// ```rust
/// use freguesia::init_logging;
/// use tracing::Level;
///
/// // Initialize with info-level logging
/// init_logging(Level::INFO)?;
/// # Ok::<(), freguesia::error::FreguesiaError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::FreguesiaError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("hyper_util=warn".parse().unwrap());

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
