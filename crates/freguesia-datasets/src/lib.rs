//! Dataset layer for the `freguesia` resolver.
//!
//! This crate reads the pre-built, file-partitioned artifacts the resolver
//! consumes: per-region parish polygon sets with their CRS definitions,
//! per-municipality statistical subsections, per-subsection address lists,
//! per-parish land-use and fire-risk polygon sets, and the sampled elevation
//! points. It also owns the CRS math (the WGS84 → native forward transform)
//! and a fixture generator that writes a complete miniature dataset tree for
//! tests.
//!
//! Building these artifacts from the government source files is a separate
//! batch concern and deliberately not part of this crate.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use tracing::warn;

pub mod crs;
mod error;
pub mod store;
pub mod test_data;

pub use error::{DataError, Result};
pub use store::{
    AddressRecord, DatasetStore, ElevationSample, FireRiskFeature, LandUseFeature, ParishFeature,
    ParishProperties, RegionData, SubsectionFeature, SubsectionProperties,
};

static TEST_DATA_DIR: Lazy<tempfile::TempDir> = Lazy::new(|| {
    tempfile::TempDir::new().expect("Failed to create global temporary test data directory")
});

pub const DATA_DIR_DEFAULT: &str = "./freguesia_data";

/// Centralized function to determine if we should use test data.
#[must_use]
pub fn should_use_test_data() -> bool {
    let is_test_environment = cfg!(test) || cfg!(doctest);

    let explicit_test_data = std::env::var("USE_TEST_DATA")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    is_test_environment || explicit_test_data
}

/// The ambient dataset root: a throwaway temp directory under test, otherwise
/// the `FREGUESIA_DATA_DIR` env var or the default relative path.
#[must_use]
pub fn data_dir() -> PathBuf {
    if should_use_test_data() {
        let temp_dir = TEST_DATA_DIR.path().to_path_buf();
        warn!(temp_dir = ?temp_dir, "Using temporary data directory for tests");
        temp_dir
    } else {
        let dir =
            std::env::var("FREGUESIA_DATA_DIR").unwrap_or_else(|_| DATA_DIR_DEFAULT.to_string());
        PathBuf::from(dir)
    }
}
