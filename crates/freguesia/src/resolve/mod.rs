//! The hierarchy resolver: direct containment lookup, the bounded geodesic
//! probe fallback, and the typed resolution result.
//!
//! The state machine is `DIRECT_LOOKUP → PROBE_LOOKUP → NOT_FOUND`. Direct
//! lookup walks the regions in registry order and stops at the first
//! enclosing parish. Only when that fails is a small fixed ring of probe
//! points tried, in bearing order, each through the same per-region lookup;
//! a probe hit additionally carries the signed distance from the original
//! point to the matched parish boundary, signalling an approximate match
//! (coastline or frontier digitization gap). Nine failed candidates are
//! terminal.

mod distance;
mod probe;

use serde::Serialize;
use tracing::{debug, instrument};

pub use distance::signed_distance;
pub use probe::{
    EARTH_RADIUS_M, PROBE_BEARINGS_DEG, PROBE_RADIUS_M, geodesic_destination,
    haversine_distance_m, probe_ring,
};

use crate::code::CompositeCode;
use crate::error::{FreguesiaError, Result};
use crate::region::{RegionMatch, RegionRegistry};

/// The outcome of hierarchy resolution. Constructed fresh per request and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    /// Region the match came from (e.g. `continente`).
    pub region: String,
    pub district: String,
    pub municipality: String,
    pub parish: String,
    /// Island name, set for the archipelago regions only.
    pub island: Option<String>,
    /// The 6-digit parish code, absent when the source `Dicofre` was
    /// malformed (which also short-circuits the code-keyed cascade
    /// branches).
    pub code: Option<CompositeCode>,
    /// Signed distance in metres from the query point to the matched parish
    /// boundary. Present only when the match came from a probe; positive
    /// means the original point was outside the boundary.
    pub boundary_distance_m: Option<f64>,
}

impl ResolutionResult {
    fn from_match(hit: RegionMatch<'_>, boundary_distance_m: Option<f64>) -> Self {
        let properties = hit.parish.payload();
        Self {
            region: hit.region.name().to_owned(),
            district: properties.district.clone(),
            municipality: properties.municipality.clone(),
            parish: properties.parish.clone(),
            island: properties.island.clone(),
            code: CompositeCode::parish(&properties.dicofre),
            boundary_distance_m,
        }
    }

    /// Whether the match came straight from containment, without a probe.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.boundary_distance_m.is_none()
    }
}

/// Reject non-finite or out-of-range input before any lookup.
pub(crate) fn validate_coordinate(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(FreguesiaError::InvalidCoordinate(format!(
            "latitude {lat} is not a value in [-90, 90]"
        )));
    }
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(FreguesiaError::InvalidCoordinate(format!(
            "longitude {lon} is not a value in [-180, 180]"
        )));
    }
    Ok(())
}

/// Run the resolution state machine for one WGS84 coordinate.
#[instrument(name = "Resolve hierarchy", level = "debug", skip(registry))]
pub(crate) fn resolve_hierarchy(
    registry: &RegionRegistry,
    lat: f64,
    lon: f64,
    probe_radius_m: f64,
    probe_bearings: &[f64],
) -> Result<ResolutionResult> {
    validate_coordinate(lat, lon)?;

    if let Some(hit) = registry.locate(lat, lon) {
        debug!(parish = %hit.parish.payload().parish, "direct lookup matched");
        return Ok(ResolutionResult::from_match(hit, None));
    }

    debug!(
        radius_m = probe_radius_m,
        bearings = probe_bearings.len(),
        "direct lookup failed, entering probe lookup"
    );
    for (bearing, (probe_lat, probe_lon)) in probe_bearings
        .iter()
        .zip(probe_ring(lat, lon, probe_radius_m, probe_bearings))
    {
        let Some(hit) = registry.locate(probe_lat, probe_lon) else {
            continue;
        };
        // Distance is measured from the original point, in the matched
        // region's plane, to tell the caller how far off the boundary the
        // query actually was.
        let origin = hit.region.project(lat, lon);
        let boundary_distance_m = signed_distance(origin, hit.parish.geometry());
        debug!(
            bearing,
            parish = %hit.parish.payload().parish,
            boundary_distance_m,
            "probe lookup matched"
        );
        return Ok(ResolutionResult::from_match(hit, Some(boundary_distance_m)));
    }

    debug!("all candidate points failed containment");
    Err(FreguesiaError::NotResolvable { lat, lon })
}
