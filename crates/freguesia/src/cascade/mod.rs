//! The auxiliary cascade: concurrent, partial-failure-tolerant lookups into
//! the per-unit side datasets, keyed by the composite code.
//!
//! Branches run as one joined task group. The nearest-address branch is
//! chained behind the subsection branch because the address files are
//! partitioned by the subsection code it derives; everything else is fully
//! independent. A branch's missing file, missing match or unexpected error
//! is logged and flattened into an absent field; the cascade itself never
//! fails a request.

mod external;

use freguesia_datasets::{DatasetStore, ElevationSample};
use geo_types::point;
use serde::Serialize;
use tokio::task::JoinError;
use tracing::{debug, instrument, warn};

pub(crate) use external::ReverseGeocoder;

use crate::code::CompositeCode;
use crate::config::ResolveOptions;
use crate::index::SpatialIndex;
use crate::resolve::haversine_distance_m;

/// Radius within which an elevation sample is taken as-is instead of
/// interpolated.
const ELEVATION_EXACT_M: f64 = 15.0;

/// The merged auxiliary data for one resolved location. Every field is
/// independently absent without invalidating the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuxiliaryRecord {
    pub subsection: Option<SubsectionInfo>,
    pub address: Option<AddressInfo>,
    pub land_use: Option<LandUseInfo>,
    pub fire_risk: Option<FireRiskInfo>,
    pub altitude_m: Option<f64>,
}

/// Statistical subsection match with the extended composite code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubsectionInfo {
    pub section: String,
    pub subsection: String,
    /// The 11-digit code (parish + section + subsection).
    pub code: CompositeCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddressSource {
    /// Matched against the local per-subsection address list.
    Local,
    /// Supplied by the external reverse-geocoding fallback.
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressInfo {
    pub street: String,
    pub house: String,
    pub postcode: String,
    /// Distance from the query point, known for local matches only.
    pub distance_m: Option<f64>,
    pub source: AddressSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LandUseInfo {
    /// Raw COS classification code, e.g. `5.1.1.1`.
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FireRiskInfo {
    /// Raw grid code, 0 = none … 5 = very high.
    pub grid_code: u8,
    pub severity: String,
}

/// Run every branch concurrently and merge the results.
#[instrument(name = "Auxiliary cascade", level = "debug", skip(store, geocoder, options))]
pub(crate) async fn aggregate(
    store: &DatasetStore,
    geocoder: Option<&ReverseGeocoder>,
    code: Option<&CompositeCode>,
    lat: f64,
    lon: f64,
    options: &ResolveOptions,
) -> AuxiliaryRecord {
    let ((subsection, address), land_use, fire_risk, altitude_m) = tokio::join!(
        subsection_then_address(store, geocoder, code, lat, lon, options),
        land_use_branch(store, code, lat, lon),
        fire_risk_branch(store, code, lat, lon),
        altitude_branch(store, lat, lon),
    );
    AuxiliaryRecord {
        subsection,
        address,
        land_use,
        fire_risk,
        altitude_m,
    }
}

/// Branch 1 (statistical subsection) chained into branch 2 (nearest
/// address): the address files are keyed by the code branch 1 derives.
async fn subsection_then_address(
    store: &DatasetStore,
    geocoder: Option<&ReverseGeocoder>,
    code: Option<&CompositeCode>,
    lat: f64,
    lon: f64,
    options: &ResolveOptions,
) -> (Option<SubsectionInfo>, Option<AddressInfo>) {
    let subsection = match code {
        Some(code) => subsection_branch(store, code, lat, lon).await,
        None => None,
    };
    let address = address_branch(store, geocoder, subsection.as_ref(), lat, lon, options).await;
    (subsection, address)
}

async fn subsection_branch(
    store: &DatasetStore,
    code: &CompositeCode,
    lat: f64,
    lon: f64,
) -> Option<SubsectionInfo> {
    let key = code.municipality_key().to_owned();
    let features = degrade(
        "subsection",
        load(store, move |store| store.subsections(&key)).await,
    )?;
    let index = SpatialIndex::build(
        features
            .into_iter()
            .map(|feature| (feature.geometry, feature.properties)),
    );
    let hit = index.locate(point!(x: lon, y: lat))?;
    let properties = hit.payload();
    let extended = code.with_subsection(&properties.section, &properties.subsection)?;
    Some(SubsectionInfo {
        section: properties.section.clone(),
        subsection: properties.subsection.clone(),
        code: extended,
    })
}

/// Branch 2: nearest local address within the snap threshold, with the
/// external reverse-geocoding fallback when enabled.
async fn address_branch(
    store: &DatasetStore,
    geocoder: Option<&ReverseGeocoder>,
    subsection: Option<&SubsectionInfo>,
    lat: f64,
    lon: f64,
    options: &ResolveOptions,
) -> Option<AddressInfo> {
    if let Some(subsection) = subsection {
        let key = subsection.code.as_str().to_owned();
        let records = degrade(
            "address",
            load(store, move |store| store.addresses(&key)).await,
        );
        if let Some(records) = records {
            let nearest = records
                .into_iter()
                .map(|record| {
                    let distance = haversine_distance_m(lat, lon, record.lat, record.lon);
                    (distance, record)
                })
                .min_by(|(a, _), (b, _)| a.total_cmp(b));
            if let Some((distance, record)) = nearest {
                if distance <= options.address_snap_m {
                    return Some(AddressInfo {
                        street: record.street,
                        house: record.house,
                        postcode: record.postcode,
                        distance_m: Some(distance),
                        source: AddressSource::Local,
                    });
                }
                debug!(distance_m = distance, "nearest address beyond snap threshold");
            }
        }
    }

    if options.use_external_services {
        if let Some(geocoder) = geocoder {
            let external = geocoder.reverse(lat, lon).await?;
            return Some(AddressInfo {
                street: external.street?,
                house: external.house.unwrap_or_default(),
                postcode: external.postcode.unwrap_or_default(),
                distance_m: None,
                source: AddressSource::External,
            });
        }
    }
    None
}

/// Branch 3: land-use classification for the enclosing cover polygon.
async fn land_use_branch(
    store: &DatasetStore,
    code: Option<&CompositeCode>,
    lat: f64,
    lon: f64,
) -> Option<LandUseInfo> {
    let key = code?.parish_key().to_owned();
    let features = degrade(
        "land use",
        load(store, move |store| store.land_use(&key)).await,
    )?;
    let index = SpatialIndex::build(
        features
            .into_iter()
            .map(|feature| (feature.geometry, feature.code)),
    );
    let hit = index.locate(point!(x: lon, y: lat))?;
    let code = hit.payload().clone();
    let label = cos_label(&code).to_owned();
    Some(LandUseInfo { code, label })
}

/// Branch 4: fire-risk grid cell for the point.
async fn fire_risk_branch(
    store: &DatasetStore,
    code: Option<&CompositeCode>,
    lat: f64,
    lon: f64,
) -> Option<FireRiskInfo> {
    let key = code?.parish_key().to_owned();
    let features = degrade(
        "fire risk",
        load(store, move |store| store.fire_risk(&key)).await,
    )?;
    let index = SpatialIndex::build(
        features
            .into_iter()
            .map(|feature| (feature.geometry, feature.grid_code)),
    );
    let hit = index.locate(point!(x: lon, y: lat))?;
    let grid_code = *hit.payload();
    Some(FireRiskInfo {
        grid_code,
        severity: fire_risk_severity(grid_code).to_owned(),
    })
}

/// Branch 5: altitude from the sampled elevation points. A sample close
/// enough is used directly; otherwise the three nearest samples are blended
/// with inverse-distance weights.
async fn altitude_branch(store: &DatasetStore, lat: f64, lon: f64) -> Option<f64> {
    let samples = degrade(
        "altitude",
        load(store, move |store| store.elevation_samples()).await,
    )?;
    interpolate_elevation(&samples, lat, lon)
}

fn interpolate_elevation(samples: &[ElevationSample], lat: f64, lon: f64) -> Option<f64> {
    let mut ranked: Vec<(f64, f64)> = samples
        .iter()
        .map(|sample| {
            (
                haversine_distance_m(lat, lon, sample.lat, sample.lon),
                sample.elevation_m,
            )
        })
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let &(nearest_distance, nearest_elevation) = ranked.first()?;
    if nearest_distance <= ELEVATION_EXACT_M {
        return Some(nearest_elevation);
    }

    let mut weight_sum = 0.0;
    let mut weighted = 0.0;
    for &(distance, elevation) in ranked.iter().take(3) {
        let weight = 1.0 / distance;
        weight_sum += weight;
        weighted += weight * elevation;
    }
    Some(weighted / weight_sum)
}

/// Top-level COS nomenclature labels, keyed by the leading class digit.
fn cos_label(code: &str) -> &'static str {
    match code.chars().next() {
        Some('1') => "Territórios artificializados",
        Some('2') => "Agricultura",
        Some('3') => "Pastagens",
        Some('4') => "Superfícies agroflorestais",
        Some('5') => "Florestas",
        Some('6') => "Matos",
        Some('7') => "Espaços descobertos ou com vegetação esparsa",
        Some('8') => "Zonas húmidas",
        Some('9') => "Massas de água",
        _ => "Desconhecido",
    }
}

fn fire_risk_severity(grid_code: u8) -> &'static str {
    match grid_code {
        0 => "None",
        1 => "Very low",
        2 => "Low",
        3 => "Medium",
        4 => "High",
        _ => "Very high",
    }
}

/// Run a blocking dataset read off the async workers.
async fn load<T, F>(store: &DatasetStore, read: F) -> freguesia_datasets::Result<T>
where
    T: Send + 'static,
    F: FnOnce(DatasetStore) -> freguesia_datasets::Result<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || read(store))
        .await
        .map_err(join_error_to_io)?
}

fn join_error_to_io(error: JoinError) -> freguesia_datasets::DataError {
    freguesia_datasets::DataError::Io(std::io::Error::other(error))
}

/// Flatten a branch's dataset errors into an absent field: a missing file is
/// expected partitioning sparsity, anything else is unexpected but still
/// non-fatal.
fn degrade<T>(branch: &'static str, result: freguesia_datasets::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) if error.is_missing() => {
            debug!(branch, "auxiliary dataset not present");
            None
        }
        Err(error) => {
            warn!(branch, %error, "auxiliary branch degraded");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use freguesia_datasets::test_data::{
        ANOBRA_CENTER, ANOBRA_DICOFRE, ANOBRA_SUBSECTION_CODE, TestDataConfig, write_fixture_tree,
    };

    use super::*;

    fn anobra_code() -> CompositeCode {
        CompositeCode::parish(ANOBRA_DICOFRE).unwrap()
    }

    #[tokio::test]
    async fn full_cascade_at_the_anchor_point() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let (lat, lon) = ANOBRA_CENTER;
        let code = anobra_code();

        let record = aggregate(
            &store,
            None,
            Some(&code),
            lat,
            lon,
            &ResolveOptions::default(),
        )
        .await;

        let subsection = record.subsection.unwrap();
        assert_eq!(subsection.section, "001");
        assert_eq!(subsection.subsection, "01");
        assert_eq!(subsection.code.as_str(), ANOBRA_SUBSECTION_CODE);

        let address = record.address.unwrap();
        assert_eq!(address.street, "Rua da Igreja");
        assert_eq!(address.source, AddressSource::Local);
        assert!(address.distance_m.unwrap() < 1.0);

        let land_use = record.land_use.unwrap();
        assert_eq!(land_use.code, "5.1.1.1");
        assert_eq!(land_use.label, "Florestas");

        let fire_risk = record.fire_risk.unwrap();
        assert_eq!(fire_risk.grid_code, 2);
        assert_eq!(fire_risk.severity, "Low");

        // A sample sits exactly at the anchor point.
        assert_eq!(record.altitude_m, Some(130.0));
    }

    #[tokio::test]
    async fn missing_datasets_degrade_to_absent_fields() {
        let fixture = write_fixture_tree(&TestDataConfig::without_auxiliaries()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let (lat, lon) = ANOBRA_CENTER;
        let code = anobra_code();

        let record = aggregate(
            &store,
            None,
            Some(&code),
            lat,
            lon,
            &ResolveOptions::default(),
        )
        .await;
        assert_eq!(record, AuxiliaryRecord::default());
    }

    #[tokio::test]
    async fn no_code_skips_code_keyed_branches_only() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let (lat, lon) = ANOBRA_CENTER;

        let record = aggregate(&store, None, None, lat, lon, &ResolveOptions::default()).await;
        assert!(record.subsection.is_none());
        assert!(record.address.is_none());
        assert!(record.land_use.is_none());
        assert!(record.fire_risk.is_none());
        // Altitude is keyed by the point alone.
        assert_eq!(record.altitude_m, Some(130.0));
    }

    #[tokio::test]
    async fn addresses_beyond_the_snap_threshold_are_rejected() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        // Inside Anobra's western subsection but a few hundred metres from
        // every fixture address.
        let (lat, lon) = (40.103, -8.505);
        let code = anobra_code();

        let record = aggregate(
            &store,
            None,
            Some(&code),
            lat,
            lon,
            &ResolveOptions::default(),
        )
        .await;
        assert!(record.subsection.is_some());
        assert!(record.address.is_none());
    }

    #[test]
    fn elevation_interpolation_blends_nearby_samples() {
        let samples = vec![
            ElevationSample { lat: 40.0, lon: -8.0, elevation_m: 100.0 },
            ElevationSample { lat: 40.01, lon: -8.0, elevation_m: 200.0 },
            ElevationSample { lat: 40.02, lon: -8.0, elevation_m: 300.0 },
        ];
        // Halfway between the first two samples.
        let altitude = interpolate_elevation(&samples, 40.005, -8.0).unwrap();
        assert!(altitude > 100.0 && altitude < 300.0, "altitude {altitude}");

        // On top of a sample: exact value.
        assert_eq!(interpolate_elevation(&samples, 40.0, -8.0), Some(100.0));

        // No samples at all.
        assert_eq!(interpolate_elevation(&[], 40.0, -8.0), None);
    }

    #[test]
    fn classification_labels() {
        assert_eq!(cos_label("5.1.1.1"), "Florestas");
        assert_eq!(cos_label("1.2"), "Territórios artificializados");
        assert_eq!(cos_label(""), "Desconhecido");
        assert_eq!(fire_risk_severity(0), "None");
        assert_eq!(fire_risk_severity(5), "Very high");
    }
}
