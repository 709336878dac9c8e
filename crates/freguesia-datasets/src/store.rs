//! Typed loaders over the file-partitioned dataset tree.
//!
//! The batch pipelines that build these artifacts are not part of this
//! workspace; the store only reads whatever files currently exist, so a
//! periodic regeneration upstream is observed as an atomic replace.
//!
//! Layout under the dataset root:
//!
//! ```text
//! regions/<region>.geojson      parish polygon sets, native CRS coordinates
//! regions/<region>.crs          proj4-style CRS definition string
//! subsections/<DDCC>.geojson    statistical subsections per municipality, WGS84
//! addresses/<DDCCFFSSSss>.json  address lists per subsection
//! landuse/<DDCCFF>.geojson      land-use polygons per parish, WGS84
//! firerisk/<DDCCFF>.geojson     fire-risk polygons per parish, WGS84
//! elevation/samples.json        sampled elevation points
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use geo_types::{Geometry, MultiPolygon};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::crs::CrsDefinition;
use crate::error::{DataError, Result};

/// Parish attributes carried by the per-region polygon sets.
///
/// Field names follow the upstream CAOP registry: `Dicofre` is the 6-digit
/// district+municipality+parish code with significant leading zeros, which is
/// why it is a string and never a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParishProperties {
    pub district: String,
    pub municipality: String,
    pub parish: String,
    pub island: Option<String>,
    pub dicofre: String,
}

/// One parish polygon (possibly multi-part, possibly holed) plus attributes.
#[derive(Debug, Clone)]
pub struct ParishFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: ParishProperties,
}

/// A region artifact: one administrative territory digitized in its own CRS.
#[derive(Debug, Clone)]
pub struct RegionData {
    pub name: String,
    pub crs_definition: String,
    pub crs: CrsDefinition,
    pub parishes: Vec<ParishFeature>,
}

/// Statistical subsection attributes (BGRI `SEC`/`SS` identifiers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsectionProperties {
    pub section: String,
    pub subsection: String,
}

#[derive(Debug, Clone)]
pub struct SubsectionFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: SubsectionProperties,
}

/// One entry of a per-subsection address list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub street: String,
    pub house: String,
    pub lat: f64,
    pub lon: f64,
    pub postcode: String,
}

/// A land-use polygon with its raw COS classification code (e.g. `5.1.1`).
#[derive(Debug, Clone)]
pub struct LandUseFeature {
    pub geometry: MultiPolygon<f64>,
    pub code: String,
}

/// A fire-risk polygon with its raw grid code (0 = none … 5 = very high).
#[derive(Debug, Clone)]
pub struct FireRiskFeature {
    pub geometry: MultiPolygon<f64>,
    pub grid_code: u8,
}

/// A sampled elevation point used for interpolated altitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    pub lat: f64,
    pub lon: f64,
    pub elevation_m: f64,
}

/// Read-only handle on a dataset tree.
///
/// The store holds only the root path; every lookup opens the file that
/// currently exists, so concurrent readers never share mutable state.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
}

impl DatasetStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store at the ambient data directory (see [`crate::data_dir`]).
    #[must_use]
    pub fn open_default() -> Self {
        Self::new(crate::data_dir())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every region artifact, mainland (`continente`) first, island
    /// groups after in name order. The order is stable across calls; the
    /// resolver relies on it for deterministic tie-breaking.
    #[instrument(name = "Load regions", level = "info", skip(self))]
    pub fn load_regions(&self) -> Result<Vec<RegionData>> {
        let dir = self.root.join("regions");
        let mut names: Vec<String> = fs::read_dir(&dir)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DataError::NoRegions(dir.clone()),
                _ => DataError::Io(e),
            })?
            .filter_map(|entry| {
                let path = entry.ok()?.path();
                if path.extension().is_some_and(|ext| ext == "geojson") {
                    Some(path.file_stem()?.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        if names.is_empty() {
            return Err(DataError::NoRegions(dir));
        }
        names.sort_by_key(|name| (name != "continente", name.clone()));

        names.iter().map(|name| self.load_region(name)).collect()
    }

    fn load_region(&self, name: &str) -> Result<RegionData> {
        let geojson_path = self.root.join("regions").join(format!("{name}.geojson"));
        let crs_path = self.root.join("regions").join(format!("{name}.crs"));

        let crs_definition = fs::read_to_string(&crs_path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => DataError::MissingCrs {
                    region: name.to_owned(),
                },
                _ => DataError::Io(e),
            })?
            .trim()
            .to_owned();
        let crs = CrsDefinition::parse(&crs_definition)?;

        let parishes = read_feature_collection(&geojson_path)?
            .into_iter()
            .map(|(geometry, properties)| {
                Ok(ParishFeature {
                    geometry,
                    properties: ParishProperties {
                        district: require_str(&properties, "Distrito", &geojson_path)?,
                        municipality: require_str(&properties, "Concelho", &geojson_path)?,
                        parish: require_str(&properties, "Freguesia", &geojson_path)?,
                        island: optional_str(&properties, "Ilha"),
                        dicofre: require_str(&properties, "Dicofre", &geojson_path)?,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(region = name, parishes = parishes.len(), "region loaded");
        Ok(RegionData {
            name: name.to_owned(),
            crs_definition,
            crs,
            parishes,
        })
    }

    /// Statistical subsections for one municipality (`DDCC` key).
    pub fn subsections(&self, municipality_code: &str) -> Result<Vec<SubsectionFeature>> {
        let path = self
            .root
            .join("subsections")
            .join(format!("{municipality_code}.geojson"));
        read_feature_collection(&path)?
            .into_iter()
            .map(|(geometry, properties)| {
                Ok(SubsectionFeature {
                    geometry,
                    properties: SubsectionProperties {
                        section: require_str(&properties, "SEC", &path)?,
                        subsection: require_str(&properties, "SS", &path)?,
                    },
                })
            })
            .collect()
    }

    /// Address list for one statistical subsection (11-digit key).
    pub fn addresses(&self, subsection_code: &str) -> Result<Vec<AddressRecord>> {
        let path = self
            .root
            .join("addresses")
            .join(format!("{subsection_code}.json"));
        let raw = read_file(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Land-use polygons for one parish (`DDCCFF` key).
    pub fn land_use(&self, parish_code: &str) -> Result<Vec<LandUseFeature>> {
        let path = self
            .root
            .join("landuse")
            .join(format!("{parish_code}.geojson"));
        read_feature_collection(&path)?
            .into_iter()
            .map(|(geometry, properties)| {
                Ok(LandUseFeature {
                    geometry,
                    code: require_str(&properties, "COS", &path)?,
                })
            })
            .collect()
    }

    /// Fire-risk polygons for one parish (`DDCCFF` key).
    pub fn fire_risk(&self, parish_code: &str) -> Result<Vec<FireRiskFeature>> {
        let path = self
            .root
            .join("firerisk")
            .join(format!("{parish_code}.geojson"));
        read_feature_collection(&path)?
            .into_iter()
            .map(|(geometry, properties)| {
                let grid_code = properties
                    .get("gridcode")
                    .and_then(serde_json::Value::as_u64)
                    .ok_or_else(|| DataError::MissingProperty {
                        path: path.clone(),
                        property: "gridcode".to_owned(),
                    })?;
                Ok(FireRiskFeature {
                    geometry,
                    grid_code: grid_code.min(5) as u8,
                })
            })
            .collect()
    }

    /// The sampled elevation point set.
    pub fn elevation_samples(&self) -> Result<Vec<ElevationSample>> {
        let path = self.root.join("elevation").join("samples.json");
        let raw = read_file(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::MissingDataset(path.to_owned()),
        _ => DataError::Io(e),
    })
}

type PropertyMap = serde_json::Map<String, serde_json::Value>;

/// Parse a GeoJSON feature collection into multipolygons plus property bags.
/// Single polygons are promoted to one-part multipolygons so every consumer
/// deals with exactly one geometry shape.
fn read_feature_collection(path: &Path) -> Result<Vec<(MultiPolygon<f64>, PropertyMap)>> {
    let raw = read_file(path)?;
    let geojson: GeoJson = raw.parse().map_err(Box::new)?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(DataError::NonPolygonFeature {
            path: path.to_owned(),
        });
    };

    collection
        .features
        .into_iter()
        .map(|feature| {
            let geometry = feature
                .geometry
                .ok_or_else(|| DataError::NonPolygonFeature {
                    path: path.to_owned(),
                })?;
            let geometry: Geometry<f64> = geometry.value.try_into().map_err(Box::new)?;
            let multi = match geometry {
                Geometry::Polygon(polygon) => MultiPolygon(vec![polygon]),
                Geometry::MultiPolygon(multi) => multi,
                _ => {
                    return Err(DataError::NonPolygonFeature {
                        path: path.to_owned(),
                    });
                }
            };
            Ok((multi, feature.properties.unwrap_or_default()))
        })
        .collect()
}

fn require_str(properties: &PropertyMap, key: &str, path: &Path) -> Result<String> {
    optional_str(properties, key).ok_or_else(|| DataError::MissingProperty {
        path: path.to_owned(),
        property: key.to_owned(),
    })
}

fn optional_str(properties: &PropertyMap, key: &str) -> Option<String> {
    match properties.get(key)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::{TestDataConfig, write_fixture_tree};

    #[test]
    fn loads_regions_mainland_first() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let regions = store.load_regions().unwrap();
        assert!(regions.len() >= 2);
        assert_eq!(regions[0].name, "continente");
        assert!(regions[0].crs.is_metric());
        assert!(!regions[0].parishes.is_empty());
    }

    #[test]
    fn missing_address_file_is_typed() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let err = store.addresses("99999999999").unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn missing_regions_dir_is_an_error() {
        let empty = tempfile::TempDir::new().unwrap();
        let store = DatasetStore::new(empty.path());
        assert!(matches!(
            store.load_regions().unwrap_err(),
            DataError::NoRegions(_)
        ));
    }

    #[test]
    fn subsections_carry_sec_and_ss() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let subsections = store.subsections("0604").unwrap();
        assert!(!subsections.is_empty());
        assert_eq!(subsections[0].properties.section.len(), 3);
        assert_eq!(subsections[0].properties.subsection.len(), 2);
    }
}
