//! Fixture dataset generation.
//!
//! Writes a complete miniature dataset tree into a temporary directory so
//! tests exercise the real file layout end to end: two regions (a mainland
//! slice around Condeixa-A-Nova on the PT-TM06 grid and a Madeira slice on
//! UTM 28N), statistical subsections, addresses, land use, fire risk and
//! elevation samples.
//!
//! Parish polygons are written in each region's native CRS by pushing
//! WGS84 rectangles through the same forward transform the resolver uses,
//! so containment invariants hold by construction. The anchor constants
//! below are the coordinates the fixture geometry is built around; tests
//! should query through them instead of re-deriving magic numbers.

use std::fs;
use std::path::Path;

use geo::MapCoords;
use geo_types::{LineString, MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, Geometry};
use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tracing::info;

use crate::crs::{CrsDefinition, PT_TM06, UTM_28N};
use crate::error::Result;
use crate::store::{AddressRecord, ElevationSample};

/// (lat, lon) at the centre of the fixture parish "Anobra".
pub const ANOBRA_CENTER: (f64, f64) = (40.10, -8.50);
/// (lat, lon) roughly 30 m west of Anobra's western boundary; outside every
/// polygon but within one probe radius of Anobra.
pub const ANOBRA_OFFSHORE: (f64, f64) = (40.10, -8.52035);
/// (lat, lon) inside the enclave hole of the fixture parish "Ega", about
/// 40 m east of the hole's western edge.
pub const EGA_HOLE_POINT: (f64, f64) = (40.10, -8.4635);
/// (lat, lon) far from every fixture polygon.
pub const OPEN_SEA: (f64, f64) = (40.10, -8.60);
/// (lat, lon) at the centre of the fixture island parish "Sé" (Funchal).
pub const SE_CENTER: (f64, f64) = (32.65, -16.91);

pub const ANOBRA_DICOFRE: &str = "060401";
pub const EGA_DICOFRE: &str = "060402";
pub const SEBAL_DICOFRE: &str = "060403";
pub const SE_DICOFRE: &str = "310301";
/// Municipality key for Condeixa-A-Nova.
pub const CONDEIXA_CODE: &str = "0604";
/// Subsection key containing [`ANOBRA_CENTER`].
pub const ANOBRA_SUBSECTION_CODE: &str = "06040100101";

/// Configuration for fixture generation.
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    /// Extra synthetic addresses written per subsection, beyond the one
    /// anchored at [`ANOBRA_CENTER`].
    pub addresses_per_subsection: usize,
    /// Extra synthetic elevation samples, beyond the five anchored ones.
    pub elevation_samples: usize,
    /// Whether to write the auxiliary sets at all (subsections, addresses,
    /// land use, fire risk, elevation). Disabling them exercises the
    /// degraded-branch paths.
    pub auxiliaries: bool,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self {
            addresses_per_subsection: 8,
            elevation_samples: 20,
            auxiliaries: true,
        }
    }
}

impl TestDataConfig {
    /// Minimal fixture for unit tests.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            addresses_per_subsection: 2,
            elevation_samples: 4,
            auxiliaries: true,
        }
    }

    /// Larger fixture for integration tests.
    #[must_use]
    pub fn sample() -> Self {
        Self::default()
    }

    /// Regions only; every auxiliary lookup will find its file missing.
    #[must_use]
    pub fn without_auxiliaries() -> Self {
        Self {
            auxiliaries: false,
            ..Self::minimal()
        }
    }
}

/// Write a complete fixture dataset tree and return its temp directory.
pub fn write_fixture_tree(config: &TestDataConfig) -> Result<TempDir> {
    let dir = TempDir::new()?;
    info!(root = ?dir.path(), config = ?config, "writing fixture dataset tree");

    write_regions(dir.path())?;
    if config.auxiliaries {
        write_subsections(dir.path())?;
        write_addresses(dir.path(), config)?;
        write_land_use(dir.path())?;
        write_fire_risk(dir.path())?;
        write_elevation(dir.path(), config)?;
    }
    Ok(dir)
}

fn write_regions(root: &Path) -> Result<()> {
    let regions = root.join("regions");
    fs::create_dir_all(&regions)?;

    // Mainland slice: three parishes of Condeixa-A-Nova. "Ega" carries an
    // enclave hole, "Sebal" is multi-part.
    let tm06 = CrsDefinition::parse(PT_TM06)?;
    let anobra = MultiPolygon(vec![wgs_rect(-8.52, 40.08, -8.48, 40.12)]);
    let ega = MultiPolygon(vec![Polygon::new(
        rect_ring(-8.48, 40.08, -8.44, 40.12),
        vec![rect_ring(-8.464, 40.095, -8.456, 40.105)],
    )]);
    let sebal = MultiPolygon(vec![
        wgs_rect(-8.52, 40.12, -8.50, 40.14),
        wgs_rect(-8.48, 40.12, -8.46, 40.14),
    ]);

    let mainland = FeatureCollection {
        bbox: None,
        features: vec![
            parish_feature(&project(&tm06, &anobra), "Coimbra", "Condeixa-A-Nova", "Anobra", None, ANOBRA_DICOFRE),
            parish_feature(&project(&tm06, &ega), "Coimbra", "Condeixa-A-Nova", "Ega", None, EGA_DICOFRE),
            parish_feature(&project(&tm06, &sebal), "Coimbra", "Condeixa-A-Nova", "Sebal", None, SEBAL_DICOFRE),
        ],
        foreign_members: None,
    };
    fs::write(regions.join("continente.geojson"), mainland.to_string())?;
    fs::write(regions.join("continente.crs"), PT_TM06)?;

    // Island slice: one Funchal parish on the Madeira UTM grid.
    let utm28 = CrsDefinition::parse(UTM_28N)?;
    let se = MultiPolygon(vec![wgs_rect(-16.93, 32.63, -16.89, 32.67)]);
    let madeira = FeatureCollection {
        bbox: None,
        features: vec![parish_feature(
            &project(&utm28, &se),
            "Ilha da Madeira",
            "Funchal",
            "Sé",
            Some("Madeira"),
            SE_DICOFRE,
        )],
        foreign_members: None,
    };
    fs::write(regions.join("madeira.geojson"), madeira.to_string())?;
    fs::write(regions.join("madeira.crs"), UTM_28N)?;
    Ok(())
}

fn write_subsections(root: &Path) -> Result<()> {
    let dir = root.join("subsections");
    fs::create_dir_all(&dir)?;

    // Two subsections splitting Anobra down lon -8.495, stored in WGS84.
    let west = MultiPolygon(vec![wgs_rect(-8.52, 40.08, -8.495, 40.12)]);
    let east = MultiPolygon(vec![wgs_rect(-8.495, 40.08, -8.48, 40.12)]);
    let collection = FeatureCollection {
        bbox: None,
        features: vec![
            subsection_feature(&west, "001", "01"),
            subsection_feature(&east, "001", "02"),
        ],
        foreign_members: None,
    };
    fs::write(
        dir.join(format!("{CONDEIXA_CODE}.geojson")),
        collection.to_string(),
    )?;
    Ok(())
}

fn write_addresses(root: &Path, config: &TestDataConfig) -> Result<()> {
    let dir = root.join("addresses");
    fs::create_dir_all(&dir)?;

    let mut records = vec![AddressRecord {
        street: "Rua da Igreja".to_owned(),
        house: "12".to_owned(),
        lat: ANOBRA_CENTER.0,
        lon: ANOBRA_CENTER.1,
        postcode: "3150-012".to_owned(),
    }];
    // Extra addresses strung out northwards, each ~90 m apart, all well
    // beyond the nearest-address snap threshold of the anchor point.
    for i in 1..=config.addresses_per_subsection {
        records.push(AddressRecord {
            street: "Rua do Outeiro".to_owned(),
            house: format!("{i}"),
            lat: ANOBRA_CENTER.0 + 0.0008 * i as f64,
            lon: ANOBRA_CENTER.1 - 0.003,
            postcode: "3150-020".to_owned(),
        });
    }
    fs::write(
        dir.join(format!("{ANOBRA_SUBSECTION_CODE}.json")),
        serde_json::to_string_pretty(&records)?,
    )?;
    Ok(())
}

fn write_land_use(root: &Path) -> Result<()> {
    let dir = root.join("landuse");
    fs::create_dir_all(&dir)?;

    let cover = MultiPolygon(vec![wgs_rect(-8.52, 40.08, -8.48, 40.12)]);
    let collection = FeatureCollection {
        bbox: None,
        features: vec![polygon_feature(&cover, json_map(&[("COS", json!("5.1.1.1"))]))],
        foreign_members: None,
    };
    fs::write(
        dir.join(format!("{ANOBRA_DICOFRE}.geojson")),
        collection.to_string(),
    )?;
    Ok(())
}

fn write_fire_risk(root: &Path) -> Result<()> {
    let dir = root.join("firerisk");
    fs::create_dir_all(&dir)?;

    let cover = MultiPolygon(vec![wgs_rect(-8.52, 40.08, -8.48, 40.12)]);
    let collection = FeatureCollection {
        bbox: None,
        features: vec![polygon_feature(&cover, json_map(&[("gridcode", json!(2))]))],
        foreign_members: None,
    };
    fs::write(
        dir.join(format!("{ANOBRA_DICOFRE}.geojson")),
        collection.to_string(),
    )?;
    Ok(())
}

fn write_elevation(root: &Path, config: &TestDataConfig) -> Result<()> {
    let dir = root.join("elevation");
    fs::create_dir_all(&dir)?;

    let mut samples = vec![
        ElevationSample { lat: 40.08, lon: -8.52, elevation_m: 100.0 },
        ElevationSample { lat: 40.08, lon: -8.48, elevation_m: 120.0 },
        ElevationSample { lat: 40.12, lon: -8.52, elevation_m: 140.0 },
        ElevationSample { lat: 40.12, lon: -8.48, elevation_m: 160.0 },
        ElevationSample { lat: ANOBRA_CENTER.0, lon: ANOBRA_CENTER.1, elevation_m: 130.0 },
    ];
    for i in 0..config.elevation_samples {
        let angle = i as f64 * 0.7;
        samples.push(ElevationSample {
            lat: ANOBRA_CENTER.0 + 0.015 * angle.sin(),
            lon: ANOBRA_CENTER.1 + 0.015 * angle.cos(),
            elevation_m: 100.0 + 10.0 * i as f64,
        });
    }
    fs::write(
        dir.join("samples.json"),
        serde_json::to_string_pretty(&samples)?,
    )?;
    Ok(())
}

/// Axis-aligned WGS84 rectangle as a simple polygon.
fn wgs_rect(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Polygon<f64> {
    Polygon::new(rect_ring(lon0, lat0, lon1, lat1), vec![])
}

fn rect_ring(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> LineString<f64> {
    LineString::from(vec![
        (lon0, lat0),
        (lon1, lat0),
        (lon1, lat1),
        (lon0, lat1),
        (lon0, lat0),
    ])
}

fn project(crs: &CrsDefinition, multi: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    multi.map_coords(|coord| {
        let (x, y) = crs.forward(coord.x, coord.y);
        geo_types::Coord { x, y }
    })
}

fn parish_feature(
    geometry: &MultiPolygon<f64>,
    district: &str,
    municipality: &str,
    parish: &str,
    island: Option<&str>,
    dicofre: &str,
) -> Feature {
    let mut properties = json_map(&[
        ("Distrito", json!(district)),
        ("Concelho", json!(municipality)),
        ("Freguesia", json!(parish)),
        ("Dicofre", json!(dicofre)),
    ]);
    if let Some(island) = island {
        properties.insert("Ilha".to_owned(), json!(island));
    }
    polygon_feature(geometry, properties)
}

fn subsection_feature(geometry: &MultiPolygon<f64>, section: &str, subsection: &str) -> Feature {
    polygon_feature(
        geometry,
        json_map(&[("SEC", json!(section)), ("SS", json!(subsection))]),
    )
}

fn polygon_feature(geometry: &MultiPolygon<f64>, properties: Map<String, Value>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn json_map(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use geo::Contains;

    use super::*;
    use crate::store::DatasetStore;

    #[test]
    fn fixture_tree_is_loadable() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let regions = store.load_regions().unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "continente");
        assert_eq!(regions[0].parishes.len(), 3);
        assert_eq!(regions[1].name, "madeira");
        assert_eq!(regions[1].parishes[0].properties.island.as_deref(), Some("Madeira"));
    }

    #[test]
    fn anchor_point_is_inside_its_parish_after_projection() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let regions = store.load_regions().unwrap();
        let mainland = &regions[0];
        let (lat, lon) = ANOBRA_CENTER;
        let (x, y) = mainland.crs.forward(lon, lat);
        let anobra = mainland
            .parishes
            .iter()
            .find(|p| p.properties.dicofre == ANOBRA_DICOFRE)
            .unwrap();
        assert!(anobra.geometry.contains(&geo_types::point!(x: x, y: y)));
    }

    #[test]
    fn hole_point_is_not_contained_by_ega() {
        let fixture = write_fixture_tree(&TestDataConfig::minimal()).unwrap();
        let store = DatasetStore::new(fixture.path());
        let regions = store.load_regions().unwrap();
        let mainland = &regions[0];
        let (lat, lon) = EGA_HOLE_POINT;
        let (x, y) = mainland.crs.forward(lon, lat);
        let ega = mainland
            .parishes
            .iter()
            .find(|p| p.properties.dicofre == EGA_DICOFRE)
            .unwrap();
        assert!(!ega.geometry.contains(&geo_types::point!(x: x, y: y)));
    }

    #[test]
    fn without_auxiliaries_writes_regions_only() {
        let fixture = write_fixture_tree(&TestDataConfig::without_auxiliaries()).unwrap();
        let store = DatasetStore::new(fixture.path());
        assert!(store.load_regions().is_ok());
        assert!(store.subsections(CONDEIXA_CODE).unwrap_err().is_missing());
        assert!(store.land_use(ANOBRA_DICOFRE).unwrap_err().is_missing());
    }
}
