//! Coordinate reference system definitions and the WGS84 → native forward
//! transform.
//!
//! Each region artifact ships a proj4-style definition string alongside its
//! polygon set (`regions/<name>.crs`). The mainland grid is a transverse
//! Mercator (PT-TM06, EPSG:3763); the island groups are digitized on UTM
//! zones, which is the same projection with fixed parameters. Only the
//! forward direction is needed: query points arrive in WGS84 and are pushed
//! into the region's plane before any containment test.

use crate::error::{DataError, Result};

/// Reference ellipsoid: semi-major axis (metres) and flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub f: f64,
}

impl Ellipsoid {
    pub const GRS80: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };
    pub const WGS84: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };
    /// International 1924 (Hayford), carried by the legacy island datums.
    pub const INTL: Self = Self {
        a: 6_378_388.0,
        f: 1.0 / 297.0,
    };

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "GRS80" => Some(Self::GRS80),
            "WGS84" => Some(Self::WGS84),
            "intl" => Some(Self::INTL),
            _ => None,
        }
    }

    /// First eccentricity squared.
    fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }
}

/// Transverse Mercator parameters (also covers UTM).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Latitude of natural origin, degrees.
    pub lat_0: f64,
    /// Central meridian, degrees.
    pub lon_0: f64,
    /// Scale factor at the central meridian.
    pub k_0: f64,
    /// False easting, metres.
    pub x_0: f64,
    /// False northing, metres.
    pub y_0: f64,
}

/// A parsed CRS definition.
///
/// `Geographic` is the degenerate identity projection (`+proj=longlat`);
/// polygon sets stored directly in WGS84 use it, and its planar unit is the
/// degree, not the metre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrsDefinition {
    Geographic,
    TransverseMercator(TransverseMercator),
}

impl CrsDefinition {
    /// Parse a proj4-style definition string.
    ///
    /// Recognised forms:
    /// - `+proj=longlat ...`
    /// - `+proj=tmerc +lat_0=.. +lon_0=.. +k=.. +x_0=.. +y_0=.. +ellps=..`
    /// - `+proj=utm +zone=N [+south] +ellps=..`
    pub fn parse(definition: &str) -> Result<Self> {
        let mut proj = None;
        let mut lat_0 = 0.0;
        let mut lon_0 = 0.0;
        let mut k_0 = 1.0;
        let mut x_0 = 0.0;
        let mut y_0 = 0.0;
        let mut zone: Option<u8> = None;
        let mut south = false;
        let mut ellipsoid = Ellipsoid::GRS80;

        for term in definition.split_whitespace() {
            let term = term.trim_start_matches('+');
            let (key, value) = match term.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (term, None),
            };
            let number = |v: Option<&str>| -> Result<f64> {
                v.and_then(|v| v.parse().ok())
                    .ok_or_else(|| DataError::MalformedCrsParameter {
                        param: key.to_owned(),
                        definition: definition.to_owned(),
                    })
            };
            match key {
                "proj" => proj = value.map(str::to_owned),
                "lat_0" => lat_0 = number(value)?,
                "lon_0" => lon_0 = number(value)?,
                "k" | "k_0" => k_0 = number(value)?,
                "x_0" => x_0 = number(value)?,
                "y_0" => y_0 = number(value)?,
                "zone" => {
                    zone = Some(number(value)? as u8);
                }
                "south" => south = true,
                "ellps" => {
                    ellipsoid = value.and_then(Ellipsoid::from_name).ok_or_else(|| {
                        DataError::MalformedCrsParameter {
                            param: key.to_owned(),
                            definition: definition.to_owned(),
                        }
                    })?;
                }
                // Datum/unit/no_defs terms carry no information we act on.
                _ => {}
            }
        }

        match proj.as_deref() {
            Some("longlat" | "latlong") => Ok(Self::Geographic),
            Some("tmerc") => Ok(Self::TransverseMercator(TransverseMercator {
                ellipsoid,
                lat_0,
                lon_0,
                k_0,
                x_0,
                y_0,
            })),
            Some("utm") => {
                let zone = zone.ok_or_else(|| DataError::MalformedCrsParameter {
                    param: "zone".to_owned(),
                    definition: definition.to_owned(),
                })?;
                Ok(Self::TransverseMercator(TransverseMercator {
                    ellipsoid,
                    lat_0: 0.0,
                    lon_0: f64::from(zone) * 6.0 - 183.0,
                    k_0: 0.9996,
                    x_0: 500_000.0,
                    y_0: if south { 10_000_000.0 } else { 0.0 },
                }))
            }
            _ => Err(DataError::UnsupportedCrs(definition.to_owned())),
        }
    }

    /// Forward transform: WGS84 (lon, lat) in degrees to native planar
    /// coordinates. Pure; no side effects.
    #[must_use]
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Self::Geographic => (lon, lat),
            Self::TransverseMercator(tm) => tm.forward(lon, lat),
        }
    }

    /// Whether planar units of this CRS are metres.
    #[must_use]
    pub fn is_metric(&self) -> bool {
        matches!(self, Self::TransverseMercator(_))
    }
}

impl TransverseMercator {
    /// Standard transverse Mercator forward series (sub-metre within a
    /// projection zone's extent).
    #[must_use]
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let e2 = self.ellipsoid.e2();
        let a = self.ellipsoid.a;
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = sin_phi / cos_phi;

        let n = a / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a_ = (lon - self.lon_0).to_radians() * cos_phi;

        let m = meridian_arc(a, e2, phi);
        let m0 = meridian_arc(a, e2, self.lat_0.to_radians());

        let x = self.x_0
            + self.k_0
                * n
                * (a_
                    + (1.0 - t + c) * a_.powi(3) / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a_.powi(5) / 120.0);
        let y = self.y_0
            + self.k_0
                * (m - m0
                    + n * tan_phi
                        * (a_ * a_ / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a_.powi(4) / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a_.powi(6)
                                / 720.0));
        (x, y)
    }
}

/// Meridian arc length from the equator to latitude `phi` (radians).
fn meridian_arc(a: f64, e2: f64, phi: f64) -> f64 {
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
}

/// The mainland grid, PT-TM06 / ETRS89 (EPSG:3763).
pub const PT_TM06: &str =
    "+proj=tmerc +lat_0=39.66825833333333 +lon_0=-8.133108333333334 +k=1 +x_0=0 +y_0=0 +ellps=GRS80 +units=m +no_defs";

/// UTM zone 26N on GRS80, the eastern Azores grid.
pub const UTM_26N: &str = "+proj=utm +zone=26 +ellps=GRS80 +units=m +no_defs";

/// UTM zone 28N on GRS80, the Madeira grid.
pub const UTM_28N: &str = "+proj=utm +zone=28 +ellps=GRS80 +units=m +no_defs";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tmerc_definition() {
        let crs = CrsDefinition::parse(PT_TM06).unwrap();
        let CrsDefinition::TransverseMercator(tm) = crs else {
            panic!("expected transverse mercator");
        };
        assert!((tm.lon_0 - -8.133108333333334).abs() < 1e-12);
        assert_eq!(tm.ellipsoid, Ellipsoid::GRS80);
        assert_eq!(tm.k_0, 1.0);
    }

    #[test]
    fn parses_utm_definition() {
        let crs = CrsDefinition::parse(UTM_26N).unwrap();
        let CrsDefinition::TransverseMercator(tm) = crs else {
            panic!("expected transverse mercator");
        };
        assert_eq!(tm.lon_0, -27.0);
        assert_eq!(tm.k_0, 0.9996);
        assert_eq!(tm.x_0, 500_000.0);
    }

    #[test]
    fn parses_longlat_definition() {
        let crs = CrsDefinition::parse("+proj=longlat +datum=WGS84 +no_defs").unwrap();
        assert_eq!(crs, CrsDefinition::Geographic);
        assert_eq!(crs.forward(-9.15, 38.72), (-9.15, 38.72));
        assert!(!crs.is_metric());
    }

    #[test]
    fn rejects_unknown_projection() {
        let err = CrsDefinition::parse("+proj=laea +lat_0=52 +lon_0=10").unwrap_err();
        assert!(matches!(err, DataError::UnsupportedCrs(_)));
    }

    #[test]
    fn tm06_origin_maps_to_zero() {
        let crs = CrsDefinition::parse(PT_TM06).unwrap();
        let (x, y) = crs.forward(-8.133108333333334, 39.66825833333333);
        assert!(x.abs() < 1e-6, "x = {x}");
        assert!(y.abs() < 1e-6, "y = {y}");
    }

    #[test]
    fn tm06_orientation_and_scale() {
        let crs = CrsDefinition::parse(PT_TM06).unwrap();
        // Coimbra is north-east of the projection origin.
        let (x, y) = crs.forward(-8.42, 40.20);
        assert!(x < 0.0 && x > -30_000.0, "x = {x}");
        assert!(y > 55_000.0 && y < 65_000.0, "y = {y}");

        // One degree of latitude along the central meridian is ~111 km.
        let (_, y0) = crs.forward(-8.133108333333334, 40.0);
        let (_, y1) = crs.forward(-8.133108333333334, 41.0);
        let dy = y1 - y0;
        assert!((dy - 111_000.0).abs() < 1_000.0, "dy = {dy}");
    }

    #[test]
    fn utm_ponta_delgada_in_range() {
        let crs = CrsDefinition::parse(UTM_26N).unwrap();
        let (x, y) = crs.forward(-25.67, 37.74);
        // East of the zone 26 central meridian, northern hemisphere.
        assert!(x > 500_000.0 && x < 650_000.0, "x = {x}");
        assert!(y > 4_000_000.0 && y < 4_300_000.0, "y = {y}");
    }

    #[test]
    fn utm_south_offsets_northing() {
        let north = CrsDefinition::parse("+proj=utm +zone=26 +ellps=WGS84").unwrap();
        let south = CrsDefinition::parse("+proj=utm +zone=26 +south +ellps=WGS84").unwrap();
        let (_, yn) = north.forward(-25.0, 10.0);
        let (_, ys) = south.forward(-25.0, 10.0);
        assert!((ys - yn - 10_000_000.0).abs() < 1e-6);
    }
}
