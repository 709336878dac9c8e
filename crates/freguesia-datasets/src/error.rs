use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),
    #[error("Dataset file not found: {0}")]
    MissingDataset(PathBuf),
    #[error("No region datasets found under {0}")]
    NoRegions(PathBuf),
    #[error("Region {region} is missing its CRS definition file")]
    MissingCrs { region: String },
    #[error("Unsupported CRS definition: {0}")]
    UnsupportedCrs(String),
    #[error("Malformed CRS parameter `{param}` in: {definition}")]
    MalformedCrsParameter { param: String, definition: String },
    #[error("Feature in {path} has no usable polygon geometry")]
    NonPolygonFeature { path: PathBuf },
    #[error("Feature in {path} is missing required property `{property}`")]
    MissingProperty { path: PathBuf, property: String },
}

impl From<geojson::Error> for DataError {
    fn from(err: geojson::Error) -> Self {
        Self::GeoJson(Box::new(err))
    }
}

impl DataError {
    /// Whether this error means "the artifact simply is not there", the
    /// non-fatal case callers downgrade to an absent field.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        match self {
            Self::MissingDataset(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
