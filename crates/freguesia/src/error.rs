use thiserror::Error;

#[derive(Error, Debug)]
pub enum FreguesiaError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("Location ({lat}, {lon}) could not be resolved to any administrative unit")]
    NotResolvable { lat: f64, lon: f64 },
    #[error("Dataset error: {0}")]
    Dataset(#[from] freguesia_datasets::DataError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Init Logging error: {0}")]
    InitLoggingError(#[from] tracing_subscriber::filter::ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FreguesiaError {
    /// Whether this is the terminal "all nine candidate points failed
    /// containment" outcome, as opposed to a fault.
    #[must_use]
    pub fn is_not_resolvable(&self) -> bool {
        matches!(self, Self::NotResolvable { .. })
    }
}

pub type Result<T> = std::result::Result<T, FreguesiaError>;
