//! Per-request resolution options and their builder.

use std::time::Duration;

use crate::resolve::{PROBE_BEARINGS_DEG, PROBE_RADIUS_M};

/// Options for one `resolve` call.
///
/// The probe constants default to the ring the boundary-gap recovery was
/// designed around (8 bearings in 45° steps at 100 m); they are exposed as
/// tunables rather than baked in.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Run the auxiliary cascade (subsection, address, land use, fire risk,
    /// altitude). When false the result carries the hierarchy only.
    pub include_details: bool,
    /// Allow the external reverse-geocoding fallback when no local address
    /// is within the snap threshold.
    pub use_external_services: bool,
    /// Probe ring radius in metres.
    pub probe_radius_m: f64,
    /// Probe bearings in degrees, tried in order. Empty disables the probe
    /// stage entirely.
    pub probe_bearings: Vec<f64>,
    /// Maximum distance at which a local address is accepted as "here".
    pub address_snap_m: f64,
    /// Total budget for one external service call.
    pub external_timeout: Duration,
    /// Reverse-geocoding endpoint; unset leaves the fallback disabled even
    /// when `use_external_services` is true.
    pub geocoder_url: Option<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            include_details: true,
            use_external_services: false,
            probe_radius_m: PROBE_RADIUS_M,
            probe_bearings: PROBE_BEARINGS_DEG.to_vec(),
            address_snap_m: 10.0,
            external_timeout: Duration::from_secs(1),
            geocoder_url: None,
        }
    }
}

impl ResolveOptions {
    #[must_use]
    pub fn builder() -> ResolveOptionsBuilder {
        ResolveOptionsBuilder::new()
    }
}

/// Builder for [`ResolveOptions`] with ergonomic presets.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptionsBuilder {
    options: ResolveOptions,
}

impl ResolveOptionsBuilder {
    /// Create a new builder with the default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: ResolveOptions::default(),
        }
    }

    /// Preset: hierarchy only, no auxiliary cascade.
    #[must_use]
    pub fn hierarchy_only() -> Self {
        let mut builder = Self::new();
        builder.options.include_details = false;
        builder
    }

    /// Preset: full detail from local datasets, never calling out.
    #[must_use]
    pub fn offline() -> Self {
        let mut builder = Self::new();
        builder.options.include_details = true;
        builder.options.use_external_services = false;
        builder
    }

    #[must_use]
    pub fn include_details(mut self, include: bool) -> Self {
        self.options.include_details = include;
        self
    }

    #[must_use]
    pub fn use_external_services(mut self, use_external: bool) -> Self {
        self.options.use_external_services = use_external;
        self
    }

    /// Set the reverse-geocoding endpoint and enable the fallback.
    #[must_use]
    pub fn geocoder_url(mut self, url: impl Into<String>) -> Self {
        self.options.geocoder_url = Some(url.into());
        self.options.use_external_services = true;
        self
    }

    #[must_use]
    pub fn probe_radius_m(mut self, radius: f64) -> Self {
        self.options.probe_radius_m = radius.max(0.0);
        self
    }

    #[must_use]
    pub fn probe_bearings(mut self, bearings: Vec<f64>) -> Self {
        self.options.probe_bearings = bearings;
        self
    }

    #[must_use]
    pub fn address_snap_m(mut self, snap: f64) -> Self {
        self.options.address_snap_m = snap.max(0.0);
        self
    }

    #[must_use]
    pub fn external_timeout(mut self, timeout: Duration) -> Self {
        self.options.external_timeout = timeout;
        self
    }

    /// Build the final options.
    #[must_use]
    pub fn build(self) -> ResolveOptions {
        self.options
    }
}
