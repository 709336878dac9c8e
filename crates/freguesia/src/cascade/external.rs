//! Best-effort client for the external reverse-geocoding collaborator.
//!
//! Failures never propagate: a timeout, transport error or unusable payload
//! degrades to `None` at this boundary and is only logged.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub(crate) struct ReverseGeocoder {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

/// Street-level fields an external lookup may provide.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ExternalAddress {
    #[serde(alias = "road")]
    pub street: Option<String>,
    #[serde(alias = "house_number")]
    pub house: Option<String>,
    #[serde(alias = "postal_code")]
    pub postcode: Option<String>,
}

impl ReverseGeocoder {
    pub(crate) fn new(client: reqwest::Client, url: String, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
        }
    }

    /// Reverse geocode one coordinate, or `None` on any failure.
    pub(crate) async fn reverse(&self, lat: f64, lon: f64) -> Option<ExternalAddress> {
        let request = self
            .client
            .get(&self.url)
            .query(&[("lat", lat), ("lon", lon)])
            .timeout(self.timeout);

        let response = match request.send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => response,
            Err(error) => {
                warn!(url = %self.url, %error, "reverse geocoding request failed");
                return None;
            }
        };
        match response.json::<ExternalAddress>().await {
            Ok(address) if address.street.is_some() => Some(address),
            Ok(_) => {
                debug!(url = %self.url, "reverse geocoding returned no street");
                None
            }
            Err(error) => {
                warn!(url = %self.url, %error, "reverse geocoding payload was unusable");
                None
            }
        }
    }
}
