//! Nominatim reverse-geocoding client.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::ReverseGeocoder;
use crate::error::{Error, ResolutionError, ResolutionErrorKind, Result};
use crate::models::{AddressFields, GeoPoint};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Optional `accept-language` preference, e.g. "es"
    pub accept_language: Option<String>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: concat!("barrio/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(5),
            accept_language: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    lat: Option<Value>,
    #[serde(default)]
    lon: Option<Value>,
    #[serde(default)]
    address: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    error: Option<Value>,
}

/// HTTP client for a Nominatim-compatible `/reverse` endpoint
pub struct NominatimClient {
    client: Client,
    endpoint: Url,
    accept_language: Option<String>,
}

impl NominatimClient {
    pub fn new(config: &NominatimConfig) -> Result<Self> {
        let mut base = Url::parse(&config.base_url).map_err(|e| {
            Error::config(format!("invalid geocoder url '{}': {}", config.base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("reverse")
            .map_err(|e| Error::config(format!("invalid geocoder url: {}", e)))?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            accept_language: config.accept_language.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    async fn reverse(&self, point: GeoPoint) -> std::result::Result<AddressFields, ResolutionError> {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("format", "jsonv2")
                .append_pair("lat", &point.lat.to_string())
                .append_pair("lon", &point.lon.to_string())
                .append_pair("addressdetails", "1");
            if let Some(lang) = &self.accept_language {
                query.append_pair("accept-language", lang);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolutionError::new(point, request_error_kind(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::new(
                point,
                ResolutionErrorKind::Status(status.as_u16()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolutionError::new(point, request_error_kind(&e)))?;

        debug!("Reverse geocoded {}", point);
        parse_response(&body).map_err(|kind| ResolutionError::new(point, kind))
    }
}

fn request_error_kind(e: &reqwest::Error) -> ResolutionErrorKind {
    if e.is_timeout() {
        ResolutionErrorKind::Timeout
    } else {
        ResolutionErrorKind::Transport(e.to_string())
    }
}

/// Map a `/reverse` body into the fixed address schema.
pub(crate) fn parse_response(body: &str) -> std::result::Result<AddressFields, ResolutionErrorKind> {
    let response: ReverseResponse = serde_json::from_str(body)
        .map_err(|e| ResolutionErrorKind::Malformed(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(ResolutionErrorKind::NoResult(value_to_string(Some(&error))));
    }
    let address = response
        .address
        .ok_or_else(|| ResolutionErrorKind::Malformed("missing 'address' member".to_string()))?;

    let field = |key: &str| value_to_string(address.get(key));
    Ok(AddressFields {
        road: field("road"),
        house_number: field("house_number"),
        suburb: field("suburb"),
        city_district: field("city_district"),
        state: field("state"),
        postcode: field("postcode"),
        country: field("country"),
        lat: value_to_string(response.lat.as_ref()),
        lon: value_to_string(response.lon.as_ref()),
    })
}

fn value_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MADRID: &str = r#"{
        "place_id": 1234,
        "lat": "40.4167047",
        "lon": "-3.7035825",
        "address": {
            "house_number": "1",
            "road": "Puerta del Sol",
            "suburb": "Sol",
            "city_district": "Centro",
            "city": "Madrid",
            "state": "Comunidad de Madrid",
            "postcode": "28013",
            "country": "España",
            "country_code": "es"
        }
    }"#;

    #[test]
    fn test_parse_full_response() {
        let fields = parse_response(MADRID).unwrap();
        assert_eq!(fields.road, "Puerta del Sol");
        assert_eq!(fields.house_number, "1");
        assert_eq!(fields.city_district, "Centro");
        assert_eq!(fields.postcode, "28013");
        assert_eq!(fields.lat, "40.4167047");
        assert_eq!(fields.lon, "-3.7035825");
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let fields =
            parse_response(r#"{"lat": "40.4", "lon": "-3.7", "address": {"road": "Gran Vía"}}"#)
                .unwrap();
        assert_eq!(fields.road, "Gran Vía");
        assert_eq!(fields.postcode, "");
        assert_eq!(fields.house_number, "");
        assert_eq!(fields.country, "");
    }

    #[test]
    fn test_numeric_coordinates_accepted() {
        let fields = parse_response(r#"{"lat": 40.5, "lon": -3.5, "address": {}}"#).unwrap();
        assert_eq!(fields.lat, "40.5");
        assert_eq!(fields.lon, "-3.5");
    }

    #[test]
    fn test_service_error_is_no_result() {
        let kind = parse_response(r#"{"error": "Unable to geocode"}"#).unwrap_err();
        assert_eq!(kind, ResolutionErrorKind::NoResult("Unable to geocode".into()));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_response("<html>busy</html>"),
            Err(ResolutionErrorKind::Malformed(_))
        ));
        assert!(matches!(
            parse_response(r#"{"lat": "1"}"#),
            Err(ResolutionErrorKind::Malformed(_))
        ));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = NominatimClient::new(&NominatimConfig {
            base_url: "http://localhost:8080/nominatim".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:8080/nominatim/reverse");
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let result = NominatimClient::new(&NominatimConfig {
            base_url: "not a url".into(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
