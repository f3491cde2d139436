use crate::config::{GeocoderKind, GeocoderParams};
use crate::types::{Location, PollutionError, PollutionResult};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a free-text place name to coordinates
pub trait Geocoder: Send + Sync {
    fn resolve(&self, name: &str) -> PollutionResult<Location>;
}

/// Build the gazetteer selected in the configuration
pub fn geocoder_from_params(params: &GeocoderParams) -> PollutionResult<Arc<dyn Geocoder>> {
    let geocoder: Arc<dyn Geocoder> = match params.kind {
        GeocoderKind::Nominatim => Arc::new(NominatimGeocoder::new(params)?),
        GeocoderKind::Static => Arc::new(StaticGazetteer::with_known_locations()),
    };
    Ok(geocoder)
}

/// OpenStreetMap Nominatim search client
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(params: &GeocoderParams) -> PollutionResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(params.timeout_secs))
            .user_agent(params.user_agent.as_str())
            .build()
            .map_err(|e| PollutionError::Geocoding(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: params.endpoint.clone(),
        })
    }

    /// Parse a Nominatim JSON search response; only the first hit is used
    fn parse_response(name: &str, body: &str) -> PollutionResult<Location> {
        let places: Vec<NominatimPlace> = serde_json::from_str(body)
            .map_err(|e| PollutionError::Geocoding(format!("Failed to parse gazetteer response: {}", e)))?;

        let place = places
            .first()
            .ok_or_else(|| PollutionError::LocationNotFound(name.to_string()))?;

        let latitude = place.lat.trim().parse::<f64>()
            .map_err(|e| PollutionError::Geocoding(format!("Invalid latitude '{}': {}", place.lat, e)))?;
        let longitude = place.lon.trim().parse::<f64>()
            .map_err(|e| PollutionError::Geocoding(format!("Invalid longitude '{}': {}", place.lon, e)))?;

        Ok(Location::new(name, latitude, longitude))
    }
}

impl Geocoder for NominatimGeocoder {
    fn resolve(&self, name: &str) -> PollutionResult<Location> {
        log::debug!("Geocoding '{}' via {}", name, self.endpoint);

        let response = self.client
            .get(&self.endpoint)
            .query(&[("q", name), ("format", "json"), ("limit", "1")])
            .send()
            .map_err(|e| PollutionError::Geocoding(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PollutionError::Geocoding(format!(
                "HTTP request failed with status: {}",
                response.status()
            )));
        }

        let body = response.text()
            .map_err(|e| PollutionError::Geocoding(format!("Failed to read response: {}", e)))?;

        let location = Self::parse_response(name, &body)?;
        log::info!("Resolved '{}' to ({:.4}, {:.4})", name, location.latitude, location.longitude);
        Ok(location)
    }
}

/// Offline gazetteer backed by a fixed table
#[derive(Debug, Clone, Default)]
pub struct StaticGazetteer {
    entries: Vec<Location>,
}

/// Places surveyed when the training set was collected
const KNOWN_LOCATIONS: &[(&str, f64, f64)] = &[
    ("New York City", 40.7128, -74.0060),
    ("Delhi", 28.6139, 77.2090),
    ("Beijing", 39.9042, 116.4074),
    ("Los Angeles", 34.0522, -118.2437),
    ("Mumbai", 19.0760, 72.8777),
    ("Shanghai", 31.2304, 121.4737),
    ("Cairo", 30.0444, 31.2357),
    ("Mexico City", 19.4326, -99.1332),
    ("Jakarta", -6.2088, 106.8456),
    ("Karachi", 24.8607, 67.0011),
    ("London", 51.5074, -0.1278),
    ("Paris", 48.8566, 2.3522),
    ("Moscow", 55.7558, 37.6173),
    ("Tokyo", 35.6762, 139.6503),
    ("Lagos", 6.5244, 3.3792),
    ("Dhaka", 23.8103, 90.4125),
    ("Chongqing", 29.5630, 106.5516),
    ("Ulaanbaatar", 47.8864, 106.9057),
    ("Tehran", 35.6892, 51.3890),
    ("Bangkok", 13.7563, 100.5018),
    ("Sao Paulo", -23.5505, -46.6333),
    ("Rio de Janeiro", -22.9068, -43.1729),
    ("Houston", 29.7604, -95.3698),
    ("Dubai", 25.276987, 55.296249),
    ("Essen", 51.4556, 7.0116),
    ("Johannesburg", -26.2041, 28.0473),
    ("Lahore", 31.5497, 74.3436),
    ("Patagonia", -47.1787, -71.2880),
    ("Siberia", 60.0000, 90.0000),
    ("Amazon Rainforest", -3.4653, -62.2159),
    ("Alaska", 64.2008, -149.4937),
    ("Sahara Desert", 23.4162, 25.6628),
    ("Gobi Desert", 42.5000, 105.0000),
    ("Middle East Dust Belt", 25.0, 50.0),
    ("Canadian Boreal Forest", 56.1304, -106.3468),
    ("Midwest USA", 41.2033, -98.1420),
    ("Kathmandu", 27.7172, 85.3240),
];

impl StaticGazetteer {
    pub fn new(entries: Vec<Location>) -> Self {
        Self { entries }
    }

    pub fn with_known_locations() -> Self {
        Self::new(
            KNOWN_LOCATIONS
                .iter()
                .map(|&(name, lat, lon)| Location::new(name, lat, lon))
                .collect(),
        )
    }

    pub fn insert(&mut self, location: Location) {
        self.entries.push(location);
    }
}

impl Geocoder for StaticGazetteer {
    fn resolve(&self, name: &str) -> PollutionResult<Location> {
        let query = name.trim();
        self.entries
            .iter()
            .find(|loc| loc.name.eq_ignore_ascii_case(query))
            .map(|loc| Location::new(name, loc.latitude, loc.longitude))
            .ok_or_else(|| PollutionError::LocationNotFound(name.to_string()))
    }
}
