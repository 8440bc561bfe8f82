use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::UNKNOWN;
use crate::parser::extract::coordinates::Coordinates;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const USER_AGENT: &str = "santafe-scraper/0.1 (reverse geocoding)";

/// Address components of a reverse-geocoded point; any may be missing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddressParts {
    pub road: Option<String>,
    pub neighbourhood: Option<String>,
    pub suburb: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait Geocoder {
    /// `None` on any failure or empty response.
    async fn reverse(&self, lat: f64, lon: f64) -> Option<AddressParts>;
}

pub struct Nominatim {
    client: Client,
}

#[derive(Deserialize)]
struct ReverseResponse {
    address: Option<AddressParts>,
}

impl Nominatim {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build geocoding client")?;
        Ok(Self { client })
    }

    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<AddressParts>> {
        let res: ReverseResponse = self
            .client
            .get(NOMINATIM_URL)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(res.address)
    }
}

impl Geocoder for Nominatim {
    async fn reverse(&self, lat: f64, lon: f64) -> Option<AddressParts> {
        match self.lookup(lat, lon).await {
            Ok(parts) => parts,
            Err(e) => {
                warn!("Reverse geocoding {}, {} failed: {}", lat, lon, e);
                None
            }
        }
    }
}

/// Human location of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub neighborhood: String,
    pub sector: String,
    pub department: String,
}

impl Location {
    pub fn unknown() -> Self {
        Self {
            address: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            neighborhood: UNKNOWN.to_string(),
            sector: UNKNOWN.to_string(),
            department: UNKNOWN.to_string(),
        }
    }

    pub fn from_parts(parts: AddressParts) -> Self {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        let road = or_unknown(parts.road);
        let neighborhood = or_unknown(parts.neighbourhood);
        let sector = or_unknown(parts.suburb);
        let city = or_unknown(parts.city);
        let department = or_unknown(parts.state);
        Self {
            address: format!("{}, barrio {}, {}, {} - {}", road, neighborhood, sector, city, department),
            city,
            neighborhood,
            sector,
            department,
        }
    }

    /// One geocoder call; no coordinates or no answer means every part unknown.
    pub async fn resolve(geocoder: &impl Geocoder, coords: Option<Coordinates>) -> Self {
        let Some(c) = coords else {
            return Self::unknown();
        };
        match geocoder.reverse(c.latitude, c.longitude).await {
            Some(parts) => Self::from_parts(parts),
            None => {
                debug!("No address for {}, {}", c.latitude, c.longitude);
                Self::unknown()
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FixedGeocoder;
    use super::*;

    fn laureles() -> AddressParts {
        AddressParts {
            road: Some("Carrera 76".into()),
            neighbourhood: Some("Laureles".into()),
            suburb: Some("Comuna 11".into()),
            city: Some("Medellín".into()),
            state: Some("Antioquia".into()),
        }
    }

    #[tokio::test]
    async fn full_address() {
        let g = FixedGeocoder { answer: Some(laureles()), ..Default::default() };
        let loc = Location::resolve(&g, Some(Coordinates::ZERO)).await;
        assert_eq!(loc.address, "Carrera 76, barrio Laureles, Comuna 11, Medellín - Antioquia");
        assert_eq!(loc.city, "Medellín");
        assert_eq!(loc.department, "Antioquia");
        assert_eq!(g.calls.get(), 1);
    }

    #[tokio::test]
    async fn partial_address() {
        let parts = AddressParts { city: Some("Envigado".into()), ..Default::default() };
        let g = FixedGeocoder { answer: Some(parts), ..Default::default() };
        let loc = Location::resolve(&g, Some(Coordinates::ZERO)).await;
        assert_eq!(loc.address, "N/A, barrio N/A, N/A, Envigado - N/A");
        assert_eq!(loc.neighborhood, "N/A");
    }

    #[tokio::test]
    async fn failure_is_unknown_everywhere() {
        let g = FixedGeocoder::default();
        assert_eq!(Location::resolve(&g, Some(Coordinates::ZERO)).await, Location::unknown());

        let g = FixedGeocoder { answer: Some(laureles()), ..Default::default() };
        assert_eq!(Location::resolve(&g, None).await, Location::unknown());
        assert_eq!(g.calls.get(), 0);
    }

    #[test]
    fn parses_nominatim_payload() {
        let body = r#"{"place_id":1,"address":{"road":"Calle 10","suburb":"El Poblado","city":"Medellín","state":"Antioquia","country":"Colombia"}}"#;
        let res: ReverseResponse = serde_json::from_str(body).unwrap();
        let parts = res.address.unwrap();
        assert_eq!(parts.road.as_deref(), Some("Calle 10"));
        assert_eq!(parts.neighbourhood, None);

        let res: ReverseResponse = serde_json::from_str(r#"{"error":"Unable to geocode"}"#).unwrap();
        assert!(res.address.is_none());
    }
}
