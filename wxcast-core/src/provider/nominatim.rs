//! Forward geocoding with Nominatim (OpenStreetMap). Free, no API key required.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{Result, WxError},
    model::Coordinates,
};

use super::{Geocoder, Service, get_json};

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>> {
        let url = format!("{}/search", self.base_url);

        let places: Option<Vec<NominatimPlace>> = get_json(
            &self.http,
            Service::Geocoder,
            &url,
            &[("q", query), ("format", "json"), ("limit", "1")],
        )
        .await?;

        let Some(place) = places.and_then(|p| p.into_iter().next()) else {
            return Ok(None);
        };

        let coords = match (place.lat.trim().parse(), place.lon.trim().parse()) {
            (Ok(lat), Ok(lon)) => Coordinates { lat, lon },
            _ => {
                return Err(WxError::InvalidResponse(format!(
                    "{} returned invalid coordinates for '{query}'",
                    Service::Geocoder
                )));
            }
        };

        tracing::info!(
            query,
            place = place.display_name.as_deref().unwrap_or("?"),
            lat = coords.lat,
            lon = coords.lon,
            "geocoded location"
        );
        Ok(Some(coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn locate_parses_string_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "denver, co"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "lat": "39.7392364",
                "lon": "-104.984862",
                "display_name": "Denver, Colorado, United States"
            }])))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(server.uri(), Client::new());
        let coords = geocoder.locate("denver, co").await.unwrap().unwrap();

        assert!((coords.lat - 39.7392364).abs() < 1e-9);
        assert!((coords.lon + 104.984862).abs() < 1e-9);
    }

    #[tokio::test]
    async fn locate_without_match_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(server.uri(), Client::new());
        assert_eq!(geocoder.locate("Fake, FK").await.unwrap(), None);
    }

    #[tokio::test]
    async fn locate_rejects_garbage_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "lat": "north",
                "lon": "-104.9"
            }])))
            .mount(&server)
            .await;

        let geocoder = NominatimGeocoder::new(server.uri(), Client::new());
        let err = geocoder.locate("somewhere").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }
}
