use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{fmt::Debug, time::Duration};

use crate::{
    error::{Result, WxError},
    model::Coordinates,
};

pub mod aviation;
pub mod nominatim;
pub mod nws;

pub const AVIATION_WEATHER_API: &str = "https://aviationweather.gov";
pub const NWS_API: &str = "https://api.weather.gov";
pub const NOMINATIM_API: &str = "https://nominatim.openstreetmap.org";

const USER_AGENT: &str = concat!(
    "wxcast/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/wxcast/wxcast)"
);
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The upstream services wxcast talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    AviationWeather,
    Nws,
    Geocoder,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::AviationWeather => "aviationweather.gov",
            Service::Nws => "api.weather.gov",
            Service::Geocoder => "the geocoding service",
        }
    }

    pub const fn all() -> &'static [Service] {
        &[Service::AviationWeather, Service::Nws, Service::Geocoder]
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URLs of every upstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub aviation_weather: String,
    pub nws: String,
    pub geocoder: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            aviation_weather: AVIATION_WEATHER_API.to_string(),
            nws: NWS_API.to_string(),
            geocoder: NOMINATIM_API.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every service at the same base URL, e.g. a local mock server.
    pub fn all_at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        Self {
            aviation_weather: base.clone(),
            nws: base.clone(),
            geocoder: base,
        }
    }
}

/// Resolves free-text locations to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` when the service has no match for `query`.
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>>;
}

pub(crate) fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| WxError::Unreachable(format!("Failed to initialise HTTP client: {e}")))
}

/// GET `url` and decode a JSON body.
///
/// Returns `Ok(None)` for 404, 204 and empty bodies so each caller can phrase
/// its own not-found message.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &Client,
    service: Service,
    url: &str,
    query: &[(&str, &str)],
) -> Result<Option<T>> {
    tracing::debug!(%service, url, ?query, "GET");

    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| WxError::Unreachable(format!("Unable to reach {service}: {e}")))?;

    let status = res.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
        tracing::debug!(%service, url, %status, "no data");
        return Ok(None);
    }

    let body = res
        .text()
        .await
        .map_err(|e| WxError::Unreachable(format!("Failed to read {service} response body: {e}")))?;

    if !status.is_success() {
        return Err(WxError::InvalidResponse(format!(
            "{service} request failed with status {status}: {}",
            truncate_body(&body),
        )));
    }

    if body.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&body).map(Some).map_err(|e| {
        tracing::warn!(%service, url, error = %e, "unexpected response shape");
        WxError::InvalidResponse(format!("Failed to parse {service} response: {e}"))
    })
}

/// Last path segment of a URL such as `https://api.weather.gov/stations/KDEN`.
pub(crate) fn last_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            Service::all().iter().map(Service::as_str).collect();
        assert_eq!(names.len(), Service::all().len());
    }

    #[test]
    fn endpoints_all_at_trims_trailing_slash() {
        let ep = Endpoints::all_at("http://127.0.0.1:9999/");
        assert_eq!(ep.nws, "http://127.0.0.1:9999");
        assert_eq!(ep.aviation_weather, ep.geocoder);
    }

    #[test]
    fn last_segment_of_station_url() {
        assert_eq!(last_segment("https://api.weather.gov/stations/KDEN"), "KDEN");
        assert_eq!(last_segment("https://api.weather.gov/offices/BOU/"), "BOU");
        assert_eq!(last_segment("KBJC"), "KBJC");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);

        assert_eq!(truncate_body("short"), "short");
    }
}
