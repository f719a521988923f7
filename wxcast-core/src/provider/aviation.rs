use reqwest::Client;
use serde::Deserialize;

use crate::error::{Result, WxError};

use super::{Service, get_json};

/// METAR observations from the aviationweather.gov data API.
#[derive(Debug, Clone)]
pub struct AviationWeatherProvider {
    base_url: String,
    http: Client,
}

/// One entry of the `/api/data/metar` JSON array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetarObservation {
    pub icao_id: String,
    pub raw_ob: String,
    #[serde(default)]
    pub report_time: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Meters.
    #[serde(default)]
    pub elev: Option<f64>,
    #[serde(default)]
    pub flt_cat: Option<String>,
}

impl AviationWeatherProvider {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Latest observation for `icao`.
    pub async fn latest_metar(&self, icao: &str) -> Result<MetarObservation> {
        let icao = icao.trim().to_uppercase();
        let url = format!("{}/api/data/metar", self.base_url);

        let parsed: Option<Vec<MetarObservation>> = get_json(
            &self.http,
            Service::AviationWeather,
            &url,
            &[("ids", icao.as_str()), ("format", "json")],
        )
        .await?;

        parsed
            .and_then(|obs| obs.into_iter().find(|o| !o.raw_ob.trim().is_empty()))
            .ok_or_else(|| {
                WxError::NotFound(format!(
                    "No METAR found for station {icao}. Check that the ICAO code is valid."
                ))
            })
    }
}
