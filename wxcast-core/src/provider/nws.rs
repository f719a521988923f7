use reqwest::Client;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

use crate::{
    error::{Result, WxError},
    model::{Coordinates, ForecastPeriod, Record},
};

use super::{Service, get_json, last_segment};

/// Client for api.weather.gov.
#[derive(Debug, Clone)]
pub struct NwsProvider {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct NwsGraph<T> {
    #[serde(rename = "@graph", default = "Vec::new")]
    graph: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsProductType {
    product_code: String,
    product_name: String,
}

#[derive(Debug, Deserialize)]
struct NwsProductRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsProduct {
    product_text: String,
}

#[derive(Debug, Deserialize)]
struct NwsLocations {
    #[serde(deserialize_with = "ordered_pairs")]
    locations: Vec<(String, Option<String>)>,
}

/// Read a JSON object as `(key, value)` pairs in document order.
fn ordered_pairs<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<(String, Option<String>)>, D::Error> {
    struct Pairs;

    impl<'de> Visitor<'de> for Pairs {
        type Value = Vec<(String, Option<String>)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of office codes to names")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                pairs.push(entry);
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(Pairs)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsAddress {
    street_address: Option<String>,
    address_locality: Option<String>,
    address_region: Option<String>,
    postal_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsOffice {
    name: String,
    #[serde(default)]
    address: Option<NwsAddress>,
    #[serde(default)]
    telephone: Option<String>,
    #[serde(default)]
    fax_number: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    nws_region: Option<String>,
    #[serde(default)]
    parent_organization: Option<String>,
    #[serde(default)]
    approved_observation_stations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NwsQuantity {
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NwsGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsStationProperties {
    name: String,
    station_identifier: String,
    #[serde(default)]
    elevation: Option<NwsQuantity>,
    #[serde(default)]
    time_zone: Option<String>,
    #[serde(default)]
    forecast: Option<String>,
    #[serde(default)]
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NwsStation {
    #[serde(default)]
    geometry: Option<NwsGeometry>,
    properties: NwsStationProperties,
}

#[derive(Debug, Deserialize)]
struct NwsPointProperties {
    #[serde(default)]
    forecast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NwsPoint {
    properties: NwsPointProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NwsPeriod {
    name: String,
    detailed_forecast: String,
}

#[derive(Debug, Deserialize)]
struct NwsForecastProperties {
    #[serde(default)]
    periods: Vec<NwsPeriod>,
}

#[derive(Debug, Deserialize)]
struct NwsForecast {
    properties: NwsForecastProperties,
}

impl NwsProvider {
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Product codes issued by `office`, mapped to their names.
    pub async fn product_types(&self, office: &str) -> Result<Record> {
        let office = office.trim().to_uppercase();
        let url = format!("{}/products/locations/{office}/types", self.base_url);

        let parsed: Option<NwsGraph<NwsProductType>> =
            get_json(&self.http, Service::Nws, &url, &[]).await?;

        let types = parsed.map(|g| g.graph).unwrap_or_default();
        if types.is_empty() {
            return Err(invalid_office(&office));
        }

        Ok(types
            .into_iter()
            .map(|t| (t.product_code, t.product_name))
            .collect())
    }

    /// Id of the most recent `product` issued by `office`.
    pub async fn latest_product_id(&self, office: &str, product: &str) -> Result<String> {
        let office = office.trim().to_uppercase();
        let product = product.trim().to_uppercase();
        let url = format!(
            "{}/products/types/{product}/locations/{office}",
            self.base_url
        );

        let parsed: Option<NwsGraph<NwsProductRef>> =
            get_json(&self.http, Service::Nws, &url, &[]).await?;

        parsed
            .and_then(|g| g.graph.into_iter().next())
            .map(|p| p.id)
            .ok_or_else(|| {
                WxError::NotFound(format!(
                    "No {product} product found for office {office}. \
                     Check the office and product codes."
                ))
            })
    }

    pub async fn product_text(&self, id: &str) -> Result<String> {
        let url = format!("{}/products/{id}", self.base_url);

        let parsed: Option<NwsProduct> = get_json(&self.http, Service::Nws, &url, &[]).await?;

        parsed
            .map(|p| p.product_text)
            .ok_or_else(|| WxError::NotFound(format!("Product {id} no longer exists")))
    }

    /// Every office that issues products, code → name.
    pub async fn office_names(&self) -> Result<Record> {
        let url = format!("{}/products/locations", self.base_url);

        let parsed: Option<NwsLocations> = get_json(&self.http, Service::Nws, &url, &[]).await?;
        let locations = parsed.ok_or_else(|| {
            WxError::InvalidResponse(format!("{} returned no office list", Service::Nws))
        })?;

        Ok(locations
            .locations
            .into_iter()
            .filter_map(|(code, name)| name.map(|n| (code, n)))
            .collect())
    }

    pub async fn office_info(&self, office: &str) -> Result<Record> {
        let office = self.office(office).await?;

        let mut record = Record::new();
        record.insert("Name", office.name);
        record.insert_opt("Address", office.address.as_ref().and_then(flatten_address));
        record.insert_opt("Phone", office.telephone);
        record.insert_opt("Fax", office.fax_number);
        record.insert_opt("Email", office.email);
        record.insert_opt("Region", office.nws_region.map(|r| r.to_uppercase()));
        record.insert_opt(
            "Parent",
            office.parent_organization.as_deref().map(last_segment),
        );
        Ok(record)
    }

    pub async fn office_stations(&self, office: &str) -> Result<Vec<String>> {
        let office = self.office(office).await?;

        Ok(office
            .approved_observation_stations
            .iter()
            .map(|url| last_segment(url).to_string())
            .collect())
    }

    async fn office(&self, office: &str) -> Result<NwsOffice> {
        let office = office.trim().to_uppercase();
        let url = format!("{}/offices/{office}", self.base_url);

        get_json(&self.http, Service::Nws, &url, &[])
            .await?
            .ok_or_else(|| invalid_office(&office))
    }

    /// Station metadata. `Elevation` is in meters.
    pub async fn station_info(&self, station: &str) -> Result<Record> {
        let station = station.trim().to_uppercase();
        let url = format!("{}/stations/{station}", self.base_url);

        let parsed: NwsStation = get_json(&self.http, Service::Nws, &url, &[])
            .await?
            .ok_or_else(|| WxError::NotFound(format!("Invalid station id: {station}")))?;

        let props = parsed.properties;
        let mut record = Record::new();
        record.insert("Name", props.name);
        record.insert("Station", props.station_identifier);
        record.insert_opt(
            "Elevation",
            props.elevation.and_then(|e| e.value).map(|m| m.to_string()),
        );

        // GeoJSON order is [lon, lat].
        if let Some(&[lon, lat, ..]) = parsed.geometry.as_ref().map(|g| g.coordinates.as_slice()) {
            record.insert("Latitude", lat.to_string());
            record.insert("Longitude", lon.to_string());
        }

        record.insert_opt("Time zone", props.time_zone);
        record.insert_opt("Forecast zone", props.forecast.as_deref().map(last_segment));
        record.insert_opt("County", props.county.as_deref().map(last_segment));
        Ok(record)
    }

    /// URL of the textual forecast for the grid cell containing `coords`.
    /// `Ok(None)` when the point is outside NWS coverage.
    pub async fn forecast_url(&self, coords: Coordinates) -> Result<Option<String>> {
        let url = format!(
            "{}/points/{:.4},{:.4}",
            self.base_url, coords.lat, coords.lon
        );

        let parsed: Option<NwsPoint> = get_json(&self.http, Service::Nws, &url, &[]).await?;
        Ok(parsed.and_then(|p| p.properties.forecast))
    }

    pub async fn forecast_periods(&self, forecast_url: &str) -> Result<Vec<ForecastPeriod>> {
        let parsed: Option<NwsForecast> =
            get_json(&self.http, Service::Nws, forecast_url, &[]).await?;

        Ok(parsed
            .map(|f| f.properties.periods)
            .unwrap_or_default()
            .into_iter()
            .map(|p| ForecastPeriod {
                name: p.name,
                detailed_forecast: p.detailed_forecast,
            })
            .collect())
    }
}

fn invalid_office(office: &str) -> WxError {
    WxError::NotFound(format!("Invalid NWS office: {office}"))
}

/// `325 Broadway, Boulder, CO 80305-3328`
fn flatten_address(address: &NwsAddress) -> Option<String> {
    let region = [address.address_region.as_deref(), address.postal_code.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

    let parts: Vec<&str> = [
        address.street_address.as_deref(),
        address.address_locality.as_deref(),
        Some(region.as_str()),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
