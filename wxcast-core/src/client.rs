use crate::{
    config::Config,
    error::{Result, WxError},
    metar,
    model::{Coordinates, DecodedMetar, ForecastPeriod, Metar, MetarHeader, Record},
    provider::{
        Endpoints, Geocoder, aviation::AviationWeatherProvider, http_client,
        nominatim::NominatimGeocoder, nws::NwsProvider,
    },
};

/// Entry point for every weather lookup. One method per command, each
/// performing its requests sequentially.
#[derive(Debug)]
pub struct WxClient {
    aviation: AviationWeatherProvider,
    nws: NwsProvider,
    geocoder: Box<dyn Geocoder>,
    config: Config,
}

impl WxClient {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_endpoints(config, Endpoints::default())
    }

    pub fn with_endpoints(config: Config, endpoints: Endpoints) -> Result<Self> {
        let http = http_client()?;

        Ok(Self {
            aviation: AviationWeatherProvider::new(endpoints.aviation_weather, http.clone()),
            nws: NwsProvider::new(endpoints.nws, http.clone()),
            geocoder: Box::new(NominatimGeocoder::new(endpoints.geocoder, http)),
            config,
        })
    }

    /// Replace the geocoding collaborator.
    pub fn with_geocoder(mut self, geocoder: Box<dyn Geocoder>) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Latest METAR for `icao`, raw or decoded into named fields.
    pub async fn fetch_metar(&self, icao: &str, decode: bool) -> Result<Metar> {
        let obs = self.aviation.latest_metar(icao).await?;

        if !decode {
            return Ok(Metar::Raw(obs.raw_ob));
        }

        let report = metar::decode(&obs.raw_ob);

        let flight_rules = report
            .flight_rules
            .map(|r| r.to_string())
            .or(obs.flt_cat.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let header = MetarHeader {
            time: metar::report_time(obs.report_time.as_deref(), report.time)
                .unwrap_or_else(|| "an unknown time".to_string()),
            station: report.station.unwrap_or_else(|| obs.icao_id.clone()),
            flight_rules,
        };

        let mut location = Record::new();
        location.insert_opt("Name", obs.name);
        location.insert_opt("Latitude", obs.lat.map(|v| v.to_string()));
        location.insert_opt("Longitude", obs.lon.map(|v| v.to_string()));
        location.insert_opt("Elevation", obs.elev.map(|v| v.to_string()));

        Ok(Metar::Decoded(DecodedMetar {
            header,
            data: report.data,
            location,
        }))
    }

    /// Body of the latest `product` issued by `office`. Two round trips: the
    /// catalog lookup, then the document itself.
    pub async fn fetch_text_product(&self, office: &str, product: &str) -> Result<String> {
        let id = self.nws.latest_product_id(office, product).await?;
        self.nws.product_text(&id).await
    }

    pub async fn fetch_product_catalog(&self, office: &str) -> Result<Record> {
        self.nws.product_types(office).await
    }

    pub async fn fetch_office_list(&self) -> Result<Record> {
        self.nws.office_names().await
    }

    pub async fn fetch_office_info(&self, office: &str) -> Result<Record> {
        self.nws.office_info(office).await
    }

    pub async fn fetch_stations_for_office(&self, office: &str) -> Result<Vec<String>> {
        self.nws.office_stations(office).await
    }

    pub async fn fetch_station_info(&self, station: &str) -> Result<Record> {
        self.nws.station_info(station).await
    }

    /// Forecast periods for a named config location or a free-text place.
    /// `None` uses the config's default location.
    pub async fn fetch_forecast(&self, location: Option<&str>) -> Result<Vec<ForecastPeriod>> {
        let (label, coords) = match location {
            Some(loc) => (loc, self.resolve(loc).await?),
            None => ("the default location", self.config.default_location()?),
        };

        let not_found = || WxError::NotFound(format!("No forecast available for {label}"));

        let url = self.nws.forecast_url(coords).await?.ok_or_else(not_found)?;
        let periods = self.nws.forecast_periods(&url).await?;

        if periods.is_empty() {
            return Err(not_found());
        }
        Ok(periods)
    }

    async fn resolve(&self, location: &str) -> Result<Coordinates> {
        if let Some(coords) = self.config.location(location) {
            tracing::debug!(location, "using configured location");
            return Ok(coords);
        }

        self.geocoder
            .locate(location)
            .await?
            .ok_or_else(|| WxError::NotFound(format!("Unable to find location: {location}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DENVER: Coordinates = Coordinates {
        lat: 39.7392,
        lon: -104.9903,
    };

    #[derive(Debug)]
    struct FixedGeocoder(Option<Coordinates>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn locate(&self, _query: &str) -> Result<Option<Coordinates>> {
            Ok(self.0)
        }
    }

    fn client(server: &MockServer, config: Config) -> WxClient {
        WxClient::with_endpoints(config, Endpoints::all_at(&server.uri())).unwrap()
    }

    async fn mount_json(server: &MockServer, at: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn mount_forecast(server: &MockServer) {
        mount_json(
            server,
            "/points/39.7392,-104.9903",
            serde_json::json!({"properties": {
                "forecast": format!("{}/gridpoints/BOU/63,62/forecast", server.uri())
            }}),
        )
        .await;
        mount_json(
            server,
            "/gridpoints/BOU/63,62/forecast",
            serde_json::json!({"properties": {"periods": [
                {"number": 1, "name": "Tonight", "detailedForecast": "Clear, with a low around 45."},
                {"number": 2, "name": "Monday", "detailedForecast": "Sunny, with a high near 80."}
            ]}}),
        )
        .await;
    }

    fn metar_json() -> serde_json::Value {
        serde_json::json!([{
            "icaoId": "KDEN",
            "rawOb": "METAR KDEN 121853Z 18012KT 10SM BKN050 27/M02 A3012 RMK AO2",
            "reportTime": "2024-05-12T18:53:00.000Z",
            "name": "Denver Intl, CO, US",
            "lat": 39.8466,
            "lon": -104.6562,
            "elev": 1656
        }])
    }

    #[tokio::test]
    async fn raw_metar_is_report_text() {
        let server = MockServer::start().await;
        mount_json(&server, "/api/data/metar", metar_json()).await;

        let metar = client(&server, Config::default())
            .fetch_metar("KDEN", false)
            .await
            .unwrap();

        match metar {
            Metar::Raw(raw) => assert!(raw.starts_with("METAR KDEN")),
            other => panic!("expected raw report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn decoded_metar_has_header_data_and_location() {
        let server = MockServer::start().await;
        mount_json(&server, "/api/data/metar", metar_json()).await;

        let metar = client(&server, Config::default())
            .fetch_metar("KDEN", true)
            .await
            .unwrap();

        let Metar::Decoded(decoded) = metar else {
            panic!("expected decoded report");
        };

        assert_eq!(decoded.header.station, "KDEN");
        assert_eq!(decoded.header.time, "2024-05-12 18:53 UTC");
        assert_eq!(decoded.header.flight_rules, "VFR");
        assert_eq!(decoded.data.get_text("Wind"), Some("from 180° at 12 knots"));
        assert_eq!(decoded.location.get_text("Name"), Some("Denver Intl, CO, US"));
        assert_eq!(decoded.location.get_text("Elevation"), Some("1656"));
    }

    #[tokio::test]
    async fn text_product_resolves_id_then_fetches_body() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/products/types/AFD/locations/BOU",
            serde_json::json!({"@graph": [{"id": "abc-123"}]}),
        )
        .await;
        mount_json(
            &server,
            "/products/abc-123",
            serde_json::json!({"id": "abc-123", "productText": "AREA FORECAST DISCUSSION"}),
        )
        .await;

        let text = client(&server, Config::default())
            .fetch_text_product("bou", "afd")
            .await
            .unwrap();

        assert_eq!(text, "AREA FORECAST DISCUSSION");
    }

    #[tokio::test]
    async fn forecast_uses_geocoder() {
        let server = MockServer::start().await;
        mount_forecast(&server).await;

        let client = client(&server, Config::default())
            .with_geocoder(Box::new(FixedGeocoder(Some(DENVER))));
        let periods = client.fetch_forecast(Some("denver, co")).await.unwrap();

        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].name, "Tonight");
        assert_eq!(periods[1].detailed_forecast, "Sunny, with a high near 80.");
    }

    #[tokio::test]
    async fn forecast_prefers_configured_location() {
        let server = MockServer::start().await;
        mount_forecast(&server).await;

        let mut config = Config::default();
        config.insert_location("home", DENVER);

        // The geocoder knows nothing about "Home".
        let client = client(&server, config).with_geocoder(Box::new(FixedGeocoder(None)));
        let periods = client.fetch_forecast(Some("Home")).await.unwrap();

        assert_eq!(periods[0].name, "Tonight");
    }

    #[tokio::test]
    async fn forecast_without_location_uses_default() {
        let server = MockServer::start().await;
        mount_forecast(&server).await;

        let mut config = Config::default();
        config.insert_location("default", DENVER);

        let periods = client(&server, config).fetch_forecast(None).await.unwrap();
        assert_eq!(periods.len(), 2);
    }

    #[tokio::test]
    async fn forecast_without_location_or_default_is_config_missing() {
        let server = MockServer::start().await;

        let err = client(&server, Config::default())
            .fetch_forecast(None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigMissing);
    }

    #[tokio::test]
    async fn forecast_for_unknown_place_is_not_found() {
        let server = MockServer::start().await;

        let client = client(&server, Config::default())
            .with_geocoder(Box::new(FixedGeocoder(None)));
        let err = client.fetch_forecast(Some("Fake, FK")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("Fake, FK"));
    }

    #[tokio::test]
    async fn forecast_outside_coverage_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/points/51.5074,-0.1278"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let london = Coordinates { lat: 51.5074, lon: -0.1278 };
        let client = client(&server, Config::default())
            .with_geocoder(Box::new(FixedGeocoder(Some(london))));
        let err = client.fetch_forecast(Some("London")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("London"));
    }

    #[tokio::test]
    async fn forecast_with_no_periods_is_not_found() {
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/points/39.7392,-104.9903",
            serde_json::json!({"properties": {
                "forecast": format!("{}/gridpoints/BOU/1,1/forecast", server.uri())
            }}),
        )
        .await;
        mount_json(
            &server,
            "/gridpoints/BOU/1,1/forecast",
            serde_json::json!({"properties": {"periods": []}}),
        )
        .await;

        let client = client(&server, Config::default())
            .with_geocoder(Box::new(FixedGeocoder(Some(DENVER))));
        let err = client.fetch_forecast(Some("denver")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
