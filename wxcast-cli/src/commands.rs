//! Command handlers: fetch through [`WxClient`], then render.
//!
//! Every handler fetches completely before rendering, so a failure never
//! leaves partial output behind.

use serde::Serialize;
use wxcast_core::{
    DecodedMetar, FEET_PER_METER, ForecastPeriod, Metar, Record, WeatherQuery, WxClient, WxError,
};

use crate::{
    cli::Command,
    render::{RecordStyle, colors, longest_key_length, render_record, render_styled},
};

/// Rendered command output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Plain(String),
    /// Long output, shown through the pager on a terminal.
    Paged(String),
}

pub async fn execute(
    command: &Command,
    client: &WxClient,
    query: &WeatherQuery,
) -> Result<Output, WxError> {
    let id = query.identifier.as_str();

    match command {
        Command::Metar { .. } => {
            let metar = client.fetch_metar(id, query.decode).await?;
            if query.json {
                return json(&metar).map(Output::Plain);
            }
            Ok(Output::Plain(render_metar(&metar, query.color)))
        }
        Command::Text { product, .. } => {
            let text = client.fetch_text_product(id, product).await?;
            if query.json {
                return json(&text).map(Output::Plain);
            }
            Ok(Output::Paged(render_styled(&text, query.color, colors::KEY)))
        }
        Command::Products { .. } => {
            let products = client.fetch_product_catalog(id).await?;
            record_output(&products, query, true)
        }
        Command::Offices => {
            let offices = client.fetch_office_list().await?;
            record_output(&offices, query, true)
        }
        Command::Office { .. } => {
            let info = client.fetch_office_info(id).await?;
            record_output(&info, query, false)
        }
        Command::Stations { .. } => {
            let stations = client.fetch_stations_for_office(id).await?;
            if query.json {
                return json(&stations).map(Output::Plain);
            }
            if stations.is_empty() {
                let msg = format!("No observation stations listed for {}", id.to_uppercase());
                let msg = render_styled(&msg, query.color, colors::MESSAGE);
                return Ok(Output::Plain(msg + "\n"));
            }
            Ok(Output::Paged(render_styled(
                &stations.join("\n"),
                query.color,
                colors::VALUE,
            )))
        }
        Command::Station { .. } => {
            let mut info = client.fetch_station_info(id).await?;
            if query.json {
                return json(&info).map(Output::Plain);
            }
            convert_elevation(&mut info);
            Ok(Output::Plain(render_record(
                &info,
                query.color,
                &RecordStyle::default(),
            )))
        }
        Command::Forecast { .. } => {
            let location = Some(id.trim()).filter(|l| !l.is_empty());
            let periods = client.fetch_forecast(location).await?;
            if query.json {
                return json(&periods).map(Output::Plain);
            }
            Ok(Output::Paged(render_record(
                &forecast_record(&periods),
                query.color,
                &RecordStyle::default(),
            )))
        }
    }
}

fn record_output(record: &Record, query: &WeatherQuery, paged: bool) -> Result<Output, WxError> {
    if query.json {
        return json(record).map(Output::Plain);
    }

    let text = render_record(record, query.color, &RecordStyle::default());
    Ok(if paged {
        Output::Paged(text)
    } else {
        Output::Plain(text)
    })
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String, WxError> {
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| WxError::InvalidResponse(format!("Failed to encode JSON: {e}")))
}

pub fn render_metar(metar: &Metar, color: bool) -> String {
    match metar {
        Metar::Raw(raw) => format!("{}\n", render_styled(raw, color, colors::VALUE)),
        Metar::Decoded(decoded) => render_decoded_metar(decoded, color),
    }
}

/// Header sentence, then data and location sharing one alignment width.
fn render_decoded_metar(metar: &DecodedMetar, color: bool) -> String {
    let key = |s: &str| render_styled(s, color, colors::KEY);
    let value = |s: &str| render_styled(s, color, colors::VALUE);

    let mut out = [
        key("At "),
        value(&metar.header.time),
        key(" the conditions for "),
        value(&metar.header.station),
        key(" are "),
        value(&metar.header.flight_rules),
        "\n\n".to_string(),
    ]
    .concat();

    let mut location = metar.location.clone();
    convert_elevation(&mut location);

    let spaces = longest_key_length(&metar.data).max(longest_key_length(&location));
    let style = RecordStyle::with_spaces(spaces);

    out.push_str(&render_record(&metar.data, color, &style));
    if !location.is_empty() {
        out.push('\n');
        out.push_str(&render_record(&location, color, &style));
    }
    out
}

/// Rewrite a numeric `Elevation` in meters as `"<ft> ft (<m> m)"`. Anything
/// else is left alone.
pub fn convert_elevation(record: &mut Record) {
    let Some(meters) = record
        .get_text("Elevation")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|m| m.is_finite())
    else {
        return;
    };

    let feet = (meters * FEET_PER_METER).round() as i64;
    record.insert(
        "Elevation",
        format!("{feet} ft ({} m)", meters.round() as i64),
    );
}

fn forecast_record(periods: &[ForecastPeriod]) -> Record {
    periods
        .iter()
        .map(|p| (p.name.as_str(), p.detailed_forecast.as_str()))
        .collect()
}
