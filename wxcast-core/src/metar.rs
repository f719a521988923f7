//! Decoding of raw METAR text into display fields.
//!
//! Only groups that are present in the report end up in the output. Groups
//! the decoder does not understand (runway visual range, trend forecasts,
//! ...) are skipped.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::model::Record;

const METERS_PER_STATUTE_MILE: f64 = 1609.344;

/// Day of month and time of an observation, as encoded in the `ddhhmmZ` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationTime {
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightRules {
    Vfr,
    Mvfr,
    Ifr,
    Lifr,
}

impl FlightRules {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightRules::Vfr => "VFR",
            FlightRules::Mvfr => "MVFR",
            FlightRules::Ifr => "IFR",
            FlightRules::Lifr => "LIFR",
        }
    }

    /// Category from ceiling (feet) and visibility (statute miles).
    pub fn classify(ceiling_ft: Option<u32>, visibility_sm: Option<f64>) -> Option<Self> {
        if ceiling_ft.is_none() && visibility_sm.is_none() {
            return None;
        }

        let ceiling = ceiling_ft.unwrap_or(u32::MAX);
        let vis = visibility_sm.unwrap_or(f64::INFINITY);

        let rules = if ceiling < 500 || vis < 1.0 {
            FlightRules::Lifr
        } else if ceiling < 1000 || vis < 3.0 {
            FlightRules::Ifr
        } else if ceiling <= 3000 || vis <= 5.0 {
            FlightRules::Mvfr
        } else {
            FlightRules::Vfr
        };
        Some(rules)
    }
}

impl std::fmt::Display for FlightRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReport {
    pub station: Option<String>,
    pub time: Option<ObservationTime>,
    pub flight_rules: Option<FlightRules>,
    pub data: Record,
}

#[derive(Default)]
struct Groups {
    wind: Option<String>,
    visibility: Option<String>,
    weather: Vec<String>,
    sky: Vec<String>,
    temperature: Option<String>,
    dew_point: Option<String>,
    pressure: Option<String>,
    remarks: Option<String>,
    ceiling_ft: Option<u32>,
    visibility_sm: Option<f64>,
}

/// Decode a raw METAR/SPECI report.
pub fn decode(raw: &str) -> DecodedReport {
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut i = 0;

    if matches!(tokens.first(), Some(&"METAR") | Some(&"SPECI")) {
        i += 1;
    }

    let mut station = None;
    if let Some(tok) = tokens.get(i) {
        if is_station(tok) {
            station = Some(tok.to_string());
            i += 1;
        }
    }

    let mut time = None;
    if let Some(parsed) = tokens.get(i).and_then(|tok| parse_time(tok)) {
        time = Some(parsed);
        i += 1;
    }

    let mut g = Groups::default();

    while i < tokens.len() {
        let tok = tokens[i];
        i += 1;

        if tok == "RMK" {
            let rest = tokens[i..].join(" ");
            if !rest.is_empty() {
                g.remarks = Some(rest);
            }
            break;
        }

        match tok {
            "AUTO" | "COR" | "NOSIG" | "$" => continue,
            "CAVOK" => {
                g.visibility = Some("10 km or more".to_string());
                g.visibility_sm = Some(10_000.0 / METERS_PER_STATUTE_MILE);
                g.sky.push("no significant clouds".to_string());
                continue;
            }
            _ => {}
        }

        if g.wind.is_none() {
            if let Some(wind) = parse_wind(tok) {
                g.wind = Some(wind);
                continue;
            }
        }

        if let Some(range) = parse_variable_direction(tok) {
            if let Some(wind) = g.wind.as_mut() {
                wind.push_str(&range);
            }
            continue;
        }

        if g.visibility.is_none() {
            // "1 1/2SM" is split over two tokens.
            if tok.len() <= 2 && tok.chars().all(|c| c.is_ascii_digit()) {
                if let Some(next) = tokens.get(i) {
                    if next.ends_with("SM") && next.contains('/') {
                        let joined = format!("{tok} {next}");
                        if let Some((text, sm)) = parse_visibility_sm(&joined) {
                            g.visibility = Some(text);
                            g.visibility_sm = Some(sm);
                            i += 1;
                            continue;
                        }
                    }
                }
            }

            if let Some((text, sm)) = parse_visibility_sm(tok).or_else(|| parse_visibility_m(tok)) {
                g.visibility = Some(text);
                g.visibility_sm = Some(sm);
                continue;
            }
        }

        // Runway visual range.
        if tok.starts_with('R') && tok.contains('/') && tok[1..].starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }

        if let Some((layer, ceiling)) = parse_sky(tok) {
            g.sky.push(layer);
            if let Some(height) = ceiling {
                g.ceiling_ft = Some(g.ceiling_ft.map_or(height, |c| c.min(height)));
            }
            continue;
        }

        if g.temperature.is_none() {
            if let Some((temp, dew)) = parse_temperatures(tok) {
                g.temperature = Some(temp);
                g.dew_point = dew;
                continue;
            }
        }

        if g.pressure.is_none() {
            if let Some(pressure) = parse_pressure(tok) {
                g.pressure = Some(pressure);
                continue;
            }
        }

        if let Some(wx) = parse_weather(tok) {
            g.weather.push(wx);
            continue;
        }

        tracing::trace!(token = tok, "skipping unrecognised METAR group");
    }

    let flight_rules = FlightRules::classify(g.ceiling_ft, g.visibility_sm);

    let mut data = Record::new();
    data.insert_opt("Temperature", g.temperature);
    data.insert_opt("Dew point", g.dew_point);
    data.insert_opt("Wind", g.wind);
    data.insert_opt("Visibility", g.visibility);
    data.insert_opt("Pressure", g.pressure);
    data.insert_opt("Sky", join_nonempty(&g.sky));
    data.insert_opt("Weather", join_nonempty(&g.weather));
    data.insert_opt("Remarks", g.remarks);

    DecodedReport {
        station,
        time,
        flight_rules,
        data,
    }
}

/// Human-readable report time. Prefers the full timestamp from the API and
/// falls back to the day/time group of the raw report.
pub fn report_time(api_time: Option<&str>, raw: Option<ObservationTime>) -> Option<String> {
    if let Some(ts) = api_time.and_then(parse_timestamp) {
        return Some(ts.format("%Y-%m-%d %H:%M UTC").to_string());
    }

    raw.map(|t| format!("{:02}:{:02} UTC on day {}", t.hour, t.minute, t.day))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ndt| ndt.and_utc())
}

fn join_nonempty(parts: &[String]) -> Option<String> {
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn is_station(tok: &str) -> bool {
    tok.len() == 4
        && tok.starts_with(|c: char| c.is_ascii_alphabetic())
        && tok.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn parse_time(tok: &str) -> Option<ObservationTime> {
    let digits = tok.strip_suffix('Z')?;
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let day = digits[0..2].parse().ok()?;
    let hour = digits[2..4].parse().ok()?;
    let minute = digits[4..6].parse().ok()?;
    Some(ObservationTime { day, hour, minute })
}

fn parse_wind(tok: &str) -> Option<String> {
    let (body, unit) = if let Some(b) = tok.strip_suffix("KT") {
        (b, "knots")
    } else if let Some(b) = tok.strip_suffix("MPS") {
        (b, "m/s")
    } else {
        return None;
    };

    if body.len() < 5 || !body.is_ascii() {
        return None;
    }

    let (dir, rest) = body.split_at(3);
    let (speed, gust) = match rest.split_once('G') {
        Some((s, g)) => (s, Some(g)),
        None => (rest, None),
    };

    let valid_num = |s: &str| (2..=3).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit());
    if !valid_num(speed) || !gust.is_none_or(valid_num) {
        return None;
    }
    let speed: u32 = speed.parse().ok()?;

    let mut out = if dir == "VRB" {
        format!("variable at {speed} {unit}")
    } else if dir.chars().all(|c| c.is_ascii_digit()) {
        if dir == "000" && speed == 0 {
            return Some("calm".to_string());
        }
        format!("from {dir}° at {speed} {unit}")
    } else {
        return None;
    };

    if let Some(g) = gust.and_then(|g| g.parse::<u32>().ok()) {
        out.push_str(&format!(", gusting to {g} {unit}"));
    }
    Some(out)
}

/// `180V240`
fn parse_variable_direction(tok: &str) -> Option<String> {
    let (from, to) = tok.split_once('V')?;
    let is_dir = |s: &str| s.len() == 3 && s.chars().all(|c| c.is_ascii_digit());
    if !is_dir(from) || !is_dir(to) {
        return None;
    }
    Some(format!(", varying from {from}° to {to}°"))
}

fn parse_fraction(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((n, d)) => {
            let n: f64 = n.parse().ok()?;
            let d: f64 = d.parse().ok()?;
            if d == 0.0 { None } else { Some(n / d) }
        }
        None => s.parse().ok(),
    }
}

/// `10SM`, `1/2SM`, `1 1/2SM`, `M1/4SM`, `P6SM`
fn parse_visibility_sm(tok: &str) -> Option<(String, f64)> {
    let body = tok.strip_suffix("SM")?;

    let (qualifier, body) = if let Some(b) = body.strip_prefix('M') {
        ("less than ", b)
    } else if let Some(b) = body.strip_prefix('P') {
        ("more than ", b)
    } else {
        ("", body)
    };

    let miles = body
        .split(' ')
        .map(parse_fraction)
        .sum::<Option<f64>>()?;

    let unit = if miles == 1.0 && qualifier.is_empty() {
        "statute mile"
    } else {
        "statute miles"
    };
    Some((format!("{qualifier}{body} {unit}"), miles))
}

/// Four digit meters, `9999` meaning 10 km or more.
fn parse_visibility_m(tok: &str) -> Option<(String, f64)> {
    let digits = tok.strip_suffix("NDV").unwrap_or(tok);
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let meters: u32 = digits.parse().ok()?;
    let text = if meters == 9999 {
        "10 km or more".to_string()
    } else {
        format!("{meters} meters")
    };
    Some((text, f64::from(meters) / METERS_PER_STATUTE_MILE))
}

/// Returns the layer description and, for ceilings, the height in feet.
fn parse_sky(tok: &str) -> Option<(String, Option<u32>)> {
    match tok {
        "SKC" | "CLR" => return Some(("clear".to_string(), None)),
        "NSC" => return Some(("no significant clouds".to_string(), None)),
        "NCD" => return Some(("no clouds detected".to_string(), None)),
        _ => {}
    }

    if let Some(h) = tok.strip_prefix("VV") {
        if h == "///" {
            return Some(("sky obscured".to_string(), Some(0)));
        }
        let feet = layer_height(h)?;
        return Some((format!("sky obscured, vertical visibility {feet} ft"), Some(feet)));
    }

    if tok.len() < 6 || !tok.is_ascii() {
        return None;
    }
    let (cover, rest) = tok.split_at(3);
    let (height, cloud) = rest.split_at(3);

    let (name, is_ceiling) = match cover {
        "FEW" => ("few clouds", false),
        "SCT" => ("scattered clouds", false),
        "BKN" => ("broken clouds", true),
        "OVC" => ("overcast", true),
        _ => return None,
    };
    let feet = layer_height(height)?;

    let cloud = match cloud {
        "" | "///" => "",
        "CB" => " (cumulonimbus)",
        "TCU" => " (towering cumulus)",
        _ => return None,
    };

    Some((
        format!("{name} at {feet} ft{cloud}"),
        is_ceiling.then_some(feet),
    ))
}

/// Three digits in hundreds of feet.
fn layer_height(s: &str) -> Option<u32> {
    if s.len() != 3 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().map(|h| h * 100)
}

fn parse_celsius(s: &str) -> Option<i32> {
    let (sign, digits) = match s.strip_prefix('M') {
        Some(d) => (-1, d),
        None => (1, s),
    };
    if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i32>().ok().map(|v| sign * v)
}

fn format_celsius(c: i32) -> String {
    let f = (f64::from(c) * 9.0 / 5.0 + 32.0).round() as i32;
    format!("{c}°C ({f}°F)")
}

/// `27/M02`, `M05/`
fn parse_temperatures(tok: &str) -> Option<(String, Option<String>)> {
    let (temp, dew) = tok.split_once('/')?;
    let temp = parse_celsius(temp)?;
    let dew = if dew.is_empty() || dew == "//" {
        None
    } else {
        Some(parse_celsius(dew)?)
    };
    Some((format_celsius(temp), dew.map(format_celsius)))
}

/// `A3012` (inches of mercury) or `Q1013` (hectopascals).
fn parse_pressure(tok: &str) -> Option<String> {
    let (unit, digits) = tok.split_at_checked(1)?;
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;

    match unit {
        "A" => Some(format!("{}.{:02} inHg", value / 100, value % 100)),
        "Q" => Some(format!("{value} hPa")),
        _ => None,
    }
}

fn descriptor(code: &str) -> Option<&'static str> {
    Some(match code {
        "MI" => "shallow",
        "PR" => "partial",
        "BC" => "patches of",
        "DR" => "low drifting",
        "BL" => "blowing",
        "SH" => "showers",
        "TS" => "thunderstorm",
        "FZ" => "freezing",
        _ => return None,
    })
}

fn phenomenon(code: &str) -> Option<&'static str> {
    Some(match code {
        "DZ" => "drizzle",
        "RA" => "rain",
        "SN" => "snow",
        "SG" => "snow grains",
        "IC" => "ice crystals",
        "PL" => "ice pellets",
        "GR" => "hail",
        "GS" => "small hail",
        "UP" => "unknown precipitation",
        "BR" => "mist",
        "FG" => "fog",
        "FU" => "smoke",
        "VA" => "volcanic ash",
        "DU" => "widespread dust",
        "SA" => "sand",
        "HZ" => "haze",
        "PY" => "spray",
        "PO" => "dust whirls",
        "SQ" => "squalls",
        "FC" => "funnel cloud",
        "SS" => "sandstorm",
        "DS" => "duststorm",
        _ => return None,
    })
}

/// Present weather such as `-RA`, `+TSRA`, `VCSH`, `FZFG`.
fn parse_weather(tok: &str) -> Option<String> {
    if !tok.is_ascii() {
        return None;
    }

    let (intensity, rest) = if let Some(r) = tok.strip_prefix('-') {
        (Some("light"), r)
    } else if let Some(r) = tok.strip_prefix('+') {
        (Some("heavy"), r)
    } else {
        (None, tok)
    };

    let (vicinity, rest) = match rest.strip_prefix("VC") {
        Some(r) => (true, r),
        None => (false, rest),
    };

    if rest.len() % 2 != 0 || (rest.is_empty() && !vicinity) {
        return None;
    }

    let codes: Vec<&str> = (0..rest.len()).step_by(2).map(|j| &rest[j..j + 2]).collect();

    let (desc, phen_codes) = match codes.first().and_then(|c| descriptor(c)) {
        Some(d) => (Some((codes[0], d)), &codes[1..]),
        None => (None, &codes[..]),
    };

    let phenomena = phen_codes
        .iter()
        .map(|c| phenomenon(c))
        .collect::<Option<Vec<_>>>()?;
    let phen = phenomena.join(" and ");

    let mut text = match desc {
        Some(("TS", _)) if phen.is_empty() => "thunderstorm".to_string(),
        Some(("TS", _)) => format!("thunderstorm with {phen}"),
        Some(("SH", _)) if phen.is_empty() => "showers".to_string(),
        Some(("SH", _)) => format!("{phen} showers"),
        Some((_, word)) if phen.is_empty() => word.to_string(),
        Some((_, word)) => format!("{word} {phen}"),
        None if phen.is_empty() => "showers".to_string(),
        None => phen,
    };

    if let Some(intensity) = intensity {
        text = format!("{intensity} {text}");
    }
    if vicinity {
        text.push_str(" in the vicinity");
    }
    Some(text)
}
