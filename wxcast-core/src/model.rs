use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Input of a single command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    /// ICAO code, office code, station id or free-text location.
    pub identifier: String,
    pub decode: bool,
    pub json: bool,
    pub color: bool,
}

impl WeatherQuery {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            decode: false,
            json: false,
            color: true,
        }
    }

    pub fn decoded(mut self, decode: bool) -> Self {
        self.decode = decode;
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A value in a [`Record`]: display text or a nested section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Text(String),
    Record(Record),
}

impl Field {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Field::Text(s) => Some(s),
            Field::Record(_) => None,
        }
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Text(value)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Text(value.to_string())
    }
}

impl From<Record> for Field {
    fn from(value: Record) -> Self {
        Field::Record(value)
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Text(s) => serializer.serialize_str(s),
            Field::Record(r) => r.serialize(serializer),
        }
    }
}

/// Ordered label/value mapping. Insertion order is display order and keys are
/// unique within one level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<(String, Field)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Field>) {
        let key = key.into();
        let value = value.into();

        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert only when a value is present.
    pub fn insert_opt<V: Into<Field>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Field::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Field>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastPeriod {
    pub name: String,
    pub detailed_forecast: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetarHeader {
    pub time: String,
    pub station: String,
    pub flight_rules: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedMetar {
    pub header: MetarHeader,
    pub data: Record,
    pub location: Record,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metar {
    Raw(String),
    Decoded(DecodedMetar),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let mut r = Record::new();
        r.insert("zulu", "1");
        r.insert("alpha", "2");
        r.insert("mike", "3");

        let keys: Vec<_> = r.keys().collect();
        assert_eq!(keys, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn reinserting_a_key_replaces_in_place() {
        let mut r = Record::new();
        r.insert("a", "1");
        r.insert("b", "2");
        r.insert("a", "3");

        assert_eq!(r.len(), 2);
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.get_text("a"), Some("3"));
    }

    #[test]
    fn insert_opt_skips_none() {
        let mut r = Record::new();
        r.insert_opt("present", Some("yes"));
        r.insert_opt::<&str>("absent", None);

        assert!(r.contains_key("present"));
        assert!(!r.contains_key("absent"));
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut inner = Record::new();
        inner.insert("y", "2");

        let mut r = Record::new();
        r.insert("b", "1");
        r.insert("a", inner);

        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"b":"1","a":{"y":"2"}}"#);
    }

    #[test]
    fn query_builder_sets_flags() {
        let q = WeatherQuery::new("KDEN").decoded(true).color(false);
        assert_eq!(q.identifier, "KDEN");
        assert!(q.decode);
        assert!(!q.json);
        assert!(!q.color);
    }
}
