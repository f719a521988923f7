use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Deserializer};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{error::WxError, model::Coordinates};

/// Name of the location used when `forecast` is run without an argument.
pub const DEFAULT_LOCATION: &str = "default";

/// A named location from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LocationConfig {
    #[serde(deserialize_with = "coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "coordinate")]
    pub lon: f64,
}

impl From<LocationConfig> for Coordinates {
    fn from(value: LocationConfig) -> Self {
        Coordinates { lat: value.lat, lon: value.lon }
    }
}

/// Top-level configuration stored on disk.
///
/// Example:
/// ```toml
/// [default]
/// lat = 39.7392
/// lon = -104.9903
///
/// [cabin]
/// lat = "40.2769"
/// lon = "-111.6817"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Config {
    pub locations: BTreeMap<String, LocationConfig>,
}

impl Config {
    /// Parse config contents.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config")
    }

    /// Load config from `path`, or from the platform default when `None`.
    /// A missing file is an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using empty config");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), locations = cfg.locations.len(), "loaded config");
        Ok(cfg)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("org", "wxcast", "wxcast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn insert_location(&mut self, name: impl Into<String>, coords: Coordinates) {
        self.locations.insert(
            name.into(),
            LocationConfig { lat: coords.lat, lon: coords.lon },
        );
    }

    /// Look up a named location, ignoring case.
    pub fn location(&self, name: &str) -> Option<Coordinates> {
        let name = name.trim();
        self.locations
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, loc)| Coordinates::from(*loc))
    }

    pub fn default_location(&self) -> Result<Coordinates, WxError> {
        self.location(DEFAULT_LOCATION).ok_or_else(|| {
            WxError::ConfigMissing(format!(
                "No location given and no [{DEFAULT_LOCATION}] location configured.\n\
                 Hint: add a [{DEFAULT_LOCATION}] table with lat and lon to your config file."
            ))
        })
    }
}

/// Accept `40.1` as well as `"40.1"`.
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate '{s}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_numeric_and_string_coordinates() {
        let cfg = Config::parse(
            r#"
            [default]
            lat = 39.7392
            lon = -104.9903

            [Cabin]
            lat = "40.2769"
            lon = "-111.6817"
            "#,
        )
        .expect("config must parse");

        assert_eq!(cfg.locations.len(), 2);
        let cabin = cfg.location("cabin").expect("case-insensitive lookup");
        assert_eq!(cabin, Coordinates { lat: 40.2769, lon: -111.6817 });
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        let err = Config::parse("[home]\nlat = \"north\"\nlon = 1.0\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn default_location_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.default_location().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigMissing);
        assert!(err.to_string().contains("[default]"));
    }

    #[test]
    fn insert_location_sets_default() {
        let mut cfg = Config::default();
        cfg.insert_location("default", Coordinates { lat: 1.0, lon: 2.0 });

        assert_eq!(
            cfg.default_location().expect("default must exist"),
            Coordinates { lat: 1.0, lon: 2.0 }
        );
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert!(cfg.locations.is_empty());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[work]\nlat = 1.5\nlon = -2.5\n").unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.location("WORK"), Some(Coordinates { lat: 1.5, lon: -2.5 }));
    }

    #[test]
    fn load_and_parse_agree() {
        let contents = "[default]\nlat = \"39.7392\"\nlon = -104.9903\n";
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), Config::parse(contents).unwrap());
    }

    #[test]
    fn load_reports_path_on_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[work\n").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }
}
