//! Core library for the `wxcast` CLI.
//!
//! This crate defines:
//! - Configuration (named locations)
//! - Providers for aviationweather.gov, api.weather.gov and geocoding
//! - METAR decoding
//! - Shared domain models and error kinds
//!
//! [`WxClient`] ties the providers together and is what the binary calls.

pub mod client;
pub mod config;
pub mod error;
pub mod metar;
pub mod model;
pub mod provider;

pub use client::WxClient;
pub use config::{Config, LocationConfig};
pub use error::{ErrorKind, WxError};
pub use model::{
    Coordinates, DecodedMetar, Field, ForecastPeriod, Metar, MetarHeader, Record, WeatherQuery,
};
pub use provider::{Endpoints, Geocoder, Service};

/// Conversion factor used for elevation display.
pub const FEET_PER_METER: f64 = 3.28084;
