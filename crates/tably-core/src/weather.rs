use serde::{Deserialize, Serialize};

/// Resolved coordinates for a free-text place query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub location: String,
    pub lat: f64,
    pub lon: f64,
}

/// Lookup parameters: either both coordinates or a free-text query.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub q: Option<String>,
}

impl WeatherQuery {
    pub fn for_place(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Self::default()
        }
    }

    pub fn for_coords(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            q: None,
        }
    }
}

/// Current conditions at a resolved location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub temp_c: f64,
    pub temp_f: f64,
    pub condition_code: String,
    pub provider: String,
}

pub fn celsius_to_fahrenheit(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Round to one decimal place, the precision weather readings carry.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
