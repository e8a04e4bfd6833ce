use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use tably_core::config::Settings;
use tably_core::errors::ChatError;
use tably_core::weather::{celsius_to_fahrenheit, round_tenth, WeatherQuery, WeatherReading};
use tably_net::{ResilientClient, TtlCache};

use crate::geocode::Geocoder;

const PROVIDER: &str = "tomorrow.io";

#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    data: RealtimeData,
}

#[derive(Debug, Deserialize)]
struct RealtimeData {
    values: RealtimeValues,
}

#[derive(Debug, Deserialize)]
struct RealtimeValues {
    temperature: f64,
    #[serde(rename = "weatherCode")]
    weather_code: i64,
}

/// Current-conditions lookup, cached under `weather:<lat>:<lon>` from
/// the resolved coordinates.
pub struct WeatherService {
    http: Arc<ResilientClient>,
    cache: Arc<TtlCache>,
    geocoder: Arc<Geocoder>,
    base_url: String,
    api_key: SecretString,
    fields: String,
    ttl: Duration,
}

impl WeatherService {
    pub fn new(
        http: Arc<ResilientClient>,
        cache: Arc<TtlCache>,
        geocoder: Arc<Geocoder>,
        settings: &Settings,
    ) -> Self {
        Self {
            http,
            cache,
            geocoder,
            base_url: settings.weather_base_url.clone(),
            api_key: settings.tomorrow_api_key.clone(),
            fields: settings.tomorrow_fields.clone(),
            ttl: settings.cache_ttl,
        }
    }

    pub async fn get_weather(&self, query: &WeatherQuery) -> Result<WeatherReading, ChatError> {
        let (lat, lon, location) = self.resolve_location(query).await?;

        let cache_key = format!("weather:{lat}:{lon}");
        if let Some(hit) = self.cache.get::<WeatherReading>(&cache_key) {
            debug!(lat, lon, "weather cache hit");
            return Ok(hit);
        }

        debug!(lat, lon, "fetching weather");

        let coords = format!("{lat},{lon}");
        let request = self.http.get(&format!("{}/realtime", self.base_url)).query(&[
            ("location", coords.as_str()),
            ("fields", self.fields.as_str()),
            ("apikey", self.api_key.expose_secret()),
        ]);

        let response = self.http.execute(request).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status, body));
        }

        let payload: RealtimeResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("invalid weather payload: {e}")))?;

        let temp_c = payload.data.values.temperature;
        let reading = WeatherReading {
            location,
            lat,
            lon,
            temp_c: round_tenth(temp_c),
            temp_f: round_tenth(celsius_to_fahrenheit(temp_c)),
            condition_code: payload.data.values.weather_code.to_string(),
            provider: PROVIDER.to_string(),
        };

        self.cache.set(&cache_key, &reading, self.ttl);
        Ok(reading)
    }

    /// Coordinates win over free text; a free-text query geocodes
    /// first; neither present is rejected before any I/O happens.
    async fn resolve_location(
        &self,
        query: &WeatherQuery,
    ) -> Result<(f64, f64, String), ChatError> {
        match (query.lat, query.lon, query.q.as_deref()) {
            (Some(lat), Some(lon), _) => Ok((lat, lon, format!("{lat},{lon}"))),
            (_, _, Some(q)) if !q.is_empty() => {
                let point = self.geocoder.geocode(q).await?;
                Ok((point.lat, point.lon, point.location))
            }
            _ => Err(ChatError::InvalidArgument(
                "either lat+lon or q must be provided".to_string(),
            )),
        }
    }
}
