use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use tably_core::config::Settings;
use tably_core::errors::ChatError;
use tably_core::weather::GeoPoint;
use tably_net::{ResilientClient, TtlCache};

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimHit {
    display_name: String,
    lat: String,
    lon: String,
}

/// Free-text place resolution, cached under `geocode:<query>` (raw,
/// case-sensitive — the cache key is the query as given).
pub struct Geocoder {
    http: Arc<ResilientClient>,
    cache: Arc<TtlCache>,
    base_url: String,
    user_agent: String,
    ttl: Duration,
}

impl Geocoder {
    pub fn new(http: Arc<ResilientClient>, cache: Arc<TtlCache>, settings: &Settings) -> Self {
        Self {
            http,
            cache,
            base_url: settings.geocode_base_url.clone(),
            user_agent: settings.nominatim_user_agent.clone(),
            ttl: settings.cache_ttl,
        }
    }

    pub async fn geocode(&self, query: &str) -> Result<GeoPoint, ChatError> {
        let cache_key = format!("geocode:{query}");
        if let Some(hit) = self.cache.get::<GeoPoint>(&cache_key) {
            debug!(query, "geocode cache hit");
            return Ok(hit);
        }

        debug!(query, "geocoding");

        let request = self
            .http
            .get(&format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, &self.user_agent);

        let response = self.http.execute(request).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::from_status(status, body));
        }

        let hits: Vec<NominatimHit> = response
            .json()
            .await
            .map_err(|e| ChatError::Transport(format!("invalid geocode payload: {e}")))?;

        let Some(hit) = hits.into_iter().next() else {
            return Err(ChatError::NotFound(format!("no results for query: {query}")));
        };

        let point = GeoPoint {
            location: hit.display_name,
            lat: parse_coord(&hit.lat, "lat")?,
            lon: parse_coord(&hit.lon, "lon")?,
        };

        self.cache.set(&cache_key, &point, self.ttl);
        Ok(point)
    }
}

fn parse_coord(raw: &str, field: &str) -> Result<f64, ChatError> {
    raw.parse().map_err(|_| ChatError::Upstream {
        status: 200,
        body: format!("non-numeric {field} in geocode payload: {raw}"),
    })
}
