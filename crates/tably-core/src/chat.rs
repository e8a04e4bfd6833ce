use serde::{Deserialize, Serialize};

use crate::route::{Facet, Route};
use crate::weather::WeatherReading;

/// Full chat request: caller supplies the business identity inline.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub business_location: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub business_type: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Simple chat request: the business identity comes from the
/// configured profile instead of the caller.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Weather subset echoed back on replies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    pub location: String,
    pub temp_f: f64,
    pub temp_c: f64,
}

impl From<&WeatherReading> for WeatherSummary {
    fn from(reading: &WeatherReading) -> Self {
        Self {
            location: reading.location.clone(),
            temp_f: reading.temp_f,
            temp_c: reading.temp_c,
        }
    }
}

/// Business identity echoed back on replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInfo {
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_info: Option<WeatherSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_info: Option<BusinessInfo>,
}

/// Simple chat reply carries the routing decision alongside the
/// answer. `business_facets` stays snake_case on the wire.
#[derive(Clone, Debug, Serialize)]
pub struct SimpleChatReply {
    pub response: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    #[serde(rename = "weatherInfo", skip_serializing_if = "Option::is_none")]
    pub weather_info: Option<WeatherSummary>,
    #[serde(rename = "businessInfo", skip_serializing_if = "Option::is_none")]
    pub business_info: Option<BusinessInfo>,
    pub route: Route,
    pub business_facets: Vec<Facet>,
}

/// The business the simple endpoints answer for.
#[derive(Clone, Debug)]
pub struct BusinessProfile {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub location: String,
}

impl Default for BusinessProfile {
    fn default() -> Self {
        Self {
            id: "cellar-sc".to_string(),
            name: "The Cellar".to_string(),
            kind: "wine_bar_cafe".to_string(),
            location: "San Clemente, CA".to_string(),
        }
    }
}
