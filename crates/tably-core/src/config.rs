use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::errors::ChatError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 120;
const DEFAULT_TOMORROW_FIELDS: &str = "temperature,weatherCode";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_GEOCODE_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_WEATHER_BASE_URL: &str = "https://api.tomorrow.io/v4/weather";
const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_BUSINESS_LOCATION: &str = "San Francisco, CA";
const DEFAULT_KNOWLEDGE_PATH: &str = "knowledge/cellar-sc/business-info.yaml";

/// Environment-driven service settings. Missing required keys fail
/// startup with a `Configuration` error rather than a late panic.
#[derive(Clone, Debug)]
pub struct Settings {
    pub port: u16,
    pub cache_ttl: Duration,
    pub nominatim_user_agent: String,
    pub tomorrow_api_key: SecretString,
    pub tomorrow_fields: String,
    pub openai_api_key: SecretString,
    pub openai_model: String,
    pub geocode_base_url: String,
    pub weather_base_url: String,
    pub completion_base_url: String,
    pub default_business_location: String,
    pub knowledge_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup so tests can inject values
    /// without touching process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let ttl_seconds = parse_or(&lookup, "CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS)?;

        Ok(Self {
            port,
            cache_ttl: Duration::from_secs(ttl_seconds),
            nominatim_user_agent: required(&lookup, "NOMINATIM_USER_AGENT")?,
            tomorrow_api_key: SecretString::from(required(&lookup, "TOMORROW_API_KEY")?),
            tomorrow_fields: or_default(&lookup, "TOMORROW_FIELDS", DEFAULT_TOMORROW_FIELDS),
            openai_api_key: SecretString::from(required(&lookup, "OPENAI_API_KEY")?),
            openai_model: or_default(&lookup, "OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            geocode_base_url: or_default(&lookup, "GEOCODE_BASE_URL", DEFAULT_GEOCODE_BASE_URL),
            weather_base_url: or_default(&lookup, "WEATHER_BASE_URL", DEFAULT_WEATHER_BASE_URL),
            completion_base_url: or_default(
                &lookup,
                "COMPLETION_BASE_URL",
                DEFAULT_COMPLETION_BASE_URL,
            ),
            default_business_location: or_default(
                &lookup,
                "DEFAULT_BUSINESS_LOCATION",
                DEFAULT_BUSINESS_LOCATION,
            ),
            knowledge_path: PathBuf::from(or_default(
                &lookup,
                "KNOWLEDGE_PATH",
                DEFAULT_KNOWLEDGE_PATH,
            )),
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, ChatError> {
    lookup(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ChatError::Configuration(format!("{key} is not set")))
}

fn or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ChatError> {
    match lookup(key) {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| ChatError::Configuration(format!("{key} is not a valid number: {raw}"))),
        _ => Ok(default),
    }
}
