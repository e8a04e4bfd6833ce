//! Pure intent classification. No I/O: every function here is a
//! deterministic function of the message text and the static tables in
//! [`keywords`].

pub mod keywords;

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use tably_core::route::{Facet, LocationRef, Route, RouterInput, RouterOutput, Timeframe};

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("literal pattern"));

/// What kinds of context a message calls for. One classifier backs
/// both the route decision and the orchestrator's fetch decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub needs_weather: bool,
    pub needs_business_context: bool,
}

/// Classify a raw message against the weather and business tables.
pub fn classify(message: &str) -> Capabilities {
    classify_lower(&message.to_lowercase())
}

fn classify_lower(lower: &str) -> Capabilities {
    Capabilities {
        needs_weather: contains_any(lower, keywords::WEATHER_KEYWORDS),
        needs_business_context: contains_any(lower, keywords::BUSINESS_KEYWORDS),
    }
}

/// Whether a reply benefits from live weather: the weather table plus
/// the orchestrator extras (patio questions, unit mentions).
pub fn needs_weather_context(message: &str) -> bool {
    let lower = message.to_lowercase();
    contains_any(&lower, keywords::WEATHER_KEYWORDS)
        || contains_any(&lower, keywords::WEATHER_CONTEXT_EXTRAS)
}

/// Route a message: capability pair, timeframe, facets, and the
/// business the question is about.
pub fn route_message(input: &RouterInput) -> RouterOutput {
    let lower = input.message.to_lowercase();
    let caps = classify_lower(&lower);

    let route = match (caps.needs_weather, caps.needs_business_context) {
        (true, true) => Route::Both,
        (true, false) => Route::Weather,
        (false, true) => Route::Business,
        (false, false) => Route::Fallback,
    };

    let timeframe = extract_timeframe(&lower);
    let business_facets = extract_facets(&lower);
    let business_id = match &input.business_id {
        Some(id) => id.clone(),
        None => infer_business_id(&lower).to_string(),
    };

    debug!(
        route = route.as_str(),
        ?timeframe,
        facets = business_facets.len(),
        business_id,
        "routed message"
    );

    RouterOutput {
        route,
        location: LocationRef::business_id(business_id),
        timeframe,
        business_facets,
    }
}

/// Timeframe priority: explicit "now"-family words, then the ordered
/// relative tokens, then a literal ISO date, then the default.
fn extract_timeframe(lower: &str) -> Timeframe {
    if lower.contains("now") || lower.contains("current") || lower.contains("today") {
        return Timeframe::Now;
    }

    for token in keywords::RELATIVE_TIMEFRAMES {
        if lower.contains(token) {
            return Timeframe::Relative(token.to_string());
        }
    }

    if let Some(m) = ISO_DATE.find(lower) {
        return Timeframe::Explicit(m.as_str().to_string());
    }

    Timeframe::Now
}

fn extract_facets(lower: &str) -> Vec<Facet> {
    keywords::FACET_TRIGGERS
        .iter()
        .filter(|(_, triggers)| contains_any(lower, triggers))
        .map(|(facet, _)| *facet)
        .collect()
}

fn infer_business_id(lower: &str) -> &'static str {
    keywords::BUSINESS_ALIASES
        .iter()
        .find(|(alias, _)| lower.contains(alias))
        .map(|(_, id)| *id)
        .unwrap_or(keywords::DEFAULT_BUSINESS_ID)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
