use tably_core::route::Facet;

/// Triggers for live-weather context.
pub const WEATHER_KEYWORDS: &[&str] = &[
    "weather", "forecast", "rain", "temp", "temperature", "wind", "humidity", "uv",
    "sunny", "cloudy", "aqi", "hot", "cold", "warm", "cool", "storm", "snow",
    "fog", "mist", "drizzle", "shower", "thunder", "lightning", "breeze", "gust",
];

/// Triggers for business-knowledge context.
pub const BUSINESS_KEYWORDS: &[&str] = &[
    "hours", "open", "close", "closed", "menu", "price", "cost", "wifi", "internet",
    "seating", "table", "patio", "outdoor", "dog", "pet", "policy", "policies",
    "refund", "return", "reservation", "book", "booking", "phone", "call",
    "email", "address", "location", "directions", "parking", "delivery",
    "takeout", "take-out", "dine-in", "dinein", "curbside", "pickup",
    "pastries", "food", "cater", "catering", "wedding", "weddings", "event", "events",
];

/// Extra triggers the orchestrator honors when deciding whether a
/// reply benefits from weather context even though the route itself is
/// not weather (patio questions, unit mentions).
pub const WEATHER_CONTEXT_EXTRAS: &[&str] = &[
    "outside", "outdoor", "patio", "terrace", "garden",
    "°f", "°c", "degrees", "fahrenheit", "celsius",
];

/// Relative time tokens, checked in order; the first hit wins.
pub const RELATIVE_TIMEFRAMES: &[&str] = &[
    "tomorrow",
    "yesterday",
    "next week",
    "this weekend",
    "tonight",
    "this evening",
    "this afternoon",
    "this morning",
];

/// Per-facet trigger words. Facets test independently; a message can
/// carry any subset.
pub const FACET_TRIGGERS: &[(Facet, &[&str])] = &[
    (Facet::Hours, &["hours", "open", "close", "closed", "schedule"]),
    (Facet::Menu, &["menu", "food", "drink", "dish", "meal", "cuisine", "pastries"]),
    (Facet::Wifi, &["wifi", "internet", "wireless"]),
    (Facet::Seating, &["seating", "table", "chair", "capacity"]),
    (Facet::Patio, &["patio", "outdoor", "terrace", "garden"]),
    (Facet::Dog, &["dog", "pet", "animal"]),
    (
        Facet::Policy,
        &["policy", "policies", "rule", "guideline", "cater", "catering", "wedding", "weddings", "event", "events"],
    ),
    (Facet::Refund, &["refund", "return", "exchange"]),
    (Facet::Reservation, &["reservation", "book", "booking", "reserve"]),
    (Facet::Contact, &["phone", "call", "email", "contact"]),
    (Facet::Address, &["address", "location", "directions", "where"]),
    (Facet::Parking, &["parking", "park"]),
    (Facet::Delivery, &["delivery", "deliver", "takeout", "take-out", "curbside", "pickup"]),
];

/// Known business names and the ids they resolve to. Matched against
/// the lowercased message when the caller supplies no id.
pub const BUSINESS_ALIASES: &[(&str, &str)] = &[
    ("the cellar", "cellar-sc"),
    ("blue bottle", "blue-bottle-sf"),
];

pub const DEFAULT_BUSINESS_ID: &str = "cellar-sc";
