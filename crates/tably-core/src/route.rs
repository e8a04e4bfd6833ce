use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ChatError;

/// Where a message should be routed for context assembly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Weather,
    Business,
    Both,
    Fallback,
}

impl Route {
    /// Whether this route calls for live weather context.
    pub fn includes_weather(&self) -> bool {
        matches!(self, Self::Weather | Self::Both)
    }

    /// Whether this route calls for business-knowledge context.
    pub fn includes_business(&self) -> bool {
        matches!(self, Self::Business | Self::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weather => "weather",
            Self::Business => "business",
            Self::Both => "both",
            Self::Fallback => "fallback",
        }
    }
}

/// Time reference extracted from a message. Serialized as a tagged
/// string: `now`, `relative:<token>`, `explicit:<YYYY-MM-DD>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Timeframe {
    #[default]
    Now,
    Relative(String),
    Explicit(String),
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Now => f.write_str("now"),
            Self::Relative(token) => write!(f, "relative:{token}"),
            Self::Explicit(date) => write!(f, "explicit:{date}"),
        }
    }
}

impl FromStr for Timeframe {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "now" {
            Ok(Self::Now)
        } else if let Some(token) = s.strip_prefix("relative:") {
            Ok(Self::Relative(token.to_string()))
        } else if let Some(date) = s.strip_prefix("explicit:") {
            Ok(Self::Explicit(date.to_string()))
        } else {
            Err(ChatError::InvalidArgument(format!("unknown timeframe: {s}")))
        }
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Business facet a message touches. A message maps to an unordered,
/// deduplicated set of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Hours,
    Menu,
    Wifi,
    Seating,
    Patio,
    Dog,
    Policy,
    Refund,
    Reservation,
    Contact,
    Address,
    Parking,
    Delivery,
}

impl Facet {
    pub const ALL: [Facet; 13] = [
        Facet::Hours,
        Facet::Menu,
        Facet::Wifi,
        Facet::Seating,
        Facet::Patio,
        Facet::Dog,
        Facet::Policy,
        Facet::Refund,
        Facet::Reservation,
        Facet::Contact,
        Facet::Address,
        Facet::Parking,
        Facet::Delivery,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Menu => "menu",
            Self::Wifi => "wifi",
            Self::Seating => "seating",
            Self::Patio => "patio",
            Self::Dog => "dog",
            Self::Policy => "policy",
            Self::Refund => "refund",
            Self::Reservation => "reservation",
            Self::Contact => "contact",
            Self::Address => "address",
            Self::Parking => "parking",
            Self::Delivery => "delivery",
        }
    }
}

/// Input to the intent router.
#[derive(Clone, Debug, Deserialize)]
pub struct RouterInput {
    pub message: String,
    #[serde(rename = "businessId", default)]
    pub business_id: Option<String>,
}

/// Location reference attached to every routing decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl LocationRef {
    pub fn business_id(value: impl Into<String>) -> Self {
        Self {
            kind: "business_id".to_string(),
            value: value.into(),
        }
    }
}

/// Full routing decision for one message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouterOutput {
    pub route: Route,
    pub location: LocationRef,
    pub timeframe: Timeframe,
    pub business_facets: Vec<Facet>,
}
