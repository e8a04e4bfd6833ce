use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use tably_core::knowledge::KnowledgeChunk;

const HOURS_KEYWORDS: &[&str] = &[
    "hours", "open", "close", "time", "schedule", "brunch", "lunch", "dinner", "happy hour",
];
const CONTACT_KEYWORDS: &[&str] = &[
    "address", "phone", "email", "website", "contact", "location", "directions",
];
const POLICIES_KEYWORDS: &[&str] = &[
    "policy", "policies", "reservation", "reservations", "reserve", "booking", "book",
    "table", "tables", "pet", "pets", "dog", "dogs",
];
const AMENITIES_KEYWORDS: &[&str] = &[
    "amenity", "amenities", "music", "live", "patio", "outdoor", "seating",
];
const BASIC_INFO_KEYWORDS: &[&str] = &["name", "type", "business", "cellar", "wine", "bar", "cafe"];

#[derive(Debug, Deserialize)]
struct BusinessDoc {
    business: Option<BusinessSection>,
    hours: Option<HoursSection>,
    policies: Option<Mapping>,
    amenities: Option<Mapping>,
}

#[derive(Debug, Deserialize)]
struct BusinessSection {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    address: Option<String>,
    contact: Option<ContactSection>,
}

#[derive(Debug, Deserialize)]
struct ContactSection {
    phone: Option<String>,
    email: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HoursSection {
    regular: Option<Mapping>,
    service_notes: Option<Mapping>,
}

/// Immutable chunked view of the business-info document. Built once;
/// a failed load yields an empty (degraded) base so the process keeps
/// serving, just without business context.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeBase {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from disk. Never fails: unreadable or malformed documents
    /// degrade to an empty base, logged.
    pub fn load(path: &Path) -> Self {
        let yaml = match std::fs::read_to_string(path) {
            Ok(yaml) => yaml,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "business info unreadable, continuing without knowledge");
                return Self::empty();
            }
        };

        match Self::from_yaml(&yaml) {
            Ok(base) => {
                info!(path = %path.display(), chunks = base.chunks.len(), "business info loaded");
                base
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "business info malformed, continuing without knowledge");
                Self::empty()
            }
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let doc: BusinessDoc = serde_yaml::from_str(yaml)?;
        Ok(Self::from_doc(doc))
    }

    fn from_doc(doc: BusinessDoc) -> Self {
        let Some(business) = doc.business else {
            warn!("business section missing, continuing without knowledge");
            return Self::empty();
        };

        let mut chunks = Vec::new();

        // Chunk order is fixed: hours, contact, policies, amenities,
        // basic info. Retrieval preserves it.
        if let Some(hours) = &doc.hours {
            if let (Some(regular), Some(notes)) = (&hours.regular, &hours.service_notes) {
                let content = format!(
                    "Regular hours: {}. Service notes: {}",
                    join_entries(regular, ", "),
                    join_entries(notes, ", "),
                );
                chunks.push(KnowledgeChunk::new("hours", content, HOURS_KEYWORDS));
            }
        }

        if let Some(contact) = &business.contact {
            let content = format!(
                "Address: {}. Phone: {}. Email: {}. Website: {}",
                business.address.as_deref().unwrap_or_default(),
                contact.phone.as_deref().unwrap_or_default(),
                contact.email.as_deref().unwrap_or_default(),
                contact.website.as_deref().unwrap_or_default(),
            );
            chunks.push(KnowledgeChunk::new("contact", content, CONTACT_KEYWORDS));
        }

        if let Some(policies) = &doc.policies {
            chunks.push(KnowledgeChunk::new(
                "policies",
                join_entries(policies, ". "),
                POLICIES_KEYWORDS,
            ));
        }

        if let Some(amenities) = &doc.amenities {
            chunks.push(KnowledgeChunk::new(
                "amenities",
                join_entries(amenities, ". "),
                AMENITIES_KEYWORDS,
            ));
        }

        if let (Some(name), Some(kind), Some(address)) =
            (&business.name, &business.kind, &business.address)
        {
            chunks.push(KnowledgeChunk::new(
                "basic_info",
                format!("{name} is a {kind} located in {address}"),
                BASIC_INFO_KEYWORDS,
            ));
        }

        Self { chunks }
    }

    /// Any-keyword substring match against the lowercased query,
    /// creation order preserved.
    pub fn retrieve(&self, query: &str) -> Vec<KnowledgeChunk> {
        let lower = query.to_lowercase();
        self.chunks
            .iter()
            .filter(|c| c.matches(&lower))
            .cloned()
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_degraded(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// "key: value" pairs in document order.
fn join_entries(mapping: &Mapping, separator: &str) -> String {
    mapping
        .iter()
        .map(|(k, v)| format!("{}: {}", scalar_to_string(k), scalar_to_string(v)))
        .collect::<Vec<_>>()
        .join(separator)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim_end().to_string(),
    }
}

/// Shared handle over the current knowledge base. Reload builds a new
/// immutable base and swaps it in atomically; in-flight requests keep
/// the base they started with.
pub struct KnowledgeStore {
    inner: RwLock<Arc<KnowledgeBase>>,
}

impl KnowledgeStore {
    pub fn new(base: KnowledgeBase) -> Self {
        Self {
            inner: RwLock::new(Arc::new(base)),
        }
    }

    pub fn current(&self) -> Arc<KnowledgeBase> {
        self.inner.read().clone()
    }

    pub fn swap(&self, base: KnowledgeBase) {
        *self.inner.write() = Arc::new(base);
    }

    pub fn reload_from(&self, path: &Path) {
        self.swap(KnowledgeBase::load(path));
    }
}
