use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Process-local keyed cache with per-entry TTL. Values are stored as
/// JSON so one instance serves heterogeneous lookups (geocoding and
/// weather share it). An expired entry is a miss and is evicted on
/// access.
#[derive(Default)]
pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        {
            let entry = self.entries.get(key)?;
            if entry.expires_at > Instant::now() {
                return serde_json::from_value(entry.value.clone()).ok();
            }
        }
        // Expired; drop the read guard before removing.
        self.entries.remove(key);
        None
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries.insert(
                    key.to_string(),
                    CacheEntry {
                        value,
                        expires_at: Instant::now() + ttl,
                    },
                );
            }
            Err(e) => warn!(key, error = %e, "dropping uncacheable value"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
