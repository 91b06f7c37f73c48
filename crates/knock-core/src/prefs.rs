//! Learned field preferences, scoped per domain with a global
//! fallback.
//!
//! When a submission is verified successful, the values that were
//! actually used are recorded against the form's field keys. On later
//! visits those recordings outrank pattern matching: a site that was
//! answered once gets answered the same way again.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Scope token for entries that apply to every domain.
pub const GLOBAL_SCOPE: &str = "global";

/// Where a learned entry applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PreferenceScope {
    Global,
    Domain(String),
}

impl PreferenceScope {
    /// Domain scope from a bare host or a full URL.
    pub fn domain(raw: &str) -> Self {
        PreferenceScope::Domain(normalize_domain(raw))
    }

    pub fn as_key(&self) -> &str {
        match self {
            PreferenceScope::Global => GLOBAL_SCOPE,
            PreferenceScope::Domain(domain) => domain.as_str(),
        }
    }

    pub fn from_key(key: &str) -> Self {
        if key == GLOBAL_SCOPE {
            PreferenceScope::Global
        } else {
            PreferenceScope::Domain(key.to_string())
        }
    }
}

/// Lowercased registrable host with any leading `www.` removed.
/// Accepts bare domains, hosts with paths, and full URLs.
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();
    let host = if let Ok(url) = Url::parse(&trimmed) {
        url.host_str().map(|h| h.to_string()).unwrap_or(trimmed)
    } else {
        trimmed
            .split(['/', '?', '#'])
            .next()
            .unwrap_or("")
            .to_string()
    };
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// In-memory view of every learned entry, keyed scope -> field key ->
/// value. This is what the mapper consults; persistence lives behind a
/// store trait in the engine crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceMap {
    scopes: HashMap<String, HashMap<String, String>>,
}

impl PreferenceMap {
    pub fn new() -> Self {
        PreferenceMap::default()
    }

    /// Domain entry first, global entry as fallback.
    pub fn lookup(&self, domain: &str, key: &str) -> Option<&str> {
        self.get(&PreferenceScope::domain(domain), key)
            .or_else(|| self.get(&PreferenceScope::Global, key))
    }

    pub fn get(&self, scope: &PreferenceScope, key: &str) -> Option<&str> {
        self.scopes
            .get(scope.as_key())
            .and_then(|entries| entries.get(key))
            .map(|v| v.as_str())
    }

    /// Additive merge: existing keys are overwritten, other keys in
    /// the scope are kept.
    pub fn merge(&mut self, scope: &PreferenceScope, entries: &HashMap<String, String>) {
        if entries.is_empty() {
            return;
        }
        let slot = self.scopes.entry(scope.as_key().to_string()).or_default();
        for (key, value) in entries {
            slot.insert(key.clone(), value.clone());
        }
    }

    pub fn scope_entries(&self, scope: &PreferenceScope) -> Option<&HashMap<String, String>> {
        self.scopes.get(scope.as_key())
    }

    pub fn scope_keys(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
