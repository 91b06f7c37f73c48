//! The sender profile: semantic key/value pairs supplied by the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Answers the mapper draws from when filling a form. Keys are
/// semantic ("first_name", "email", "message", ...) and normalized to
/// lowercase snake_case on insert, so callers can pass "First Name"
/// and still match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderProfile {
    fields: HashMap<String, String>,
}

impl SenderProfile {
    pub fn new() -> Self {
        SenderProfile::default()
    }

    pub fn from_map(fields: HashMap<String, String>) -> Self {
        let mut profile = SenderProfile::new();
        for (key, value) in fields {
            profile.set(key, value);
        }
        profile
    }

    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.fields.insert(normalize_key(key.as_ref()), value.into());
    }

    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the trimmed value for `key`, or `None` when absent or
    /// blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .get(&normalize_key(key))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Full name, composed from first/last when no explicit name is
    /// set.
    pub fn full_name(&self) -> Option<String> {
        if let Some(name) = self.get("name") {
            return Some(name.to_string());
        }
        match (self.get("first_name"), self.get("last_name")) {
            (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
            (Some(first), None) => Some(first.to_string()),
            (None, Some(last)) => Some(last.to_string()),
            (None, None) => None,
        }
    }

    /// First name, split off a full name when only that is present.
    pub fn first_name(&self) -> Option<String> {
        if let Some(first) = self.get("first_name") {
            return Some(first.to_string());
        }
        self.get("name")
            .and_then(|n| n.split_whitespace().next())
            .map(|s| s.to_string())
    }

    /// Last name, taken from the tail of a full name when needed.
    pub fn last_name(&self) -> Option<String> {
        if let Some(last) = self.get("last_name") {
            return Some(last.to_string());
        }
        let name = self.get("name")?;
        let mut parts = name.split_whitespace();
        parts.next()?;
        let rest: Vec<&str> = parts.collect();
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        }
    }

    /// Whether the sender opted in to marketing communication. Drives
    /// the checkbox defaults.
    pub fn marketing_consent(&self) -> bool {
        matches!(
            self.get("marketing_consent").map(|v| v.to_lowercase()),
            Some(v) if v == "true" || v == "yes" || v == "1"
        )
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}
