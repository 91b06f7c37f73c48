//! Field-to-value resolution.
//!
//! For every answerable field the mapper produces exactly one
//! [`FieldDecision`]. Learned per-domain values outrank pattern
//! matching, pattern matching outranks type-based fallbacks, and every
//! decision carries a confidence so callers can tell a remembered
//! answer from a guess.

pub mod checkbox;
pub mod options;
pub mod synonyms;

use crate::detector::{FieldDescriptor, FieldKind};
use crate::prefs::PreferenceMap;
use crate::profile::SenderProfile;
use std::collections::HashMap;
use tracing::debug;

/// Confidence for a value learned from an earlier verified
/// submission.
pub const CONFIDENCE_LEARNED: f32 = 0.95;
/// Confidence for a synonym, option-group, or checkbox pattern match.
pub const CONFIDENCE_PATTERN: f32 = 0.75;
/// Confidence for a type-based fallback.
pub const CONFIDENCE_FALLBACK: f32 = 0.3;

/// What a field should be set to.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
    /// Option value of a select or radio group.
    Choice(String),
}

impl FieldValue {
    /// Empty values are skipped by the filler; a checkbox decision is
    /// always actionable.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.trim().is_empty(),
            FieldValue::Checked(_) => false,
        }
    }

    /// String form recorded by the learner.
    pub fn as_learnable(&self) -> String {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => s.clone(),
            FieldValue::Checked(true) => "true".to_string(),
            FieldValue::Checked(false) => "false".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Remembered from an earlier verified submission on this domain
    /// (or globally).
    Learned,
    /// Profile value matched through the synonym tables.
    Profile,
    /// Survey-purpose or checkbox-purpose pattern.
    Purpose,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct FieldDecision {
    pub field: FieldDescriptor,
    pub value: FieldValue,
    pub confidence: f32,
    pub source: DecisionSource,
}

/// Resolves fields against a sender profile and the learned
/// preferences for one domain.
pub struct FieldMapper<'a> {
    profile: &'a SenderProfile,
    prefs: &'a PreferenceMap,
    domain: String,
}

impl<'a> FieldMapper<'a> {
    pub fn new(profile: &'a SenderProfile, prefs: &'a PreferenceMap, domain: impl Into<String>) -> Self {
        FieldMapper {
            profile,
            prefs,
            domain: domain.into(),
        }
    }

    /// One decision per answerable field. Hidden inputs, submit
    /// controls, passwords, and file uploads are left untouched.
    pub fn map_fields(&self, fields: &[FieldDescriptor]) -> Vec<FieldDecision> {
        fields
            .iter()
            .filter(|f| is_answerable(f.kind))
            .map(|f| self.resolve(f))
            .collect()
    }

    fn resolve(&self, field: &FieldDescriptor) -> FieldDecision {
        let mut decision = self
            .learned(field)
            .or_else(|| self.from_profile(field))
            .or_else(|| self.from_purpose(field))
            .unwrap_or_else(|| self.fallback(field));
        if field.required && decision.value.is_empty() {
            decision.confidence /= 2.0;
        }
        debug!(
            key = %field.key,
            source = ?decision.source,
            confidence = decision.confidence,
            "resolved field"
        );
        decision
    }

    fn learned(&self, field: &FieldDescriptor) -> Option<FieldDecision> {
        let remembered = self.prefs.lookup(&self.domain, &field.key)?;
        let value = match field.kind {
            FieldKind::Checkbox => FieldValue::Checked(remembered.eq_ignore_ascii_case("true")),
            FieldKind::Select | FieldKind::Radio => {
                // The remembered option may have disappeared from the
                // form since; fall through when it has.
                let option = options::match_value(&field.options, remembered)?;
                FieldValue::Choice(option.value)
            }
            _ => FieldValue::Text(remembered.to_string()),
        };
        Some(FieldDecision {
            field: field.clone(),
            value,
            confidence: CONFIDENCE_LEARNED,
            source: DecisionSource::Learned,
        })
    }

    fn from_profile(&self, field: &FieldDescriptor) -> Option<FieldDecision> {
        if field.kind == FieldKind::Checkbox {
            // Checkboxes only take a direct profile key, never a
            // synonym: "newsletter: true" in the profile is explicit.
            let raw = self.profile.get(&field.key)?;
            return Some(self.decision(
                field,
                FieldValue::Checked(parse_bool(raw)?),
                DecisionSource::Profile,
            ));
        }
        let matched = synonyms::match_profile_key(field.haystack())?;
        let wanted = self.profile_value(matched.key)?;
        let value = match field.kind {
            FieldKind::Select | FieldKind::Radio => {
                let option = options::match_value(&field.options, &wanted)?;
                FieldValue::Choice(option.value)
            }
            _ => FieldValue::Text(wanted),
        };
        Some(self.decision(field, value, DecisionSource::Profile))
    }

    fn from_purpose(&self, field: &FieldDescriptor) -> Option<FieldDecision> {
        match field.kind {
            FieldKind::Select | FieldKind::Radio => {
                let purpose = options::detect_purpose(field.haystack())?;
                let option = options::choose_for_purpose(purpose, &field.options)?;
                Some(self.decision(field, FieldValue::Choice(option.value), DecisionSource::Purpose))
            }
            FieldKind::Checkbox => {
                let purpose = checkbox::classify(field.haystack());
                if purpose == checkbox::CheckboxPurpose::Unknown {
                    return None;
                }
                let state =
                    checkbox::default_state(purpose, field.required, self.profile.marketing_consent());
                Some(self.decision(field, FieldValue::Checked(state), DecisionSource::Purpose))
            }
            _ => None,
        }
    }

    fn fallback(&self, field: &FieldDescriptor) -> FieldDecision {
        let value = match field.kind {
            FieldKind::Date => FieldValue::Text(today()),
            FieldKind::Select | FieldKind::Radio => FieldValue::Choice(
                options::first_real_option(&field.options)
                    .map(|o| o.value)
                    .unwrap_or_default(),
            ),
            FieldKind::Checkbox => FieldValue::Checked(field.required),
            _ => FieldValue::Text(String::new()),
        };
        FieldDecision {
            field: field.clone(),
            value,
            confidence: CONFIDENCE_FALLBACK,
            source: DecisionSource::Fallback,
        }
    }

    fn decision(
        &self,
        field: &FieldDescriptor,
        value: FieldValue,
        source: DecisionSource,
    ) -> FieldDecision {
        FieldDecision {
            field: field.clone(),
            value,
            confidence: CONFIDENCE_PATTERN,
            source,
        }
    }

    /// Profile lookup with name composition: a form asking for a full
    /// name is answered even when the profile only carries first and
    /// last, and the other way round.
    fn profile_value(&self, key: &str) -> Option<String> {
        match key {
            "name" => self.profile.full_name(),
            "first_name" => self.profile.first_name(),
            "last_name" => self.profile.last_name(),
            _ => self.profile.get(key).map(|v| v.to_string()),
        }
    }
}

/// Values worth remembering after a verified submission, keyed by
/// field key.
pub fn learned_map(decisions: &[FieldDecision]) -> HashMap<String, String> {
    decisions
        .iter()
        .filter(|d| !d.value.is_empty() && !d.field.key.is_empty())
        .map(|d| (d.field.key.clone(), d.value.as_learnable()))
        .collect()
}

fn is_answerable(kind: FieldKind) -> bool {
    kind.is_user_input() && !matches!(kind, FieldKind::Password | FieldKind::File)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "1" | "checked" => Some(true),
        "false" | "no" | "0" | "unchecked" => Some(false),
        _ => None,
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}
