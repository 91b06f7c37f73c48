//! Option selection for dropdowns and radio groups.
//!
//! Selects that do not map to a profile key usually ask a survey
//! question: how did you hear about us, company size, budget. Each
//! purpose carries an ordered preference list; the first option whose
//! label or value contains a preferred term is chosen, with any
//! "Other" entry as the safety net before the first real option.

use crate::protocol::SelectOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectPurpose {
    ReferralSource,
    Industry,
    CompanySize,
    Budget,
    Timeline,
    ProjectType,
}

struct PurposeRule {
    purpose: SelectPurpose,
    patterns: &'static [&'static str],
}

const PURPOSE_RULES: &[PurposeRule] = &[
    PurposeRule {
        purpose: SelectPurpose::ReferralSource,
        patterns: &[
            "how did you hear",
            "how_did_you_hear",
            "hear about",
            "heard about",
            "referral",
            "referrer",
            "found us",
            "find us",
            "discover",
            "source",
        ],
    },
    PurposeRule {
        purpose: SelectPurpose::Industry,
        patterns: &["industry", "sector", "vertical", "business type", "field of work"],
    },
    PurposeRule {
        purpose: SelectPurpose::CompanySize,
        patterns: &["company size", "company_size", "employees", "team size", "headcount"],
    },
    PurposeRule {
        purpose: SelectPurpose::Budget,
        patterns: &["budget", "price range", "spend", "investment"],
    },
    PurposeRule {
        purpose: SelectPurpose::Timeline,
        patterns: &["timeline", "timeframe", "time frame", "when do you", "how soon", "start date"],
    },
    PurposeRule {
        purpose: SelectPurpose::ProjectType,
        patterns: &[
            "project type",
            "project_type",
            "type of project",
            "service",
            "interested in",
            "what do you need",
            "inquiry type",
            "enquiry type",
        ],
    },
];

/// Preferred answers per purpose, most preferred first. Terms are
/// matched by containment against option label and value.
fn preferred_terms(purpose: SelectPurpose) -> &'static [&'static str] {
    match purpose {
        SelectPurpose::ReferralSource => &[
            "google",
            "search engine",
            "web search",
            "online search",
            "internet",
            "search",
            "social media",
        ],
        SelectPurpose::Industry => &[
            "technology",
            "software",
            "internet",
            "information technology",
            "computer",
            "professional services",
        ],
        SelectPurpose::CompanySize => &["1-10", "2-10", "1-9", "small", "10-49", "11-50"],
        SelectPurpose::Budget => &["not sure", "undecided", "flexible", "discuss", "tbd"],
        SelectPurpose::Timeline => &[
            "flexible",
            "not sure",
            "just researching",
            "exploring",
            "1-3 months",
            "soon",
        ],
        SelectPurpose::ProjectType => &["general", "consultation", "information", "inquiry", "enquiry"],
    }
}

/// Labels that read as "none of the above".
const OTHER_MARKERS: &[&str] = &[
    "other",
    "none of",
    "not listed",
    "something else",
    "prefer not",
    "not sure",
    "unspecified",
    "n/a",
];

/// Placeholder entries that are not real answers.
const PLACEHOLDER_MARKERS: &[&str] = &["select", "choose", "please", "pick one", "--", "..."];

/// Detects what survey question a select is asking, from its field
/// haystack.
pub fn detect_purpose(haystack: &str) -> Option<SelectPurpose> {
    for rule in PURPOSE_RULES {
        if rule.patterns.iter().any(|p| haystack.contains(p)) {
            return Some(rule.purpose);
        }
    }
    None
}

/// Chooses an option for a recognized purpose: first preferred term
/// that matches, else an "Other"-shaped entry.
pub fn choose_for_purpose(purpose: SelectPurpose, options: &[SelectOption]) -> Option<SelectOption> {
    for term in preferred_terms(purpose) {
        if let Some(option) = options.iter().find(|o| option_contains(o, term)) {
            return Some(option.clone());
        }
    }
    other_option(options)
}

/// Finds an option matching a concrete wanted value, label or value,
/// exact before containment.
pub fn match_value(options: &[SelectOption], wanted: &str) -> Option<SelectOption> {
    let wanted = wanted.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    options
        .iter()
        .find(|o| o.value.to_lowercase() == wanted || o.label.trim().to_lowercase() == wanted)
        .or_else(|| options.iter().find(|o| option_contains(o, &wanted)))
        .cloned()
}

/// The "Other" entry, when the list has one.
pub fn other_option(options: &[SelectOption]) -> Option<SelectOption> {
    options
        .iter()
        .find(|o| {
            let label = o.label.trim().to_lowercase();
            OTHER_MARKERS.iter().any(|m| label.starts_with(m) || label == *m)
        })
        .cloned()
}

/// First option that is a real answer rather than a "Please select"
/// placeholder.
pub fn first_real_option(options: &[SelectOption]) -> Option<SelectOption> {
    options
        .iter()
        .find(|o| {
            if o.value.trim().is_empty() {
                return false;
            }
            let label = o.label.trim().to_lowercase();
            !PLACEHOLDER_MARKERS.iter().any(|m| label.contains(m))
        })
        .cloned()
}

fn option_contains(option: &SelectOption, term: &str) -> bool {
    option.label.to_lowercase().contains(term) || option.value.to_lowercase().contains(term)
}
