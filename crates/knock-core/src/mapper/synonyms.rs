//! Synonym tables mapping attribute-name variants to profile keys.
//!
//! Form authors name the same field a hundred ways: `fname`,
//! `your-first-name`, `billing_first_name`. Each group below collects
//! the variants seen in the wild for one semantic profile key. Lookup
//! is longest-pattern-first so `first_name` beats the bare `name`
//! inside it, with a fuzzy pass behind it to absorb typos like
//! `emial`.

use lazy_static::lazy_static;
use strsim::jaro_winkler;
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a typo-tolerant match.
const FUZZY_THRESHOLD: f64 = 0.92;

/// Tokens shorter than this are too ambiguous to fuzzy-match.
const FUZZY_MIN_LEN: usize = 4;

pub struct SynonymGroup {
    /// Semantic profile key the group resolves to.
    pub key: &'static str,
    /// Lowercase fragments matched against the field haystack.
    pub patterns: &'static [&'static str],
}

pub const SYNONYM_GROUPS: &[SynonymGroup] = &[
    SynonymGroup {
        key: "first_name",
        patterns: &[
            "first_name",
            "firstname",
            "first-name",
            "first name",
            "fname",
            "forename",
            "given_name",
            "given-name",
            "givenname",
            "given name",
            "your-first-name",
        ],
    },
    SynonymGroup {
        key: "last_name",
        patterns: &[
            "last_name",
            "lastname",
            "last-name",
            "last name",
            "lname",
            "surname",
            "family_name",
            "family-name",
            "familyname",
            "family name",
            "your-last-name",
        ],
    },
    SynonymGroup {
        key: "name",
        patterns: &[
            "full_name",
            "fullname",
            "full-name",
            "full name",
            "your_name",
            "your-name",
            "yourname",
            "your name",
            "contact_name",
            "contact-name",
            "contact name",
            "from_name",
            "sender_name",
            "realname",
            "name",
        ],
    },
    SynonymGroup {
        key: "email",
        patterns: &[
            "email_address",
            "emailaddress",
            "email address",
            "e-mail address",
            "your-email",
            "your_email",
            "your email",
            "sender_email",
            "contact_email",
            "reply_to",
            "reply-to",
            "replyto",
            "e-mail",
            "email",
            "mail",
        ],
    },
    SynonymGroup {
        key: "phone",
        patterns: &[
            "phone_number",
            "phonenumber",
            "phone-number",
            "phone number",
            "telephone",
            "your-phone",
            "your phone",
            "contact_number",
            "contact number",
            "cellphone",
            "cell phone",
            "cell_phone",
            "mobile",
            "phone",
            "tel",
        ],
    },
    SynonymGroup {
        key: "company",
        patterns: &[
            "company_name",
            "companyname",
            "company-name",
            "company name",
            "organization",
            "organisation",
            "business_name",
            "business name",
            "businessname",
            "employer",
            "agency",
            "company",
        ],
    },
    SynonymGroup {
        key: "job_title",
        patterns: &[
            "job_title",
            "jobtitle",
            "job-title",
            "job title",
            "job_role",
            "occupation",
            "designation",
            "position",
            "your-title",
            "title",
            "role",
        ],
    },
    SynonymGroup {
        key: "website",
        patterns: &[
            "website",
            "web_site",
            "web site",
            "your-website",
            "homepage",
            "home_page",
            "company_website",
            "web_address",
            "webaddress",
            "web address",
            "site_url",
            "siteurl",
            "domain",
            "url",
        ],
    },
    SynonymGroup {
        key: "address",
        patterns: &[
            "street_address",
            "street-address",
            "street address",
            "streetaddress",
            "address_line",
            "address line",
            "address1",
            "address_1",
            "mailing_address",
            "mailing address",
            "your-address",
            "street",
            "address",
        ],
    },
    SynonymGroup {
        key: "city",
        patterns: &["city", "town", "locality", "suburb", "municipality"],
    },
    SynonymGroup {
        key: "state",
        patterns: &[
            "state_province",
            "state-province",
            "state/province",
            "province",
            "state",
            "region",
            "county",
        ],
    },
    SynonymGroup {
        key: "zip",
        patterns: &[
            "postal_code",
            "postal-code",
            "postal code",
            "postalcode",
            "postcode",
            "post_code",
            "post code",
            "zip_code",
            "zip-code",
            "zip code",
            "zipcode",
            "zip",
            "postal",
        ],
    },
    SynonymGroup {
        key: "country",
        patterns: &[
            "country_code",
            "country-code",
            "country code",
            "countrycode",
            "country_name",
            "country name",
            "your-country",
            "country",
        ],
    },
    SynonymGroup {
        key: "subject",
        patterns: &[
            "subject_line",
            "msg_subject",
            "your-subject",
            "subject",
            "topic",
            "regarding",
            "reason for",
            "reason",
            "purpose",
        ],
    },
    SynonymGroup {
        key: "message",
        patterns: &[
            "your-message",
            "your_message",
            "your message",
            "project_details",
            "project description",
            "how can we help",
            "tell us",
            "message",
            "comments",
            "comment",
            "inquiry",
            "enquiry",
            "question",
            "description",
            "details",
            "feedback",
            "notes",
            "body",
            "msg",
        ],
    },
];

/// A resolved haystack match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynonymMatch {
    pub key: &'static str,
    pub pattern: &'static str,
    pub fuzzy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("group '{0}' has no patterns")]
    EmptyGroup(&'static str),
    #[error("group '{group}' pattern '{pattern}' {problem}")]
    MalformedPattern {
        group: &'static str,
        pattern: &'static str,
        problem: &'static str,
    },
    #[error("pattern '{pattern}' is claimed by both '{first}' and '{second}'")]
    DuplicatePattern {
        pattern: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

struct FuzzyPattern {
    key: &'static str,
    pattern: &'static str,
    normalized: String,
}

struct CompiledTables {
    fuzzy: Vec<FuzzyPattern>,
}

impl CompiledTables {
    fn build() -> Result<Self, TableError> {
        validate_groups()?;
        let mut fuzzy = Vec::new();
        for group in SYNONYM_GROUPS {
            for pattern in group.patterns {
                let normalized = normalize_token(pattern);
                if normalized.len() >= FUZZY_MIN_LEN {
                    fuzzy.push(FuzzyPattern {
                        key: group.key,
                        pattern,
                        normalized,
                    });
                }
            }
        }
        Ok(CompiledTables { fuzzy })
    }
}

lazy_static! {
    static ref COMPILED: CompiledTables =
        CompiledTables::build().expect("synonym tables failed validation");
}

/// Checks every pattern for the properties lookup relies on:
/// non-empty, trimmed, lowercase, and claimed by a single group.
pub fn validate_groups() -> Result<(), TableError> {
    let mut seen: std::collections::HashMap<&'static str, &'static str> =
        std::collections::HashMap::new();
    for group in SYNONYM_GROUPS {
        if group.patterns.is_empty() {
            return Err(TableError::EmptyGroup(group.key));
        }
        for pattern in group.patterns {
            if pattern.is_empty() {
                return Err(TableError::MalformedPattern {
                    group: group.key,
                    pattern,
                    problem: "is empty",
                });
            }
            if pattern.trim() != *pattern {
                return Err(TableError::MalformedPattern {
                    group: group.key,
                    pattern,
                    problem: "has surrounding whitespace",
                });
            }
            if pattern.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(TableError::MalformedPattern {
                    group: group.key,
                    pattern,
                    problem: "is not lowercase",
                });
            }
            if let Some(owner) = seen.insert(pattern, group.key) {
                if owner != group.key {
                    return Err(TableError::DuplicatePattern {
                        pattern,
                        first: owner,
                        second: group.key,
                    });
                }
            }
        }
    }
    Ok(())
}

/// Resolves a field haystack to a profile key.
///
/// Exact containment runs first, longest pattern winning so that
/// `first_name` beats the `name` buried inside it. When nothing
/// contains a pattern, individual haystack tokens are compared
/// fuzzily to absorb misspellings.
pub fn match_profile_key(haystack: &str) -> Option<SynonymMatch> {
    let mut best: Option<SynonymMatch> = None;
    let mut best_len = 0;
    for group in SYNONYM_GROUPS {
        for pattern in group.patterns {
            if pattern.len() > best_len && haystack.contains(pattern) {
                best = Some(SynonymMatch {
                    key: group.key,
                    pattern,
                    fuzzy: false,
                });
                best_len = pattern.len();
            }
        }
    }
    if best.is_some() {
        return best;
    }
    fuzzy_match(haystack)
}

fn fuzzy_match(haystack: &str) -> Option<SynonymMatch> {
    let mut best: Option<(f64, SynonymMatch)> = None;
    for token in haystack.split(|c: char| !c.is_ascii_alphanumeric()) {
        if token.len() < FUZZY_MIN_LEN {
            continue;
        }
        for entry in &COMPILED.fuzzy {
            let score = jaro_winkler(token, &entry.normalized);
            if score < FUZZY_THRESHOLD {
                continue;
            }
            if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                best = Some((
                    score,
                    SynonymMatch {
                        key: entry.key,
                        pattern: entry.pattern,
                        fuzzy: true,
                    },
                ));
            }
        }
    }
    best.map(|(_, m)| m)
}

fn normalize_token(pattern: &str) -> String {
    pattern
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_pass_validation() {
        validate_groups().unwrap();
    }

    #[test]
    fn longest_pattern_wins() {
        let m = match_profile_key("your-first-name").unwrap();
        assert_eq!(m.key, "first_name");
        let m = match_profile_key("input name email_address required").unwrap();
        assert_eq!(m.key, "email");
    }

    #[test]
    fn fuzzy_absorbs_typos() {
        let m = match_profile_key("emial").unwrap();
        assert_eq!(m.key, "email");
        assert!(m.fuzzy);
        let m = match_profile_key("phonne").unwrap();
        assert_eq!(m.key, "phone");
        assert!(m.fuzzy);
    }

    #[test]
    fn unknown_haystack_matches_nothing() {
        assert!(match_profile_key("xq9").is_none());
    }
}
