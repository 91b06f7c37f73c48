//! Checkbox classification and privacy-conscious defaults.
//!
//! Opt-ins stay unchecked unless the sender explicitly consented to
//! marketing; required agreements (terms, privacy policy) are checked
//! so the form can actually submit.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckboxPurpose {
    /// Newsletter signups and marketing opt-ins.
    Marketing,
    /// Terms of service, privacy policy, data-processing consent.
    Agreement,
    /// "Are you an existing customer?"
    ExistingCustomer,
    Unknown,
}

struct CheckboxRule {
    purpose: CheckboxPurpose,
    patterns: &'static [&'static str],
}

/// Order matters: customer questions and opt-ins are named before the
/// generic agreement vocabulary so "agree to receive offers" lands on
/// Marketing, not Agreement.
const CHECKBOX_RULES: &[CheckboxRule] = &[
    CheckboxRule {
        purpose: CheckboxPurpose::ExistingCustomer,
        patterns: &[
            "existing customer",
            "current customer",
            "already a customer",
            "existing client",
            "have an account",
        ],
    },
    CheckboxRule {
        purpose: CheckboxPurpose::Marketing,
        patterns: &[
            "newsletter",
            "subscribe",
            "marketing",
            "promotional",
            "offers",
            "updates",
            "mailing list",
            "opt_in",
            "opt-in",
            "optin",
            "keep me informed",
        ],
    },
    CheckboxRule {
        purpose: CheckboxPurpose::Agreement,
        patterns: &[
            "terms",
            "tos",
            "conditions",
            "privacy policy",
            "privacy_policy",
            "privacy-policy",
            "privacypolicy",
            "gdpr",
            "data processing",
            "data protection",
            "consent",
            "acknowledge",
            "agree",
        ],
    },
];

pub fn classify(haystack: &str) -> CheckboxPurpose {
    for rule in CHECKBOX_RULES {
        if rule.patterns.iter().any(|p| haystack.contains(p)) {
            return rule.purpose;
        }
    }
    CheckboxPurpose::Unknown
}

/// The state a checkbox should be left in.
pub fn default_state(purpose: CheckboxPurpose, required: bool, marketing_consent: bool) -> bool {
    match purpose {
        CheckboxPurpose::Marketing => marketing_consent,
        CheckboxPurpose::Agreement => true,
        CheckboxPurpose::ExistingCustomer => false,
        // Required unknown checkboxes are almost always agreements.
        CheckboxPurpose::Unknown => required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newsletter_stays_unchecked_without_consent() {
        let purpose = classify("subscribe to our newsletter");
        assert_eq!(purpose, CheckboxPurpose::Marketing);
        assert!(!default_state(purpose, false, false));
        assert!(default_state(purpose, false, true));
    }

    #[test]
    fn terms_get_accepted() {
        let purpose = classify("i agree to the terms and conditions");
        assert_eq!(purpose, CheckboxPurpose::Agreement);
        assert!(default_state(purpose, true, false));
    }

    #[test]
    fn marketing_agreement_reads_as_marketing() {
        let purpose = classify("agree to receive promotional offers");
        assert_eq!(purpose, CheckboxPurpose::Marketing);
    }

    #[test]
    fn existing_customer_defaults_to_no() {
        let purpose = classify("are you an existing customer?");
        assert_eq!(purpose, CheckboxPurpose::ExistingCustomer);
        assert!(!default_state(purpose, false, true));
    }
}
