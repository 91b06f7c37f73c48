//! Post-submission success classification.
//!
//! Six strategies run in order from strongest evidence to weakest:
//! URL change, affirmative page text, success-marked elements, form
//! state, confirmation modals, dynamically revealed alerts. The first
//! hit wins. No hit at all is not a failure verdict; the caller
//! decides what an unverified submission means.

use crate::detector;
use crate::protocol::{Element, PageSnapshot};
use url::Url;

/// Characters inspected around a matched phrase when ruling out
/// negated text like "we did not receive your message".
const NEGATION_WINDOW: usize = 120;

const URL_SUCCESS_TOKENS: &[&str] = &[
    "thank",
    "thanks",
    "success",
    "confirm",
    "confirmation",
    "received",
    "submitted",
    "merci",
    "danke",
    "gracias",
];

const AFFIRMATIVE_PHRASES: &[&str] = &[
    "thank you",
    "thanks for",
    "we'll be in touch",
    "we will be in touch",
    "message sent",
    "message has been sent",
    "your message has been sent",
    "message has been received",
    "we have received",
    "we've received",
    "we received your",
    "successfully sent",
    "successfully submitted",
    "sent successfully",
    "submitted successfully",
    "submission received",
    "your submission",
    "form submitted",
    "form has been submitted",
    "has been submitted",
    "we'll get back to you",
    "we will get back to you",
    "we'll respond",
    "we will respond",
    "respond shortly",
    "someone will contact you",
    "we'll contact you",
    "we will contact you",
    "your request has been received",
    "received your request",
    "your inquiry",
    "your enquiry",
    "got your message",
    "appreciate you reaching out",
    "talk soon",
    "be in contact",
    "thank you for contacting",
    "merci",
    "danke",
    "gracias",
    "grazie",
    "obrigado",
];

/// Words that flip nearby affirmative text into a failure report.
const NEGATIVE_CONTEXT: &[&str] = &[
    "did not",
    "didn't",
    "was not",
    "wasn't",
    "could not",
    "couldn't",
    "unable to",
    "failed",
    "failure",
    "error",
    "problem",
    "invalid",
    "missing",
    "required field",
    "must be",
    "try again",
    "not sent",
    "not be sent",
];

/// Short tokens used when judging a single element's own text.
const AFFIRMATIVE_TOKENS: &[&str] = &[
    "thank",
    "success",
    "received",
    "sent",
    "submitted",
    "confirm",
    "appreciate",
];

/// Class/id/role fragments that mark an element as a success banner.
const SUCCESS_ELEMENT_PATTERNS: &[&str] = &[
    "success",
    "thank",
    "confirmation",
    "form-confirm",
    "submitted",
    "mail-sent",
    "message-sent",
    "alert-success",
    "notification-success",
];

/// Class fragments of dynamically revealed status elements.
const ALERT_CLASS_PATTERNS: &[&str] = &[
    "success",
    "alert",
    "notification",
    "notice",
    "toast",
    "snackbar",
    "status",
];

/// Class/role fragments that mark overlay containers.
const MODAL_MARKERS: &[&str] = &["modal", "popup", "lightbox", "overlay", "dialog", "toast"];

/// Evidence that a submission went through.
#[derive(Debug, Clone, PartialEq)]
pub enum SuccessSignal {
    /// Final URL carries a success token in path or query.
    Url { token: String },
    /// Page text contains an affirmative phrase with no negation
    /// nearby.
    Text { phrase: String },
    /// A visible element is marked as a success banner.
    Element { selector: String },
    /// The form vanished, was hidden, or had its controls disabled.
    FormState { reason: String },
    /// A confirmation overlay appeared.
    Modal { excerpt: String },
    /// A status element became visible that was not visible before.
    Dynamic { excerpt: String },
}

impl SuccessSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            SuccessSignal::Url { .. } => "url",
            SuccessSignal::Text { .. } => "text",
            SuccessSignal::Element { .. } => "element",
            SuccessSignal::FormState { .. } => "form-state",
            SuccessSignal::Modal { .. } => "modal",
            SuccessSignal::Dynamic { .. } => "dynamic",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SuccessSignal::Url { token } => format!("url contains '{}'", token),
            SuccessSignal::Text { phrase } => format!("page text contains '{}'", phrase),
            SuccessSignal::Element { selector } => format!("success element '{}'", selector),
            SuccessSignal::FormState { reason } => reason.clone(),
            SuccessSignal::Modal { excerpt } => format!("confirmation overlay: '{}'", excerpt),
            SuccessSignal::Dynamic { excerpt } => format!("status appeared: '{}'", excerpt),
        }
    }
}

/// Classifies the page state after a submission attempt. `before` is
/// the snapshot taken just before submitting.
pub fn verify(before: &PageSnapshot, after: &PageSnapshot, final_url: &str) -> Option<SuccessSignal> {
    url_signal(final_url)
        .or_else(|| text_signal(after))
        .or_else(|| element_signal(after))
        .or_else(|| form_state_signal(before, after))
        .or_else(|| modal_signal(after))
        .or_else(|| dynamic_signal(before, after))
}

// ============================================================================
// Strategies
// ============================================================================

fn url_signal(final_url: &str) -> Option<SuccessSignal> {
    let url = Url::parse(final_url).ok()?;
    let mut haystack = url.path().to_lowercase();
    if let Some(query) = url.query() {
        haystack.push('?');
        haystack.push_str(&query.to_lowercase());
    }
    URL_SUCCESS_TOKENS
        .iter()
        .find(|t| haystack.contains(*t))
        .map(|t| SuccessSignal::Url {
            token: t.to_string(),
        })
}

fn text_signal(after: &PageSnapshot) -> Option<SuccessSignal> {
    for frame in &after.frames {
        let text = frame.text.to_lowercase();
        if text.is_empty() {
            continue;
        }
        for phrase in AFFIRMATIVE_PHRASES {
            let mut from = 0;
            while let Some(pos) = text[from..].find(phrase) {
                let start = from + pos;
                let end = start + phrase.len();
                if !has_negative_context(&text, start, end) {
                    return Some(SuccessSignal::Text {
                        phrase: phrase.to_string(),
                    });
                }
                from = end;
            }
        }
    }
    None
}

fn element_signal(after: &PageSnapshot) -> Option<SuccessSignal> {
    for frame in &after.frames {
        for element in &frame.elements {
            if !element.is_visible() {
                continue;
            }
            let marker = marker_text(element);
            if !SUCCESS_ELEMENT_PATTERNS.iter().any(|p| marker.contains(p)) {
                continue;
            }
            let text = element.text.as_deref().unwrap_or("").to_lowercase();
            if contains_affirmative_token(&text) && !contains_negative_token(&text) {
                return Some(SuccessSignal::Element {
                    selector: element.selector.clone(),
                });
            }
        }
    }
    None
}

fn form_state_signal(before: &PageSnapshot, after: &PageSnapshot) -> Option<SuccessSignal> {
    let had_forms = !detector::detect_forms(before).is_empty();
    if !had_forms {
        return None;
    }
    let after_candidates = detector::detect_forms(after);
    if after_candidates.is_empty() {
        return Some(SuccessSignal::FormState {
            reason: "form no longer present".to_string(),
        });
    }
    let all_hidden = after_candidates.iter().all(|c| {
        c.form
            .as_ref()
            .and_then(|f| after.get_element(f))
            .map(|e| !e.is_visible())
            .unwrap_or(false)
    });
    if all_hidden {
        return Some(SuccessSignal::FormState {
            reason: "form hidden after submit".to_string(),
        });
    }
    let all_disabled = after_candidates.iter().all(|c| {
        let inputs: Vec<_> = c.fields.iter().filter(|f| f.kind.is_user_input()).collect();
        !inputs.is_empty()
            && inputs.iter().all(|f| {
                after
                    .get_element(&f.element)
                    .map(|e| e.state.disabled)
                    .unwrap_or(false)
            })
    });
    if all_disabled {
        return Some(SuccessSignal::FormState {
            reason: "form controls disabled after submit".to_string(),
        });
    }
    None
}

fn modal_signal(after: &PageSnapshot) -> Option<SuccessSignal> {
    for frame in &after.frames {
        for element in &frame.elements {
            if !element.is_visible() || !is_modal(element) {
                continue;
            }
            let text = element.text.as_deref().unwrap_or("").to_lowercase();
            if contains_affirmative_token(&text) && !contains_negative_token(&text) {
                return Some(SuccessSignal::Modal {
                    excerpt: excerpt(element),
                });
            }
        }
    }
    None
}

fn dynamic_signal(before: &PageSnapshot, after: &PageSnapshot) -> Option<SuccessSignal> {
    let previously_visible: std::collections::HashSet<&str> = before
        .frames
        .iter()
        .flat_map(|f| f.elements.iter())
        .filter(|e| e.is_visible() && !e.selector.is_empty())
        .map(|e| e.selector.as_str())
        .collect();
    for frame in &after.frames {
        for element in &frame.elements {
            if !element.is_visible() {
                continue;
            }
            if !element.selector.is_empty() && previously_visible.contains(element.selector.as_str())
            {
                continue;
            }
            let marker = marker_text(element);
            if !ALERT_CLASS_PATTERNS.iter().any(|p| marker.contains(p)) {
                continue;
            }
            let text = element.text.as_deref().unwrap_or("").to_lowercase();
            if contains_affirmative_token(&text) && !contains_negative_token(&text) {
                return Some(SuccessSignal::Dynamic {
                    excerpt: excerpt(element),
                });
            }
        }
    }
    None
}

// ============================================================================
// Helpers
// ============================================================================

/// Whether the surroundings of `[start, end)` in `text` carry a
/// negation marker.
fn has_negative_context(text: &str, start: usize, end: usize) -> bool {
    let mut from = start.saturating_sub(NEGATION_WINDOW);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + NEGATION_WINDOW).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    let window = &text[from..to];
    NEGATIVE_CONTEXT.iter().any(|n| window.contains(n))
}

fn contains_affirmative_token(text: &str) -> bool {
    AFFIRMATIVE_TOKENS.iter().any(|t| text.contains(t))
}

fn contains_negative_token(text: &str) -> bool {
    NEGATIVE_CONTEXT.iter().any(|n| text.contains(n))
}

fn marker_text(element: &Element) -> String {
    let mut out = String::new();
    for key in ["class", "id"] {
        if let Some(v) = element.attr(key) {
            out.push_str(&v.to_lowercase());
            out.push(' ');
        }
    }
    if let Some(role) = &element.role {
        out.push_str(&role.to_lowercase());
    }
    out
}

fn is_modal(element: &Element) -> bool {
    if matches!(element.role.as_deref(), Some("dialog") | Some("alertdialog")) {
        return true;
    }
    let marker = marker_text(element);
    MODAL_MARKERS.iter().any(|m| marker.contains(m))
}

fn excerpt(element: &Element) -> String {
    let text = element.text.as_deref().unwrap_or("").trim();
    let mut end = text.len().min(80);
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    text[..end].to_string()
}
