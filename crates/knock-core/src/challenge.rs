//! Challenge-widget detection.
//!
//! Finds the anti-bot widget on a page and identifies its family so
//! the engine can hand it to an external solver. Detection only; no
//! solving happens here.

use crate::protocol::{Element, ElementRef, FrameSnapshot, PageSnapshot};
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Recaptcha,
    Hcaptcha,
    Turnstile,
    /// Unbranded image or question challenges.
    Generic,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Recaptcha => "recaptcha",
            ChallengeKind::Hcaptcha => "hcaptcha",
            ChallengeKind::Turnstile => "turnstile",
            ChallengeKind::Generic => "generic",
        }
    }

    /// Name of the hidden response field the widget reads its token
    /// from, when the family has one.
    pub fn response_field(&self) -> Option<&'static str> {
        match self {
            ChallengeKind::Recaptcha => Some("g-recaptcha-response"),
            ChallengeKind::Hcaptcha => Some("h-captcha-response"),
            ChallengeKind::Turnstile => Some("cf-turnstile-response"),
            ChallengeKind::Generic => None,
        }
    }
}

/// A challenge found on the page.
#[derive(Debug, Clone)]
pub struct DetectedChallenge {
    pub kind: ChallengeKind,
    pub element: ElementRef,
    pub site_key: Option<String>,
}

struct ChallengeMarker {
    kind: ChallengeKind,
    matches: fn(&Element) -> bool,
}

/// Branded families first; the generic catch-all runs last.
const CHALLENGE_MARKERS: &[ChallengeMarker] = &[
    ChallengeMarker {
        kind: ChallengeKind::Recaptcha,
        matches: |e| marker_blob(e).contains("recaptcha"),
    },
    ChallengeMarker {
        kind: ChallengeKind::Hcaptcha,
        matches: |e| {
            let blob = marker_blob(e);
            blob.contains("hcaptcha") || blob.contains("h-captcha")
        },
    },
    ChallengeMarker {
        kind: ChallengeKind::Turnstile,
        matches: |e| marker_blob(e).contains("turnstile"),
    },
    ChallengeMarker {
        kind: ChallengeKind::Generic,
        matches: |e| marker_blob(e).contains("captcha"),
    },
];

lazy_static! {
    static ref SITE_KEY_PARAM: Regex = Regex::new(r"[?&]k=([A-Za-z0-9_\-]+)").expect("site key pattern");
}

/// First challenge widget found, scanning markers in priority order
/// across every frame.
pub fn detect_challenge(snapshot: &PageSnapshot) -> Option<DetectedChallenge> {
    for marker in CHALLENGE_MARKERS {
        for frame in &snapshot.frames {
            for element in &frame.elements {
                if !(marker.matches)(element) {
                    continue;
                }
                return Some(DetectedChallenge {
                    kind: marker.kind,
                    element: ElementRef::new(frame.index, element.id),
                    site_key: site_key_of(frame, element),
                });
            }
        }
    }
    None
}

fn marker_blob(element: &Element) -> String {
    let mut blob = String::new();
    for key in ["class", "id", "src", "data-sitekey", "name"] {
        if let Some(v) = element.attr(key) {
            blob.push_str(&v.to_lowercase());
            blob.push(' ');
        }
    }
    blob
}

/// Site key from the element itself, a `k=` iframe parameter, or a
/// sibling carrying `data-sitekey`.
fn site_key_of(frame: &FrameSnapshot, element: &Element) -> Option<String> {
    if let Some(key) = element.attr("data-sitekey") {
        return Some(key.to_string());
    }
    if let Some(src) = element.attr("src") {
        if let Some(captures) = SITE_KEY_PARAM.captures(src) {
            return Some(captures[1].to_string());
        }
    }
    frame
        .elements
        .iter()
        .find_map(|e| e.attr("data-sitekey").map(|k| k.to_string()))
}
