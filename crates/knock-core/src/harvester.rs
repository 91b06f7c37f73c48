//! Fallback e-mail harvesting for pages without a usable form.
//!
//! Addresses come from `mailto:` links first, then a regex sweep over
//! the rendered text. Results are normalized, cleaned of placeholder
//! and asset junk, deduplicated, and capped, sorted so the same page
//! always yields the same list.

use crate::protocol::PageSnapshot;
use lazy_static::lazy_static;
use regex::Regex;

/// Upper bound on harvested addresses per page.
pub const MAX_EMAILS: usize = 5;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("email pattern");
}

/// Fragments that mark an address as a placeholder or machine
/// mailbox.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "noreply",
    "no-reply",
    "no_reply",
    "donotreply",
    "do-not-reply",
    "example.com",
    "example.org",
    "example.net",
    "test@test",
    "your@",
    "yourname@",
    "youremail@",
    "email@example",
    "placeholder",
    "@sentry",
    "wixpress.com",
];

/// File suffixes that show up when the regex eats an asset path.
const ASSET_SUFFIXES: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".css", ".js",
];

/// Collects candidate addresses from every frame: `mailto:` links
/// first, then the text sweep. Returns at most [`MAX_EMAILS`]
/// addresses, sorted.
pub fn harvest(snapshot: &PageSnapshot) -> Vec<String> {
    let mut found = Vec::new();
    for frame in &snapshot.frames {
        for element in &frame.elements {
            let Some(href) = element.attr("href") else {
                continue;
            };
            if let Some(rest) = href.strip_prefix("mailto:") {
                let address = rest.split(['?', '&']).next().unwrap_or("");
                push_candidate(&mut found, address);
            }
        }
        for m in EMAIL_RE.find_iter(&frame.text) {
            push_candidate(&mut found, m.as_str());
        }
    }
    found.sort();
    found.dedup();
    found.truncate(MAX_EMAILS);
    found
}

/// The address a caller should write to when several were harvested.
pub fn primary(emails: &[String]) -> Option<&str> {
    emails.first().map(|s| s.as_str())
}

fn push_candidate(found: &mut Vec<String>, raw: &str) {
    if let Some(address) = normalize(raw) {
        found.push(address);
    }
}

fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '>', '"', '\''])
        .to_lowercase();
    if trimmed.is_empty() {
        return None;
    }
    let matched = EMAIL_RE.find(&trimmed)?;
    if matched.start() != 0 || matched.end() != trimmed.len() {
        return None;
    }
    if PLACEHOLDER_MARKERS.iter().any(|m| trimmed.contains(m)) {
        return None;
    }
    if ASSET_SUFFIXES.iter().any(|s| trimmed.ends_with(s)) {
        return None;
    }
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Element, FrameSnapshot, PageSnapshot};

    fn page_with_text(text: &str) -> PageSnapshot {
        PageSnapshot::new("https://example.net/")
            .with_frame(FrameSnapshot::new(0, "main").with_text(text))
    }

    #[test]
    fn mailto_and_text_addresses_combine() {
        let frame = FrameSnapshot::new(0, "main")
            .with_element(
                Element::new(1, "a").with_attr("href", "mailto:Sales@Acme.COM?subject=Hi"),
            )
            .with_text("Write to support@acme.com for help.");
        let page = PageSnapshot::new("https://acme.com/").with_frame(frame);
        assert_eq!(harvest(&page), vec!["sales@acme.com", "support@acme.com"]);
    }

    #[test]
    fn placeholders_and_assets_are_dropped() {
        let page = page_with_text(
            "noreply@acme.com hero@2x.png photo@example.com real.person@acme.com",
        );
        assert_eq!(harvest(&page), vec!["real.person@acme.com"]);
    }

    #[test]
    fn trailing_punctuation_is_stripped() {
        let page = page_with_text("Reach us at hello@acme.com.");
        assert_eq!(harvest(&page), vec!["hello@acme.com"]);
    }

    #[test]
    fn output_is_capped_and_sorted() {
        let page = page_with_text(
            "f@a.io e@a.io d@a.io c@a.io b@a.io a@a.io",
        );
        let emails = harvest(&page);
        assert_eq!(emails.len(), MAX_EMAILS);
        assert_eq!(emails[0], "a@a.io");
        assert_eq!(primary(&emails), Some("a@a.io"));
    }
}
