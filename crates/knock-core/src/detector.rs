//! Contact-form discovery and ranking.
//!
//! Every frame of a snapshot is scanned for form-shaped containers.
//! Each candidate is scored by contact vocabulary, field makeup, and
//! size, then the candidates are ranked best-first. Scoring is pure
//! and deterministic: the same snapshot always produces the same
//! ordering.

use crate::protocol::{Element, ElementRef, FrameSnapshot, PageSnapshot, SelectOption};
use std::collections::HashSet;
use url::Url;

/// Maximum vertical distance between a form and a submit control that
/// sits outside it but still belongs to it.
pub const EXTERNAL_SUBMIT_MAX_GAP_PX: f64 = 200.0;

/// Maximum vertical distance when borrowing adjacent text as a field
/// label.
const MAX_LABEL_GAP_PX: f64 = 40.0;

/// Field count above which a candidate starts losing points.
const FIELD_COUNT_SOFT_CAP: usize = 15;

/// Phrases that mark a container as contact-shaped, with their score
/// contribution. Each phrase counts once per candidate.
const CONTACT_VOCAB: &[(&str, i32)] = &[
    ("contact", 30),
    ("get in touch", 30),
    ("reach out", 25),
    ("inquiry", 25),
    ("enquiry", 25),
    ("write to us", 20),
    ("talk to us", 20),
    ("email us", 20),
    ("request a quote", 20),
    ("work with us", 15),
    ("say hello", 15),
    ("feedback", 15),
    ("message", 15),
    ("your name", 10),
    ("how can we help", 20),
    ("send", 10),
    ("support", 10),
];

/// Phrases that mark a container as something other than a contact
/// form.
const NEGATIVE_VOCAB: &[(&str, i32)] = &[
    ("password", -30),
    ("log in", -25),
    ("login", -25),
    ("sign in", -25),
    ("signin", -25),
    ("register", -20),
    ("sign up", -20),
    ("signup", -20),
    ("checkout", -40),
    ("credit card", -40),
    ("card number", -40),
    ("coupon", -20),
    ("promo code", -20),
    ("track order", -20),
    ("forgot", -20),
    ("search", -15),
    ("newsletter", -10),
    ("subscribe", -10),
];

/// Link text or path fragments that point at a contact page.
const CONTACT_LINK_HINTS: &[(&str, i32)] = &[
    ("contact", 40),
    ("get in touch", 30),
    ("get-in-touch", 30),
    ("getintouch", 30),
    ("enquiry", 20),
    ("inquiry", 20),
    ("write to us", 20),
    ("reach", 15),
    ("support", 12),
    ("feedback", 12),
    ("quote", 10),
    ("hire", 10),
    ("help", 8),
    ("talk", 8),
    ("about", 6),
];

/// Button captions that read as "submit this form".
const SUBMIT_TEXT: &[&str] = &[
    "submit",
    "send",
    "get in touch",
    "contact us",
    "message",
    "request",
    "enquire",
    "inquire",
    "reach out",
    "let's talk",
];

// ============================================================================
// Field model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Url,
    Number,
    Date,
    Password,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Hidden,
    Submit,
    Button,
    File,
    Other,
}

impl FieldKind {
    /// Classifies an element as a form field, or `None` for anything
    /// that is not one.
    pub fn classify(element: &Element) -> Option<FieldKind> {
        match element.element_type.as_str() {
            "textarea" => Some(FieldKind::Textarea),
            "select" => Some(FieldKind::Select),
            "button" => match element.input_type() {
                None | Some("submit") => Some(FieldKind::Submit),
                _ => Some(FieldKind::Button),
            },
            "input" => Some(match element.input_type().unwrap_or("text") {
                "text" => FieldKind::Text,
                "email" => FieldKind::Email,
                "tel" => FieldKind::Phone,
                "url" => FieldKind::Url,
                "number" => FieldKind::Number,
                "date" | "datetime-local" => FieldKind::Date,
                "password" => FieldKind::Password,
                "checkbox" => FieldKind::Checkbox,
                "radio" => FieldKind::Radio,
                "hidden" => FieldKind::Hidden,
                "submit" | "image" => FieldKind::Submit,
                "button" | "reset" => FieldKind::Button,
                "file" => FieldKind::File,
                "search" => FieldKind::Text,
                _ => FieldKind::Other,
            }),
            _ => None,
        }
    }

    /// Accepts typed text.
    pub fn is_text_entry(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Email
                | FieldKind::Phone
                | FieldKind::Url
                | FieldKind::Number
                | FieldKind::Date
                | FieldKind::Textarea
        )
    }

    /// A field the sender is expected to answer, as opposed to
    /// plumbing like hidden inputs and submit controls.
    pub fn is_user_input(&self) -> bool {
        !matches!(self, FieldKind::Hidden | FieldKind::Submit | FieldKind::Button)
    }

    fn weight(&self) -> i32 {
        match self {
            FieldKind::Textarea => 12,
            FieldKind::Email => 10,
            FieldKind::Text
            | FieldKind::Phone
            | FieldKind::Url
            | FieldKind::Number
            | FieldKind::Date => 6,
            FieldKind::Select | FieldKind::Radio | FieldKind::Checkbox => 4,
            FieldKind::Other | FieldKind::File => 2,
            FieldKind::Submit | FieldKind::Button => 2,
            FieldKind::Hidden => 1,
            FieldKind::Password => 0,
        }
    }
}

/// One answerable field of a candidate form. Radio groups collapse
/// into a single descriptor carrying the group's options.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub element: ElementRef,
    pub kind: FieldKind,
    /// Stable key used for learned preferences: name attribute, else
    /// id, else selector.
    pub key: String,
    pub label: Option<String>,
    pub placeholder: Option<String>,
    pub required: bool,
    pub options: Vec<SelectOption>,
    haystack: String,
}

impl FieldDescriptor {
    fn build(frame: &FrameSnapshot, element: &Element, kind: FieldKind) -> Self {
        let key = element
            .attr("name")
            .or_else(|| element.attr("id"))
            .map(|s| s.to_string())
            .unwrap_or_else(|| element.selector.clone());
        let label = element
            .label
            .clone()
            .or_else(|| nearest_label_text(frame, element));
        let mut haystack = element.haystack();
        if let Some(label) = &label {
            let lowered = label.to_lowercase();
            if !haystack.contains(&lowered) {
                haystack.push(' ');
                haystack.push_str(&lowered);
            }
        }
        FieldDescriptor {
            element: ElementRef::new(frame.index, element.id),
            kind,
            key,
            label,
            placeholder: element.placeholder.clone(),
            required: is_required(element),
            options: element.options.clone(),
            haystack,
        }
    }

    /// Lowercased identifying text: attributes plus resolved label.
    pub fn haystack(&self) -> &str {
        &self.haystack
    }
}

fn is_required(element: &Element) -> bool {
    element.attributes.contains_key("required")
        || element.attr("aria-required") == Some("true")
}

/// Text sitting just above or beside an unlabeled field, borrowed as
/// its label.
fn nearest_label_text(frame: &FrameSnapshot, field: &Element) -> Option<String> {
    let mut best: Option<(f64, &str)> = None;
    for other in &frame.elements {
        if other.id == field.id || !other.is_visible() {
            continue;
        }
        if !matches!(other.element_type.as_str(), "label" | "text" | "span" | "div" | "p") {
            continue;
        }
        let text = match &other.text {
            Some(t) if !t.trim().is_empty() && t.len() <= 60 => t.trim(),
            _ => continue,
        };
        let gap = other.rect.vertical_gap(&field.rect);
        if gap > MAX_LABEL_GAP_PX {
            continue;
        }
        let overlaps = other.rect.x < field.rect.x + field.rect.width
            && other.rect.x + other.rect.width > field.rect.x;
        let above = other.rect.y <= field.rect.y;
        if !(overlaps && above) {
            continue;
        }
        if best.map(|(d, _)| gap < d).unwrap_or(true) {
            best = Some((gap, text));
        }
    }
    best.map(|(_, text)| text.to_string())
}

// ============================================================================
// Candidates
// ============================================================================

/// A scored contact-form candidate. `form` is `None` for synthesized
/// candidates built from loose fields with no enclosing container.
#[derive(Debug, Clone)]
pub struct FormCandidate {
    pub form: Option<ElementRef>,
    pub frame: usize,
    pub fields: Vec<FieldDescriptor>,
    pub score: i32,
}

impl FormCandidate {
    /// Negative scores mean the candidate matched anti-contact
    /// vocabulary (login, checkout, search) and should not be filled.
    pub fn is_viable(&self) -> bool {
        self.score >= 0
    }

    /// Id attribute of the container, used to find submit controls
    /// linked by a `form` attribute.
    fn container_id<'a>(&self, frame: &'a FrameSnapshot) -> Option<&'a str> {
        let form = self.form.as_ref()?;
        frame.get_element(form.id).and_then(|e| e.attr("id"))
    }
}

/// Scans every frame and returns the scored candidates, best first.
/// Ties keep encounter order.
pub fn detect_forms(snapshot: &PageSnapshot) -> Vec<FormCandidate> {
    let mut candidates = Vec::new();
    for frame in &snapshot.frames {
        collect_frame_candidates(frame, &mut candidates);
    }
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

fn collect_frame_candidates(frame: &FrameSnapshot, out: &mut Vec<FormCandidate>) {
    let mut frame_candidates = Vec::new();
    for element in &frame.elements {
        if !is_form_container(element) {
            continue;
        }
        let fields = collect_fields(frame, element);
        if !fields.iter().any(|f| f.kind.is_user_input()) {
            continue;
        }
        let score = score_candidate(element, &fields);
        frame_candidates.push((
            element.element_type == "form" || element.role.as_deref() == Some("form"),
            FormCandidate {
                form: Some(ElementRef::new(frame.index, element.id)),
                frame: frame.index,
                fields,
                score,
            },
        ));
    }

    // Wrappers that merely repeat a native form's fields add noise.
    let native_field_ids: HashSet<ElementRef> = frame_candidates
        .iter()
        .filter(|(native, _)| *native)
        .flat_map(|(_, c)| c.fields.iter().map(|f| f.element))
        .collect();
    let had_candidates = !frame_candidates.is_empty();
    for (native, candidate) in frame_candidates {
        if !native
            && !native_field_ids.is_empty()
            && candidate.fields.iter().all(|f| native_field_ids.contains(&f.element))
        {
            continue;
        }
        out.push(candidate);
    }

    if !had_candidates {
        if let Some(candidate) = synthesize_frame_candidate(frame) {
            out.push(candidate);
        }
    }
}

/// Pages built without a `<form>` tag still get a candidate when the
/// frame holds enough loose fields to answer.
fn synthesize_frame_candidate(frame: &FrameSnapshot) -> Option<FormCandidate> {
    let fields = group_fields(
        frame,
        frame
            .elements
            .iter()
            .filter(|e| e.is_visible() || matches!(FieldKind::classify(e), Some(FieldKind::Hidden))),
    );
    let user_inputs = fields.iter().filter(|f| f.kind.is_user_input()).count();
    if user_inputs < 2 {
        return None;
    }
    let score = vocabulary_score(&frame.text.to_lowercase())
        + fields.iter().map(|f| f.kind.weight()).sum::<i32>()
        + size_penalty(fields.len());
    Some(FormCandidate {
        form: None,
        frame: frame.index,
        fields,
        score,
    })
}

fn is_form_container(element: &Element) -> bool {
    if element.element_type == "form" || element.role.as_deref() == Some("form") {
        return true;
    }
    if !matches!(element.element_type.as_str(), "div" | "section" | "fieldset") {
        return false;
    }
    let mut tokens = String::new();
    for key in ["class", "id"] {
        if let Some(v) = element.attr(key) {
            tokens.push_str(v);
            tokens.push(' ');
        }
    }
    tokens
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|t| t == "form" || t == "webform")
}

fn collect_fields(frame: &FrameSnapshot, container: &Element) -> Vec<FieldDescriptor> {
    if container.rect.is_empty() {
        // No layout info: fall back to explicit form-attribute links.
        let container_id = container.attr("id");
        return group_fields(
            frame,
            frame
                .elements
                .iter()
                .filter(|e| container_id.is_some() && e.attr("form") == container_id),
        );
    }
    group_fields(frame, frame.elements_within(&container.rect, container.id))
}

/// Builds descriptors from raw elements, collapsing radio groups that
/// share a name into one descriptor.
fn group_fields<'a>(
    frame: &FrameSnapshot,
    elements: impl Iterator<Item = &'a Element>,
) -> Vec<FieldDescriptor> {
    let mut fields: Vec<FieldDescriptor> = Vec::new();
    let mut radio_groups: Vec<(String, usize)> = Vec::new();
    for element in elements {
        let Some(kind) = FieldKind::classify(element) else {
            continue;
        };
        if kind == FieldKind::Radio {
            let name = element.attr("name").unwrap_or("").to_string();
            let option = SelectOption {
                value: element
                    .attr("value")
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| radio_label(frame, element)),
                label: radio_label(frame, element),
            };
            if let Some(&(_, idx)) = radio_groups
                .iter()
                .find(|(n, _)| !n.is_empty() && *n == name)
            {
                fields[idx].options.push(option);
                continue;
            }
            let mut descriptor = FieldDescriptor::build(frame, element, kind);
            descriptor.options = vec![option];
            radio_groups.push((name, fields.len()));
            fields.push(descriptor);
            continue;
        }
        fields.push(FieldDescriptor::build(frame, element, kind));
    }
    fields
}

fn radio_label(frame: &FrameSnapshot, radio: &Element) -> String {
    radio
        .label
        .clone()
        .or_else(|| radio.text.clone())
        .or_else(|| nearest_label_text(frame, radio))
        .or_else(|| radio.attr("value").map(|v| v.to_string()))
        .unwrap_or_default()
}

// ============================================================================
// Scoring
// ============================================================================

fn score_candidate(container: &Element, fields: &[FieldDescriptor]) -> i32 {
    let mut blob = container.haystack();
    if let Some(text) = &container.text {
        blob.push(' ');
        blob.push_str(&text.to_lowercase());
    }
    for field in fields {
        blob.push(' ');
        blob.push_str(field.haystack());
    }
    vocabulary_score(&blob)
        + fields.iter().map(|f| f.kind.weight()).sum::<i32>()
        + size_penalty(fields.len())
}

fn vocabulary_score(blob: &str) -> i32 {
    let mut score = 0;
    for (term, weight) in CONTACT_VOCAB {
        if blob.contains(term) {
            score += weight;
        }
    }
    for (term, weight) in NEGATIVE_VOCAB {
        if blob.contains(term) {
            score += weight;
        }
    }
    score
}

fn size_penalty(field_count: usize) -> i32 {
    if field_count > FIELD_COUNT_SOFT_CAP {
        -(4 * (field_count - FIELD_COUNT_SOFT_CAP) as i32)
    } else {
        0
    }
}

// ============================================================================
// Contact links
// ============================================================================

/// Best same-site link that looks like it leads to a contact page,
/// resolved to an absolute URL.
pub fn find_contact_link(snapshot: &PageSnapshot, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let mut best: Option<(i32, Url)> = None;
    for frame in &snapshot.frames {
        for element in &frame.elements {
            if !matches!(element.element_type.as_str(), "a" | "link")
                && element.role.as_deref() != Some("link")
            {
                continue;
            }
            let Some(href) = element.attr("href") else {
                continue;
            };
            if href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("tel:")
                || href.starts_with("javascript:")
            {
                continue;
            }
            let Ok(resolved) = base.join(href) else {
                continue;
            };
            if resolved.host_str() != base.host_str() {
                continue;
            }
            if resolved.path() == base.path() {
                continue;
            }
            let text = element.text.as_deref().unwrap_or("").to_lowercase();
            let blob = format!("{} {}", text, resolved.path().to_lowercase());
            let mut score = 0;
            for (term, weight) in CONTACT_LINK_HINTS {
                if blob.contains(term) {
                    score += weight;
                }
            }
            if score <= 0 {
                continue;
            }
            if best.as_ref().map(|(s, _)| score > *s).unwrap_or(true) {
                best = Some((score, resolved));
            }
        }
    }
    best.map(|(_, url)| url.to_string())
}

// ============================================================================
// Submit controls
// ============================================================================

/// A clickable control that submits a form.
pub fn is_submit_control(element: &Element) -> bool {
    match element.element_type.as_str() {
        "input" => matches!(element.input_type(), Some("submit") | Some("image")),
        "button" => matches!(element.input_type(), None | Some("submit")),
        _ => {
            element.role.as_deref() == Some("button")
                && has_submit_text(element.text.as_deref().unwrap_or(""))
        }
    }
}

/// Caption reads as a submit action.
pub fn has_submit_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    SUBMIT_TEXT.iter().any(|t| lowered.contains(t))
}

/// Finds a submit control that lives outside the form container:
/// first one linked by a `form` attribute, then the nearest
/// submit-shaped control vertically adjacent to the form.
pub fn find_external_submit(
    snapshot: &PageSnapshot,
    candidate: &FormCandidate,
) -> Option<ElementRef> {
    let frame = snapshot.frame(candidate.frame)?;
    let form_ref = candidate.form.as_ref()?;
    let form_element = frame.get_element(form_ref.id)?;

    if let Some(form_id) = candidate.container_id(frame) {
        for element in &frame.elements {
            if element.attr("form") == Some(form_id) && is_submit_control(element) {
                return Some(ElementRef::new(frame.index, element.id));
            }
        }
    }

    let form_rect = &form_element.rect;
    let mut best: Option<(f64, u32)> = None;
    for element in &frame.elements {
        if !element.is_visible() || element.rect.is_inside(form_rect) {
            continue;
        }
        let submitish = is_submit_control(element)
            || (matches!(element.element_type.as_str(), "button" | "a" | "div")
                && has_submit_text(element.text.as_deref().unwrap_or("")));
        if !submitish {
            continue;
        }
        let gap = element.rect.vertical_gap(form_rect);
        if gap > EXTERNAL_SUBMIT_MAX_GAP_PX {
            continue;
        }
        let overlaps = element.rect.x < form_rect.x + form_rect.width
            && element.rect.x + element.rect.width > form_rect.x;
        if !overlaps {
            continue;
        }
        if best.map(|(d, _)| gap < d).unwrap_or(true) {
            best = Some((gap, element.id));
        }
    }
    best.map(|(_, id)| ElementRef::new(candidate.frame, id))
}
