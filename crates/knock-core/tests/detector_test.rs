use knock_core::detector::{detect_forms, find_contact_link, find_external_submit, FieldKind};
use knock_core::protocol::{Element, FrameSnapshot, PageSnapshot};

// ============================================================================
// Builders
// ============================================================================

fn text_input(id: u32, name: &str, y: f64) -> Element {
    Element::new(id, "input")
        .with_attr("type", "text")
        .with_attr("name", name)
        .with_rect(20.0, y, 300.0, 30.0)
}

fn typed_input(id: u32, input_type: &str, name: &str, y: f64) -> Element {
    Element::new(id, "input")
        .with_attr("type", input_type)
        .with_attr("name", name)
        .with_rect(20.0, y, 300.0, 30.0)
}

fn submit_button(id: u32, y: f64) -> Element {
    Element::new(id, "button")
        .with_text("Send Message")
        .with_rect(20.0, y, 120.0, 40.0)
}

fn contact_form_frame() -> FrameSnapshot {
    FrameSnapshot::new(0, "main")
        .with_element(
            Element::new(1, "form")
                .with_attr("id", "contact-form")
                .with_attr("class", "contact-form")
                .with_rect(10.0, 10.0, 500.0, 600.0),
        )
        .with_element(text_input(2, "name", 50.0))
        .with_element(typed_input(3, "email", "email", 100.0))
        .with_element(
            Element::new(4, "textarea")
                .with_attr("name", "message")
                .with_rect(20.0, 150.0, 300.0, 120.0),
        )
        .with_element(submit_button(5, 300.0))
}

fn page(frame: FrameSnapshot) -> PageSnapshot {
    PageSnapshot::new("https://acme.com/contact").with_frame(frame)
}

// ============================================================================
// Ranking
// ============================================================================

#[test]
fn contact_form_outranks_newsletter_form() {
    let frame = contact_form_frame()
        .with_element(
            Element::new(10, "form")
                .with_attr("class", "newsletter-form")
                .with_rect(10.0, 700.0, 500.0, 100.0),
        )
        .with_element(typed_input(11, "email", "newsletter_email", 720.0).with_rect(20.0, 720.0, 200.0, 30.0))
        .with_element(submit_button(12, 760.0).with_rect(240.0, 720.0, 80.0, 30.0));
    let candidates = detect_forms(&page(frame));

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].form.unwrap().id, 1);
    assert!(candidates[0].score > candidates[1].score);
}

#[test]
fn login_form_is_not_viable() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(
            Element::new(1, "form")
                .with_attr("class", "login-form")
                .with_rect(10.0, 10.0, 400.0, 300.0),
        )
        .with_element(text_input(2, "username", 50.0))
        .with_element(typed_input(3, "password", "password", 100.0))
        .with_element(submit_button(4, 150.0));
    let candidates = detect_forms(&page(frame));

    assert_eq!(candidates.len(), 1);
    assert!(!candidates[0].is_viable());
}

#[test]
fn ranking_is_deterministic() {
    let frame = contact_form_frame();
    let first = detect_forms(&page(frame.clone()));
    let second = detect_forms(&page(frame));
    let scores_a: Vec<i32> = first.iter().map(|c| c.score).collect();
    let scores_b: Vec<i32> = second.iter().map(|c| c.score).collect();
    assert_eq!(scores_a, scores_b);
}

#[test]
fn oversized_forms_lose_points() {
    let mut small = FrameSnapshot::new(0, "main").with_element(
        Element::new(1, "form")
            .with_attr("class", "contact-form")
            .with_rect(0.0, 0.0, 600.0, 3000.0),
    );
    for i in 0..3 {
        small = small.with_element(text_input(10 + i, "field", 50.0 + 40.0 * i as f64));
    }
    let mut big = FrameSnapshot::new(0, "main").with_element(
        Element::new(1, "form")
            .with_attr("class", "contact-form")
            .with_rect(0.0, 0.0, 600.0, 3000.0),
    );
    for i in 0..25 {
        big = big.with_element(text_input(10 + i, "field", 50.0 + 40.0 * i as f64));
    }
    let small_score = detect_forms(&page(small))[0].score;
    let big_score = detect_forms(&page(big))[0].score;
    // 25 plain text fields outweigh 3, but the soft cap claws it back.
    assert!(big_score < small_score + 22 * 6);
}

#[test]
fn forms_in_iframes_are_found() {
    let main = FrameSnapshot::new(0, "main");
    let embedded = FrameSnapshot {
        index: 1,
        ..contact_form_frame()
    };
    let snapshot = PageSnapshot::new("https://acme.com/").with_frame(main).with_frame(embedded);
    let candidates = detect_forms(&snapshot);

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].frame, 1);
}

// ============================================================================
// Field extraction
// ============================================================================

#[test]
fn radio_groups_collapse_into_one_field() {
    let frame = contact_form_frame()
        .with_element(
            typed_input(6, "radio", "budget", 340.0)
                .with_attr("value", "low")
                .with_label("Under $5k"),
        )
        .with_element(
            typed_input(7, "radio", "budget", 370.0)
                .with_attr("value", "high")
                .with_label("Over $5k"),
        );
    let candidates = detect_forms(&page(frame));
    let radios: Vec<_> = candidates[0]
        .fields
        .iter()
        .filter(|f| f.kind == FieldKind::Radio)
        .collect();

    assert_eq!(radios.len(), 1);
    assert_eq!(radios[0].options.len(), 2);
    assert_eq!(radios[0].options[0].value, "low");
}

#[test]
fn adjacent_text_becomes_the_label() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(
            Element::new(1, "form")
                .with_attr("class", "contact-form")
                .with_rect(0.0, 0.0, 500.0, 400.0),
        )
        .with_element(
            Element::new(2, "span")
                .with_text("Your Name")
                .with_rect(20.0, 40.0, 120.0, 20.0),
        )
        .with_element(text_input(3, "f_17", 70.0))
        .with_element(
            Element::new(4, "textarea")
                .with_attr("name", "message")
                .with_rect(20.0, 120.0, 300.0, 100.0),
        );
    let candidates = detect_forms(&page(frame));
    let field = candidates[0].fields.iter().find(|f| f.key == "f_17").unwrap();

    assert_eq!(field.label.as_deref(), Some("Your Name"));
    assert!(field.haystack().contains("your name"));
}

#[test]
fn loose_fields_form_a_synthesized_candidate() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(text_input(1, "name", 50.0))
        .with_element(typed_input(2, "email", "email", 100.0))
        .with_element(
            Element::new(3, "textarea")
                .with_attr("name", "message")
                .with_rect(20.0, 150.0, 300.0, 100.0),
        );
    let candidates = detect_forms(&page(frame));

    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].form.is_none());
    assert_eq!(candidates[0].fields.len(), 3);
}

// ============================================================================
// Contact links
// ============================================================================

#[test]
fn contact_link_is_resolved_absolute() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(Element::new(1, "a").with_attr("href", "/contact").with_text("Contact Us"))
        .with_element(Element::new(2, "a").with_attr("href", "/about").with_text("About"))
        .with_element(Element::new(3, "a").with_attr("href", "mailto:x@acme.com"))
        .with_element(
            Element::new(4, "a")
                .with_attr("href", "https://other.example/contact")
                .with_text("Partner contact"),
        );
    let snapshot = PageSnapshot::new("https://acme.com/").with_frame(frame);

    assert_eq!(
        find_contact_link(&snapshot, "https://acme.com/"),
        Some("https://acme.com/contact".to_string())
    );
}

#[test]
fn pages_without_contact_links_yield_none() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(Element::new(1, "a").with_attr("href", "/pricing").with_text("Pricing"));
    let snapshot = PageSnapshot::new("https://acme.com/").with_frame(frame);

    assert_eq!(find_contact_link(&snapshot, "https://acme.com/"), None);
}

// ============================================================================
// External submit controls
// ============================================================================

#[test]
fn form_attribute_links_an_external_submit() {
    let frame = contact_form_frame().with_element(
        Element::new(9, "button")
            .with_attr("form", "contact-form")
            .with_text("Send")
            .with_rect(20.0, 900.0, 100.0, 40.0),
    );
    let snapshot = page(frame);
    let candidates = detect_forms(&snapshot);

    let external = find_external_submit(&snapshot, &candidates[0]).unwrap();
    assert_eq!(external.id, 9);
}

#[test]
fn nearby_submit_button_is_adopted() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(
            Element::new(1, "form")
                .with_attr("class", "contact-form")
                .with_rect(10.0, 10.0, 400.0, 300.0),
        )
        .with_element(text_input(2, "name", 50.0))
        .with_element(
            Element::new(3, "textarea")
                .with_attr("name", "message")
                .with_rect(20.0, 100.0, 300.0, 100.0),
        )
        .with_element(
            Element::new(4, "button")
                .with_text("Submit")
                .with_rect(20.0, 330.0, 100.0, 40.0),
        );
    let snapshot = page(frame);
    let candidates = detect_forms(&snapshot);

    let external = find_external_submit(&snapshot, &candidates[0]).unwrap();
    assert_eq!(external.id, 4);
}

#[test]
fn distant_buttons_are_ignored() {
    let frame = FrameSnapshot::new(0, "main")
        .with_element(
            Element::new(1, "form")
                .with_attr("class", "contact-form")
                .with_rect(10.0, 10.0, 400.0, 300.0),
        )
        .with_element(text_input(2, "name", 50.0))
        .with_element(
            Element::new(3, "button")
                .with_text("Submit")
                .with_rect(20.0, 600.0, 100.0, 40.0),
        );
    let snapshot = page(frame);
    let candidates = detect_forms(&snapshot);

    assert!(find_external_submit(&snapshot, &candidates[0]).is_none());
}
