use async_trait::async_trait;
use knock_core::challenge::DetectedChallenge;
use knock_core::prefs::PreferenceScope;
use knock_core::profile::SenderProfile;
use knock_core::protocol::{Element, ElementRef, FrameSnapshot, PageSnapshot};
use knock_engine::config::KnockConfig;
use knock_engine::driver::{BrowserDriver, DriverError, NavigationOutcome, PageReaction};
use knock_engine::pipeline::{ContactMethod, SubmissionPipeline};
use knock_engine::prefs::{MemoryPreferenceStore, PreferenceStore};
use knock_engine::solver::{ChallengeSolver, SolverError};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Scripted driver
// ============================================================================

/// One page of a scripted site, with the transitions its controls
/// trigger.
#[derive(Clone)]
struct ScriptedPage {
    snapshot: PageSnapshot,
    status: u16,
    click_goes_to: HashMap<u32, String>,
    submit_goes_to: Option<String>,
    key_goes_to: Option<String>,
}

impl ScriptedPage {
    fn new(snapshot: PageSnapshot) -> Self {
        ScriptedPage {
            snapshot,
            status: 200,
            click_goes_to: HashMap::new(),
            submit_goes_to: None,
            key_goes_to: None,
        }
    }

    fn click_goes_to(mut self, id: u32, url: &str) -> Self {
        self.click_goes_to.insert(id, url.to_string());
        self
    }
}

#[derive(Default)]
struct FakeDriver {
    pages: HashMap<String, ScriptedPage>,
    current: String,
    pending: Option<PageReaction>,
    visited: Vec<String>,
    events: Vec<&'static str>,
    fills: Vec<(ElementRef, String)>,
    checks: Vec<(ElementRef, bool)>,
    selections: Vec<(ElementRef, String)>,
    clicks: Vec<ElementRef>,
    scripts: Vec<String>,
    fail_fill_ids: HashSet<u32>,
    fail_click_ids: HashSet<u32>,
    fail_submit_form: bool,
    fail_request_submit: bool,
    fail_press_key: bool,
}

impl FakeDriver {
    fn with_pages(pages: Vec<(&str, ScriptedPage)>) -> Self {
        FakeDriver {
            pages: pages.into_iter().map(|(u, p)| (u.to_string(), p)).collect(),
            ..FakeDriver::default()
        }
    }

    fn go_to(&mut self, destination: Option<String>) {
        if let Some(url) = destination {
            self.current = url;
            self.pending = Some(PageReaction {
                navigated: true,
                dom_changed: true,
            });
        }
    }

    fn page(&self) -> Result<&ScriptedPage, DriverError> {
        self.pages
            .get(&self.current)
            .ok_or_else(|| DriverError::Other(format!("no page at {}", self.current)))
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<NavigationOutcome, DriverError> {
        self.events.push("navigate");
        self.visited.push(url.to_string());
        let Some(page) = self.pages.get(url) else {
            return Err(DriverError::Navigation(format!("no route to {url}")));
        };
        self.current = url.to_string();
        self.pending = None;
        Ok(NavigationOutcome {
            url: url.to_string(),
            title: String::new(),
            status: page.status,
        })
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.current.clone())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, DriverError> {
        Ok(self.page()?.snapshot.clone())
    }

    async fn fill(&mut self, target: &ElementRef, value: &str) -> Result<(), DriverError> {
        if self.fail_fill_ids.contains(&target.id) {
            return Err(DriverError::ElementNotFound {
                frame: target.frame,
                id: target.id,
            });
        }
        self.events.push("fill");
        self.fills.push((*target, value.to_string()));
        Ok(())
    }

    async fn set_checked(&mut self, target: &ElementRef, checked: bool) -> Result<(), DriverError> {
        self.events.push("check");
        self.checks.push((*target, checked));
        Ok(())
    }

    async fn select_option(&mut self, target: &ElementRef, value: &str) -> Result<(), DriverError> {
        self.events.push("select");
        self.selections.push((*target, value.to_string()));
        Ok(())
    }

    async fn click(&mut self, target: &ElementRef) -> Result<(), DriverError> {
        if self.fail_click_ids.contains(&target.id) {
            return Err(DriverError::ElementNotFound {
                frame: target.frame,
                id: target.id,
            });
        }
        self.events.push("click");
        self.clicks.push(*target);
        let destination = self.page()?.click_goes_to.get(&target.id).cloned();
        self.go_to(destination);
        Ok(())
    }

    async fn focus(&mut self, _target: &ElementRef) -> Result<(), DriverError> {
        self.events.push("focus");
        Ok(())
    }

    async fn press_key(&mut self, _key: &str) -> Result<(), DriverError> {
        if self.fail_press_key {
            return Err(DriverError::Other("key press rejected".to_string()));
        }
        self.events.push("key");
        let destination = self.page()?.key_goes_to.clone();
        self.go_to(destination);
        Ok(())
    }

    async fn submit_form(&mut self, _form: &ElementRef) -> Result<(), DriverError> {
        if self.fail_submit_form {
            return Err(DriverError::Script("submit() threw".to_string()));
        }
        self.events.push("submit");
        let destination = self.page()?.submit_goes_to.clone();
        self.go_to(destination);
        Ok(())
    }

    async fn request_submit(&mut self, _form: &ElementRef) -> Result<(), DriverError> {
        if self.fail_request_submit {
            return Err(DriverError::Script("requestSubmit() threw".to_string()));
        }
        self.events.push("request-submit");
        let destination = self.page()?.submit_goes_to.clone();
        self.go_to(destination);
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> Result<(), DriverError> {
        self.events.push("script");
        self.scripts.push(script.to_string());
        Ok(())
    }

    async fn wait_until_settled(&mut self, _timeout: Duration) -> Result<PageReaction, DriverError> {
        Ok(self.pending.take().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct TokenSolver;

#[async_trait]
impl ChallengeSolver for TokenSolver {
    async fn solve(
        &self,
        _challenge: &DetectedChallenge,
        _page_url: &str,
    ) -> Result<String, SolverError> {
        Ok("tok-abc".to_string())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn contact_frame() -> FrameSnapshot {
    FrameSnapshot::new(0, "main")
        .with_element(
            Element::new(1, "form")
                .with_attr("id", "contact-form")
                .with_attr("class", "contact-form")
                .with_rect(10.0, 10.0, 500.0, 400.0),
        )
        .with_element(
            Element::new(2, "input")
                .with_attr("type", "text")
                .with_attr("name", "name")
                .with_attr("required", "")
                .with_rect(20.0, 50.0, 300.0, 30.0),
        )
        .with_element(
            Element::new(3, "input")
                .with_attr("type", "email")
                .with_attr("name", "email")
                .with_attr("required", "")
                .with_rect(20.0, 100.0, 300.0, 30.0),
        )
        .with_element(
            Element::new(4, "textarea")
                .with_attr("name", "message")
                .with_attr("required", "")
                .with_rect(20.0, 150.0, 300.0, 120.0),
        )
        .with_element(
            Element::new(5, "button")
                .with_text("Send Message")
                .with_rect(20.0, 300.0, 120.0, 40.0),
        )
}

fn contact_page(url: &str) -> ScriptedPage {
    ScriptedPage::new(PageSnapshot::new(url).with_frame(contact_frame()))
}

fn thanks_page(url: &str) -> ScriptedPage {
    ScriptedPage::new(PageSnapshot::new(url).with_frame(
        FrameSnapshot::new(0, "main").with_text("Thank you for your message!"),
    ))
}

fn profile() -> SenderProfile {
    SenderProfile::new()
        .with("first_name", "Ada")
        .with("last_name", "Lovelace")
        .with("email", "ada@lovelace.dev")
        .with("message", "I would like to discuss a project.")
}

fn pipeline() -> SubmissionPipeline {
    SubmissionPipeline::new(KnockConfig::default())
}

// ============================================================================
// Form path
// ============================================================================

#[tokio::test]
async fn verified_submission_end_to_end() {
    let mut driver = FakeDriver::with_pages(vec![
        (
            "https://acme.com",
            contact_page("https://acme.com").click_goes_to(5, "https://acme.com/thanks"),
        ),
        ("https://acme.com/thanks", thanks_page("https://acme.com/thanks")),
    ]);
    let store = Arc::new(MemoryPreferenceStore::new());
    let pipeline = pipeline().with_store(store.clone());
    let result = pipeline.run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert_eq!(result.method, ContactMethod::Form);
    assert!(result.error.is_none());
    assert_eq!(result.details["submitted_via"], json!("button"));
    assert_eq!(result.details["fields_filled"], json!(3));
    assert_eq!(result.details["challenge"], json!("none"));
    assert_eq!(result.details["success_hint"], json!("url"));
    assert_eq!(result.details["soft_success"], json!(false));
    assert_eq!(result.details["final_url"], json!("https://acme.com/thanks"));

    assert!(driver
        .fills
        .contains(&(ElementRef::new(0, 2), "Ada Lovelace".to_string())));
    assert!(driver
        .fills
        .contains(&(ElementRef::new(0, 3), "ada@lovelace.dev".to_string())));

    // The values that worked were learned for the domain.
    let scope = PreferenceScope::domain("acme.com");
    assert_eq!(
        store.get(&scope, "name").await.unwrap().as_deref(),
        Some("Ada Lovelace")
    );
    assert_eq!(
        store.get(&scope, "message").await.unwrap().as_deref(),
        Some("I would like to discuss a project.")
    );
}

#[tokio::test]
async fn unverified_submission_counts_as_soft_success() {
    let mut driver = FakeDriver::with_pages(vec![
        (
            "https://acme.com",
            contact_page("https://acme.com").click_goes_to(5, "https://acme.com/step2"),
        ),
        ("https://acme.com/step2", contact_page("https://acme.com/step2")),
    ]);
    let store = Arc::new(MemoryPreferenceStore::new());
    let pipeline = pipeline().with_store(store.clone());
    let result = pipeline.run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert_eq!(result.details["soft_success"], json!(true));
    assert_eq!(result.details["success_hint"], Value::Null);

    // Nothing is learned from an unverified attempt.
    assert!(store.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn contact_link_retry_finds_the_form() {
    let landing = ScriptedPage::new(
        PageSnapshot::new("https://acme.com").with_frame(
            FrameSnapshot::new(0, "main").with_element(
                Element::new(7, "a")
                    .with_text("Contact")
                    .with_attr("href", "/contact"),
            ),
        ),
    );
    let mut driver = FakeDriver::with_pages(vec![
        ("https://acme.com", landing),
        (
            "https://acme.com/contact",
            contact_page("https://acme.com/contact").click_goes_to(5, "https://acme.com/thanks"),
        ),
        ("https://acme.com/thanks", thanks_page("https://acme.com/thanks")),
    ]);
    let result = pipeline().run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert_eq!(result.method, ContactMethod::Form);
    assert!(driver.visited.contains(&"https://acme.com/contact".to_string()));
}

#[tokio::test]
async fn challenge_is_solved_before_submitting() {
    let page = ScriptedPage::new(
        PageSnapshot::new("https://acme.com").with_frame(
            contact_frame().with_element(
                Element::new(9, "div")
                    .with_attr("class", "g-recaptcha")
                    .with_attr("data-sitekey", "6LcSiteKey")
                    .with_rect(20.0, 250.0, 300.0, 80.0),
            ),
        ),
    )
    .click_goes_to(5, "https://acme.com/thanks");
    let mut driver = FakeDriver::with_pages(vec![
        ("https://acme.com", page),
        ("https://acme.com/thanks", thanks_page("https://acme.com/thanks")),
    ]);
    let pipeline = pipeline().with_solver(Arc::new(TokenSolver));
    let result = pipeline.run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert_eq!(result.details["challenge"], json!("solved:recaptcha"));
    assert!(driver.scripts[0].contains("tok-abc"));

    let script_at = driver.events.iter().position(|e| *e == "script").unwrap();
    let click_at = driver.events.iter().position(|e| *e == "click").unwrap();
    assert!(script_at < click_at);
}

#[tokio::test]
async fn learned_values_override_the_profile() {
    let mut driver = FakeDriver::with_pages(vec![
        (
            "https://acme.com",
            contact_page("https://acme.com").click_goes_to(5, "https://acme.com/thanks"),
        ),
        ("https://acme.com/thanks", thanks_page("https://acme.com/thanks")),
    ]);
    let store = Arc::new(MemoryPreferenceStore::new());
    let mut remembered = HashMap::new();
    remembered.insert("message".to_string(), "Remembered note".to_string());
    store
        .merge(&PreferenceScope::domain("acme.com"), &remembered)
        .await
        .unwrap();

    let pipeline = pipeline().with_store(store);
    let result = pipeline.run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert!(driver
        .fills
        .contains(&(ElementRef::new(0, 4), "Remembered note".to_string())));
}

#[tokio::test]
async fn required_field_nobody_answered_gets_the_filler() {
    let frame = contact_frame().with_element(
        Element::new(6, "input")
            .with_attr("type", "text")
            .with_attr("name", "subject")
            .with_attr("required", "")
            .with_rect(20.0, 130.0, 300.0, 30.0),
    );
    let page = ScriptedPage::new(PageSnapshot::new("https://acme.com").with_frame(frame))
        .click_goes_to(5, "https://acme.com/thanks");
    let mut driver = FakeDriver::with_pages(vec![
        ("https://acme.com", page),
        ("https://acme.com/thanks", thanks_page("https://acme.com/thanks")),
    ]);
    let mut config = KnockConfig::default();
    config.submission.filler_message = "Filler body.".to_string();
    let result = SubmissionPipeline::new(config)
        .run(&mut driver, "acme.com", &profile())
        .await;

    assert!(result.success);
    assert_eq!(result.details["fields_filled"], json!(4));
    assert!(driver
        .fills
        .contains(&(ElementRef::new(0, 6), "Filler body.".to_string())));
}

#[tokio::test]
async fn stubborn_field_does_not_sink_the_run() {
    let mut driver = FakeDriver::with_pages(vec![
        (
            "https://acme.com",
            contact_page("https://acme.com").click_goes_to(5, "https://acme.com/thanks"),
        ),
        ("https://acme.com/thanks", thanks_page("https://acme.com/thanks")),
    ]);
    driver.fail_fill_ids = HashSet::from([2]);
    let result = pipeline().run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert_eq!(result.details["fields_filled"], json!(2));
    assert!(!driver.fills.iter().any(|(t, _)| t.id == 2));
}

// ============================================================================
// Fallbacks and failures
// ============================================================================

#[tokio::test]
async fn email_fallback_collects_addresses() {
    let landing = ScriptedPage::new(
        PageSnapshot::new("https://acme.com").with_frame(
            FrameSnapshot::new(0, "main")
                .with_element(Element::new(8, "a").with_attr("href", "mailto:info@acme.dev?subject=Hi"))
                .with_text("Reach us at hello@acme.dev any time."),
        ),
    );
    let mut driver = FakeDriver::with_pages(vec![("https://acme.com", landing)]);
    let result = pipeline().run(&mut driver, "acme.com", &profile()).await;

    assert!(result.success);
    assert_eq!(result.method, ContactMethod::Email);
    assert_eq!(
        result.details["emails"],
        json!(["hello@acme.dev", "info@acme.dev"])
    );
    assert_eq!(result.details["primary_email"], json!("hello@acme.dev"));
}

#[tokio::test]
async fn submit_failure_is_reported_when_nothing_else_works() {
    let mut driver = FakeDriver::with_pages(vec![(
        "https://acme.com",
        contact_page("https://acme.com"),
    )]);
    driver.fail_click_ids = HashSet::from([5]);
    driver.fail_submit_form = true;
    driver.fail_request_submit = true;
    driver.fail_press_key = true;
    let result = pipeline().run(&mut driver, "acme.com", &profile()).await;

    assert!(!result.success);
    assert_eq!(result.method, ContactMethod::None);
    assert!(result.error.unwrap().contains("submission failed"));
}

#[tokio::test]
async fn unreachable_target_is_reported() {
    let mut driver = FakeDriver::default();
    let result = pipeline().run(&mut driver, "missing.example", &profile()).await;

    assert!(!result.success);
    assert_eq!(result.method, ContactMethod::None);
    assert!(result.error.unwrap().contains("no route"));
}
