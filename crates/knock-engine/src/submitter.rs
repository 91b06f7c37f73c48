//! Form submission strategies.
//!
//! Four attempts, cheapest first: click the form's own submit
//! control, invoke the native submit, press Enter in the last text
//! field, click a submit control that lives outside the form. A
//! strategy counts as applied when its action and the settle wait
//! both complete without a driver error; whether the site accepted
//! the submission is the verifier's question, not ours.

use crate::driver::{BrowserDriver, DriverError, PageReaction};
use knock_core::detector::{find_external_submit, has_submit_text, FieldKind, FormCandidate};
use knock_core::protocol::{ElementRef, PageSnapshot};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMethod {
    Button,
    Script,
    Key,
    External,
    NotSubmitted,
}

impl SubmitMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMethod::Button => "button",
            SubmitMethod::Script => "script",
            SubmitMethod::Key => "key",
            SubmitMethod::External => "external-button",
            SubmitMethod::NotSubmitted => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub success: bool,
    pub method: SubmitMethod,
    pub error: Option<String>,
}

pub struct FormSubmitter {
    settle_timeout: Duration,
}

impl FormSubmitter {
    pub fn new(settle_timeout_ms: u64) -> Self {
        FormSubmitter {
            settle_timeout: Duration::from_millis(settle_timeout_ms),
        }
    }

    pub async fn submit(
        &self,
        driver: &mut dyn BrowserDriver,
        snapshot: &PageSnapshot,
        candidate: &FormCandidate,
    ) -> SubmissionOutcome {
        let mut last_error: Option<String> = None;

        if let Some(control) = submit_control_in(candidate) {
            match self.click_and_settle(driver, &control).await {
                Ok(reaction) => return applied(SubmitMethod::Button, reaction),
                Err(e) => {
                    debug!(error = %e, "submit button click failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        if let Some(form) = candidate.form {
            match self.native_submit(driver, &form).await {
                Ok(reaction) => return applied(SubmitMethod::Script, reaction),
                Err(e) => {
                    debug!(error = %e, "native submit failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        if let Some(field) = last_text_field(candidate) {
            match self.enter_key_submit(driver, &field).await {
                Ok(reaction) => return applied(SubmitMethod::Key, reaction),
                Err(e) => {
                    debug!(error = %e, "enter key submit failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        if let Some(control) = find_external_submit(snapshot, candidate) {
            match self.click_and_settle(driver, &control).await {
                Ok(reaction) => return applied(SubmitMethod::External, reaction),
                Err(e) => {
                    debug!(error = %e, "external submit click failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        SubmissionOutcome {
            success: false,
            method: SubmitMethod::NotSubmitted,
            error: last_error.or_else(|| Some("no submission strategy applied".to_string())),
        }
    }

    async fn click_and_settle(
        &self,
        driver: &mut dyn BrowserDriver,
        target: &ElementRef,
    ) -> Result<PageReaction, DriverError> {
        driver.click(target).await?;
        driver.wait_until_settled(self.settle_timeout).await
    }

    async fn native_submit(
        &self,
        driver: &mut dyn BrowserDriver,
        form: &ElementRef,
    ) -> Result<PageReaction, DriverError> {
        if let Err(first) = driver.submit_form(form).await {
            debug!(error = %first, "submit_form failed, trying request_submit");
            driver.request_submit(form).await?;
        }
        driver.wait_until_settled(self.settle_timeout).await
    }

    async fn enter_key_submit(
        &self,
        driver: &mut dyn BrowserDriver,
        field: &ElementRef,
    ) -> Result<PageReaction, DriverError> {
        driver.focus(field).await?;
        driver.press_key("Enter").await?;
        driver.wait_until_settled(self.settle_timeout).await
    }
}

fn applied(method: SubmitMethod, reaction: PageReaction) -> SubmissionOutcome {
    info!(
        method = method.as_str(),
        navigated = reaction.navigated,
        dom_changed = reaction.dom_changed,
        "submission applied"
    );
    SubmissionOutcome {
        success: true,
        method,
        error: None,
    }
}

/// The form's own submit control: a submit field first, then a plain
/// button whose caption reads as a submit action.
fn submit_control_in(candidate: &FormCandidate) -> Option<ElementRef> {
    candidate
        .fields
        .iter()
        .find(|f| f.kind == FieldKind::Submit)
        .or_else(|| {
            candidate
                .fields
                .iter()
                .find(|f| f.kind == FieldKind::Button && has_submit_text(f.haystack()))
        })
        .map(|f| f.element)
}

fn last_text_field(candidate: &FormCandidate) -> Option<ElementRef> {
    candidate
        .fields
        .iter()
        .rev()
        .find(|f| f.kind.is_text_entry())
        .map(|f| f.element)
}
