//! The per-target submission pipeline.
//!
//! One run takes one target through navigate, detect, map, fill,
//! challenge hand-off, submit, verify, and learn. When no usable form
//! turns up on the landing page the run retries once on a discovered
//! contact page, then falls back to harvesting e-mail addresses.
//! Stage failures downgrade the run to the next stage; only driver
//! errors that cannot be attributed to a stage abort, and those are
//! caught once here and folded into a failed result.

use crate::config::KnockConfig;
use crate::driver::{BrowserDriver, DriverError};
use crate::navigator::PageNavigator;
use crate::prefs::{FilePreferenceStore, PreferenceStore};
use crate::solver::{ChallengeHandler, ChallengeOutcome, ChallengeSolver, HttpSolver};
use crate::submitter::{FormSubmitter, SubmissionOutcome};
use knock_core::detector::{detect_forms, find_contact_link, FieldKind, FormCandidate};
use knock_core::harvester;
use knock_core::mapper::{learned_map, FieldDecision, FieldMapper, FieldValue};
use knock_core::prefs::{normalize_domain, PreferenceMap, PreferenceScope};
use knock_core::profile::SenderProfile;
use knock_core::protocol::PageSnapshot;
use knock_core::verifier::{self, SuccessSignal};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How the target ended up being contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Form,
    Email,
    None,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Form => "form",
            ContactMethod::Email => "email",
            ContactMethod::None => "none",
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub success: bool,
    pub method: ContactMethod,
    pub error: Option<String>,
    pub details: Map<String, Value>,
}

impl PipelineResult {
    pub fn failed(method: ContactMethod, error: impl Into<String>) -> Self {
        PipelineResult {
            success: false,
            method,
            error: Some(error.into()),
            details: Map::new(),
        }
    }
}

enum FormAttempt {
    Completed(PipelineResult),
    SubmitFailed(String),
    NotFound,
}

pub struct SubmissionPipeline {
    config: KnockConfig,
    store: Option<Arc<dyn PreferenceStore>>,
    solver: Option<Arc<dyn ChallengeSolver>>,
}

impl SubmissionPipeline {
    pub fn new(config: KnockConfig) -> Self {
        SubmissionPipeline {
            config,
            store: None,
            solver: None,
        }
    }

    /// Wires the solver and preference store the configuration names.
    pub fn from_config(config: KnockConfig) -> Self {
        let solver = config.challenge.endpoint.as_ref().map(|endpoint| {
            let api_key = config.challenge.api_key.clone().unwrap_or_default();
            Arc::new(HttpSolver::new(endpoint.clone(), api_key)) as Arc<dyn ChallengeSolver>
        });
        let store = if config.learning.enabled {
            config
                .learning
                .store_dir
                .clone()
                .or_else(FilePreferenceStore::default_dir)
                .map(|dir| Arc::new(FilePreferenceStore::new(dir)) as Arc<dyn PreferenceStore>)
        } else {
            None
        };
        SubmissionPipeline {
            config,
            store,
            solver,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn ChallengeSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Runs the full pipeline against one target. Never panics and
    /// never returns an error: whatever happens is folded into the
    /// result.
    pub async fn run(
        &self,
        driver: &mut dyn BrowserDriver,
        target: &str,
        profile: &SenderProfile,
    ) -> PipelineResult {
        info!(target, "outreach run started");
        match self.try_run(driver, target, profile).await {
            Ok(result) => {
                info!(
                    success = result.success,
                    method = result.method.as_str(),
                    "outreach run finished"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "outreach run aborted by driver");
                PipelineResult::failed(ContactMethod::None, format!("driver failure: {}", e))
            }
        }
    }

    async fn try_run(
        &self,
        driver: &mut dyn BrowserDriver,
        target: &str,
        profile: &SenderProfile,
    ) -> Result<PipelineResult, DriverError> {
        let navigator = PageNavigator::new(self.config.navigation.timeout_ms);
        let report = navigator.resolve(driver, target).await;
        let Some(final_url) = report.final_url else {
            return Ok(PipelineResult::failed(
                ContactMethod::None,
                report
                    .error
                    .unwrap_or_else(|| "navigation failed".to_string()),
            ));
        };
        let domain = normalize_domain(&final_url);
        let prefs = self.load_preferences().await;

        let mut form_error: Option<String> = None;
        let mut tried_contact_page = false;
        loop {
            let snapshot = driver.snapshot().await?;
            match self
                .attempt_form(driver, &snapshot, profile, &prefs, &domain)
                .await?
            {
                FormAttempt::Completed(result) => return Ok(result),
                FormAttempt::SubmitFailed(error) => form_error = Some(error),
                FormAttempt::NotFound => {}
            }
            if tried_contact_page {
                break;
            }
            tried_contact_page = true;
            let Some(contact_url) = find_contact_link(&snapshot, &snapshot.url) else {
                break;
            };
            info!(url = %contact_url, "no usable form here, trying the contact page");
            if !navigator.resolve(driver, &contact_url).await.success {
                break;
            }
        }

        let snapshot = driver.snapshot().await?;
        let emails = harvester::harvest(&snapshot);
        if emails.is_empty() {
            let error = match form_error {
                Some(e) => format!("form found but submission failed: {}", e),
                None => "no contact form or email address found".to_string(),
            };
            let mut result = PipelineResult::failed(ContactMethod::None, error);
            result.details.insert("emails".to_string(), json!([]));
            return Ok(result);
        }
        info!(count = emails.len(), "falling back to harvested addresses");
        let mut details = Map::new();
        details.insert("emails".to_string(), json!(emails));
        details.insert(
            "primary_email".to_string(),
            json!(harvester::primary(&emails)),
        );
        if let Some(e) = form_error {
            details.insert("form_error".to_string(), json!(e));
        }
        Ok(PipelineResult {
            success: true,
            method: ContactMethod::Email,
            error: None,
            details,
        })
    }

    /// Tries the viable candidates best-first. The first candidate
    /// that takes any values gets submitted; a submit failure does not
    /// move on to weaker candidates, it reports so the caller can
    /// retry elsewhere.
    async fn attempt_form(
        &self,
        driver: &mut dyn BrowserDriver,
        snapshot: &PageSnapshot,
        profile: &SenderProfile,
        prefs: &PreferenceMap,
        domain: &str,
    ) -> Result<FormAttempt, DriverError> {
        let candidates: Vec<FormCandidate> = detect_forms(snapshot)
            .into_iter()
            .filter(|c| c.is_viable())
            .collect();
        if candidates.is_empty() {
            debug!("no viable form candidates");
            return Ok(FormAttempt::NotFound);
        }
        let mapper = FieldMapper::new(profile, prefs, domain);
        for candidate in &candidates {
            let mut decisions = mapper.map_fields(&candidate.fields);
            apply_filler(&mut decisions, &self.config.submission.filler_message);
            if decisions.iter().all(|d| d.value.is_empty()) {
                debug!(score = candidate.score, "candidate yielded no values, skipping");
                continue;
            }
            let filled = self.fill_fields(driver, &decisions).await;
            if filled == 0 {
                continue;
            }
            let challenge =
                ChallengeHandler::new(self.solver.clone(), self.config.challenge.solve_timeout_ms)
                    .handle(driver, snapshot)
                    .await;
            let before = driver.snapshot().await?;
            let submitter = FormSubmitter::new(self.config.submission.settle_timeout_ms);
            let outcome = submitter.submit(driver, snapshot, candidate).await;
            if !outcome.success {
                return Ok(FormAttempt::SubmitFailed(
                    outcome
                        .error
                        .unwrap_or_else(|| "submission failed".to_string()),
                ));
            }
            let after = driver.snapshot().await?;
            let signal = verifier::verify(&before, &after, &after.url);
            if signal.is_some() {
                self.learn(domain, &decisions).await;
            }
            return Ok(FormAttempt::Completed(form_result(
                candidate, &outcome, filled, &challenge, signal, &after.url,
            )));
        }
        Ok(FormAttempt::NotFound)
    }

    async fn fill_fields(
        &self,
        driver: &mut dyn BrowserDriver,
        decisions: &[FieldDecision],
    ) -> usize {
        let mut filled = 0;
        for decision in decisions {
            if decision.value.is_empty() {
                continue;
            }
            let target = &decision.field.element;
            let result = match &decision.value {
                FieldValue::Text(value) => driver.fill(target, value).await,
                FieldValue::Checked(state) => driver.set_checked(target, *state).await,
                FieldValue::Choice(value) => driver.select_option(target, value).await,
            };
            match result {
                Ok(()) => filled += 1,
                Err(e) => {
                    // One stubborn field should not sink the attempt.
                    debug!(key = %decision.field.key, error = %e, "field fill failed");
                }
            }
        }
        filled
    }

    async fn load_preferences(&self) -> PreferenceMap {
        let Some(store) = &self.store else {
            return PreferenceMap::new();
        };
        match store.snapshot().await {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "failed to load learned preferences");
                PreferenceMap::new()
            }
        }
    }

    /// Best-effort persistence of the values that just worked.
    async fn learn(&self, domain: &str, decisions: &[FieldDecision]) {
        if !self.config.learning.enabled {
            return;
        }
        let Some(store) = &self.store else {
            return;
        };
        let entries = learned_map(decisions);
        if entries.is_empty() {
            return;
        }
        match store.merge(&PreferenceScope::domain(domain), &entries).await {
            Ok(()) => debug!(domain, entries = entries.len(), "preferences learned"),
            Err(e) => warn!(error = %e, "failed to persist learned preferences"),
        }
    }
}

fn form_result(
    candidate: &FormCandidate,
    outcome: &SubmissionOutcome,
    filled: usize,
    challenge: &ChallengeOutcome,
    signal: Option<SuccessSignal>,
    final_url: &str,
) -> PipelineResult {
    let mut details = Map::new();
    details.insert("submitted_via".to_string(), json!(outcome.method.as_str()));
    details.insert("fields_filled".to_string(), json!(filled));
    details.insert("form_score".to_string(), json!(candidate.score));
    details.insert("challenge".to_string(), json!(challenge.describe()));
    details.insert("final_url".to_string(), json!(final_url));
    match &signal {
        Some(signal) => {
            details.insert("success_hint".to_string(), json!(signal.kind()));
            details.insert("success_evidence".to_string(), json!(signal.describe()));
            details.insert("soft_success".to_string(), json!(false));
        }
        None => {
            // Submitted without visible confirmation: count it, but
            // say so.
            details.insert("success_hint".to_string(), Value::Null);
            details.insert("soft_success".to_string(), json!(true));
        }
    }
    PipelineResult {
        success: true,
        method: ContactMethod::Form,
        error: None,
        details,
    }
}

/// Required free-text fields that stayed empty get the generic filler
/// so client-side validation does not bounce the form.
fn apply_filler(decisions: &mut [FieldDecision], filler: &str) {
    for decision in decisions.iter_mut() {
        if decision.field.required
            && decision.value.is_empty()
            && matches!(decision.field.kind, FieldKind::Text | FieldKind::Textarea)
        {
            decision.value = FieldValue::Text(filler.to_string());
        }
    }
}
