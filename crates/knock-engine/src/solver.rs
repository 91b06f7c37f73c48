//! Challenge hand-off.
//!
//! The engine never attempts to break a challenge itself. When a
//! widget is detected it is delegated to an external solver service;
//! the returned token is injected into the widget's response field
//! and the outcome reported either way, so the pipeline can push on
//! and let verification tell the truth.

use crate::driver::BrowserDriver;
use async_trait::async_trait;
use knock_core::challenge::{detect_challenge, ChallengeKind, DetectedChallenge};
use knock_core::protocol::PageSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver request failed: {0}")]
    Request(String),
    #[error("Solver returned no token")]
    NoToken,
}

#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Resolves a detected challenge into a response token.
    async fn solve(&self, challenge: &DetectedChallenge, page_url: &str)
        -> Result<String, SolverError>;
}

// ============================================================================
// HTTP solver
// ============================================================================

#[derive(Serialize)]
struct SolveRequest<'a> {
    kind: &'a str,
    site_key: Option<&'a str>,
    page_url: &'a str,
}

#[derive(Deserialize)]
struct SolveResponse {
    token: Option<String>,
}

/// Talks to a solver service over HTTP. One POST per challenge; the
/// service answers `{"token": "..."}`.
pub struct HttpSolver {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSolver {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpSolver {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChallengeSolver for HttpSolver {
    async fn solve(
        &self,
        challenge: &DetectedChallenge,
        page_url: &str,
    ) -> Result<String, SolverError> {
        let request = SolveRequest {
            kind: challenge.kind.as_str(),
            site_key: challenge.site_key.as_deref(),
            page_url,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| SolverError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| SolverError::Request(e.to_string()))?;
        let body: SolveResponse = response
            .json()
            .await
            .map_err(|e| SolverError::Request(e.to_string()))?;
        match body.token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(SolverError::NoToken),
        }
    }
}

// ============================================================================
// Handler
// ============================================================================

/// What happened to the challenge on one page.
#[derive(Debug, Clone)]
pub enum ChallengeOutcome {
    NotPresent,
    Solved { kind: ChallengeKind, elapsed: Duration },
    Unsolved { kind: Option<ChallengeKind>, reason: String },
}

impl ChallengeOutcome {
    /// Short form recorded in run details.
    pub fn describe(&self) -> String {
        match self {
            ChallengeOutcome::NotPresent => "none".to_string(),
            ChallengeOutcome::Solved { kind, .. } => format!("solved:{}", kind.as_str()),
            ChallengeOutcome::Unsolved { kind, reason } => match kind {
                Some(kind) => format!("unsolved:{} ({})", kind.as_str(), reason),
                None => format!("unsolved ({})", reason),
            },
        }
    }
}

pub struct ChallengeHandler {
    solver: Option<Arc<dyn ChallengeSolver>>,
    timeout: Duration,
}

impl ChallengeHandler {
    pub fn new(solver: Option<Arc<dyn ChallengeSolver>>, solve_timeout_ms: u64) -> Self {
        ChallengeHandler {
            solver,
            timeout: Duration::from_millis(solve_timeout_ms),
        }
    }

    /// Detects, delegates, and injects. Never fails the run: an
    /// unsolved challenge is reported and left for verification to
    /// judge.
    pub async fn handle(
        &self,
        driver: &mut dyn BrowserDriver,
        snapshot: &PageSnapshot,
    ) -> ChallengeOutcome {
        let Some(challenge) = detect_challenge(snapshot) else {
            return ChallengeOutcome::NotPresent;
        };
        info!(kind = challenge.kind.as_str(), "challenge detected");
        let Some(solver) = &self.solver else {
            return ChallengeOutcome::Unsolved {
                kind: Some(challenge.kind),
                reason: "no solver configured".to_string(),
            };
        };
        let started = std::time::Instant::now();
        let token = match tokio::time::timeout(
            self.timeout,
            solver.solve(&challenge, &snapshot.url),
        )
        .await
        {
            Err(_) => {
                warn!(kind = challenge.kind.as_str(), "solve timed out");
                return ChallengeOutcome::Unsolved {
                    kind: Some(challenge.kind),
                    reason: format!("solve timed out after {}ms", self.timeout.as_millis()),
                };
            }
            Ok(Err(e)) => {
                warn!(kind = challenge.kind.as_str(), error = %e, "solve failed");
                return ChallengeOutcome::Unsolved {
                    kind: Some(challenge.kind),
                    reason: e.to_string(),
                };
            }
            Ok(Ok(token)) => token,
        };
        let elapsed = started.elapsed();
        info!(
            kind = challenge.kind.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "challenge solved"
        );
        if let Err(e) = driver.execute_script(&injection_script(&challenge, &token)).await {
            debug!(error = %e, "token injection failed");
            return ChallengeOutcome::Unsolved {
                kind: Some(challenge.kind),
                reason: format!("token obtained but injection failed: {}", e),
            };
        }
        ChallengeOutcome::Solved {
            kind: challenge.kind,
            elapsed,
        }
    }
}

fn injection_script(challenge: &DetectedChallenge, token: &str) -> String {
    let escaped = token.replace('\\', "\\\\").replace('\'', "\\'");
    match challenge.kind.response_field() {
        Some(field) => format!(
            "document.querySelectorAll('textarea[name=\"{field}\"], input[name=\"{field}\"]')\
             .forEach(el => {{ el.value = '{escaped}'; }});"
        ),
        None => format!(
            "document.querySelectorAll('input[name*=\"captcha\"]')\
             .forEach(el => {{ el.value = '{escaped}'; }});"
        ),
    }
}
