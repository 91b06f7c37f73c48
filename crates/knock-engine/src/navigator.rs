//! URL resolution with scheme fallback.
//!
//! Targets arrive as bare domains more often than full URLs. A bare
//! target is tried as `https://` first, then `http://`; a target that
//! already carries a scheme is tried as given. The first attempt that
//! loads without an HTTP error wins.

use crate::driver::BrowserDriver;
use knock_core::detector::find_contact_link;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct NavigationReport {
    pub success: bool,
    /// URL the page actually settled on, redirects included.
    pub final_url: Option<String>,
    /// Error of the last failed attempt.
    pub error: Option<String>,
}

pub struct PageNavigator {
    timeout: Duration,
}

impl PageNavigator {
    pub fn new(timeout_ms: u64) -> Self {
        PageNavigator {
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Works through the candidate URLs until one loads.
    pub async fn resolve(&self, driver: &mut dyn BrowserDriver, target: &str) -> NavigationReport {
        let mut last_error = None;
        for url in candidate_urls(target) {
            debug!(url = %url, "navigating");
            match tokio::time::timeout(self.timeout, driver.navigate(&url)).await {
                Err(_) => {
                    last_error = Some(format!(
                        "navigation timed out after {}ms",
                        self.timeout.as_millis()
                    ));
                }
                Ok(Err(e)) => {
                    last_error = Some(e.to_string());
                }
                Ok(Ok(outcome)) if outcome.status >= 400 => {
                    last_error = Some(format!("HTTP {} at {}", outcome.status, outcome.url));
                }
                Ok(Ok(outcome)) => {
                    info!(url = %outcome.url, status = outcome.status, "page loaded");
                    return NavigationReport {
                        success: true,
                        final_url: Some(outcome.url),
                        error: None,
                    };
                }
            }
        }
        NavigationReport {
            success: false,
            final_url: None,
            error: last_error.or_else(|| Some("no navigation candidates".to_string())),
        }
    }

    /// Looks for a contact-page link on the current page.
    pub async fn find_contact_page(&self, driver: &mut dyn BrowserDriver) -> Option<String> {
        let snapshot = driver.snapshot().await.ok()?;
        find_contact_link(&snapshot, &snapshot.url)
    }
}

/// `https://` before `http://` for schemeless targets; schemeful
/// targets as given.
pub fn candidate_urls(target: &str) -> Vec<String> {
    let trimmed = target.trim();
    if trimmed.contains("://") {
        vec![trimmed.to_string()]
    } else {
        vec![format!("https://{}", trimmed), format!("http://{}", trimmed)]
    }
}
