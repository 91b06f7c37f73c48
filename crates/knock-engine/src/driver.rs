//! The driver boundary.
//!
//! Everything the pipeline needs from a real browser is expressed
//! here. A driver owns one page at a time; optional capabilities ship
//! a default that reports [`DriverError::NotSupported`] so the caller
//! can fall through to the next strategy.

use async_trait::async_trait;
use knock_core::protocol::{ElementRef, PageSnapshot};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation error: {0}")]
    Navigation(String),
    #[error("Element not found: frame {frame}, id {id}")]
    ElementNotFound { frame: usize, id: u32 },
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Driver error: {0}")]
    Other(String),
}

/// What the page did in response to an action.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageReaction {
    pub navigated: bool,
    pub dom_changed: bool,
}

#[derive(Debug, Clone)]
pub struct NavigationOutcome {
    pub url: String,
    pub title: String,
    pub status: u16,
}

/// One page-owning browser session. Implementations enforce their own
/// per-operation deadlines and report [`DriverError::Timeout`] instead
/// of hanging.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<NavigationOutcome, DriverError>;

    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Captures the settled page, main document plus iframes.
    async fn snapshot(&mut self) -> Result<PageSnapshot, DriverError>;

    async fn fill(&mut self, target: &ElementRef, value: &str) -> Result<(), DriverError>;

    async fn set_checked(&mut self, target: &ElementRef, checked: bool) -> Result<(), DriverError>;

    /// Chooses a select option by value, or checks the matching radio
    /// in the target's group.
    async fn select_option(&mut self, target: &ElementRef, value: &str) -> Result<(), DriverError>;

    async fn click(&mut self, target: &ElementRef) -> Result<(), DriverError>;

    async fn focus(&mut self, target: &ElementRef) -> Result<(), DriverError>;

    async fn press_key(&mut self, key: &str) -> Result<(), DriverError>;

    /// Script-level form submit, bypassing the page's submit
    /// handlers.
    async fn submit_form(&mut self, form: &ElementRef) -> Result<(), DriverError>;

    /// requestSubmit-style submit that runs validation and submit
    /// handlers. Optional.
    async fn request_submit(&mut self, form: &ElementRef) -> Result<(), DriverError> {
        let _ = form;
        Err(DriverError::NotSupported("request_submit".to_string()))
    }

    /// Runs a page script. Optional.
    async fn execute_script(&mut self, script: &str) -> Result<(), DriverError> {
        let _ = script;
        Err(DriverError::NotSupported("execute_script".to_string()))
    }

    /// Waits for navigation, network, and DOM mutations to settle
    /// after an action.
    async fn wait_until_settled(&mut self, timeout: Duration) -> Result<PageReaction, DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;
}

/// Creates one driver per batch item.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn create(&self) -> Result<Box<dyn BrowserDriver>, DriverError>;
}
