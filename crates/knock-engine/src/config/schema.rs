//! Engine configuration schema.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnockConfig {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub challenge: ChallengeConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub learning: LearningConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Per-attempt navigation timeout.
    #[serde(default = "default_navigation_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        NavigationConfig {
            timeout_ms: default_navigation_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// How long to wait for the page to settle after a submit action.
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    /// Text placed into required free-text fields nothing else
    /// answered.
    #[serde(default = "default_filler_message")]
    pub filler_message: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        SubmissionConfig {
            settle_timeout_ms: default_settle_timeout_ms(),
            filler_message: default_filler_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Upper bound on one external solve round-trip.
    #[serde(default = "default_solve_timeout_ms")]
    pub solve_timeout_ms: u64,
    /// Solver HTTP endpoint. No endpoint means challenges go
    /// unsolved.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        ChallengeConfig {
            solve_timeout_ms: default_solve_timeout_ms(),
            endpoint: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Worker count for batch runs.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Pacing delay between item starts on one worker.
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            concurrency: default_concurrency(),
            start_delay_ms: default_start_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    #[serde(default = "default_learning_enabled")]
    pub enabled: bool,
    /// Directory for the file-backed preference store. Defaults to
    /// `~/.knock/learned`.
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            enabled: default_learning_enabled(),
            store_dir: None,
        }
    }
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_settle_timeout_ms() -> u64 {
    10_000
}

fn default_filler_message() -> String {
    "Hello, I came across your website and would like to get in touch. \
     Please reply to this message when you have a moment."
        .to_string()
}

fn default_solve_timeout_ms() -> u64 {
    120_000
}

fn default_concurrency() -> usize {
    2
}

fn default_start_delay_ms() -> u64 {
    3_000
}

fn default_learning_enabled() -> bool {
    true
}
