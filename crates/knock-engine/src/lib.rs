pub mod batch;
pub mod config;
pub mod driver;
pub mod navigator;
pub mod pipeline;
pub mod prefs;
pub mod solver;
pub mod submitter;

pub use knock_core::detector;
pub use knock_core::mapper;
pub use knock_core::profile;
pub use knock_core::protocol;
pub use knock_core::verifier;

pub use batch::{BatchItem, BatchReport, BatchRunner};
pub use config::{ConfigLoader, KnockConfig};
pub use driver::{BrowserDriver, DriverError, DriverFactory};
pub use pipeline::{ContactMethod, PipelineResult, SubmissionPipeline};
pub use prefs::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use solver::{ChallengeHandler, ChallengeOutcome, ChallengeSolver, HttpSolver};
