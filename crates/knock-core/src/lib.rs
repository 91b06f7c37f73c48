//! Pure heuristics for contact-form outreach.
//!
//! Everything in this crate operates on [`protocol::PageSnapshot`]
//! values and owns no I/O: form detection, field mapping, challenge
//! detection, success verification, and e-mail harvesting are all
//! deterministic functions a driver-agnostic engine can call.

pub mod challenge;
pub mod detector;
pub mod harvester;
pub mod mapper;
pub mod prefs;
pub mod profile;
pub mod protocol;
pub mod verifier;

pub use challenge::{detect_challenge, ChallengeKind, DetectedChallenge};
pub use detector::{detect_forms, find_contact_link, FieldDescriptor, FieldKind, FormCandidate};
pub use mapper::{FieldDecision, FieldMapper, FieldValue};
pub use prefs::{normalize_domain, PreferenceMap, PreferenceScope};
pub use profile::SenderProfile;
pub use protocol::{Element, ElementRef, FrameSnapshot, PageSnapshot};
pub use verifier::{verify, SuccessSignal};
