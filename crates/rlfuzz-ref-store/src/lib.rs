//! # rlfuzz-ref-store
//!
//! Reference target and campaign wiring for rlfuzz.
//!
//! - [`ReferenceStore`]: an in-process shop API (items, prices, discounts,
//!   points) with known server-side defects, so training can be exercised
//!   without a network.
//! - [`HttpService`]: the same seam over a live HTTP endpoint.
//! - [`TemplatePayloadGenerator`]: seeded request bodies for every
//!   resource, field focus, mutation strategy and intensity.
//! - [`run_campaign`]: builds the value network, oracle and subscribers from
//!   a `TrainingConfig` and runs the trainer end to end.

pub mod http;
pub mod payloads;
pub mod scenario;
pub mod store;

pub use http::HttpService;
pub use payloads::TemplatePayloadGenerator;
pub use scenario::{build_trainer, run_campaign, CampaignOptions, CampaignOutcome, JournalOptions, Target};
pub use store::ReferenceStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
