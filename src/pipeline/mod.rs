//! The analysis and drafting pipeline.
//!
//! Gates run strictly in order inside one request: security scan and schema
//! checks, rate limiting, file normalization, the remote call, response
//! reconciliation, then best-effort persistence.

pub mod draft_builder;
pub mod entity_role;
pub mod normalizer;
pub mod orchestrator;
pub mod persistence;
pub mod rate_limit;
pub mod reconcile;
pub mod security;

pub use draft_builder::{build_draft_request, DraftComposer};
pub use entity_role::{classify_entity_role, EntityRole};
pub use normalizer::normalize;
pub use orchestrator::{AnalysisOrchestrator, AnalysisOutcome, AnalysisRun, Caller, PipelineState};
pub use persistence::{PersistJob, PersistenceGateway, PersistenceReport};
pub use rate_limit::{Clock, ManualClock, RateLimiter, SystemClock};
pub use reconcile::{classify, reconcile, Reconciled, ResponseShape};
pub use security::{SecurityValidator, ValidationLimits};
