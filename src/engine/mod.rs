//! Verification engine
//!
//! - **resource**: Keyed init-once guard for expensive shared resources
//! - **dispatcher**: Runs every registered checker concurrently under one deadline
//! - **outcome**: Per-checker success or classified failure
//! - **scorer**: Weighted, pure reduction of outcomes into a verdict
//! - **report**: Public report shape
//! - **verifier**: The validate → dispatch → score → assemble pipeline

pub mod dispatcher;
pub mod outcome;
pub mod report;
pub mod resource;
pub mod scorer;
pub mod verifier;

pub use dispatcher::Dispatcher;
pub use outcome::{CheckFailure, CheckOutcome, FailureKind, Outcomes};
pub use report::{PublicReport, assemble};
pub use resource::{ResourceGuard, ResourceInitError, SharedResource};
pub use scorer::{AggregateReport, ScoredCheck, Status, score};
pub use verifier::{Verifier, VerifierSettings};
