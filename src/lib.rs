//! Identity-photo verification
//!
//! Runs a set of independent checkers (face present, eyes visible, sharpness,
//! pose, lighting, background, framing, text, ...) concurrently against one
//! image, then reduces their outcomes into a weighted pass/fail verdict.
//!
//! ```rust,ignore
//! use idphoto::{IdphotoConfig, Verifier};
//!
//! let config = IdphotoConfig::load(Path::new("."))?;
//! let verifier = Verifier::new(config.build_registry()?, config.settings())?;
//! let report = verifier.verify(std::fs::read("passport.jpg")?)?;
//! println!("{}", report.to_json()?);
//! ```
//!
//! A checker that errors, panics, outlives the deadline or cannot get its
//! shared resource never aborts the request: it is recorded as a failure
//! outcome and scores zero.

pub mod checks;
pub mod commands;
pub mod core;
pub mod engine;
pub mod ui;

pub use checks::{Check, CheckContext, CheckResult, CheckerDescriptor, CommandCheck, PassSignal, Registry};
pub use crate::core::config::IdphotoConfig;
pub use crate::core::error::{InputError, VerifyError, VerifyResult};
pub use crate::core::image::{Image, ImageFormat};
pub use engine::{AggregateReport, PublicReport, Status, Verifier, VerifierSettings};
