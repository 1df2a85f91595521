//! Checker contract and registry
//!
//! Every image property (face present, eyes open, background plain, ...) is a
//! `Check`. Checks are registered once at startup with their weight, required
//! flag, pass signal and optional shared resource, and are then dispatched
//! concurrently by the engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use idphoto::checks::{CheckerDescriptor, CommandCheck, PassSignal, Registry};
//!
//! let face = CommandCheck::new("face", &["python3".into(), "-m".into(), "idchecks.face".into()])?;
//! let mut registry = Registry::new();
//! registry.register(
//!   CheckerDescriptor::new(Arc::new(face))
//!     .required(true)
//!     .signal(PassSignal::flag("face_detected")),
//! )?;
//! ```

mod command;
pub(crate) mod registry;
mod trait_def;

pub use command::{CommandCheck, CommandResource, command_resource};
pub use registry::{CheckerDescriptor, Registry, ResourceBinding};
pub use trait_def::{Check, CheckContext, CheckParams, CheckResult, Expectation, PassSignal};
