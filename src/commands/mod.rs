//! CLI commands for idphoto
//!
//! - **verify**: Score one or more images against the configured checkers
//! - **checkers**: List the configured checkers and how they are scored
//! - **init**: Write the default `idphoto.toml`

pub mod checkers;
pub mod init;
pub mod verify;

pub use checkers::run_checkers;
pub use init::run_init;
pub use verify::{VerifyOptions, run_verify};

use crate::core::config::IdphotoConfig;
use crate::core::error::VerifyResult;
use std::env;
use std::path::Path;

/// Load an explicit config file, or search the current directory
pub(crate) fn load_config(explicit: Option<&Path>) -> VerifyResult<IdphotoConfig> {
  match explicit {
    Some(path) => IdphotoConfig::load_from(path),
    None => IdphotoConfig::load(&env::current_dir()?),
  }
}
