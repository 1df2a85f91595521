use crate::core::config::IdphotoConfig;
use crate::core::error::{VerifyError, VerifyResult};
use std::env;
use std::path::{Path, PathBuf};

/// Write the default template into `dir`
pub fn init_config(dir: &Path, force: bool) -> VerifyResult<PathBuf> {
  if let Some(existing) = IdphotoConfig::find_config_path(dir)
    && !force
  {
    return Err(VerifyError::with_help(
      format!("Configuration already exists at {}", existing.display()),
      "Use --force to overwrite it with the default template",
    ));
  }
  IdphotoConfig::default_template().save(dir)
}

/// Run the init command
pub fn run_init(force: bool) -> VerifyResult<()> {
  let current_dir = env::current_dir()?;
  let path = init_config(&current_dir, force)?;
  println!("✅ Wrote {}", path.display());
  println!("   Edit the [[checkers]] commands to point at your analysis scripts.");
  Ok(())
}
