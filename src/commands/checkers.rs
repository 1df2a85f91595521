use crate::core::config::IdphotoConfig;
use crate::core::error::VerifyResult;
use serde::Serialize;
use std::path::PathBuf;

/// One row of `idphoto checkers`
#[derive(Debug, Clone, Serialize)]
pub struct CheckerRow {
  pub name: String,
  pub weight: u32,
  pub required: bool,
  pub enabled: bool,
  pub resource: Option<String>,
  pub pass_when: String,
  pub description: String,
}

/// Rows for every configured checker, disabled ones included
pub fn checker_rows(config: &IdphotoConfig) -> VerifyResult<Vec<CheckerRow>> {
  let registry = config.build_registry()?;

  let rows = config
    .checkers
    .iter()
    .map(|checker| {
      let description = registry
        .get(&checker.name)
        .map(|d| d.check.description().to_string())
        .or_else(|| checker.description.clone())
        .unwrap_or_default();
      CheckerRow {
        name: checker.name.clone(),
        weight: checker.weight,
        required: checker.required,
        enabled: checker.enabled,
        resource: checker.resource.clone(),
        pass_when: checker.pass_when.to_string(),
        description,
      }
    })
    .collect();
  Ok(rows)
}

/// Run the checkers command
pub fn run_checkers(config_path: Option<PathBuf>, json: bool) -> VerifyResult<()> {
  let config = super::load_config(config_path.as_deref())?;
  let rows = checker_rows(&config)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&rows)?);
    return Ok(());
  }

  let enabled: Vec<&CheckerRow> = rows.iter().filter(|r| r.enabled).collect();
  let max_score = enabled.iter().fold(0u32, |total, r| total.saturating_add(r.weight));
  println!(
    "\n🔎 Checkers ({} enabled, max score {}, threshold {})\n",
    enabled.len(),
    max_score,
    config.verification.passing_threshold
  );
  println!(
    "{:<20} {:>6} {:<9} {:<8} {:<10} {:<40} DESCRIPTION",
    "NAME", "WEIGHT", "REQUIRED", "ENABLED", "RESOURCE", "PASS WHEN"
  );
  println!("{:-<120}", "");
  for row in &rows {
    println!(
      "{:<20} {:>6} {:<9} {:<8} {:<10} {:<40} {}",
      row.name,
      row.weight,
      if row.required { "yes" } else { "no" },
      if row.enabled { "yes" } else { "no" },
      row.resource.as_deref().unwrap_or("-"),
      row.pass_when,
      row.description
    );
  }
  println!();
  Ok(())
}
