//! Tests for the `init` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_init_creates_config() -> Result<()> {
  let workspace = TestWorkspace::new()?;

  run_idphoto_ok(&workspace.path, &["init"])?;

  assert!(workspace.file_exists("idphoto.toml"));
  let config = workspace.read_file("idphoto.toml")?;
  assert!(config.contains("[verification]"));
  assert!(config.contains("passing_threshold = 7"));
  assert!(config.contains("[[checkers]]"));
  assert!(config.contains("[resources.yolo]"));
  Ok(())
}

#[test]
fn test_init_refuses_existing_config() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.write_config(&checker_entry("face", ""))?;

  let output = run_idphoto(&workspace.path, &["init"])?;
  assert_eq!(exit_code(&output), 1);
  assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));
  assert!(workspace.read_file("idphoto.toml")?.contains("checks/face.sh"));

  run_idphoto_ok(&workspace.path, &["init", "--force"])?;
  assert!(workspace.read_file("idphoto.toml")?.contains("idchecks.face"));
  Ok(())
}

#[test]
fn test_init_template_is_loadable() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  run_idphoto_ok(&workspace.path, &["init"])?;

  let output = run_idphoto_ok(&workspace.path, &["checkers", "--json"])?;
  let rows = stdout_json(&output)?;
  let enabled: Vec<&str> = rows
    .as_array()
    .unwrap()
    .iter()
    .filter(|r| r["enabled"] == true)
    .map(|r| r["name"].as_str().unwrap())
    .collect();
  assert_eq!(
    enabled,
    ["face", "eyes", "quality", "pose", "lighting", "background", "geometry", "text"]
  );
  Ok(())
}
