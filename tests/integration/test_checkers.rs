//! Tests for the `checkers` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_checkers_json_lists_config() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  let mut config = String::from("[resources.yolo]\ncommand = [\"echo\", \"/models/yolo.pt\"]\n");
  config.push_str(&checker_entry(
    "face",
    "weight = 2\nrequired = true\ndescription = \"Haar cascade face count\"\npass_when = { field = \"face_detected\", equals = true }",
  ));
  config.push_str(&checker_entry(
    "pose",
    "pass_when = { field = \"head_pose\", one_of = [\"frontal\", \"turned\"] }",
  ));
  config.push_str(&checker_entry("objects", "enabled = false\nresource = \"yolo\""));
  workspace.write_config(&config)?;

  let output = run_idphoto_ok(&workspace.path, &["checkers", "--json"])?;
  let rows = stdout_json(&output)?;
  let rows = rows.as_array().unwrap();
  assert_eq!(rows.len(), 3);

  assert_eq!(rows[0]["name"], "face");
  assert_eq!(rows[0]["weight"], 2);
  assert_eq!(rows[0]["required"], true);
  assert_eq!(rows[0]["pass_when"], "face_detected == true");
  assert_eq!(rows[0]["description"], "Haar cascade face count");

  assert_eq!(rows[1]["pass_when"], r#"head_pose in ["frontal", "turned"]"#);
  assert_eq!(rows[1]["description"], "external command `sh checks/pose.sh`");

  assert_eq!(rows[2]["enabled"], false);
  assert_eq!(rows[2]["resource"], "yolo");
  Ok(())
}

#[test]
fn test_checkers_table() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.write_config(&checker_entry("face", "weight = 3"))?;

  let output = run_idphoto_ok(&workspace.path, &["checkers"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("1 enabled, max score 3, threshold 7"), "{}", stdout);
  assert!(stdout.contains("face"), "{}", stdout);
  Ok(())
}
