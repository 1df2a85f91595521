//! Tests for the `verify` command

use crate::helpers::*;
use anyhow::Result;
use std::time::{Duration, Instant};

/// face (required), eyes and blur, threshold 2
fn three_checker_workspace(face: &str, eyes: &str, blur: &str) -> Result<TestWorkspace> {
  let workspace = TestWorkspace::new()?;
  workspace.add_static_checker("face", face)?;
  workspace.add_static_checker("eyes", eyes)?;
  workspace.add_static_checker("blur", blur)?;

  let mut config = String::from("[verification]\npassing_threshold = 2\ntimeout_ms = 10000\n");
  config.push_str(&checker_entry(
    "face",
    "required = true\npass_when = { field = \"face_detected\", equals = true }",
  ));
  config.push_str(&checker_entry(
    "eyes",
    "pass_when = { field = \"eyes_detected\", equals = true }",
  ));
  config.push_str(&checker_entry("blur", "pass_when = { field = \"is_blurry\", equals = false }"));
  workspace.write_config(&config)?;
  Ok(workspace)
}

#[test]
fn test_verify_passing_image() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true, "face_count": 1}"#,
    r#"{"eyes_detected": false}"#,
    r#"{"blur_score": 143.2, "is_blurry": false}"#,
  )?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto_ok(&workspace.path, &["verify", "photo.png", "--json"])?;
  let report = stdout_json(&output)?;

  assert_eq!(report["file"], "photo.png");
  assert_eq!(report["sha256"].as_str().unwrap().len(), 64);
  assert!(report["checked_at"].is_string());
  assert_eq!(report["status"], "passed");
  assert_eq!(report["score"], 2);
  assert_eq!(report["max_score"], 3);
  assert_eq!(report["passing_threshold"], 2);
  assert_eq!(report["required_failures"], serde_json::json!([]));
  assert_eq!(report["details"]["face"]["face_count"], 1);
  assert_eq!(report["details"]["blur"]["blur_score"], 143.2);

  let order: Vec<&String> = report["details"].as_object().unwrap().keys().collect();
  assert_eq!(order, ["face", "eyes", "blur"]);
  Ok(())
}

#[test]
fn test_verify_required_failure_exits_3() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": false, "face_count": 0}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto(&workspace.path, &["verify", "photo.png", "--json"])?;
  assert_eq!(exit_code(&output), 3);

  let report = stdout_json(&output)?;
  assert_eq!(report["status"], "failed");
  assert_eq!(report["score"], 2);
  assert_eq!(report["required_failures"], serde_json::json!(["face"]));
  Ok(())
}

#[test]
fn test_verify_isolates_crashing_checker() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;
  workspace.add_checker("blur", "echo 'cv2.error: empty image' >&2\nexit 1\n")?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto_ok(&workspace.path, &["verify", "photo.png", "--json"])?;
  let report = stdout_json(&output)?;

  assert_eq!(report["status"], "passed");
  assert_eq!(report["score"], 2);
  assert_eq!(report["details"]["blur"]["error"]["kind"], "fault");
  let message = report["details"]["blur"]["error"]["message"].as_str().unwrap();
  assert!(message.contains("cv2.error: empty image"), "{}", message);
  assert_eq!(report["details"]["face"]["face_detected"], true);
  Ok(())
}

#[test]
fn test_verify_deadline_marks_timeout() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;
  workspace.add_checker("eyes", "cat > /dev/null\nsleep 5\necho '{\"eyes_detected\": true}'\n")?;
  workspace.add_image("photo.png")?;

  let started = Instant::now();
  let output = run_idphoto_ok(
    &workspace.path,
    &["verify", "photo.png", "--json", "--timeout-ms", "1000"],
  )?;
  assert!(started.elapsed() < Duration::from_secs(4));

  let report = stdout_json(&output)?;
  assert_eq!(
    report["details"]["eyes"],
    serde_json::json!({ "error": { "kind": "timeout", "message": "timeout" } })
  );
  assert_eq!(report["score"], 2);
  assert_eq!(report["status"], "passed");
  Ok(())
}

#[test]
fn test_verify_threshold_override() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": true}"#,
  )?;
  workspace.add_image("photo.png")?;

  // score 2 meets the configured threshold exactly
  run_idphoto_ok(&workspace.path, &["verify", "photo.png", "--json"])?;

  let output = run_idphoto(&workspace.path, &["verify", "photo.png", "--json", "--threshold", "3"])?;
  assert_eq!(exit_code(&output), 3);
  let report = stdout_json(&output)?;
  assert_eq!(report["passing_threshold"], 3);
  assert_eq!(report["status"], "failed");
  Ok(())
}

#[test]
fn test_verify_multiple_images_in_order() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;
  let names: Vec<String> = (0..5).map(|i| format!("photo-{}.png", i)).collect();
  for name in &names {
    workspace.add_image(name)?;
  }

  let mut args = vec!["verify", "--json"];
  args.extend(names.iter().map(String::as_str));
  let output = run_idphoto_ok(&workspace.path, &args)?;
  let reports = stdout_json(&output)?;

  let files: Vec<&str> = reports
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["file"].as_str().unwrap())
    .collect();
  assert_eq!(files, names);
  assert!(reports.as_array().unwrap().iter().all(|r| r["status"] == "passed"));
  Ok(())
}

#[test]
fn test_verify_rejects_non_image() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;
  workspace.add_file("notes.txt", b"not a photo")?;
  workspace.add_file("empty.jpg", b"")?;

  let output = run_idphoto(&workspace.path, &["verify", "notes.txt", "empty.jpg", "--json"])?;
  assert_eq!(exit_code(&output), 1);
  let reports = stdout_json(&output)?;
  assert_eq!(reports[0]["status"], "rejected");
  assert_eq!(reports[0]["error"], "Input is not a recognized image");
  assert_eq!(reports[1]["error"], "Empty image file");
  assert!(reports[0].get("details").is_none());
  Ok(())
}

#[test]
fn test_verify_missing_file_is_io_error() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;

  let output = run_idphoto(&workspace.path, &["verify", "missing.png"])?;
  assert_eq!(exit_code(&output), 2);
  assert!(String::from_utf8_lossy(&output.stderr).contains("missing.png"));
  Ok(())
}

#[test]
fn test_verify_without_config() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto(&workspace.path, &["verify", "photo.png"])?;
  assert_eq!(exit_code(&output), 1);
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("No idphoto configuration found"), "{}", stderr);
  assert!(stderr.contains("idphoto init"), "{}", stderr);
  Ok(())
}

#[test]
fn test_verify_invalid_config() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_image("photo.png")?;
  workspace.write_config(&checker_entry("objects", "resource = \"yolo\""))?;

  let output = run_idphoto(&workspace.path, &["verify", "photo.png"])?;
  assert_eq!(exit_code(&output), 1);
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("undeclared resource 'yolo'"), "{}", stderr);
  assert!(stderr.contains("Invalid configuration in"), "{}", stderr);
  assert!(stderr.contains("idphoto.toml"), "{}", stderr);
  assert!(stderr.contains("[resources.yolo]"), "{}", stderr);
  Ok(())
}

#[test]
fn test_verify_explicit_config_path() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": true}"#,
    r#"{"is_blurry": false}"#,
  )?;
  std::fs::rename(workspace.path.join("idphoto.toml"), workspace.path.join("custom.toml"))?;
  let image = workspace.add_image("photo.png")?;
  let config = workspace.path.join("custom.toml");

  // Run from elsewhere: checker scripts resolve against the config's directory
  let elsewhere = tempfile::TempDir::new()?;
  let output = run_idphoto_ok(
    elsewhere.path(),
    &[
      "verify",
      image.to_str().unwrap(),
      "--config",
      config.to_str().unwrap(),
      "--json",
    ],
  )?;
  assert_eq!(stdout_json(&output)?["score"], 3);
  Ok(())
}

#[test]
fn test_verify_shared_resource_built_once() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_checker(
    "objects",
    "cat > /dev/null\nprintf '{\"passed\": true, \"model\": \"%s\"}' \"$IDPHOTO_RESOURCE\"\n",
  )?;
  workspace.add_checker(
    "human_only",
    "cat > /dev/null\nprintf '{\"status\": \"PASS\", \"model\": \"%s\"}' \"$IDPHOTO_RESOURCE\"\n",
  )?;

  let mut config = String::from(
    "[verification]\npassing_threshold = 2\n\n[resources.yolo]\ncommand = [\"sh\", \"-c\", \"echo run >> resource-runs.log; echo /models/yolov8n-seg.pt\"]\n",
  );
  config.push_str(&checker_entry("objects", "resource = \"yolo\""));
  config.push_str(&checker_entry(
    "human_only",
    "resource = \"yolo\"\npass_when = { field = \"status\", one_of = [\"PASS\"] }",
  ));
  workspace.write_config(&config)?;
  for i in 0..4 {
    workspace.add_image(&format!("photo-{}.png", i))?;
  }

  let output = run_idphoto_ok(
    &workspace.path,
    &["verify", "--json", "photo-0.png", "photo-1.png", "photo-2.png", "photo-3.png"],
  )?;
  let reports = stdout_json(&output)?;
  for report in reports.as_array().unwrap() {
    assert_eq!(report["status"], "passed");
    assert_eq!(report["details"]["objects"]["model"], "/models/yolov8n-seg.pt");
    assert_eq!(report["details"]["human_only"]["model"], "/models/yolov8n-seg.pt");
  }

  let runs = workspace.read_file("resource-runs.log")?;
  assert_eq!(runs.lines().count(), 1);
  Ok(())
}

#[test]
fn test_verify_failed_resource_is_an_outcome() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_static_checker("face", r#"{"passed": true}"#)?;
  workspace.add_static_checker("objects", r#"{"passed": true}"#)?;

  let mut config = String::from(
    "[verification]\npassing_threshold = 1\n\n[resources.yolo]\ncommand = [\"sh\", \"-c\", \"echo 'download failed' >&2; exit 1\"]\n",
  );
  config.push_str(&checker_entry("face", "required = true"));
  config.push_str(&checker_entry("objects", "resource = \"yolo\""));
  workspace.write_config(&config)?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto_ok(&workspace.path, &["verify", "photo.png", "--json"])?;
  let report = stdout_json(&output)?;
  assert_eq!(report["score"], 1);
  assert_eq!(report["details"]["objects"]["error"]["kind"], "resource");
  assert!(
    report["details"]["objects"]["error"]["message"]
      .as_str()
      .unwrap()
      .contains("download failed")
  );
  Ok(())
}

#[test]
fn test_verify_forwards_params() -> Result<()> {
  let workspace = TestWorkspace::new()?;
  workspace.add_checker(
    "quality",
    "cat > /dev/null\nprintf '{\"passed\": true, \"params\": %s, \"format\": \"%s\"}' \"$IDPHOTO_PARAMS\" \"$IDPHOTO_FORMAT\"\n",
  )?;
  let mut config = String::from("[verification]\npassing_threshold = 1\n");
  config.push_str(&checker_entry("quality", "[checkers.params]\nthreshold = 100.0"));
  workspace.write_config(&config)?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto_ok(&workspace.path, &["verify", "photo.png", "--json"])?;
  let report = stdout_json(&output)?;
  assert_eq!(report["details"]["quality"]["params"]["threshold"], 100.0);
  assert_eq!(report["details"]["quality"]["format"], "png");
  Ok(())
}

#[test]
fn test_verify_human_output() -> Result<()> {
  let workspace = three_checker_workspace(
    r#"{"face_detected": true}"#,
    r#"{"eyes_detected": false}"#,
    r#"{"is_blurry": false}"#,
  )?;
  workspace.add_image("photo.png")?;

  let output = run_idphoto_ok(&workspace.path, &["verify", "photo.png"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("photo.png passed (score 2/3, threshold 2)"), "{}", stdout);
  assert!(stdout.contains("eyes"), "{}", stdout);
  Ok(())
}
