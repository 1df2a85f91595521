//! Test helpers for integration tests

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// 8-byte PNG signature followed by padding; enough for format sniffing
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x02\0\0\0";

/// A scratch directory holding idphoto.toml, checker scripts and images
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();
    std::fs::create_dir_all(path.join("checks"))?;
    Ok(Self { _root: root, path })
  }

  /// Write `checks/<name>.sh`; configs refer to it as `["sh", "checks/<name>.sh"]`
  pub fn add_checker(&self, name: &str, body: &str) -> Result<()> {
    std::fs::write(self.path.join("checks").join(format!("{}.sh", name)), body)?;
    Ok(())
  }

  /// Checker that drains stdin and prints `result`
  pub fn add_static_checker(&self, name: &str, result: &str) -> Result<()> {
    self.add_checker(name, &format!("cat > /dev/null\necho '{}'\n", result))
  }

  pub fn write_config(&self, content: &str) -> Result<()> {
    std::fs::write(self.path.join("idphoto.toml"), content)?;
    Ok(())
  }

  pub fn add_image(&self, name: &str) -> Result<PathBuf> {
    self.add_file(name, PNG)
  }

  pub fn add_file(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = self.path.join(name);
    std::fs::write(&path, bytes)?;
    Ok(path)
  }

  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// `[[checkers]]` entry running `checks/<name>.sh`
pub fn checker_entry(name: &str, extra: &str) -> String {
  format!(
    "\n[[checkers]]\nname = \"{}\"\ncommand = [\"sh\", \"checks/{}.sh\"]\n{}\n",
    name, name, extra
  )
}

/// Run the idphoto binary, whatever its exit status
pub fn run_idphoto(cwd: &Path, args: &[&str]) -> Result<Output> {
  let idphoto_bin = env!("CARGO_BIN_EXE_idphoto");

  Command::new(idphoto_bin)
    .current_dir(cwd)
    .args(args)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run idphoto")
}

/// Run the idphoto binary and require a zero exit status
pub fn run_idphoto_ok(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_idphoto(cwd, args)?;
  if !output.status.success() {
    anyhow::bail!(
      "idphoto command failed: idphoto {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    );
  }
  Ok(output)
}

pub fn stdout_json(output: &Output) -> Result<Value> {
  serde_json::from_slice(&output.stdout).with_context(|| {
    format!(
      "stdout is not JSON:\n{}\nstderr: {}",
      String::from_utf8_lossy(&output.stdout),
      String::from_utf8_lossy(&output.stderr)
    )
  })
}

pub fn exit_code(output: &Output) -> i32 {
  output.status.code().unwrap_or(-1)
}
