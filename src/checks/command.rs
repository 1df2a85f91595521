//! Checks and resources backed by external executables
//!
//! The pixel-level analyses (cascade detectors, landmark models, OCR, object
//! detectors) live outside this crate. A `CommandCheck` runs one of them per
//! image with a small protocol:
//!
//! - stdin: the raw image bytes
//! - `IDPHOTO_CHECKER`: the checker name
//! - `IDPHOTO_FORMAT`: sniffed container format (`jpeg`, `png`, ...)
//! - `IDPHOTO_PARAMS`: the checker's params as a JSON object
//! - `IDPHOTO_RESOURCE`: the shared resource value, when one is bound
//! - stdout: one JSON object, the check result
//!
//! A non-zero exit or anything other than a JSON object on stdout is a fault.
//! A verdict such as "no face found" must be reported as fields with exit 0.

use super::trait_def::{Check, CheckContext, CheckResult};
use super::registry::ResourceBinding;
use crate::core::image::Image;
use crate::engine::resource::SharedResource;
use anyhow::{Context, bail};
use serde_json::Value;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::thread;

const STDERR_TAIL: usize = 400;

/// Value produced by a resource command (usually a model path)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResource(pub String);

/// Check implemented by an external program
#[derive(Debug, Clone)]
pub struct CommandCheck {
  name: String,
  description: String,
  program: String,
  args: Vec<String>,
  working_dir: Option<PathBuf>,
}

impl CommandCheck {
  /// `argv[0]` is the program, the rest are its arguments
  pub fn new(name: impl Into<String>, argv: &[String]) -> anyhow::Result<Self> {
    let name = name.into();
    let Some((program, args)) = argv.split_first() else {
      bail!("checker '{}' has an empty command", name);
    };
    Ok(Self {
      description: format!("external command `{}`", argv.join(" ")),
      name,
      program: program.clone(),
      args: args.to_vec(),
      working_dir: None,
    })
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Run the program from this directory (relative script paths resolve here)
  pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.working_dir = Some(dir.into());
    self
  }

  fn command(&self) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args);
    if let Some(dir) = &self.working_dir {
      cmd.current_dir(dir);
    }
    cmd
  }
}

impl Check for CommandCheck {
  fn name(&self) -> &str {
    &self.name
  }

  fn description(&self) -> &str {
    &self.description
  }

  fn run(&self, image: &Image, ctx: &CheckContext<'_>) -> anyhow::Result<CheckResult> {
    let mut cmd = self.command();
    cmd
      .env("IDPHOTO_CHECKER", &self.name)
      .env("IDPHOTO_FORMAT", image.format().as_str())
      .env("IDPHOTO_PARAMS", serde_json::to_string(ctx.params)?);
    if let Some(CommandResource(value)) = ctx.resource::<CommandResource>() {
      cmd.env("IDPHOTO_RESOURCE", value);
    }

    let output = run_with_stdin(cmd, image.bytes()).with_context(|| format!("failed to run `{}`", self.program))?;

    if !output.status.success() {
      bail!(
        "`{}` exited with {}: {}",
        self.program,
        output.status,
        stderr_tail(&output.stderr)
      );
    }

    match serde_json::from_slice::<Value>(&output.stdout) {
      Ok(Value::Object(fields)) => Ok(CheckResult::from(fields)),
      Ok(other) => bail!("`{}` printed JSON {} instead of an object", self.program, kind_of(&other)),
      Err(err) => Err(err).with_context(|| {
        format!(
          "`{}` did not print a JSON object (stderr: {})",
          self.program,
          stderr_tail(&output.stderr)
        )
      }),
    }
  }
}

/// Resource built by running `argv` once; its trimmed stdout is the value
pub fn command_resource(key: impl Into<String>, argv: Vec<String>, working_dir: Option<PathBuf>) -> ResourceBinding {
  let key = key.into();
  let label = key.clone();
  ResourceBinding::new(key, move || -> anyhow::Result<SharedResource> {
    let Some((program, args)) = argv.split_first() else {
      bail!("resource '{}' has an empty command", label);
    };
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = &working_dir {
      cmd.current_dir(dir);
    }
    let output = cmd
      .stdin(Stdio::null())
      .output()
      .with_context(|| format!("failed to run `{}`", program))?;
    if !output.status.success() {
      bail!("`{}` exited with {}: {}", program, output.status, stderr_tail(&output.stderr));
    }
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(Arc::new(CommandResource(value)))
  })
}

/// Feed `input` on stdin from a helper thread so a chatty child cannot deadlock us
fn run_with_stdin(mut cmd: Command, input: &[u8]) -> std::io::Result<Output> {
  let mut child = cmd
    .stdin(Stdio::piped())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()?;

  let stdin = child.stdin.take();
  thread::scope(|s| {
    let writer = s.spawn(move || -> std::io::Result<()> {
      if let Some(mut stdin) = stdin {
        match stdin.write_all(input) {
          // The child may legitimately ignore stdin
          Err(err) if err.kind() == ErrorKind::BrokenPipe => {}
          other => other?,
        }
      }
      Ok(())
    });
    let output = child.wait_with_output()?;
    writer
      .join()
      .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")))?;
    Ok(output)
  })
}

fn stderr_tail(stderr: &[u8]) -> String {
  let text = String::from_utf8_lossy(stderr);
  let text = text.trim();
  if text.is_empty() {
    return "<no stderr>".to_string();
  }
  let chars: Vec<char> = text.chars().collect();
  if chars.len() <= STDERR_TAIL {
    text.to_string()
  } else {
    format!("…{}", chars[chars.len() - STDERR_TAIL..].iter().collect::<String>())
  }
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}
