use crate::core::config::IdphotoConfig;
use crate::core::error::{ExitCode, InputError, VerifyError, VerifyResult};
use crate::engine::report::{PublicReport, assemble};
use crate::engine::scorer::AggregateReport;
use crate::engine::verifier::Verifier;
use crate::ui::ImageProgress;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line overrides for `[verification]`
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
  pub config: Option<PathBuf>,
  pub threshold: Option<u32>,
  pub timeout_ms: Option<u64>,
  pub workers: Option<usize>,
  pub json: bool,
}

/// What happened to one input file
#[derive(Debug)]
pub enum Verdict {
  Scored(AggregateReport),
  Rejected(InputError),
}

#[derive(Debug)]
pub struct ImageResult {
  pub file: String,
  pub sha256: String,
  pub checked_at: DateTime<Utc>,
  pub verdict: Verdict,
}

/// JSON envelope around the public report
#[derive(Debug, Serialize)]
pub struct ImageEnvelope {
  pub file: String,
  pub sha256: String,
  pub checked_at: DateTime<Utc>,
  #[serde(flatten)]
  pub body: EnvelopeBody,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EnvelopeBody {
  Report(PublicReport),
  Rejected { status: &'static str, error: String },
}

impl ImageResult {
  pub fn envelope(&self) -> ImageEnvelope {
    let body = match &self.verdict {
      Verdict::Scored(report) => EnvelopeBody::Report(assemble(report)),
      Verdict::Rejected(err) => EnvelopeBody::Rejected {
        status: "rejected",
        error: err.to_string(),
      },
    };
    ImageEnvelope {
      file: self.file.clone(),
      sha256: self.sha256.clone(),
      checked_at: self.checked_at,
      body,
    }
  }
}

/// 0 when every image passed, 1 when any input was rejected, otherwise 3
pub fn exit_code_for(results: &[ImageResult]) -> i32 {
  if results.iter().any(|r| matches!(r.verdict, Verdict::Rejected(_))) {
    return ExitCode::User.as_i32();
  }
  let all_passed = results
    .iter()
    .all(|r| matches!(&r.verdict, Verdict::Scored(report) if report.passed()));
  if all_passed { 0 } else { ExitCode::Validation.as_i32() }
}

/// Run the verify command, returning the process exit code
pub fn run_verify(images: Vec<PathBuf>, options: VerifyOptions) -> VerifyResult<i32> {
  if images.is_empty() {
    return Err(VerifyError::with_help(
      "No images given",
      "Pass one or more image paths: idphoto verify photo.jpg",
    ));
  }

  let config = super::load_config(options.config.as_deref())?;
  let mut settings = config.settings();
  if let Some(threshold) = options.threshold {
    settings.passing_threshold = threshold;
  }
  if let Some(timeout_ms) = options.timeout_ms {
    if timeout_ms == 0 {
      return Err(VerifyError::with_help("--timeout-ms must be greater than zero", "Try --timeout-ms 30000"));
    }
    settings.timeout = Duration::from_millis(timeout_ms);
  }
  if let Some(workers) = options.workers {
    settings.workers = workers;
  }

  let verifier = Verifier::new(config.build_registry()?, settings)?;
  let inputs = read_inputs(&images)?;
  let results = verify_all(&verifier, inputs, !options.json);

  if options.json {
    let envelopes: Vec<ImageEnvelope> = results.iter().map(ImageResult::envelope).collect();
    let rendered = match envelopes.as_slice() {
      [single] => serde_json::to_string_pretty(single)?,
      many => serde_json::to_string_pretty(many)?,
    };
    println!("{}", rendered);
  } else {
    print_results(&results);
  }

  Ok(exit_code_for(&results))
}

fn read_inputs(images: &[PathBuf]) -> VerifyResult<Vec<(PathBuf, Vec<u8>)>> {
  images
    .iter()
    .map(|path| {
      let bytes = fs::read(path).map_err(|err| {
        VerifyError::Io(io::Error::new(
          err.kind(),
          format!("failed to read {}: {}", path.display(), err),
        ))
      })?;
      Ok((path.clone(), bytes))
    })
    .collect()
}

/// Verify every input in parallel; one result per input, in input order
pub fn verify_all(verifier: &Verifier, inputs: Vec<(PathBuf, Vec<u8>)>, show_progress: bool) -> Vec<ImageResult> {
  let total = inputs.len();
  let progress = (show_progress && total > 1).then(|| ImageProgress::new(total, "Verifying images"));

  inputs
    .into_par_iter()
    .map(|(path, bytes)| {
      let result = verify_one(verifier, &path, &bytes);
      if let Some(progress) = &progress {
        progress.inc();
      }
      result
    })
    .collect()
}

fn verify_one(verifier: &Verifier, path: &std::path::Path, bytes: &[u8]) -> ImageResult {
  let sha256 = format!("{:x}", Sha256::digest(bytes));
  let verdict = match verifier.verify_report(bytes.to_vec()) {
    Ok(report) => Verdict::Scored(report),
    Err(err) => {
      tracing::warn!(file = %path.display(), error = %err, "input rejected");
      Verdict::Rejected(err)
    }
  };
  ImageResult {
    file: path.display().to_string(),
    sha256,
    checked_at: Utc::now(),
    verdict,
  }
}

fn print_results(results: &[ImageResult]) {
  for result in results {
    println!();
    match &result.verdict {
      Verdict::Rejected(err) => {
        println!("⛔ {} rejected: {}", result.file, err);
      }
      Verdict::Scored(report) => {
        let icon = if report.passed() { "✅" } else { "❌" };
        println!(
          "{} {} {} (score {}/{}, threshold {})",
          icon, result.file, report.status, report.score, report.max_score, report.passing_threshold
        );
        for check in &report.checks {
          let mark = if check.passed { "✓" } else { "✗" };
          let note = match check.outcome.as_failure() {
            Some(failure) => format!("{}: {}", failure.kind, failure.message),
            None if check.required => "required".to_string(),
            None => String::new(),
          };
          println!("   {} {:<20} {:>3}  {}", mark, check.name, check.weight, note);
        }
        if !report.required_failures.is_empty() {
          println!("   required checks failed: {}", report.required_failures.join(", "));
        }
      }
    }
  }
  println!();
}
