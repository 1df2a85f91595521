//! One-call verification pipeline: validate → dispatch → score → assemble
//!
//! A `Verifier` is built once at startup and shared by reference across
//! request threads. Each call dispatches independently onto the same bounded
//! pool and the same resource guard.

use crate::checks::Registry;
use crate::core::error::{InputError, VerifyResult};
use crate::core::image::Image;
use crate::engine::dispatcher::Dispatcher;
use crate::engine::report::{PublicReport, assemble};
use crate::engine::resource::ResourceGuard;
use crate::engine::scorer::{AggregateReport, score};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global verification settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierSettings {
  /// Minimum score to pass (inclusive)
  pub passing_threshold: u32,
  /// Overall per-image deadline
  pub timeout: Duration,
  /// Worker threads (0 = host parallelism)
  pub workers: usize,
}

impl Default for VerifierSettings {
  fn default() -> Self {
    Self {
      passing_threshold: 7,
      timeout: Duration::from_secs(30),
      workers: 0,
    }
  }
}

pub struct Verifier {
  registry: Registry,
  dispatcher: Dispatcher,
  settings: VerifierSettings,
}

impl Verifier {
  /// Build a verifier backed by the process-wide resource guard
  pub fn new(registry: Registry, settings: VerifierSettings) -> VerifyResult<Self> {
    Self::with_guard(registry, settings, ResourceGuard::global())
  }

  /// Build a verifier with its own resource guard
  pub fn with_guard(registry: Registry, settings: VerifierSettings, guard: Arc<ResourceGuard>) -> VerifyResult<Self> {
    let dispatcher = Dispatcher::new(settings.workers, guard)?;
    tracing::debug!(
      checkers = registry.len(),
      workers = dispatcher.workers(),
      passing_threshold = settings.passing_threshold,
      "verifier ready"
    );
    Ok(Self {
      registry,
      dispatcher,
      settings,
    })
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn settings(&self) -> &VerifierSettings {
    &self.settings
  }

  pub fn workers(&self) -> usize {
    self.dispatcher.workers()
  }

  /// Verify raw bytes and return the public report
  pub fn verify(&self, bytes: impl Into<Arc<[u8]>>) -> Result<PublicReport, InputError> {
    self.verify_report(bytes).map(|report| assemble(&report))
  }

  /// Verify raw bytes and return the scored report
  pub fn verify_report(&self, bytes: impl Into<Arc<[u8]>>) -> Result<AggregateReport, InputError> {
    let image = Image::from_bytes(bytes)?;
    Ok(self.verify_image(&image))
  }

  /// Verify an already validated image
  pub fn verify_image(&self, image: &Image) -> AggregateReport {
    let started = Instant::now();
    let outcomes = self.dispatcher.run(image, &self.registry, self.settings.timeout);
    let report = score(&outcomes, &self.registry, self.settings.passing_threshold);
    tracing::info!(
      status = %report.status,
      score = report.score,
      max_score = report.max_score,
      format = %image.format(),
      failed_outcomes = report.failed_outcomes(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "image verified"
    );
    report
  }
}
