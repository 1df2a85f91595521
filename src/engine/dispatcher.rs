//! Fan-out/fan-in execution of every registered check against one image
//!
//! # Failure isolation
//!
//! - Check returns `Err`: recorded as a `fault` failure for that check only
//! - Check panics: caught with `catch_unwind`, recorded as `panic`
//! - Shared resource fails to build: recorded as `resource`, guard stays retryable
//! - Deadline elapses: every check still outstanding is recorded as `timeout`
//!
//! Every registered check yields exactly one outcome, whatever happens to its
//! siblings.
//!
//! # Known limitation
//!
//! Checks are blocking native computations and cannot be interrupted. A check
//! that misses the deadline is abandoned, not killed: it keeps its pool worker
//! until it returns and its late result is dropped. A pathological check can
//! therefore reduce the pool capacity seen by later requests.

use crate::checks::{CheckContext, CheckerDescriptor, Registry};
use crate::core::error::VerifyResult;
use crate::core::image::Image;
use crate::engine::outcome::{CheckOutcome, FailureKind, Outcomes};
use crate::engine::resource::{ResourceGuard, panic_message};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Runs checks on a bounded worker pool
pub struct Dispatcher {
  pool: rayon::ThreadPool,
  guard: Arc<ResourceGuard>,
}

impl Dispatcher {
  /// Build a dispatcher with `workers` threads (0 = host parallelism)
  pub fn new(workers: usize, guard: Arc<ResourceGuard>) -> VerifyResult<Self> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(workers)
      .thread_name(|i| format!("idphoto-check-{}", i))
      .panic_handler(|panic| {
        tracing::error!(panic = %panic_message(&*panic), "checker worker panicked outside isolation");
      })
      .build()?;
    Ok(Self { pool, guard })
  }

  /// Number of worker threads
  pub fn workers(&self) -> usize {
    self.pool.current_num_threads()
  }

  pub fn guard(&self) -> &Arc<ResourceGuard> {
    &self.guard
  }

  /// Run every check in `registry` against `image`, waiting at most `timeout`
  pub fn run(&self, image: &Image, registry: &Registry, timeout: Duration) -> Outcomes {
    let started = Instant::now();
    let deadline = started + timeout;
    let checkers = registry.list();
    let (tx, rx) = mpsc::channel::<(usize, CheckOutcome)>();

    for (idx, descriptor) in checkers.iter().enumerate() {
      let tx = tx.clone();
      let descriptor = Arc::clone(descriptor);
      let image = image.clone();
      let guard = Arc::clone(&self.guard);
      self.pool.spawn(move || {
        let outcome = execute(&descriptor, &image, &guard);
        // The receiver is gone once the deadline passed; the late result is dropped
        let _ = tx.send((idx, outcome));
      });
    }
    drop(tx);

    let mut slots: Vec<Option<CheckOutcome>> = (0..checkers.len()).map(|_| None).collect();
    let mut pending = checkers.len();
    let mut disconnected = false;

    while pending > 0 {
      let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
        break;
      };
      match rx.recv_timeout(remaining) {
        Ok((idx, outcome)) => {
          if slots[idx].replace(outcome).is_none() {
            pending -= 1;
          }
        }
        Err(RecvTimeoutError::Timeout) => break,
        Err(RecvTimeoutError::Disconnected) => {
          disconnected = true;
          break;
        }
      }
    }

    let outcomes = checkers
      .iter()
      .zip(slots)
      .map(|(descriptor, slot)| {
        let outcome = slot.unwrap_or_else(|| {
          if disconnected {
            tracing::warn!(checker = %descriptor.name, "worker exited without reporting");
            CheckOutcome::failure(FailureKind::Fault, "worker exited without reporting")
          } else {
            tracing::warn!(checker = %descriptor.name, timeout_ms = timeout.as_millis() as u64, "check timed out");
            CheckOutcome::timeout()
          }
        });
        (descriptor.name.clone(), outcome)
      })
      .collect();

    tracing::debug!(
      checks = checkers.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "dispatch complete"
    );
    outcomes
  }
}

/// One isolated unit of work: resolve the resource, run the check, classify the result
fn execute(descriptor: &CheckerDescriptor, image: &Image, guard: &ResourceGuard) -> CheckOutcome {
  let started = Instant::now();

  let resource = match &descriptor.resource {
    Some(binding) => match guard.get_or_init(&binding.key, || (binding.factory)()) {
      Ok(resource) => Some(resource),
      Err(err) => {
        tracing::warn!(checker = %descriptor.name, error = %err, "check skipped");
        return CheckOutcome::failure(FailureKind::Resource, err.to_string());
      }
    },
    None => None,
  };

  let ctx = CheckContext {
    params: &descriptor.params,
    resource: resource.as_ref(),
  };

  let outcome = match catch_unwind(AssertUnwindSafe(|| descriptor.check.run(image, &ctx))) {
    Ok(Ok(result)) => CheckOutcome::Success(result),
    Ok(Err(err)) => {
      let message = format!("{:#}", err);
      tracing::warn!(checker = %descriptor.name, error = %message, "check faulted");
      CheckOutcome::failure(FailureKind::Fault, message)
    }
    Err(panic) => {
      let message = panic_message(&*panic);
      tracing::warn!(checker = %descriptor.name, panic = %message, "check panicked");
      CheckOutcome::failure(FailureKind::Panic, message)
    }
  };

  tracing::debug!(
    checker = %descriptor.name,
    elapsed_ms = started.elapsed().as_millis() as u64,
    success = outcome.is_success(),
    "check finished"
  );
  outcome
}
