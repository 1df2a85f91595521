//! Weighted scoring of dispatch outcomes
//!
//! `score` is a pure function of (outcomes, registry, threshold): no clocks, no
//! randomness, iteration follows registration order.

use crate::checks::Registry;
use crate::engine::outcome::{CheckOutcome, FailureKind, Outcomes};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Passed,
  Failed,
}

impl Status {
  pub fn is_passed(self) -> bool {
    self == Status::Passed
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Status::Passed => write!(f, "passed"),
      Status::Failed => write!(f, "failed"),
    }
  }
}

/// One checker's contribution to the score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCheck {
  pub name: String,
  pub weight: u32,
  pub required: bool,
  /// Pass signal as read from the outcome (always false for failures)
  pub passed: bool,
  pub outcome: CheckOutcome,
}

/// Scored verdict for one image
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
  pub status: Status,
  pub score: u32,
  pub max_score: u32,
  pub passing_threshold: u32,
  /// Every registered checker, in registration order
  pub checks: Vec<ScoredCheck>,
  /// Required checkers that failed or read false
  pub required_failures: Vec<String>,
}

impl AggregateReport {
  pub fn passed(&self) -> bool {
    self.status.is_passed()
  }

  pub fn check(&self, name: &str) -> Option<&ScoredCheck> {
    self.checks.iter().find(|c| c.name == name)
  }

  /// Count of checkers that ended in a failure outcome
  pub fn failed_outcomes(&self) -> usize {
    self.checks.iter().filter(|c| !c.outcome.is_success()).count()
  }
}

/// Reduce outcomes into a score and verdict
///
/// - A `Failure` outcome reads as false; for a required checker it forces `failed`
/// - A `Success` outcome adds the checker's weight when its pass signal is true
/// - `max_score` is the sum of all registered weights, whatever ran
/// - `passed` iff `score >= passing_threshold` and no required checker failed or
///   read false (the boundary is inclusive)
pub fn score(outcomes: &Outcomes, registry: &Registry, passing_threshold: u32) -> AggregateReport {
  let mut total = 0u32;
  let mut checks = Vec::with_capacity(registry.len());
  let mut required_failures = Vec::new();

  for descriptor in registry.list() {
    let outcome = outcomes
      .get(&descriptor.name)
      .cloned()
      .unwrap_or_else(|| CheckOutcome::failure(FailureKind::Fault, "no outcome recorded"));

    let passed = match &outcome {
      CheckOutcome::Success(result) => descriptor.signal.evaluate(result),
      CheckOutcome::Failure(_) => false,
    };

    if passed {
      total = total.saturating_add(descriptor.weight);
    } else if descriptor.required {
      required_failures.push(descriptor.name.clone());
    }

    checks.push(ScoredCheck {
      name: descriptor.name.clone(),
      weight: descriptor.weight,
      required: descriptor.required,
      passed,
      outcome,
    });
  }

  let status = if total >= passing_threshold && required_failures.is_empty() {
    Status::Passed
  } else {
    Status::Failed
  };

  AggregateReport {
    status,
    score: total,
    max_score: registry.max_score(),
    passing_threshold,
    checks,
    required_failures,
  }
}
