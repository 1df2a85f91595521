//! Per-checker outcomes produced by the dispatcher

use crate::checks::CheckResult;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Why a checker produced no result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
  /// The check returned an error
  Fault,
  /// The check panicked
  Panic,
  /// Its shared resource could not be initialized
  Resource,
  /// It did not report before the deadline
  Timeout,
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureKind::Fault => write!(f, "fault"),
      FailureKind::Panic => write!(f, "panic"),
      FailureKind::Resource => write!(f, "resource"),
      FailureKind::Timeout => write!(f, "timeout"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckFailure {
  pub kind: FailureKind,
  pub message: String,
}

/// Result of attempting one checker
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
  Success(CheckResult),
  Failure(CheckFailure),
}

impl CheckOutcome {
  pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
    CheckOutcome::Failure(CheckFailure {
      kind,
      message: message.into(),
    })
  }

  pub fn timeout() -> Self {
    Self::failure(FailureKind::Timeout, "timeout")
  }

  pub fn is_success(&self) -> bool {
    matches!(self, CheckOutcome::Success(_))
  }

  pub fn as_failure(&self) -> Option<&CheckFailure> {
    match self {
      CheckOutcome::Failure(failure) => Some(failure),
      CheckOutcome::Success(_) => None,
    }
  }

  /// Value placed under `details.<name>` in the public report
  pub fn to_detail(&self) -> Value {
    match self {
      CheckOutcome::Success(result) => result.clone().into_value(),
      CheckOutcome::Failure(failure) => json!({
        "error": {
          "kind": failure.kind,
          "message": failure.message,
        }
      }),
    }
  }
}

/// Outcomes of one dispatch keyed by checker name, in registration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcomes {
  entries: Vec<(String, CheckOutcome)>,
}

impl Outcomes {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record an outcome, replacing any earlier one for the same name
  pub fn insert(&mut self, name: impl Into<String>, outcome: CheckOutcome) {
    let name = name.into();
    match self.entries.iter_mut().find(|(n, _)| *n == name) {
      Some((_, existing)) => *existing = outcome,
      None => self.entries.push((name, outcome)),
    }
  }

  pub fn get(&self, name: &str) -> Option<&CheckOutcome> {
    self.entries.iter().find(|(n, _)| n == name).map(|(_, o)| o)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &CheckOutcome)> {
    self.entries.iter().map(|(n, o)| (n.as_str(), o))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl<S: Into<String>> FromIterator<(S, CheckOutcome)> for Outcomes {
  fn from_iter<I: IntoIterator<Item = (S, CheckOutcome)>>(iter: I) -> Self {
    let mut outcomes = Outcomes::new();
    for (name, outcome) in iter {
      outcomes.insert(name, outcome);
    }
    outcomes
  }
}
