//! Public report shape handed to response envelopes
//!
//! ```json
//! {
//!   "status": "passed",
//!   "score": 7,
//!   "max_score": 8,
//!   "passing_threshold": 7,
//!   "required_failures": [],
//!   "details": {
//!     "face": { "face_detected": true, "face_count": 1 },
//!     "text": { "error": { "kind": "timeout", "message": "timeout" } }
//!   }
//! }
//! ```

use crate::engine::scorer::{AggregateReport, Status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicReport {
  pub status: Status,
  pub score: u32,
  pub max_score: u32,
  pub passing_threshold: u32,
  pub required_failures: Vec<String>,
  /// Raw result (or failure placeholder) per checker, in registration order
  pub details: Map<String, Value>,
}

impl PublicReport {
  pub fn passed(&self) -> bool {
    self.status.is_passed()
  }

  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

/// Merge verdict and per-checker payloads into the public structure
pub fn assemble(report: &AggregateReport) -> PublicReport {
  let details = report
    .checks
    .iter()
    .map(|check| (check.name.clone(), check.outcome.to_detail()))
    .collect();

  PublicReport {
    status: report.status,
    score: report.score,
    max_score: report.max_score,
    passing_threshold: report.passing_threshold,
    required_failures: report.required_failures.clone(),
    details,
  }
}
