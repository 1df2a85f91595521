//! Progress indicator for multi-image runs
//!
//! Uses `linya`, which draws to stderr and tolerates concurrent increments, so
//! workers can tick the bar from any thread while JSON stays on stdout.

use linya::{Bar, Progress};
use std::sync::{Mutex, PoisonError};

/// Thread-safe bar counting verified images
pub struct ImageProgress {
  progress: Mutex<Progress>,
  bar: Bar,
}

impl ImageProgress {
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      progress: Mutex::new(progress),
      bar,
    }
  }

  /// Increment progress by 1
  pub fn inc(&self) {
    let mut progress = self.progress.lock().unwrap_or_else(PoisonError::into_inner);
    progress.inc_and_draw(&self.bar, 1);
  }
}
