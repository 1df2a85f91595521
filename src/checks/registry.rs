//! Ordered catalog of registered checks
//!
//! Built once at startup and read-only afterwards. Registration order is kept
//! for report determinism; it has no influence on the score.

use super::trait_def::{Check, CheckParams, PassSignal};
use crate::core::error::RegistryError;
use crate::engine::resource::{ResourceFactory, SharedResource};
use std::fmt;
use std::sync::Arc;

/// Shared resource a check needs before it can run
#[derive(Clone)]
pub struct ResourceBinding {
  pub key: String,
  pub factory: ResourceFactory,
}

impl ResourceBinding {
  pub fn new<F>(key: impl Into<String>, factory: F) -> Self
  where
    F: Fn() -> anyhow::Result<SharedResource> + Send + Sync + 'static,
  {
    Self {
      key: key.into(),
      factory: Arc::new(factory),
    }
  }
}

impl fmt::Debug for ResourceBinding {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResourceBinding").field("key", &self.key).finish_non_exhaustive()
  }
}

/// A check plus everything the engine needs to schedule and score it
#[derive(Clone)]
pub struct CheckerDescriptor {
  pub name: String,
  pub check: Arc<dyn Check>,
  /// Points contributed to the score when the signal reads true
  pub weight: u32,
  /// Failure or a false signal forces the overall verdict to fail
  pub required: bool,
  pub signal: PassSignal,
  pub resource: Option<ResourceBinding>,
  pub params: CheckParams,
}

impl CheckerDescriptor {
  /// Describe a check with weight 1, not required, `passed == true` as its signal
  pub fn new(check: Arc<dyn Check>) -> Self {
    Self {
      name: check.name().to_string(),
      check,
      weight: 1,
      required: false,
      signal: PassSignal::default(),
      resource: None,
      params: CheckParams::new(),
    }
  }

  pub fn weight(mut self, weight: u32) -> Self {
    self.weight = weight;
    self
  }

  pub fn required(mut self, required: bool) -> Self {
    self.required = required;
    self
  }

  pub fn signal(mut self, signal: PassSignal) -> Self {
    self.signal = signal;
    self
  }

  pub fn resource(mut self, binding: ResourceBinding) -> Self {
    self.resource = Some(binding);
    self
  }

  pub fn params(mut self, params: CheckParams) -> Self {
    self.params = params;
    self
  }
}

impl fmt::Debug for CheckerDescriptor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CheckerDescriptor")
      .field("name", &self.name)
      .field("weight", &self.weight)
      .field("required", &self.required)
      .field("signal", &self.signal)
      .field("resource", &self.resource)
      .finish_non_exhaustive()
  }
}

/// Registry of checks, in registration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
  checkers: Vec<Arc<CheckerDescriptor>>,
}

impl Registry {
  /// Create an empty registry
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a check; names must be unique
  pub fn register(&mut self, descriptor: CheckerDescriptor) -> Result<(), RegistryError> {
    if self.get(&descriptor.name).is_some() {
      return Err(RegistryError::DuplicateName { name: descriptor.name });
    }
    self.checkers.push(Arc::new(descriptor));
    Ok(())
  }

  /// All descriptors in registration order
  pub fn list(&self) -> &[Arc<CheckerDescriptor>] {
    &self.checkers
  }

  pub fn get(&self, name: &str) -> Option<&Arc<CheckerDescriptor>> {
    self.checkers.iter().find(|d| d.name == name)
  }

  pub fn len(&self) -> usize {
    self.checkers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.checkers.is_empty()
  }

  /// Sum of every registered weight, independent of any run
  ///
  /// Saturates like the scorer's running total, so `score <= max_score` holds.
  pub fn max_score(&self) -> u32 {
    self
      .checkers
      .iter()
      .fold(0u32, |total, d| total.saturating_add(d.weight))
  }
}
