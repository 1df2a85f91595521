//! Lazy, keyed, init-once cache for expensive shared resources
//!
//! Some checks depend on something costly to build (a detector model, a loaded
//! OCR engine, a warmed-up helper). The guard defers that construction to first
//! use and guarantees the factory runs at most once per key, however many
//! requests race for it.
//!
//! Failure policy: callers that arrive while an attempt is in flight block until
//! that attempt resolves and receive its outcome, success or failure. A failed
//! attempt leaves the slot empty, so the next caller after it starts a fresh one.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};

/// A constructed resource, shared read-only by every check that uses it
pub type SharedResource = Arc<dyn Any + Send + Sync>;

/// Builds a resource; invoked at most once per successful key
pub type ResourceFactory = Arc<dyn Fn() -> anyhow::Result<SharedResource> + Send + Sync>;

/// Resource construction failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInitError {
  pub key: String,
  pub message: Arc<str>,
}

impl fmt::Display for ResourceInitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "resource '{}' failed to initialize: {}", self.key, self.message)
  }
}

impl std::error::Error for ResourceInitError {}

#[derive(Default)]
struct SlotState {
  value: Option<SharedResource>,
  initializing: bool,
  /// Number of attempts that have finished (either way)
  attempts: u64,
  last_failure: Option<Arc<str>>,
}

#[derive(Default)]
struct Slot {
  state: Mutex<SlotState>,
  resolved: Condvar,
}

/// Keyed init-once guard
#[derive(Default)]
pub struct ResourceGuard {
  slots: Mutex<HashMap<String, Arc<Slot>>>,
}

impl ResourceGuard {
  pub fn new() -> Self {
    Self::default()
  }

  /// Process-wide guard shared by every verifier in the process
  pub fn global() -> Arc<ResourceGuard> {
    static GLOBAL: OnceLock<Arc<ResourceGuard>> = OnceLock::new();
    GLOBAL.get_or_init(|| Arc::new(ResourceGuard::new())).clone()
  }

  /// Return the resource for `key`, constructing it with `factory` if needed
  pub fn get_or_init<F>(&self, key: &str, factory: F) -> Result<SharedResource, ResourceInitError>
  where
    F: FnOnce() -> anyhow::Result<SharedResource>,
  {
    let slot = self.slot(key);
    let mut state = lock(&slot.state);

    loop {
      if let Some(value) = &state.value {
        return Ok(Arc::clone(value));
      }
      if !state.initializing {
        break;
      }

      // Someone else is building it: wait for that attempt to finish
      let seen = state.attempts;
      while state.initializing && state.attempts == seen {
        state = slot.resolved.wait(state).unwrap_or_else(PoisonError::into_inner);
      }
      if state.value.is_none()
        && state.attempts != seen
        && let Some(message) = &state.last_failure
      {
        return Err(ResourceInitError {
          key: key.to_string(),
          message: Arc::clone(message),
        });
      }
    }

    state.initializing = true;
    drop(state);

    tracing::debug!(resource = key, "initializing shared resource");
    let built = match catch_unwind(AssertUnwindSafe(factory)) {
      Ok(Ok(value)) => Ok(value),
      Ok(Err(err)) => Err(Arc::<str>::from(format!("{:#}", err))),
      Err(panic) => Err(Arc::<str>::from(format!("factory panicked: {}", panic_message(&*panic)))),
    };

    let mut state = lock(&slot.state);
    state.initializing = false;
    state.attempts += 1;
    let result = match built {
      Ok(value) => {
        state.value = Some(Arc::clone(&value));
        state.last_failure = None;
        tracing::info!(resource = key, "shared resource ready");
        Ok(value)
      }
      Err(message) => {
        state.last_failure = Some(Arc::clone(&message));
        tracing::warn!(resource = key, error = %message, "shared resource failed to initialize");
        Err(ResourceInitError {
          key: key.to_string(),
          message,
        })
      }
    };
    drop(state);
    slot.resolved.notify_all();
    result
  }

  /// Typed convenience wrapper around `get_or_init`
  pub fn get_or_init_typed<T, F>(&self, key: &str, factory: F) -> Result<Arc<T>, ResourceInitError>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> anyhow::Result<T>,
  {
    let shared = self.get_or_init(key, || factory().map(|v| Arc::new(v) as SharedResource))?;
    shared.downcast::<T>().map_err(|_| ResourceInitError {
      key: key.to_string(),
      message: Arc::from(format!("resource holds a different type than {}", std::any::type_name::<T>())),
    })
  }

  /// Whether `key` has been successfully initialized
  pub fn is_ready(&self, key: &str) -> bool {
    let slots = lock(&self.slots);
    slots
      .get(key)
      .map(|slot| lock(&slot.state).value.is_some())
      .unwrap_or(false)
  }

  fn slot(&self, key: &str) -> Arc<Slot> {
    let mut slots = lock(&self.slots);
    Arc::clone(slots.entry(key.to_string()).or_default())
  }
}

// Factories run outside every lock, so a poisoned mutex only means a panic
// between two field writes above; the state is still consistent enough to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
  if let Some(s) = panic.downcast_ref::<&str>() {
    (*s).to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
