//! Check trait abstraction for photo criteria
//!
//! Every analysis (face count, eyes, blur, pose, lighting, background, text, ...)
//! implements the `Check` trait, so new criteria can be added by registering a
//! descriptor instead of touching the dispatcher or the scorer.
//!
//! A check returns `Ok` for every substantive verdict, including negative ones
//! ("no face found" is a result with `face_detected = false`). `Err` is reserved for
//! faults inside the check itself: a crashed model, a broken helper process.

use crate::core::image::Image;
use crate::engine::resource::SharedResource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Opaque per-checker parameters (thresholds, model options)
pub type CheckParams = Map<String, Value>;

/// Named fields produced by one check
///
/// Field order is preserved so reports read the way the check wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckResult {
  fields: Map<String, Value>,
}

impl CheckResult {
  /// Create an empty result
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a field (builder style)
  pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.fields.insert(field.into(), value.into());
    self
  }

  /// Attach the free-text diagnostic
  pub fn with_reason(self, reason: impl Into<String>) -> Self {
    self.with("reason", reason.into())
  }

  /// Set a field in place
  pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
    self.fields.insert(field.into(), value.into());
  }

  pub fn get(&self, field: &str) -> Option<&Value> {
    self.fields.get(field)
  }

  pub fn reason(&self) -> Option<&str> {
    self.fields.get("reason").and_then(Value::as_str)
  }

  pub fn fields(&self) -> &Map<String, Value> {
    &self.fields
  }

  pub fn into_value(self) -> Value {
    Value::Object(self.fields)
  }
}

impl From<Map<String, Value>> for CheckResult {
  fn from(fields: Map<String, Value>) -> Self {
    Self { fields }
  }
}

/// How a result is read as pass/fail
///
/// ```toml
/// pass_when = { field = "is_blurry", equals = false }
/// pass_when = { field = "head_pose", one_of = ["frontal", "slightly turned", "turned"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPassSignal", into = "RawPassSignal")]
pub struct PassSignal {
  pub field: String,
  pub expect: Expectation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
  /// Field must equal this value
  Equals(Value),
  /// Field must equal one of these values
  OneOf(Vec<Value>),
}

impl PassSignal {
  /// Pass when a boolean field is `true`
  pub fn flag(field: impl Into<String>) -> Self {
    Self::equals(field, true)
  }

  /// Pass when a field equals a value
  pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      field: field.into(),
      expect: Expectation::Equals(value.into()),
    }
  }

  /// Pass when a field matches any of the values
  pub fn one_of<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
    Self {
      field: field.into(),
      expect: Expectation::OneOf(values.into_iter().map(Into::into).collect()),
    }
  }

  /// Read the signal; a missing field is a failed signal
  pub fn evaluate(&self, result: &CheckResult) -> bool {
    let Some(actual) = result.get(&self.field) else {
      return false;
    };
    match &self.expect {
      Expectation::Equals(expected) => values_match(actual, expected),
      Expectation::OneOf(options) => options.iter().any(|o| values_match(actual, o)),
    }
  }
}

impl Default for PassSignal {
  fn default() -> Self {
    Self::flag("passed")
  }
}

impl fmt::Display for PassSignal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.expect {
      Expectation::Equals(v) => write!(f, "{} == {}", self.field, v),
      Expectation::OneOf(vs) => {
        let rendered: Vec<String> = vs.iter().map(|v| v.to_string()).collect();
        write!(f, "{} in [{}]", self.field, rendered.join(", "))
      }
    }
  }
}

// 1 and 1.0 compare equal; checkers written in other languages are loose about this
fn values_match(actual: &Value, expected: &Value) -> bool {
  match (actual, expected) {
    (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
    _ => actual == expected,
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPassSignal {
  field: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  equals: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  one_of: Option<Vec<Value>>,
}

impl TryFrom<RawPassSignal> for PassSignal {
  type Error = String;

  fn try_from(raw: RawPassSignal) -> Result<Self, Self::Error> {
    if raw.field.trim().is_empty() {
      return Err("pass_when.field must not be empty".to_string());
    }
    match (raw.equals, raw.one_of) {
      (Some(v), None) => Ok(PassSignal::equals(raw.field, v)),
      (None, Some(vs)) if !vs.is_empty() => Ok(PassSignal::one_of(raw.field, vs)),
      (None, Some(_)) => Err(format!("pass_when.one_of for '{}' is empty", raw.field)),
      (None, None) => Ok(PassSignal::flag(raw.field)),
      (Some(_), Some(_)) => Err(format!(
        "pass_when for '{}' sets both `equals` and `one_of`",
        raw.field
      )),
    }
  }
}

impl From<PassSignal> for RawPassSignal {
  fn from(signal: PassSignal) -> Self {
    match signal.expect {
      Expectation::Equals(v) => RawPassSignal {
        field: signal.field,
        equals: Some(v),
        one_of: None,
      },
      Expectation::OneOf(vs) => RawPassSignal {
        field: signal.field,
        equals: None,
        one_of: Some(vs),
      },
    }
  }
}

/// Context passed to checks
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
  /// The checker's own configuration
  pub params: &'a CheckParams,
  /// Shared resource, when the descriptor declares one
  pub resource: Option<&'a SharedResource>,
}

impl<'a> CheckContext<'a> {
  /// Borrow the shared resource as a concrete type
  pub fn resource<T: Send + Sync + 'static>(&self) -> Option<&'a T> {
    self.resource.and_then(|r| r.downcast_ref::<T>())
  }

  /// Read a numeric parameter with a fallback
  pub fn param_f64(&self, key: &str, default: f64) -> f64 {
    self.params.get(key).and_then(Value::as_f64).unwrap_or(default)
  }
}

/// Photo criterion trait
///
/// # Example
///
/// ```rust,ignore
/// struct Lighting;
///
/// impl Check for Lighting {
///   fn name(&self) -> &str {
///     "lighting"
///   }
///
///   fn description(&self) -> &str {
///     "Mean brightness within the acceptable band"
///   }
///
///   fn run(&self, image: &Image, ctx: &CheckContext<'_>) -> anyhow::Result<CheckResult> {
///     let brightness = mean_brightness(image.bytes())?;
///     let ok = (ctx.param_f64("min", 70.0)..=ctx.param_f64("max", 190.0)).contains(&brightness);
///     Ok(CheckResult::new().with("brightness", brightness).with("lighting", if ok { "good" } else { "bad" }))
///   }
/// }
/// ```
pub trait Check: Send + Sync {
  /// Unique name for this check
  fn name(&self) -> &str;

  /// Human-readable description of what this check validates
  fn description(&self) -> &str;

  /// Run the check against one image
  fn run(&self, image: &Image, ctx: &CheckContext<'_>) -> anyhow::Result<CheckResult>;
}
