//! Error types for idphoto with contextual messages and exit codes
//!
//! This module provides a unified error type that categorizes errors and provides
//! contextual help messages to users. Checker faults are deliberately NOT part of
//! this taxonomy: they never escape the dispatcher and are recorded as failure
//! outcomes in the report instead.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for idphoto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, unreadable input)
  User = 1,
  /// System error (I/O, worker pool)
  System = 2,
  /// Validation failure (an image did not pass)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for idphoto
#[derive(Debug)]
pub enum VerifyError {
  /// Configuration errors
  Config(ConfigError),

  /// Rejected input image
  Input(InputError),

  /// Registry construction errors
  Registry(RegistryError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl VerifyError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    VerifyError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    VerifyError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      VerifyError::Message { message, context, help } => VerifyError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      VerifyError::Io(err) => VerifyError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      // All of these exit as user errors, same as Message
      other @ (VerifyError::Config(_) | VerifyError::Input(_) | VerifyError::Registry(_)) => VerifyError::Message {
        message: other.to_string(),
        context: Some(ctx_str),
        help: other.help_message(),
      },
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      VerifyError::Config(_) => ExitCode::User,
      VerifyError::Input(_) => ExitCode::User,
      VerifyError::Registry(_) => ExitCode::User,
      VerifyError::Io(_) => ExitCode::System,
      VerifyError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      VerifyError::Config(e) => e.help_message(),
      VerifyError::Input(e) => e.help_message(),
      VerifyError::Registry(e) => e.help_message(),
      VerifyError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for VerifyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VerifyError::Config(e) => write!(f, "{}", e),
      VerifyError::Input(e) => write!(f, "{}", e),
      VerifyError::Registry(e) => write!(f, "{}", e),
      VerifyError::Io(e) => write!(f, "I/O error: {}", e),
      VerifyError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for VerifyError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      VerifyError::Io(e) => Some(e),
      VerifyError::Input(e) => Some(e),
      VerifyError::Registry(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for VerifyError {
  fn from(err: io::Error) -> Self {
    VerifyError::Io(err)
  }
}

impl From<String> for VerifyError {
  fn from(msg: String) -> Self {
    VerifyError::message(msg)
  }
}

impl From<&str> for VerifyError {
  fn from(msg: &str) -> Self {
    VerifyError::message(msg)
  }
}

impl From<ConfigError> for VerifyError {
  fn from(err: ConfigError) -> Self {
    VerifyError::Config(err)
  }
}

impl From<InputError> for VerifyError {
  fn from(err: InputError) -> Self {
    VerifyError::Input(err)
  }
}

impl From<RegistryError> for VerifyError {
  fn from(err: RegistryError) -> Self {
    VerifyError::Registry(err)
  }
}

impl From<toml_edit::de::Error> for VerifyError {
  fn from(err: toml_edit::de::Error) -> Self {
    VerifyError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<toml_edit::ser::Error> for VerifyError {
  fn from(err: toml_edit::ser::Error) -> Self {
    VerifyError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for VerifyError {
  fn from(err: serde_json::Error) -> Self {
    VerifyError::message(format!("JSON error: {}", err))
  }
}

impl From<rayon::ThreadPoolBuildError> for VerifyError {
  fn from(err: rayon::ThreadPoolBuildError) -> Self {
    VerifyError::message(format!("Failed to start checker worker pool: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// idphoto.toml not found
  NotFound { search_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Invalid value for a field
  InvalidValue { field: String, reason: String },

  /// A checker refers to a resource that is not declared
  UnknownResource { checker: String, resource: String },

  /// No enabled checkers left after loading
  NoCheckers,
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Run `idphoto init` to create a configuration file.".to_string()),
      ConfigError::UnknownResource { resource, .. } => Some(format!(
        "Declare it as a [resources.{}] table with a `command` array.",
        resource
      )),
      ConfigError::NoCheckers => Some("Add at least one [[checkers]] entry with `enabled = true`.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No idphoto configuration found.\nExpected file: {}/idphoto.toml",
          search_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::InvalidValue { field, reason } => {
        write!(f, "Invalid value for {}: {}", field, reason)
      }
      ConfigError::UnknownResource { checker, resource } => {
        write!(f, "Checker '{}' uses undeclared resource '{}'", checker, resource)
      }
      ConfigError::NoCheckers => write!(f, "Configuration does not enable any checkers"),
    }
  }
}

/// Rejected input images. Reported before any checker runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
  /// Zero-length buffer
  Empty,

  /// The buffer does not start with the signature of a supported image format
  UnrecognizedFormat,
}

impl InputError {
  fn help_message(&self) -> Option<String> {
    match self {
      InputError::Empty => None,
      InputError::UnrecognizedFormat => Some("Supported formats: JPEG, PNG, BMP, GIF, WebP, TIFF.".to_string()),
    }
  }
}

impl fmt::Display for InputError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      InputError::Empty => write!(f, "Empty image file"),
      InputError::UnrecognizedFormat => write!(f, "Input is not a recognized image"),
    }
  }
}

impl std::error::Error for InputError {}

/// Registry construction errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
  /// A checker with this name is already registered
  DuplicateName { name: String },
}

impl RegistryError {
  fn help_message(&self) -> Option<String> {
    match self {
      RegistryError::DuplicateName { .. } => Some("Checker names must be unique; rename one of them.".to_string()),
    }
  }
}

impl fmt::Display for RegistryError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RegistryError::DuplicateName { name } => write!(f, "Checker '{}' is already registered", name),
    }
  }
}

impl std::error::Error for RegistryError {}

/// Result type alias for idphoto
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> VerifyResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> VerifyResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<VerifyError>,
{
  fn context(self, ctx: impl Into<String>) -> VerifyResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> VerifyResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &VerifyError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

impl From<anyhow::Error> for VerifyError {
  fn from(err: anyhow::Error) -> Self {
    VerifyError::message(format!("{:#}", err))
  }
}
