use crate::checks::{CheckParams, CheckerDescriptor, CommandCheck, PassSignal, Registry, command_resource};
use crate::core::error::{ConfigError, RegistryError, ResultExt, VerifyError, VerifyResult};
use crate::engine::verifier::VerifierSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// File name written by `idphoto init`
pub const CONFIG_FILE: &str = "idphoto.toml";

/// Configuration for idphoto
/// Searched in order: idphoto.toml, .idphoto.toml, .config/idphoto.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdphotoConfig {
  #[serde(default)]
  pub verification: VerificationConfig,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub resources: BTreeMap<String, ResourceConfig>,
  #[serde(default)]
  pub checkers: Vec<CheckerConfig>,
  /// Directory the file was loaded from; relative commands run from here
  #[serde(skip)]
  pub source_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
  /// Minimum score to pass (inclusive)
  #[serde(default = "default_passing_threshold")]
  pub passing_threshold: u32,

  /// Overall per-image deadline in milliseconds
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,

  /// Worker threads shared by all checkers (0 = host parallelism)
  #[serde(default)]
  pub workers: usize,
}

fn default_passing_threshold() -> u32 {
  7
}

fn default_timeout_ms() -> u64 {
  30_000
}

impl Default for VerificationConfig {
  fn default() -> Self {
    Self {
      passing_threshold: default_passing_threshold(),
      timeout_ms: default_timeout_ms(),
      workers: 0,
    }
  }
}

/// Shared resource built once by running `command`
///
/// ```toml
/// [resources.yolo]
/// command = ["python3", "-m", "idchecks.fetch_model", "yolov8n-seg.pt"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
  pub command: Vec<String>,
}

/// One `[[checkers]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
  pub name: String,

  /// Program and arguments; the image is written to its stdin
  pub command: Vec<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,

  #[serde(default = "default_weight")]
  pub weight: u32,

  /// A failed or false required checker fails the image regardless of score
  #[serde(default)]
  pub required: bool,

  #[serde(default = "default_enabled")]
  pub enabled: bool,

  /// Key into `[resources]`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub resource: Option<String>,

  #[serde(default)]
  pub pass_when: PassSignal,

  /// Opaque parameters forwarded to the checker as JSON
  #[serde(default, skip_serializing_if = "CheckParams::is_empty")]
  pub params: CheckParams,
}

fn default_weight() -> u32 {
  1
}

fn default_enabled() -> bool {
  true
}

impl CheckerConfig {
  fn new(name: &str, module: &str, pass_when: PassSignal) -> Self {
    Self {
      name: name.to_string(),
      command: vec!["python3".to_string(), "-m".to_string(), format!("idchecks.{}", module)],
      description: None,
      weight: 1,
      required: false,
      enabled: true,
      resource: None,
      pass_when,
      params: CheckParams::new(),
    }
  }

  fn describe(mut self, description: &str) -> Self {
    self.description = Some(description.to_string());
    self
  }

  fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.params.insert(key.to_string(), value.into());
    self
  }

  fn disabled(mut self) -> Self {
    self.enabled = false;
    self
  }

  fn uses(mut self, resource: &str) -> Self {
    self.resource = Some(resource.to_string());
    self
  }
}

impl IdphotoConfig {
  /// Find config file in search order: idphoto.toml, .idphoto.toml, .config/idphoto.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = [
      path.join(CONFIG_FILE),
      path.join(".idphoto.toml"),
      path.join(".config").join(CONFIG_FILE),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config by searching `path` (see `find_config_path`)
  pub fn load(path: &Path) -> VerifyResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      VerifyError::Config(ConfigError::NotFound {
        search_root: path.to_path_buf(),
      })
    })?;
    Self::load_from(&config_path)
  }

  /// Load config from an explicit file
  pub fn load_from(config_path: &Path) -> VerifyResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let mut config = Self::from_toml_str(&content)
      .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
    config.source_dir = config_path.parent().map(Path::to_path_buf);
    tracing::debug!(path = %config_path.display(), checkers = config.checkers.len(), "loaded config");
    Ok(config)
  }

  /// Parse and validate TOML text
  pub fn from_toml_str(content: &str) -> VerifyResult<Self> {
    let config: IdphotoConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  pub fn to_toml_string(&self) -> VerifyResult<String> {
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    Ok(content)
  }

  /// Save config to idphoto.toml in `path`, returning the written file
  pub fn save(&self, path: &Path) -> VerifyResult<PathBuf> {
    let config_path = path.join(CONFIG_FILE);
    let content = self.to_toml_string()?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(config_path)
  }

  /// Check if config exists at the given path
  pub fn exists(path: &Path) -> bool {
    Self::find_config_path(path).is_some()
  }

  /// Validate cross-field constraints that serde cannot express
  ///
  /// A threshold above the reachable maximum is allowed; such a config simply
  /// never passes.
  pub fn validate(&self) -> VerifyResult<()> {
    if self.verification.timeout_ms == 0 {
      return Err(VerifyError::Config(ConfigError::InvalidValue {
        field: "verification.timeout_ms".to_string(),
        reason: "must be greater than zero".to_string(),
      }));
    }

    for (key, resource) in &self.resources {
      if resource.command.is_empty() {
        return Err(VerifyError::Config(ConfigError::InvalidValue {
          field: format!("resources.{}.command", key),
          reason: "must name a program".to_string(),
        }));
      }
    }

    let mut seen = HashSet::new();
    for checker in &self.checkers {
      if checker.name.trim().is_empty() {
        return Err(VerifyError::Config(ConfigError::MissingField {
          field: "checkers.name".to_string(),
        }));
      }
      if !seen.insert(checker.name.as_str()) {
        return Err(VerifyError::Registry(RegistryError::DuplicateName {
          name: checker.name.clone(),
        }));
      }
      if checker.command.is_empty() {
        return Err(VerifyError::Config(ConfigError::InvalidValue {
          field: format!("checkers.{}.command", checker.name),
          reason: "must name a program".to_string(),
        }));
      }
      if let Some(resource) = &checker.resource
        && !self.resources.contains_key(resource)
      {
        return Err(VerifyError::Config(ConfigError::UnknownResource {
          checker: checker.name.clone(),
          resource: resource.clone(),
        }));
      }
    }

    if self.enabled_checkers().next().is_none() {
      return Err(VerifyError::Config(ConfigError::NoCheckers));
    }

    let total = self
      .enabled_checkers()
      .try_fold(0u32, |total, c| total.checked_add(c.weight));
    if total.is_none() {
      return Err(VerifyError::Config(ConfigError::InvalidValue {
        field: "checkers.weight".to_string(),
        reason: format!("enabled weights must sum to at most {}", u32::MAX),
      }));
    }

    Ok(())
  }

  pub fn enabled_checkers(&self) -> impl Iterator<Item = &CheckerConfig> {
    self.checkers.iter().filter(|c| c.enabled)
  }

  pub fn settings(&self) -> VerifierSettings {
    VerifierSettings {
      passing_threshold: self.verification.passing_threshold,
      timeout: Duration::from_millis(self.verification.timeout_ms),
      workers: self.verification.workers,
    }
  }

  /// Build the registry from enabled checkers, in file order
  pub fn build_registry(&self) -> VerifyResult<Registry> {
    let mut registry = Registry::new();

    for checker in self.enabled_checkers() {
      let mut check = CommandCheck::new(checker.name.clone(), &checker.command)?;
      if let Some(description) = &checker.description {
        check = check.with_description(description.clone());
      }
      if let Some(dir) = &self.source_dir {
        check = check.with_working_dir(dir.clone());
      }

      let mut descriptor = CheckerDescriptor::new(Arc::new(check))
        .weight(checker.weight)
        .required(checker.required)
        .signal(checker.pass_when.clone())
        .params(checker.params.clone());

      if let Some(key) = &checker.resource {
        let resource = self.resources.get(key).ok_or_else(|| {
          VerifyError::Config(ConfigError::UnknownResource {
            checker: checker.name.clone(),
            resource: key.clone(),
          })
        })?;
        descriptor = descriptor.resource(command_resource(
          key.clone(),
          resource.command.clone(),
          self.source_dir.clone(),
        ));
      }

      registry.register(descriptor)?;
    }

    Ok(registry)
  }

  /// The stock checker catalog
  ///
  /// Eight checkers score one point each with a threshold of 7. The heavier
  /// detectors ship disabled and can be switched on per deployment.
  pub fn default_template() -> Self {
    let mut resources = BTreeMap::new();
    resources.insert(
      "yolo".to_string(),
      ResourceConfig {
        command: vec![
          "python3".to_string(),
          "-m".to_string(),
          "idchecks.fetch_model".to_string(),
          "yolov8n-seg.pt".to_string(),
        ],
      },
    );

    let checkers = vec![
      CheckerConfig::new("face", "face", PassSignal::flag("face_detected"))
        .describe("Exactly one frontal face is present")
        .param("scale_factor", 1.3)
        .param("min_neighbors", 5),
      CheckerConfig::new("eyes", "eyes", PassSignal::flag("eyes_detected")).describe("Both eyes are visible"),
      CheckerConfig::new("quality", "quality", PassSignal::equals("is_blurry", false))
        .describe("Laplacian variance above the blur threshold")
        .param("threshold", 100.0),
      CheckerConfig::new(
        "pose",
        "pose",
        PassSignal::one_of("head_pose", ["frontal", "slightly turned", "turned"]),
      )
      .describe("Head pose could be estimated"),
      CheckerConfig::new("lighting", "lighting", PassSignal::equals("lighting", "good"))
        .describe("Mean brightness within range")
        .param("min_brightness", 70)
        .param("max_brightness", 190),
      CheckerConfig::new("background", "background", PassSignal::flag("background_ok"))
        .describe("Low edge density behind the subject")
        .param("max_edge_ratio", 0.05),
      CheckerConfig::new("geometry", "geometry", PassSignal::flag("geometry_ok"))
        .describe("Face size and centering within bounds")
        .param("min_area_ratio", 0.15)
        .param("max_area_ratio", 0.45)
        .param("max_center_offset", 0.15),
      CheckerConfig::new("text", "text", PassSignal::flag("text_ok"))
        .describe("No significant printed text")
        .param("max_text_area", 0.06),
      CheckerConfig::new(
        "background_uniform",
        "background_uniform",
        PassSignal::equals("non_human_object_present", false),
      )
      .describe("No non-human objects against the background")
      .disabled(),
      CheckerConfig::new("hands", "hands", PassSignal::flag("is_ok"))
        .describe("No hands near the face")
        .disabled(),
      CheckerConfig::new("objects", "objects", PassSignal::equals("non_human_object_present", false))
        .describe("Segmentation finds no objects besides the person")
        .uses("yolo")
        .disabled(),
      CheckerConfig::new("human_only", "human_only", PassSignal::equals("status", "PASS"))
        .describe("Exactly one person and nothing else")
        .uses("yolo")
        .disabled(),
    ];

    Self {
      verification: VerificationConfig::default(),
      resources,
      checkers,
      source_dir: None,
    }
  }
}
