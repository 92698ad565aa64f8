//! Optimizer configuration loaded from JSON with defaults for every field.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{BuildError, BuildResult};
use crate::project::OptimizerLayout;

const DEFAULT_CONFIG_FILE: &str = "static-optimizer.json";

/// Knobs controlling how the static tree is bundled and versioned.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
  /// URL prefix under which files are served statically and fingerprinted.
  pub static_prefix: String,
  /// Name of the root child whose subtree contains the public routes.
  pub public_root: String,
  /// File name of the combined script bundle inside the static prefix.
  pub script_bundle_name: String,
  /// File name of the combined stylesheet bundle inside the static prefix.
  pub stylesheet_bundle_name: String,
  /// Number of hex digest characters embedded in versioned file names.
  pub digest_length: usize,
  /// Whether scripts under the static prefix are minified when written.
  pub minify_scripts: bool,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      static_prefix: "static".into(),
      public_root: "public".into(),
      script_bundle_name: "js-combined.js".into(),
      stylesheet_bundle_name: "css-combined.css".into(),
      digest_length: 12,
      minify_scripts: true,
    }
  }
}

impl OptimizerConfig {
  /// Load `static-optimizer.json` from the directory, falling back to defaults when it is absent.
  pub fn discover(dir: &Path) -> BuildResult<Self> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if !candidate.is_file() {
      return Ok(Self::default());
    }
    Self::from_path(&candidate)
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> BuildResult<Self> {
    let content = fs::read_to_string(path).map_err(|source| BuildError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let config: Self =
      serde_json::from_str(&content).map_err(|err| BuildError::config(path, err.to_string()))?;
    config.validate(path)?;
    Ok(config)
  }

  /// Reject settings that would produce colliding versioned names. `path` names the source file.
  pub fn validate(&self, path: &Path) -> BuildResult<()> {
    if self.digest_length == 0 {
      return Err(BuildError::config(path, "digest_length must be at least 1"));
    }
    Ok(())
  }

  /// Derive the normalised layout used by the build stages.
  pub fn to_layout(&self) -> OptimizerLayout {
    OptimizerLayout::from_config(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn discover_defaults_when_file_missing() {
    let dir = tempdir().unwrap();
    let config = OptimizerConfig::discover(dir.path()).unwrap();
    assert_eq!(config, OptimizerConfig::default());
  }

  #[test]
  fn partial_files_keep_remaining_defaults() {
    let dir = tempdir().unwrap();
    fs::write(
      dir.path().join(DEFAULT_CONFIG_FILE),
      r#"{"static_prefix": "assets", "minify_scripts": false}"#,
    )
    .unwrap();

    let config = OptimizerConfig::discover(dir.path()).unwrap();
    assert_eq!(config.static_prefix, "assets");
    assert!(!config.minify_scripts);
    assert_eq!(config.script_bundle_name, "js-combined.js");
    assert_eq!(config.digest_length, 12);
  }

  #[test]
  fn malformed_files_are_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(&path, "{ not json").unwrap();

    let err = OptimizerConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, BuildError::Config { .. }));
  }

  #[test]
  fn zero_digest_length_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(DEFAULT_CONFIG_FILE);
    fs::write(&path, r#"{"digest_length": 0}"#).unwrap();

    let err = OptimizerConfig::from_path(&path).unwrap_err();
    assert!(matches!(err, BuildError::Config { message, .. } if message.contains("digest_length")));
  }
}
