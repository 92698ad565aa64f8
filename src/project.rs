//! Normalised build layout and the per-invocation build context.

use std::path::Path;

use crate::config::OptimizerConfig;
use crate::tree::{ModuleNode, ResourceLoader};

/// Owned, normalised view of an [`OptimizerConfig`].
///
/// All snapshot paths are slash-separated and rooted at `/`, so the static prefix and the two
/// synthetic bundle paths are stored in that same form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerLayout {
  /// Static prefix with a leading slash and no trailing slash; empty when every file is static.
  pub static_prefix: String,
  /// Name of the root child containing public routes.
  pub public_root: String,
  /// Snapshot path of the combined script bundle.
  pub script_bundle_path: String,
  /// Snapshot path of the combined stylesheet bundle.
  pub stylesheet_bundle_path: String,
  /// Number of digest characters in version tokens.
  pub digest_length: usize,
  /// Whether static scripts are minified on write.
  pub minify_scripts: bool,
}

impl OptimizerLayout {
  /// Normalise the configured values into snapshot paths.
  pub fn from_config(config: &OptimizerConfig) -> Self {
    let trimmed = config.static_prefix.trim_matches('/');
    let static_prefix = if trimmed.is_empty() {
      String::new()
    } else {
      format!("/{trimmed}")
    };

    Self {
      script_bundle_path: format!("{static_prefix}/{}", config.script_bundle_name),
      stylesheet_bundle_path: format!("{static_prefix}/{}", config.stylesheet_bundle_name),
      static_prefix,
      public_root: config.public_root.trim_matches('/').to_string(),
      digest_length: config.digest_length,
      minify_scripts: config.minify_scripts,
    }
  }

  /// Returns `true` when the snapshot path lives under the static prefix.
  pub fn is_static_path(&self, path: &str) -> bool {
    if self.static_prefix.is_empty() {
      return true;
    }
    path
      .strip_prefix(self.static_prefix.as_str())
      .is_some_and(|rest| rest.starts_with('/'))
  }
}

impl Default for OptimizerLayout {
  fn default() -> Self {
    Self::from_config(&OptimizerConfig::default())
  }
}

/// Everything a single build invocation reads from: the layout, the module tree, its loader and
/// the package directory on disk.
pub struct BuildContext<'a, L: ResourceLoader> {
  /// Normalised layout.
  pub layout: &'a OptimizerLayout,
  /// Root of the server's module tree.
  pub root: &'a ModuleNode,
  /// Loader resolving each module's resources.
  pub loader: &'a L,
  /// Source package directory that is snapshotted.
  pub package_path: &'a Path,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normalises_prefix_and_bundle_paths() {
    let layout = OptimizerLayout::from_config(&OptimizerConfig {
      static_prefix: "/assets/".into(),
      ..OptimizerConfig::default()
    });

    assert_eq!(layout.static_prefix, "/assets");
    assert_eq!(layout.script_bundle_path, "/assets/js-combined.js");
    assert_eq!(layout.stylesheet_bundle_path, "/assets/css-combined.css");
  }

  #[test]
  fn static_prefix_matches_whole_segments() {
    let layout = OptimizerLayout::default();
    assert!(layout.is_static_path("/static/js/app.js"));
    assert!(!layout.is_static_path("/staticfoo/app.js"));
    assert!(!layout.is_static_path("/templates/index.html"));
  }

  #[test]
  fn empty_prefix_marks_everything_static() {
    let layout = OptimizerLayout::from_config(&OptimizerConfig {
      static_prefix: "/".into(),
      ..OptimizerConfig::default()
    });
    assert_eq!(layout.script_bundle_path, "/js-combined.js");
    assert!(layout.is_static_path("/anything.css"));
  }
}
