//! Data structures produced while optimizing a server's static tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::fingerprint::FingerprintIndex;

/// Mapping from module path to the combined bundle its resources were merged into.
pub type StaticAliasMap = BTreeMap<String, String>;

/// Environment a script may be evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetEnvironment {
  /// Shipped to and executed by the browser.
  Browser,
  /// Executed by the server only.
  Server,
}

/// Kind of a module resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
  /// JavaScript source.
  Script,
  /// CSS source.
  Stylesheet,
}

/// A script or stylesheet owned by exactly one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
  /// Path of the owning module.
  pub module_path: String,
  /// Resource kind.
  pub kind: ResourceKind,
  /// Raw source text.
  pub body: String,
  /// Environments a script is valid for. Ignored for stylesheets.
  pub environments: BTreeSet<TargetEnvironment>,
}

impl Resource {
  /// Build a script resource valid for the given environments.
  pub fn script(
    module_path: impl Into<String>,
    body: impl Into<String>,
    environments: impl IntoIterator<Item = TargetEnvironment>,
  ) -> Self {
    Self {
      module_path: module_path.into(),
      kind: ResourceKind::Script,
      body: body.into(),
      environments: environments.into_iter().collect(),
    }
  }

  /// Build a stylesheet resource.
  pub fn stylesheet(module_path: impl Into<String>, body: impl Into<String>) -> Self {
    Self {
      module_path: module_path.into(),
      kind: ResourceKind::Stylesheet,
      body: body.into(),
      environments: BTreeSet::new(),
    }
  }

  /// Whether the resource should be shipped to the given environment.
  pub fn include_in_environment(&self, environment: TargetEnvironment) -> bool {
    match self.kind {
      ResourceKind::Stylesheet => true,
      ResourceKind::Script => self.environments.contains(&environment),
    }
  }
}

/// Result of loading one module: its resources and those of its dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleResources {
  /// Whether the loaded module acts as a route controller.
  pub is_controller: bool,
  /// Script resources, dependencies first.
  pub scripts: Vec<Resource>,
  /// Stylesheet resources, dependencies first.
  pub stylesheets: Vec<Resource>,
}

/// Combined bundle contents produced from every discovered route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedBundles {
  /// Module path to bundle path aliases.
  pub alias_map: StaticAliasMap,
  /// Newline-joined browser scripts.
  pub script: String,
  /// Newline-joined stylesheets.
  pub stylesheet: String,
}

/// Summary returned by [`crate::StaticBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuildReport {
  /// Route module paths in discovery order.
  pub routes: Vec<String>,
  /// Alias map written next to the output tree, before reference rewriting.
  pub alias_map: StaticAliasMap,
  /// Original to versioned path for every static entry.
  pub fingerprints: FingerprintIndex,
  /// Number of text entries whose references were rewritten.
  pub files_rewritten: usize,
  /// Number of files written to the output directory.
  pub files_written: usize,
  /// Number of scripts minified on write.
  pub files_minified: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scripts_honour_their_environments() {
    let server_only = Resource::script("lib/db", "query()", [TargetEnvironment::Server]);
    assert!(!server_only.include_in_environment(TargetEnvironment::Browser));
    assert!(server_only.include_in_environment(TargetEnvironment::Server));
  }

  #[test]
  fn stylesheets_ship_everywhere() {
    let sheet = Resource::stylesheet("public/home", "body{}");
    assert!(sheet.include_in_environment(TargetEnvironment::Browser));
  }

  #[test]
  fn environments_deserialise_lowercase() {
    let parsed: Vec<TargetEnvironment> = serde_json::from_str(r#"["browser","server"]"#).unwrap();
    assert_eq!(parsed, vec![
      TargetEnvironment::Browser,
      TargetEnvironment::Server
    ]);
  }
}
