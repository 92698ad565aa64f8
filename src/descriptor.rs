//! JSON server descriptor declaring the package location, optimizer settings and module tree.
//!
//! The descriptor is the concrete [`ResourceLoader`] used by the command line tool. Each declared
//! module lists its script and stylesheet files (relative to the package directory) and the
//! module paths it requires.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::OptimizerConfig;
use crate::error::{BuildError, BuildResult};
use crate::models::{ModuleResources, Resource, TargetEnvironment};
use crate::tree::{ContainerNode, ModuleLeaf, ModuleNode, ResourceLoader};

/// Deserialised server descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerDescriptor {
  /// Package directory, relative to the descriptor file unless absolute.
  pub package_path: PathBuf,
  /// Optimizer settings; defaults apply to omitted fields.
  #[serde(default)]
  pub optimizer: OptimizerConfig,
  /// Declared modules in tree order.
  #[serde(default)]
  pub modules: Vec<ModuleDeclaration>,
}

/// One module entry of the descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDeclaration {
  /// Slash-delimited module path.
  pub path: String,
  /// Whether the module is a route controller.
  #[serde(default)]
  pub controller: bool,
  /// Script files owned by the module.
  #[serde(default)]
  pub scripts: Vec<ScriptDeclaration>,
  /// Stylesheet files owned by the module.
  #[serde(default)]
  pub stylesheets: Vec<String>,
  /// Module paths whose resources load before this module's own.
  #[serde(default)]
  pub requires: Vec<String>,
}

/// Script file with the environments it targets.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptDeclaration {
  /// File path relative to the package directory.
  pub file: String,
  /// Target environments; browser only when omitted.
  #[serde(default = "default_environments")]
  pub environments: BTreeSet<TargetEnvironment>,
}

fn default_environments() -> BTreeSet<TargetEnvironment> {
  BTreeSet::from([TargetEnvironment::Browser])
}

impl ServerDescriptor {
  /// Load a descriptor and resolve its package path against the descriptor's directory.
  pub fn load(path: &Path) -> BuildResult<Self> {
    let content = fs::read_to_string(path).map_err(|source| BuildError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let mut descriptor: Self =
      serde_json::from_str(&content).map_err(|err| BuildError::config(path, err.to_string()))?;
    descriptor.optimizer.validate(path)?;

    if descriptor.package_path.is_relative() {
      let base = path.parent().unwrap_or_else(|| Path::new(""));
      descriptor.package_path = base.join(&descriptor.package_path);
    }
    Ok(descriptor)
  }

  /// Build the module tree. Intermediate path segments become containers in first-seen order.
  pub fn module_tree(&self) -> BuildResult<ModuleNode> {
    let mut root = ContainerNode {
      name: String::new(),
      module_path: String::new(),
      children: Vec::new(),
    };
    for module in &self.modules {
      insert_module(&mut root, &module.path)?;
    }
    Ok(ModuleNode::Container(root))
  }

  /// Borrowing loader over the declared modules.
  pub fn loader(&self) -> DescriptorLoader<'_> {
    DescriptorLoader {
      package_path: &self.package_path,
      modules: self
        .modules
        .iter()
        .map(|module| (module.path.trim_matches('/'), module))
        .collect(),
    }
  }
}

fn insert_module(root: &mut ContainerNode, module_path: &str) -> BuildResult<()> {
  let segments: Vec<&str> = module_path
    .split('/')
    .filter(|segment| !segment.is_empty())
    .collect();
  let Some((leaf_name, parents)) = segments.split_last() else {
    return Err(BuildError::loader(module_path, "module path is empty"));
  };

  let mut current = root;
  for (depth, segment) in parents.iter().enumerate() {
    let position = current
      .children
      .iter()
      .position(|child| child.name() == *segment);
    let index = match position {
      Some(index) => index,
      None => {
        current.children.push(ModuleNode::Container(ContainerNode {
          name: segment.to_string(),
          module_path: segments[..=depth].join("/"),
          children: Vec::new(),
        }));
        current.children.len() - 1
      }
    };
    current = match &mut current.children[index] {
      ModuleNode::Container(container) => container,
      ModuleNode::Module(module) => {
        return Err(BuildError::loader(
          module_path,
          format!("parent `{}` is a module and cannot contain other modules", module.module_path),
        ));
      }
    };
  }

  if current.children.iter().any(|child| child.name() == *leaf_name) {
    return Err(BuildError::loader(module_path, "module path is declared twice"));
  }
  current.children.push(ModuleNode::Module(ModuleLeaf {
    name: leaf_name.to_string(),
    module_path: segments.join("/"),
  }));
  Ok(())
}

/// [`ResourceLoader`] reading resource bodies from the package directory.
pub struct DescriptorLoader<'a> {
  package_path: &'a Path,
  modules: BTreeMap<&'a str, &'a ModuleDeclaration>,
}

impl DescriptorLoader<'_> {
  fn visit(
    &self,
    module_path: &str,
    visiting: &mut Vec<String>,
    visited: &mut BTreeSet<String>,
    resources: &mut ModuleResources,
  ) -> BuildResult<()> {
    if visited.contains(module_path) {
      return Ok(());
    }
    if visiting.iter().any(|path| path == module_path) {
      visiting.push(module_path.to_string());
      return Err(BuildError::loader(
        &visiting[0],
        format!("dependency cycle: {}", visiting.join(" -> ")),
      ));
    }

    let declaration = self.modules.get(module_path).ok_or_else(|| {
      let requirer = visiting.last().map_or(module_path, String::as_str);
      BuildError::loader(requirer, format!("required module `{module_path}` is not declared"))
    })?;

    visiting.push(module_path.to_string());
    for dependency in &declaration.requires {
      self.visit(dependency.trim_matches('/'), visiting, visited, resources)?;
    }
    visiting.pop();

    for script in &declaration.scripts {
      let body = self.read_body(module_path, &script.file)?;
      resources.scripts.push(Resource::script(
        module_path,
        body,
        script.environments.iter().copied(),
      ));
    }
    for stylesheet in &declaration.stylesheets {
      let body = self.read_body(module_path, stylesheet)?;
      resources.stylesheets.push(Resource::stylesheet(module_path, body));
    }

    visited.insert(module_path.to_string());
    Ok(())
  }

  fn read_body(&self, module_path: &str, file: &str) -> BuildResult<String> {
    let path = self.package_path.join(file.trim_start_matches('/'));
    fs::read_to_string(&path).map_err(|err| {
      BuildError::loader(module_path, format!("failed to read {}: {err}", path.display()))
    })
  }
}

impl ResourceLoader for DescriptorLoader<'_> {
  fn load_resources_for_module(&self, module: &ModuleLeaf) -> BuildResult<ModuleResources> {
    let declaration = self
      .modules
      .get(module.module_path.as_str())
      .ok_or_else(|| BuildError::loader(&module.module_path, "module is not declared"))?;

    let mut resources = ModuleResources {
      is_controller: declaration.controller,
      ..ModuleResources::default()
    };
    self.visit(
      &module.module_path,
      &mut Vec::new(),
      &mut BTreeSet::new(),
      &mut resources,
    )?;
    Ok(resources)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn descriptor(json: &str) -> ServerDescriptor {
    serde_json::from_str(json).unwrap()
  }

  fn module<'a>(root: &'a ModuleNode, path: &str) -> &'a ModuleLeaf {
    match root.find_node_with_path(path) {
      Some(ModuleNode::Module(module)) => module,
      other => panic!("expected module at {path}, found {other:?}"),
    }
  }

  #[test]
  fn load_rejects_zero_digest_length() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("server.json");
    fs::write(&path, r#"{"package_path": "site", "optimizer": {"digest_length": 0}}"#).unwrap();

    let err = ServerDescriptor::load(&path).unwrap_err();
    assert!(matches!(err, BuildError::Config { .. }));
  }

  #[test]
  fn builds_tree_in_declaration_order() {
    let descriptor = descriptor(
      r#"{
        "package_path": "site",
        "modules": [
          {"path": "public/home"},
          {"path": "lib/widgets"},
          {"path": "public/admin/users"}
        ]
      }"#,
    );

    let root = descriptor.module_tree().unwrap();
    let names: Vec<&str> = root.children().iter().map(ModuleNode::name).collect();
    assert_eq!(names, vec!["public", "lib"]);

    let public = root.child_with_name("public").unwrap();
    let public_names: Vec<&str> = public.children().iter().map(ModuleNode::name).collect();
    assert_eq!(public_names, vec!["home", "admin"]);
    assert_eq!(module(&root, "public/admin/users").module_path, "public/admin/users");
  }

  #[test]
  fn rejects_modules_nested_under_modules() {
    let descriptor = descriptor(
      r#"{"package_path": ".", "modules": [{"path": "public/home"}, {"path": "public/home/extra"}]}"#,
    );
    let err = descriptor.module_tree().unwrap_err();
    assert!(err.to_string().contains("public/home/extra"));
  }

  #[test]
  fn loads_dependencies_before_module_resources() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("site/lib")).unwrap();
    fs::write(root.join("site/lib/base.js"), "base()").unwrap();
    fs::write(root.join("site/lib/db.js"), "db()").unwrap();
    fs::write(root.join("site/lib/base.css"), "html{}").unwrap();
    fs::write(root.join("site/home.js"), "home()").unwrap();
    fs::write(
      root.join("server.json"),
      r#"{
        "package_path": "site",
        "modules": [
          {"path": "lib/base", "scripts": [{"file": "lib/base.js"}], "stylesheets": ["lib/base.css"]},
          {"path": "lib/db", "scripts": [{"file": "lib/db.js", "environments": ["server"]}]},
          {"path": "public/home", "controller": true, "requires": ["lib/base", "lib/db", "lib/base"],
           "scripts": [{"file": "home.js"}]}
        ]
      }"#,
    )
    .unwrap();

    let descriptor = ServerDescriptor::load(&root.join("server.json")).unwrap();
    assert_eq!(descriptor.package_path, root.join("site"));

    let tree = descriptor.module_tree().unwrap();
    let loader = descriptor.loader();
    let resources = loader
      .load_resources_for_module(module(&tree, "public/home"))
      .unwrap();

    assert!(resources.is_controller);
    let script_bodies: Vec<&str> = resources.scripts.iter().map(|s| s.body.as_str()).collect();
    assert_eq!(script_bodies, vec!["base()", "db()", "home()"]);
    assert_eq!(resources.scripts[0].module_path, "lib/base");
    assert!(!resources.scripts[1].include_in_environment(TargetEnvironment::Browser));
    assert_eq!(resources.stylesheets.len(), 1);
  }

  #[test]
  fn reports_missing_files_against_the_module() {
    let dir = tempdir().unwrap();
    let descriptor = ServerDescriptor {
      package_path: dir.path().to_path_buf(),
      optimizer: OptimizerConfig::default(),
      modules: vec![ModuleDeclaration {
        path: "public/home".into(),
        controller: true,
        scripts: Vec::new(),
        stylesheets: vec!["missing.css".into()],
        requires: Vec::new(),
      }],
    };
    let tree = descriptor.module_tree().unwrap();

    let err = descriptor
      .loader()
      .load_resources_for_module(module(&tree, "public/home"))
      .unwrap_err();
    assert!(matches!(err, BuildError::Loader { module_path, .. } if module_path == "public/home"));
  }

  #[test]
  fn detects_dependency_cycles() {
    let descriptor = descriptor(
      r#"{"package_path": ".", "modules": [
        {"path": "public/a", "requires": ["lib/b"]},
        {"path": "lib/b", "requires": ["public/a"]}
      ]}"#,
    );
    let tree = descriptor.module_tree().unwrap();

    let err = descriptor
      .loader()
      .load_resources_for_module(module(&tree, "public/a"))
      .unwrap_err();
    assert!(err.to_string().contains("public/a -> lib/b -> public/a"));
  }

  #[test]
  fn undeclared_requirements_are_loader_errors() {
    let descriptor = descriptor(
      r#"{"package_path": ".", "modules": [{"path": "public/a", "requires": ["lib/ghost"]}]}"#,
    );
    let tree = descriptor.module_tree().unwrap();

    let err = descriptor
      .loader()
      .load_resources_for_module(module(&tree, "public/a"))
      .unwrap_err();
    assert!(err.to_string().contains("lib/ghost"));
  }
}
