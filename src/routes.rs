//! Route discovery and aggregation of route resources into combined bundles.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BuildError, BuildResult};
use crate::models::{CombinedBundles, Resource, ResourceKind, TargetEnvironment};
use crate::project::OptimizerLayout;
use crate::tree::{ModuleNode, ResourceLoader};

/// Collect the module paths of every controller module below `node`.
///
/// Traversal is depth-first with children visited in tree order; the returned order decides the
/// concatenation order of the combined bundles.
pub fn collect_routes<L: ResourceLoader>(node: &ModuleNode, loader: &L) -> BuildResult<Vec<String>> {
  let mut routes = Vec::new();
  collect_routes_into(node, loader, &mut routes)?;
  Ok(routes)
}

fn collect_routes_into<L: ResourceLoader>(
  node: &ModuleNode,
  loader: &L,
  routes: &mut Vec<String>,
) -> BuildResult<()> {
  for child in node.children() {
    match child {
      ModuleNode::Module(module) => {
        let resources = loader.load_resources_for_module(module)?;
        if resources.is_controller {
          routes.push(module.module_path.clone());
        }
      }
      ModuleNode::Container(_) => collect_routes_into(child, loader, routes)?,
    }
  }
  Ok(())
}

/// Concatenate the browser scripts and stylesheets of every route into combined bundles.
///
/// Each module contributes through the first route that reaches it; later routes sharing the
/// module add nothing for it.
pub fn aggregate_resources<L: ResourceLoader>(
  root: &ModuleNode,
  loader: &L,
  route_paths: &[String],
  layout: &OptimizerLayout,
) -> BuildResult<CombinedBundles> {
  let mut aggregator = BundleAggregator::new(layout);

  for (ordinal, route_path) in route_paths.iter().enumerate() {
    let module = match root.find_node_with_path(route_path) {
      Some(ModuleNode::Module(module)) => module,
      Some(ModuleNode::Container(_)) => {
        return Err(BuildError::loader(route_path, "route resolves to a container node"));
      }
      None => return Err(BuildError::loader(route_path, "route not found in module tree")),
    };
    let resources = loader.load_resources_for_module(module)?;

    for stylesheet in &resources.stylesheets {
      aggregator.admit(ordinal, stylesheet);
    }
    for script in &resources.scripts {
      aggregator.admit(ordinal, script);
    }
  }

  Ok(aggregator.finish())
}

struct BundleAggregator<'a> {
  layout: &'a OptimizerLayout,
  // (kind, module path) -> ordinal of the route that admitted it
  admitted: BTreeMap<(ResourceKind, String), usize>,
  bundles: CombinedBundles,
  scripts: Vec<String>,
  stylesheets: Vec<String>,
}

impl<'a> BundleAggregator<'a> {
  fn new(layout: &'a OptimizerLayout) -> Self {
    Self {
      layout,
      admitted: BTreeMap::new(),
      bundles: CombinedBundles::default(),
      scripts: Vec::new(),
      stylesheets: Vec::new(),
    }
  }

  fn admit(&mut self, ordinal: usize, resource: &Resource) {
    if !resource.include_in_environment(TargetEnvironment::Browser) {
      return;
    }

    let key = (resource.kind, resource.module_path.clone());
    let admitting_route = *self.admitted.entry(key).or_insert(ordinal);
    if admitting_route != ordinal {
      return;
    }

    debug!(module = %resource.module_path, kind = ?resource.kind, "adding resource to bundle");
    match resource.kind {
      ResourceKind::Script => {
        self.scripts.push(resource.body.clone());
        self
          .bundles
          .alias_map
          .insert(resource.module_path.clone(), self.layout.script_bundle_path.clone());
      }
      ResourceKind::Stylesheet => {
        self.stylesheets.push(resource.body.clone());
        self
          .bundles
          .alias_map
          .entry(resource.module_path.clone())
          .or_insert_with(|| self.layout.stylesheet_bundle_path.clone());
      }
    }
  }

  fn finish(mut self) -> CombinedBundles {
    self.bundles.script = self.scripts.join("\n");
    self.bundles.stylesheet = self.stylesheets.join("\n");
    self.bundles
  }
}
