//! Build orchestrator tying route collection, snapshotting, fingerprinting, rewriting and output
//! together.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{BuildError, BuildResult};
use crate::fingerprint::FingerprintIndex;
use crate::models::BuildReport;
use crate::output::write_snapshot;
use crate::project::BuildContext;
use crate::rewrite::ReferenceRewriter;
use crate::routes::{aggregate_resources, collect_routes};
use crate::snapshot::ContentSnapshot;
use crate::tree::ResourceLoader;

/// High-level helper producing an optimized copy of a server package.
pub struct StaticBuilder<'a, L: ResourceLoader> {
  context: BuildContext<'a, L>,
}

impl<'a, L: ResourceLoader> StaticBuilder<'a, L> {
  /// Create a builder for the provided build context.
  pub fn new(context: BuildContext<'a, L>) -> Self {
    Self { context }
  }

  /// Bundle every public route, fingerprint the static tree, rewrite references and write the
  /// result to `out_dir` with the alias map stored at `alias_map_path` inside it.
  ///
  /// All state lives in this call; a failed build leaves no output behind.
  pub fn build(&self, out_dir: &Path, alias_map_path: &str) -> BuildResult<BuildReport> {
    let BuildContext {
      layout,
      root,
      loader,
      package_path,
    } = &self.context;

    let public_root = root.child_with_name(&layout.public_root).ok_or_else(|| {
      BuildError::loader(&layout.public_root, "public subtree not found in module tree")
    })?;
    let routes = collect_routes(public_root, *loader)?;
    info!(routes = routes.len(), "collected public routes");

    let bundles = aggregate_resources(root, *loader, &routes, layout)?;
    info!(
      modules = bundles.alias_map.len(),
      script_bytes = bundles.script.len(),
      stylesheet_bytes = bundles.stylesheet.len(),
      "combined route resources"
    );

    let mut snapshot = ContentSnapshot::capture(package_path, layout)?;
    snapshot.merge_bundles(layout, &bundles, alias_map_path)?;

    let fingerprints = FingerprintIndex::build(&snapshot, layout.digest_length)?;
    for (original, versioned) in fingerprints.iter() {
      debug!(original, versioned, "versioned static file");
    }
    let files_rewritten = ReferenceRewriter::new(&fingerprints)?.rewrite_snapshot(&mut snapshot);

    let summary = write_snapshot(&snapshot, &fingerprints, layout, out_dir)?;

    Ok(BuildReport {
      routes,
      alias_map: bundles.alias_map,
      fingerprints,
      files_rewritten,
      files_written: summary.files_written,
      files_minified: summary.files_minified,
    })
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::fs;

  use md5::{Digest, Md5};
  use tempfile::tempdir;

  use super::*;
  use crate::config::OptimizerConfig;
  use crate::descriptor::ServerDescriptor;
  use crate::project::OptimizerLayout;
  use crate::tree::ModuleNode;

  fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  fn digest_prefix(content: &str) -> String {
    hex::encode(Md5::digest(content.as_bytes()))[..12].to_string()
  }

  #[test]
  fn optimizes_a_single_route_end_to_end() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(root, "site/public/home/home.js", "alert(1)");
    write(root, "site/public/home/home.css", "body{color:red}");
    write(
      root,
      "site/templates/index.html",
      r#"<link href="/static/css-combined.css"><script src="/static/js-combined.js"></script>"#,
    );
    write(root, "site/static/img/logo.png", "\u{FFFD}png");
    write(
      root,
      "server.json",
      r#"{
        "package_path": "site",
        "modules": [
          {"path": "public/home", "controller": true,
           "scripts": [{"file": "public/home/home.js"}],
           "stylesheets": ["public/home/home.css"]}
        ]
      }"#,
    );

    let descriptor = ServerDescriptor::load(&root.join("server.json")).unwrap();
    let layout = descriptor.optimizer.to_layout();
    let tree = descriptor.module_tree().unwrap();
    let loader = descriptor.loader();
    let builder = StaticBuilder::new(BuildContext {
      layout: &layout,
      root: &tree,
      loader: &loader,
      package_path: &descriptor.package_path,
    });

    let out_dir = root.join("dist");
    let report = builder.build(&out_dir, "static-aliases.json").unwrap();

    assert_eq!(report.routes, vec!["public/home"]);
    assert_eq!(
      report.alias_map,
      BTreeMap::from([("public/home".to_string(), "/static/js-combined.js".to_string())])
    );

    let js_name = format!("static/js-combined-v{}.js", digest_prefix("alert(1)"));
    let css_name = format!("static/css-combined-v{}.css", digest_prefix("body{color:red}"));
    let js = fs::read_to_string(out_dir.join(&js_name)).unwrap();
    assert!(js.contains("alert(1)"));
    assert_eq!(
      fs::read_to_string(out_dir.join(&css_name)).unwrap(),
      "body{color:red}"
    );

    let index_html = fs::read_to_string(out_dir.join("templates/index.html")).unwrap();
    assert!(index_html.contains(&format!("\"/{css_name}\"")));
    assert!(index_html.contains(&format!("\"/{js_name}\"")));

    let aliases: BTreeMap<String, String> =
      serde_json::from_str(&fs::read_to_string(out_dir.join("static-aliases.json")).unwrap())
        .unwrap();
    assert_eq!(aliases["public/home"], format!("/{js_name}"));

    let logo = report.fingerprints.get("/static/img/logo.png").unwrap();
    assert_eq!(
      fs::read(out_dir.join(logo.trim_start_matches('/'))).unwrap(),
      "\u{FFFD}png".as_bytes()
    );
    assert!(out_dir.join("public/home/home.js").exists());
    assert_eq!(report.files_minified, 1);
  }

  #[test]
  fn missing_public_subtree_fails_the_build() {
    let temp = tempdir().unwrap();
    let layout = OptimizerLayout::from_config(&OptimizerConfig::default());
    let tree = ModuleNode::root();
    let descriptor: ServerDescriptor =
      serde_json::from_str(r#"{"package_path": "."}"#).unwrap();
    let loader = descriptor.loader();

    let builder = StaticBuilder::new(BuildContext {
      layout: &layout,
      root: &tree,
      loader: &loader,
      package_path: temp.path(),
    });
    let out_dir = temp.path().join("dist");
    let err = builder.build(&out_dir, "aliases.json").unwrap_err();

    assert!(matches!(err, BuildError::Loader { .. }));
    assert!(!out_dir.exists());
  }
}
