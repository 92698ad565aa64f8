//! Module tree representation and the loader seam used to resolve module resources.

use crate::error::BuildResult;
use crate::models::ModuleResources;

/// Node grouping other nodes. Containers never own resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerNode {
  /// Last path segment.
  pub name: String,
  /// Slash-delimited path from the tree root; empty for the root itself.
  pub module_path: String,
  /// Child nodes in declaration order.
  pub children: Vec<ModuleNode>,
}

/// Leaf node that may own resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLeaf {
  /// Last path segment.
  pub name: String,
  /// Slash-delimited path from the tree root.
  pub module_path: String,
}

/// Node of the server's module tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleNode {
  /// Intermediate node with children.
  Container(ContainerNode),
  /// Resource-owning module.
  Module(ModuleLeaf),
}

impl ModuleNode {
  /// Create an empty root container.
  pub fn root() -> Self {
    Self::Container(ContainerNode {
      name: String::new(),
      module_path: String::new(),
      children: Vec::new(),
    })
  }

  /// Last path segment of the node.
  pub fn name(&self) -> &str {
    match self {
      Self::Container(node) => &node.name,
      Self::Module(node) => &node.name,
    }
  }

  /// Full module path of the node.
  pub fn module_path(&self) -> &str {
    match self {
      Self::Container(node) => &node.module_path,
      Self::Module(node) => &node.module_path,
    }
  }

  /// Children in declaration order; always empty for modules.
  pub fn children(&self) -> &[ModuleNode] {
    match self {
      Self::Container(node) => &node.children,
      Self::Module(_) => &[],
    }
  }

  /// Direct child with the given name.
  pub fn child_with_name(&self, name: &str) -> Option<&ModuleNode> {
    self.children().iter().find(|child| child.name() == name)
  }

  /// Descend from this node following the slash-delimited path.
  ///
  /// The path is interpreted relative to this node, so calling it on the tree root with a full
  /// module path finds that module.
  pub fn find_node_with_path(&self, path: &str) -> Option<&ModuleNode> {
    path
      .split('/')
      .filter(|segment| !segment.is_empty())
      .try_fold(self, |node, segment| node.child_with_name(segment))
  }
}

/// Resolves the resources a module (and its dependencies) contribute.
pub trait ResourceLoader {
  /// Load the resources of `module`, dependencies first, along with its controller flag.
  fn load_resources_for_module(&self, module: &ModuleLeaf) -> BuildResult<ModuleResources>;
}
