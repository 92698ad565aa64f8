#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fingerprint;
#[cfg(feature = "logging")]
pub mod logging;
pub mod minify;
pub mod models;
pub mod output;
pub mod project;
pub mod rewrite;
pub mod routes;
pub mod snapshot;
pub mod tree;

pub use builder::StaticBuilder;
pub use config::OptimizerConfig;
pub use descriptor::{DescriptorLoader, ServerDescriptor};
pub use error::{BuildError, BuildResult};
pub use fingerprint::FingerprintIndex;
pub use models::{BuildReport, StaticAliasMap};
pub use project::{BuildContext, OptimizerLayout};
pub use tree::{ModuleNode, ResourceLoader};
