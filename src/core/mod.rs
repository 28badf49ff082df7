pub mod artifacts;
pub mod canonical;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod resolver;

pub use artifacts::{ArtifactId, RunArtifacts};
pub use catalog::{Operation, StylesheetRef, TransformationCatalog, TransformationSpec};
pub use config::{BridgeConfig, ConfigLoader, ConfigValidator, EngineConfig, ResolverKind};
pub use engine::{CommandProcessor, ProcessInvocation, XsltProcessor};
pub use error::{ConfigError, TransformError};
pub use pipeline::{Pipeline, Settings};
pub use resolver::{CatalogResolver, DirectoryResolver, StylesheetResolver};
