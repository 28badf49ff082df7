//! Read-only view over the configured transformations.

use crate::core::config::BridgeConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the reserved pass-through transformation.
pub const NONE_TRANSFORMATION: &str = "none";

const NONE_LABEL: &str = "None";

/// Direction of a transformation relative to the hosting system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Import,
    Export,
    #[default]
    None,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Import => write!(f, "import"),
            Operation::Export => write!(f, "export"),
            Operation::None => write!(f, "none"),
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "import" => Ok(Operation::Import),
            "export" => Ok(Operation::Export),
            "none" => Ok(Operation::None),
            _ => Err(format!(
                "invalid operation '{}'; supported values are import, export, none",
                value
            )),
        }
    }
}

/// A stylesheet filename relative to the stylesheets root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StylesheetRef {
    pub filename: String,
}

impl StylesheetRef {
    pub fn new<T: Into<String>>(filename: T) -> Self {
        StylesheetRef {
            filename: filename.into(),
        }
    }
}

/// One named transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformationSpec {
    pub name: String,
    pub label: String,
    pub operation: Operation,
    pub steps: Vec<StylesheetRef>,
}

impl TransformationSpec {
    pub fn is_passthrough(&self) -> bool {
        self.name == NONE_TRANSFORMATION
    }

    fn passthrough() -> Self {
        TransformationSpec {
            name: NONE_TRANSFORMATION.to_string(),
            label: NONE_LABEL.to_string(),
            operation: Operation::None,
            steps: Vec::new(),
        }
    }
}

/// Immutable catalog of transformations, built once at startup.
///
/// The reserved `none` entry is always present and always listed first.
#[derive(Debug, Clone)]
pub struct TransformationCatalog {
    specs: IndexMap<String, TransformationSpec>,
}

impl TransformationCatalog {
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut specs = IndexMap::with_capacity(config.transformation.len() + 1);
        specs.insert(
            NONE_TRANSFORMATION.to_string(),
            TransformationSpec::passthrough(),
        );
        for (name, entry) in &config.transformation {
            if name == NONE_TRANSFORMATION {
                continue;
            }
            let steps = entry
                .files
                .iter()
                .flatten()
                .map(StylesheetRef::new)
                .collect();
            specs.insert(
                name.clone(),
                TransformationSpec {
                    name: name.clone(),
                    label: entry.label.clone(),
                    operation: entry.operation,
                    steps,
                },
            );
        }
        TransformationCatalog { specs }
    }

    pub fn get(&self, name: &str) -> Option<&TransformationSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// All transformations, `none` first, then in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &TransformationSpec> {
        self.specs.values()
    }

    /// Configured transformations, excluding the reserved `none` entry.
    pub fn configured(&self) -> impl Iterator<Item = &TransformationSpec> {
        self.specs.values().filter(|spec| !spec.is_passthrough())
    }

    pub fn by_operation(&self, operation: Operation) -> impl Iterator<Item = &TransformationSpec> {
        self.specs
            .values()
            .filter(move |spec| spec.operation == operation)
    }

    /// `(label, name)` pairs for selection lists, starting with `("None", "none")`.
    pub fn choices(&self) -> Vec<(&str, &str)> {
        self.specs
            .values()
            .map(|spec| (spec.label.as_str(), spec.name.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
