use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeKind, Port};
use crate::value::ValueKind;

/// Everything needed to create a node of one type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodePrototype {
    #[serde(rename = "type")]
    pub type_name: String,

    /// Set for value nodes; `None` means a computational node
    #[serde(default)]
    pub value_kind: Option<ValueKind>,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    /// Whether nodes of this type carry an embedded script
    #[serde(default)]
    pub accepts_script: bool,
}

impl NodePrototype {
    /// Create a new computational prototype
    pub fn component(type_name: impl Into<String>, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            type_name: type_name.into(),
            value_kind: None,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            accepts_script: false,
        }
    }

    /// Create a new value prototype
    pub fn value(type_name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            type_name: type_name.into(),
            value_kind: Some(kind),
            inputs: Vec::new(),
            outputs: Vec::new(),
            accepts_script: false,
        }
    }

    pub fn scripted(mut self) -> Self {
        self.accepts_script = true;
        self
    }
}

/// Resolves type names to prototypes and instantiates them
pub trait NodeTypeRegistry {
    /// Find the prototype for a type name
    fn resolve(&self, type_name: &str) -> Option<&NodePrototype>;

    /// Create a fresh node from a prototype
    fn instantiate(&self, prototype: &NodePrototype) -> Node {
        let kind = match prototype.value_kind {
            Some(value_kind) => NodeKind::Value(value_kind),
            None => NodeKind::Component,
        };
        let mut node = Node::with_kind(prototype.type_name.clone(), kind);
        node.inputs = prototype.inputs.iter().map(Port::new).collect();
        node.outputs = prototype.outputs.iter().map(Port::new).collect();
        node
    }
}

/// On-disk catalog of prototypes and aliases
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub prototypes: Vec<NodePrototype>,
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

/// In-memory registry with an alias table
#[derive(Debug, Clone, Default)]
pub struct PrototypeRegistry {
    prototypes: HashMap<String, NodePrototype>,
    aliases: HashMap<String, String>,
}

impl PrototypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with common value and math node types
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(NodePrototype::value("Number", ValueKind::Scalar));
        registry.register(NodePrototype::value("Integer", ValueKind::Integer));
        registry.register(NodePrototype::value("Boolean Toggle", ValueKind::Boolean));
        registry.register(NodePrototype::value("Panel", ValueKind::Text));
        registry.register(NodePrototype::value("Point", ValueKind::Point));
        registry.register(NodePrototype::component("Addition", &["A", "B"], &["Result"]));
        registry.register(NodePrototype::component(
            "Construct Point",
            &["X", "Y", "Z"],
            &["Pt"],
        ));
        registry.register(NodePrototype::component("Series", &["S", "N", "C"], &["S"]));
        registry.register(NodePrototype::component("List Item", &["L", "i"], &["E"]));
        registry.register(NodePrototype::component(
            "Extrude",
            &["Base", "Direction"],
            &["Extrusion"],
        ));
        registry.register(NodePrototype::component("Python 3 Script", &["x", "y"], &["a"]).scripted());
        registry.alias("Extrusion", "Extrude");
        registry.alias("Text Panel", "Panel");
        registry
    }

    /// Load a registry from a JSON catalog file
    pub fn from_catalog(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open catalog: {}", path.display()))?;
        let reader = BufReader::new(file);
        let catalog: Catalog = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
        Ok(Self::from(catalog))
    }

    /// Register a prototype under its type name
    pub fn register(&mut self, prototype: NodePrototype) {
        self.prototypes
            .insert(prototype.type_name.clone(), prototype);
    }

    /// Make `from` resolve to the prototype registered as `to`
    pub fn alias(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.aliases.insert(from.into(), to.into());
    }

    /// Merge an alias table, keeping existing entries
    pub fn extend_aliases(&mut self, aliases: &HashMap<String, String>) {
        for (from, to) in aliases {
            self.aliases
                .entry(from.clone())
                .or_insert_with(|| to.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    /// Registered type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prototypes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Case-insensitive match over type names, then alias names
    ///
    /// Candidates are checked in sorted order so names differing only by
    /// case always resolve the same way.
    fn lookup_case_insensitive(&self, type_name: &str) -> Option<&NodePrototype> {
        let wanted = type_name.to_lowercase();
        if let Some(name) = self
            .type_names()
            .into_iter()
            .find(|name| name.to_lowercase() == wanted)
        {
            return self.prototypes.get(name);
        }

        let mut aliases: Vec<(&String, &String)> = self
            .aliases
            .iter()
            .filter(|(from, _)| from.to_lowercase() == wanted)
            .collect();
        aliases.sort();
        aliases
            .into_iter()
            .find_map(|(_, to)| self.prototypes.get(to))
    }
}

impl NodeTypeRegistry for PrototypeRegistry {
    fn resolve(&self, type_name: &str) -> Option<&NodePrototype> {
        if let Some(prototype) = self.prototypes.get(type_name) {
            return Some(prototype);
        }

        if let Some(target) = self.aliases.get(type_name) {
            log::debug!("Resolved type '{}' through alias '{}'", type_name, target);
            if let Some(prototype) = self.prototypes.get(target) {
                return Some(prototype);
            }
        }

        let found = self.lookup_case_insensitive(type_name);
        if let Some(prototype) = found {
            log::debug!(
                "Resolved type '{}' case-insensitively as '{}'",
                type_name,
                prototype.type_name
            );
        }
        found
    }
}

impl From<Catalog> for PrototypeRegistry {
    fn from(catalog: Catalog) -> Self {
        let mut registry = Self::new();
        for prototype in catalog.prototypes {
            registry.register(prototype);
        }
        registry.aliases = catalog.aliases;
        registry
    }
}
