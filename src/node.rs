use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::document::{Entries, PortFragment};
use crate::transform::DataHandlingSet;
use crate::value::{NodeValue, ValueKind};

pub type NodeId = Ulid;

/// A node in the graph: a computation or a stored value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Unique identifier (sortable, timestamp-based)
    pub id: NodeId,

    /// Native type name, resolved through the node-type registry
    pub type_name: String,

    /// Optional display name, used to derive semantic IDs
    pub name: Option<String>,

    /// Pivot position on the canvas
    pub position: Point2,

    pub kind: NodeKind,

    /// Ordered input ports (computational nodes only)
    pub inputs: Vec<Port>,

    /// Ordered output ports (computational nodes only)
    pub outputs: Vec<Port>,

    /// Stored value (value nodes only)
    pub value: Option<NodeValue>,

    /// Embedded script text, for node types that accept one
    pub script: Option<String>,
}

/// What a node is
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NodeKind {
    /// Computes outputs from inputs through named ports
    Component,

    /// Holds a value of the given kind behind a single implicit port
    Value(ValueKind),

    /// Stands in for a node whose type could not be resolved
    Placeholder {
        original_type: String,
        /// Raw value from the document, kept so it can be written back
        original_value: Option<serde_json::Value>,
        /// Raw port entries, written back with refreshed connection lists
        #[serde(default)]
        inputs: Option<Entries<PortFragment>>,
        #[serde(default)]
        outputs: Option<Entries<PortFragment>>,
    },
}

/// A named input or output slot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Port {
    pub name: String,
    pub data_handling: DataHandlingSet,
    /// Stored value used when the port has no sources
    pub value: Option<NodeValue>,
}

impl Port {
    /// Create a new port with no data handling
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_handling: DataHandlingSet::new(),
            value: None,
        }
    }

    pub fn with_handling(mut self, data_handling: DataHandlingSet) -> Self {
        self.data_handling = data_handling;
        self
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }
}

/// Position on the canvas
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl From<[f32; 2]> for Point2 {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl Node {
    /// Create a new computational node
    pub fn component(type_name: impl Into<String>) -> Self {
        Self::with_kind(type_name, NodeKind::Component)
    }

    /// Create a new value node holding values of `kind`
    pub fn value_node(type_name: impl Into<String>, kind: ValueKind) -> Self {
        Self::with_kind(type_name, NodeKind::Value(kind))
    }

    /// Create a new node of any kind
    pub fn with_kind(type_name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: Ulid::new(),
            type_name: type_name.into(),
            name: None,
            position: Point2::default(),
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            value: None,
            script: None,
        }
    }

    /// Create a placeholder for a node type the registry could not resolve
    ///
    /// The placeholder is an annotation node of `host_type` whose text says
    /// what failed to load.
    pub fn placeholder(
        host_type: impl Into<String>,
        original_type: impl Into<String>,
        original_value: Option<serde_json::Value>,
    ) -> Self {
        let original_type = original_type.into();
        let note = format!("{} could not be loaded", original_type);
        let mut node = Self::with_kind(
            host_type,
            NodeKind::Placeholder {
                original_type,
                original_value,
                inputs: None,
                outputs: None,
            },
        );
        node.value = Some(NodeValue::Text(note));
        node
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Point2::new(x, y);
        self
    }

    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Set the node's position
    pub fn set_position(&mut self, position: Point2) {
        self.position = position;
    }

    /// Update the stored value
    pub fn set_value(&mut self, value: Option<NodeValue>) {
        self.value = value;
    }

    pub fn is_value_node(&self) -> bool {
        matches!(self.kind, NodeKind::Value(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, NodeKind::Placeholder { .. })
    }

    /// Type name written to documents; placeholders keep their original type
    pub fn exported_type(&self) -> &str {
        match &self.kind {
            NodeKind::Placeholder { original_type, .. } => original_type,
            _ => &self.type_name,
        }
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.inputs.iter_mut().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.outputs.iter_mut().find(|p| p.name == name)
    }

    /// Check whether a connection may arrive at the named input
    ///
    /// Value nodes have one implicit port that answers to any name;
    /// placeholders answer to the port names they were loaded with.
    pub fn accepts_input(&self, name: &str) -> bool {
        match &self.kind {
            NodeKind::Value(_) => true,
            NodeKind::Placeholder { inputs, .. } => recorded_port(inputs, name),
            NodeKind::Component => self.input(name).is_some(),
        }
    }

    /// Check whether a connection may leave from the named output
    pub fn provides_output(&self, name: &str) -> bool {
        match &self.kind {
            NodeKind::Value(_) => true,
            NodeKind::Placeholder { outputs, .. } => recorded_port(outputs, name),
            NodeKind::Component => self.output(name).is_some(),
        }
    }
}

fn recorded_port(ports: &Option<Entries<PortFragment>>, name: &str) -> bool {
    ports.as_ref().map_or(false, |ports| ports.contains_key(name))
}
