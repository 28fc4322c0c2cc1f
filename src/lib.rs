// Graph Document - node graph <-> JSON document conversion

pub mod config;
pub mod connection;
pub mod container;
pub mod converter;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod event;
pub mod export;
pub mod graph;
pub mod hierarchy;
pub mod import;
pub mod node;
pub mod persistence;
pub mod registry;
pub mod semantic_id;
pub mod transform;
pub mod value;

// Re-export main types for convenience
pub use config::{ConverterConfig, ExportOptions, ExportScope, ImportOptions};
pub use connection::{Connection, PortRef};
pub use container::{Container, ContainerId, Rectangle};
pub use diagnostics::{
    ConversionCounts, ConversionReport, ConversionStatus, Diagnostic, DiagnosticKind, Diagnostics,
    Severity,
};
pub use document::{ConnectionRecord, Document, Entries, GroupRecord, NodeFragment, PortFragment};
pub use error::{ConversionError, Result};
pub use event::{EventType, GraphEvent};
pub use export::{export_graph, Exporter};
pub use graph::Graph;
pub use hierarchy::ContainerForest;
pub use import::{import_graph, Importer};
pub use node::{Node, NodeId, NodeKind, Point2, Port};
pub use persistence::{export_to_file, import_from_file, FileSystem, Persistence};
pub use registry::{NodePrototype, NodeTypeRegistry, PrototypeRegistry};
pub use semantic_id::SemanticIdRegistry;
pub use transform::{DataHandling, DataHandlingSet};
pub use value::{NodeValue, ValueKind};
