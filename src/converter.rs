use crate::config::{ExportOptions, ImportOptions};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::document::{Entries, NodeFragment, PortFragment, PORT_SEPARATOR};
use crate::graph::Graph;
use crate::node::{Node, NodeKind, Point2, Port};
use crate::registry::NodeTypeRegistry;
use crate::semantic_id::SemanticIdRegistry;
use crate::transform::DataHandlingSet;
use crate::value::{self, NodeValue, ValueKind};

// ========== Export ==========

/// Convert one node to its document fragment
///
/// Port connection references name peers by the semantic IDs already
/// assigned in `ids`; peers without one (outside the export) are left out.
pub fn export_node(
    node: &Node,
    graph: &Graph,
    ids: &SemanticIdRegistry,
    options: &ExportOptions,
) -> NodeFragment {
    let mut fragment = NodeFragment::new(node.exported_type());
    fragment.name = node.name.clone();
    fragment.position = node.position.to_array();

    match &node.kind {
        NodeKind::Placeholder {
            original_value,
            inputs,
            outputs,
            ..
        } => {
            fragment.value = original_value.clone();
            fragment.inputs = inputs
                .as_ref()
                .map(|ports| refresh_ports(ports, node, graph, ids, true));
            fragment.outputs = outputs
                .as_ref()
                .map(|ports| refresh_ports(ports, node, graph, ids, false));
        }
        NodeKind::Value(declared) => {
            if let Some(stored) = &node.value {
                let (tag, json) = encode_value(stored, *declared);
                fragment.value_type = Some(tag.to_string());
                fragment.value = Some(json);
            }
        }
        NodeKind::Component => {
            fragment.inputs = Some(export_inputs(node, graph, ids, options));
            fragment.outputs = Some(export_outputs(node, graph, ids));
        }
    }

    if options.include_scripts {
        fragment.script = node.script.clone();
    }

    fragment
}

/// Peers of one port as `sid:port` references
fn port_connections(
    node: &Node,
    graph: &Graph,
    ids: &SemanticIdRegistry,
    port: &str,
    is_input: bool,
) -> Vec<String> {
    if is_input {
        graph
            .incoming(node.id)
            .into_iter()
            .filter(|c| c.to.port == port)
            .filter_map(|c| ids.get(c.from.node).map(|sid| reference(sid, &c.from.port)))
            .collect()
    } else {
        graph
            .outgoing(node.id)
            .into_iter()
            .filter(|c| c.from.port == port)
            .filter_map(|c| ids.get(c.to.node).map(|sid| reference(sid, &c.to.port)))
            .collect()
    }
}

/// Recorded placeholder ports with connection lists taken from the graph
fn refresh_ports(
    recorded: &Entries<PortFragment>,
    node: &Node,
    graph: &Graph,
    ids: &SemanticIdRegistry,
    is_input: bool,
) -> Entries<PortFragment> {
    recorded
        .iter()
        .map(|(name, entry)| {
            let connections = port_connections(node, graph, ids, name, is_input);
            let entry = PortFragment {
                connections,
                ..entry.clone()
            };
            (name.to_string(), entry)
        })
        .collect()
}

fn export_inputs(
    node: &Node,
    graph: &Graph,
    ids: &SemanticIdRegistry,
    options: &ExportOptions,
) -> Entries<PortFragment> {
    let mut ports = Entries::new();
    for port in &node.inputs {
        let connections = port_connections(node, graph, ids, &port.name, true);

        let mut entry = PortFragment {
            data_handling: port.data_handling.names(),
            ..PortFragment::default()
        };
        if options.include_port_values && connections.is_empty() {
            if let Some(stored) = &port.value {
                let (tag, json) = encode_value(stored, stored.kind());
                entry.value_type = Some(tag.to_string());
                entry.value = Some(json);
            }
        }
        entry.connections = connections;
        ports.insert(port.name.clone(), entry);
    }
    ports
}

fn export_outputs(node: &Node, graph: &Graph, ids: &SemanticIdRegistry) -> Entries<PortFragment> {
    let mut ports = Entries::new();
    for port in &node.outputs {
        let connections = port_connections(node, graph, ids, &port.name, false);
        ports.insert(
            port.name.clone(),
            PortFragment {
                data_handling: port.data_handling.names(),
                connections,
                ..PortFragment::default()
            },
        );
    }
    ports
}

fn reference(semantic_id: &str, port: &str) -> String {
    format!("{}{}{}", semantic_id, PORT_SEPARATOR, port)
}

/// Tag and JSON for a stored value; an empty sequence keeps the declared tag
fn encode_value(stored: &NodeValue, declared: ValueKind) -> (ValueKind, serde_json::Value) {
    let tag = match stored {
        NodeValue::Sequence(items) if items.is_empty() => declared,
        other => other.kind(),
    };
    (tag, stored.to_json())
}

// ========== Import ==========

/// Materialize one fragment as a node
///
/// Never fails: an unknown type yields a placeholder, and bad values or
/// unknown ports are reported and skipped.
pub fn import_node<R>(
    semantic_id: &str,
    fragment: &NodeFragment,
    registry: &R,
    options: &ImportOptions,
    diagnostics: &mut Diagnostics,
) -> Node
where
    R: NodeTypeRegistry + ?Sized,
{
    let Some(prototype) = registry.resolve(&fragment.type_name) else {
        diagnostics.warn(
            DiagnosticKind::UnknownNodeType,
            Some(semantic_id),
            format!(
                "type '{}' could not be resolved; created a placeholder",
                fragment.type_name
            ),
        );
        let mut node = Node::placeholder(
            options.placeholder_type.clone(),
            fragment.type_name.clone(),
            fragment.value.clone(),
        );
        if let NodeKind::Placeholder { inputs, outputs, .. } = &mut node.kind {
            *inputs = fragment.inputs.clone();
            *outputs = fragment.outputs.clone();
        }
        node.name = fragment.name.clone();
        node.script = fragment.script.clone();
        node.set_position(Point2::from(fragment.position));
        return node;
    };

    let mut node = registry.instantiate(prototype);
    node.name = fragment.name.clone();
    node.set_position(Point2::from(fragment.position));

    if let Some(json) = &fragment.value {
        match node.kind {
            NodeKind::Value(declared) => {
                let kind = value_kind(fragment.value_type.as_deref(), declared, semantic_id, diagnostics);
                match value::decode(kind, json) {
                    Ok(decoded) => node.set_value(Some(decoded)),
                    Err(err) => diagnostics.warn(
                        DiagnosticKind::MalformedValue,
                        Some(semantic_id),
                        format!("{}; keeping the default value", err),
                    ),
                }
            }
            _ => diagnostics.warn(
                DiagnosticKind::UnsupportedPayload,
                Some(semantic_id),
                format!("'{}' does not store a value; value ignored", node.type_name),
            ),
        }
    }

    if node.kind == NodeKind::Component {
        if let Some(inputs) = &fragment.inputs {
            for (name, port_fragment) in inputs.iter() {
                match node.input_mut(name) {
                    Some(port) => apply_port(port, port_fragment, semantic_id, true, diagnostics),
                    None => diagnostics.warn(
                        DiagnosticKind::MissingPort,
                        Some(semantic_id),
                        format!("'{}' has no input named '{}'", fragment.type_name, name),
                    ),
                }
            }
        }
        if let Some(outputs) = &fragment.outputs {
            for (name, port_fragment) in outputs.iter() {
                match node.output_mut(name) {
                    Some(port) => apply_port(port, port_fragment, semantic_id, false, diagnostics),
                    None => diagnostics.warn(
                        DiagnosticKind::MissingPort,
                        Some(semantic_id),
                        format!("'{}' has no output named '{}'", fragment.type_name, name),
                    ),
                }
            }
        }
    }

    if let Some(script) = &fragment.script {
        if prototype.accepts_script {
            node.script = Some(script.clone());
        } else {
            diagnostics.warn(
                DiagnosticKind::UnsupportedPayload,
                Some(semantic_id),
                format!("'{}' does not accept a script; script dropped", prototype.type_name),
            );
        }
    }

    node
}

fn value_kind(
    tag: Option<&str>,
    declared: ValueKind,
    semantic_id: &str,
    diagnostics: &mut Diagnostics,
) -> ValueKind {
    match tag.map(str::parse::<ValueKind>) {
        None => declared,
        Some(Ok(kind)) => kind,
        Some(Err(err)) => {
            diagnostics.warn(
                DiagnosticKind::MalformedValue,
                Some(semantic_id),
                format!("{}; decoding as {}", err, declared),
            );
            declared
        }
    }
}

fn apply_port(
    port: &mut Port,
    fragment: &PortFragment,
    semantic_id: &str,
    is_input: bool,
    diagnostics: &mut Diagnostics,
) {
    let (set, unknown) = DataHandlingSet::parse(&fragment.data_handling);
    for name in unknown {
        diagnostics.warn(
            DiagnosticKind::UnknownDataHandling,
            Some(semantic_id),
            format!("port '{}': unknown data handling '{}' ignored", port.name, name),
        );
    }
    port.data_handling = set;

    let Some(json) = &fragment.value else {
        return;
    };
    if !is_input {
        diagnostics.warn(
            DiagnosticKind::UnsupportedPayload,
            Some(semantic_id),
            format!("output '{}' cannot store a value; value ignored", port.name),
        );
        return;
    }
    let kind = value_kind(
        fragment.value_type.as_deref(),
        ValueKind::Sequence,
        semantic_id,
        diagnostics,
    );
    match value::decode(kind, json) {
        Ok(decoded) => port.value = Some(decoded),
        Err(err) => diagnostics.warn(
            DiagnosticKind::MalformedValue,
            Some(semantic_id),
            format!("input '{}': {}; keeping the default value", port.name, err),
        ),
    }
}
