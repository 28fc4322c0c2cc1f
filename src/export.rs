use std::collections::{HashMap, HashSet};

use ulid::Ulid;

use crate::config::{ExportOptions, ExportScope};
use crate::container::ContainerId;
use crate::converter::export_node;
use crate::diagnostics::{ConversionCounts, DiagnosticKind, Diagnostics};
use crate::document::{format_endpoint, ConnectionRecord, Document, GroupRecord, CANVAS_ID};
use crate::error::{ConversionError, Result};
use crate::graph::Graph;
use crate::hierarchy::{is_disjoint, owning_container, ContainerForest};
use crate::node::NodeId;
use crate::semantic_id::SemanticIdRegistry;

const CANVAS_NAME: &str = "Canvas";

/// Export session
///
/// Holds the semantic ID tables for one export at a time; both are cleared
/// at the start of every call.
#[derive(Debug, Clone)]
pub struct Exporter {
    options: ExportOptions,
    node_ids: SemanticIdRegistry,
    container_ids: SemanticIdRegistry,
    counts: ConversionCounts,
}

impl Exporter {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            node_ids: SemanticIdRegistry::new(),
            container_ids: SemanticIdRegistry::with_reserved([CANVAS_ID]),
            counts: ConversionCounts::default(),
        }
    }

    /// Export using the configured scope
    pub fn export(&mut self, graph: &Graph, diagnostics: &mut Diagnostics) -> Result<Document> {
        match self.options.scope {
            ExportScope::All => self.export_graph(graph, None, diagnostics),
            ExportScope::Selected => {
                let selection: HashSet<Ulid> = graph
                    .selected_nodes()
                    .into_iter()
                    .chain(graph.selected_containers())
                    .collect();
                self.export_graph(graph, Some(&selection), diagnostics)
            }
        }
    }

    /// Export the whole graph, or only the selected nodes and containers
    pub fn export_graph(
        &mut self,
        graph: &Graph,
        selection: Option<&HashSet<Ulid>>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Document> {
        self.node_ids.reset();
        self.container_ids.reset();
        self.counts = ConversionCounts::default();

        let (containers, nodes) = match selection {
            None => (
                graph.containers().map(|c| c.id).collect::<HashSet<_>>(),
                graph.nodes().map(|n| n.id).collect::<HashSet<_>>(),
            ),
            Some(selected) => included_by_selection(graph, selected)?,
        };
        if selection.is_some() && nodes.is_empty() && containers.is_empty() {
            diagnostics.warn(
                DiagnosticKind::EmptySelection,
                None,
                "nothing selected; exporting an empty canvas",
            );
        }

        // Container forest over what is exported, parents collapsed to the
        // nearest exported ancestor
        let mut forest = ContainerForest::new();
        for container in graph.containers().filter(|c| containers.contains(&c.id)) {
            let parent = nearest_included(graph, graph.parent_of(container.id), &containers)?;
            forest.insert(container.id, parent);
        }
        let order = forest.creation_order(diagnostics)?;

        for id in &order {
            if let Some(container) = graph.get_container(*id) {
                self.container_ids.id_for(*id, Some(&container.name), "group");
            }
        }

        // Owning container of each exported node
        let mut owners: HashMap<NodeId, Option<ContainerId>> = HashMap::new();
        let mut owned: HashMap<Option<ContainerId>, Vec<NodeId>> = HashMap::new();
        for node in graph.nodes().filter(|n| nodes.contains(&n.id)) {
            let owner = nearest_included(graph, graph.owner_of(node.id), &containers)?;
            owners.insert(node.id, owner);
            owned.entry(owner).or_default().push(node.id);
        }

        // Node IDs follow emission order: containers shallow-first, then canvas
        let emission: Vec<Option<ContainerId>> =
            order.iter().copied().map(Some).chain(std::iter::once(None)).collect();
        for slot in &emission {
            for node_id in owned.get(slot).into_iter().flatten() {
                if let Some(node) = graph.get_node(*node_id) {
                    self.node_ids
                        .id_for(node.id, node.name.as_deref(), node.exported_type());
                }
            }
        }

        let mut records: HashMap<Option<ContainerId>, GroupRecord> = HashMap::new();
        for slot in &emission {
            let record = self.group_record(graph, &forest, *slot, owned.get(slot));
            records.insert(*slot, record);
        }

        for connection in graph.connections() {
            let (Some(from_owner), Some(to_owner)) =
                (owners.get(&connection.from.node), owners.get(&connection.to.node))
            else {
                log::debug!("Skipping connection outside the export: {}", connection);
                continue;
            };
            let (Some(from_id), Some(to_id)) = (
                self.node_ids.get(connection.from.node),
                self.node_ids.get(connection.to.node),
            ) else {
                continue;
            };

            let from_chain = forest.chain_of_owner(from_owner.as_ref());
            let to_chain = forest.chain_of_owner(to_owner.as_ref());
            let owner = owning_container(&from_chain, &to_chain);

            let record = ConnectionRecord::new(
                format_endpoint(&self.path(&from_chain), from_id, &connection.from.port),
                format_endpoint(&self.path(&to_chain), to_id, &connection.to.port),
            );
            if owner.is_none() && is_disjoint(&from_chain, &to_chain) {
                diagnostics.info(
                    DiagnosticKind::DisjointContainers,
                    Some(&format!("{} -> {}", record.from, record.to)),
                    "endpoints share no container; recorded on the canvas",
                );
            }
            if let Some(group) = records.get_mut(&owner) {
                group.connections.push(record);
                self.counts.connections += 1;
            }
        }

        let mut document = Document::new();
        for slot in &emission {
            if let Some(record) = records.remove(slot) {
                let key = match slot {
                    Some(id) => self.container_ids.get(*id).unwrap_or_default().to_string(),
                    None => CANVAS_ID.to_string(),
                };
                document.groups.insert(key, record);
            }
        }

        self.counts.containers = order.len();
        self.counts.nodes = owners.len();
        log::info!(
            "Exported {} containers, {} nodes, {} connections",
            self.counts.containers,
            self.counts.nodes,
            self.counts.connections
        );
        Ok(document)
    }

    /// Counts from the last export
    pub fn counts(&self) -> ConversionCounts {
        self.counts
    }

    /// Semantic ID assigned to a node in the last export
    pub fn node_id(&self, node: NodeId) -> Option<&str> {
        self.node_ids.get(node)
    }

    /// Document ID assigned to a container in the last export
    pub fn container_id(&self, container: ContainerId) -> Option<&str> {
        self.container_ids.get(container)
    }

    fn path(&self, chain: &[ContainerId]) -> Vec<String> {
        chain
            .iter()
            .filter_map(|id| self.container_ids.get(*id))
            .map(str::to_string)
            .collect()
    }

    fn group_record(
        &self,
        graph: &Graph,
        forest: &ContainerForest<ContainerId>,
        slot: Option<ContainerId>,
        nodes: Option<&Vec<NodeId>>,
    ) -> GroupRecord {
        let mut record = match slot.and_then(|id| graph.get_container(id)) {
            Some(container) => GroupRecord {
                name: container.name.clone(),
                parent: Some(
                    forest
                        .parent(&container.id)
                        .and_then(|p| self.container_ids.get(*p))
                        .unwrap_or(CANVAS_ID)
                        .to_string(),
                ),
                children: self.path(&forest.children(&container.id)),
                position: container.position.to_array(),
                bounds: container.bounds.corners(),
                color: container.color,
                ..GroupRecord::default()
            },
            None => GroupRecord {
                name: CANVAS_NAME.to_string(),
                parent: None,
                children: self.path(&forest.roots()),
                ..GroupRecord::default()
            },
        };

        for node_id in nodes.into_iter().flatten() {
            let (Some(node), Some(sid)) = (graph.get_node(*node_id), self.node_ids.get(*node_id))
            else {
                continue;
            };
            let fragment = export_node(node, graph, &self.node_ids, &self.options);
            record.components.insert(sid, fragment);
        }
        record
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportOptions::default())
    }
}

/// Export a whole graph in one call
pub fn export_graph(graph: &Graph, options: &ExportOptions) -> Result<(Document, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let document = Exporter::new(options.clone()).export(graph, &mut diagnostics)?;
    Ok((document, diagnostics))
}

/// Walk up from `start` to the first container in `included`
fn nearest_included(
    graph: &Graph,
    start: Option<ContainerId>,
    included: &HashSet<ContainerId>,
) -> Result<Option<ContainerId>> {
    let mut seen = HashSet::new();
    let mut current = start;
    while let Some(id) = current {
        if included.contains(&id) {
            return Ok(Some(id));
        }
        if !seen.insert(id) {
            return Err(ConversionError::HierarchyCycle(id.to_string()));
        }
        current = graph.parent_of(id);
    }
    Ok(None)
}

/// Selected containers bring their whole subtree along
fn included_by_selection(
    graph: &Graph,
    selected: &HashSet<Ulid>,
) -> Result<(HashSet<ContainerId>, HashSet<NodeId>)> {
    let mut containers = HashSet::new();
    for container in graph.containers() {
        let mut seen = HashSet::new();
        let mut current = Some(container.id);
        while let Some(id) = current {
            if selected.contains(&id) {
                containers.insert(container.id);
                break;
            }
            if !seen.insert(id) {
                return Err(ConversionError::HierarchyCycle(id.to_string()));
            }
            current = graph.parent_of(id);
        }
    }

    let nodes = graph
        .nodes()
        .filter(|n| {
            selected.contains(&n.id)
                || graph
                    .owner_of(n.id)
                    .map_or(false, |owner| containers.contains(&owner))
        })
        .map(|n| n.id)
        .collect();

    Ok((containers, nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::PortRef;
    use crate::container::{Container, Rectangle};
    use crate::node::{Node, Port};
    use crate::value::{NodeValue, ValueKind};
    use pretty_assertions::assert_eq;

    fn point(name: &str) -> Node {
        Node::value_node("Point", ValueKind::Point)
            .named(name)
            .with_value(NodeValue::Point([0.0, 0.0, 0.0]))
    }

    fn adder() -> Node {
        Node::component("Addition")
            .with_input(Port::new("A"))
            .with_input(Port::new("B"))
            .with_output(Port::new("Result"))
    }

    #[test]
    fn test_export_flat_graph() {
        let mut graph = Graph::new();
        let p1 = graph.add_node(point("Point"));
        let p2 = graph.add_node(point("Point"));
        let add = graph.add_node(adder());
        graph.connect(PortRef::new(p1, "Point"), PortRef::new(add, "A")).unwrap();
        graph.connect(PortRef::new(p2, "Point"), PortRef::new(add, "B")).unwrap();

        let (doc, diagnostics) = export_graph(&graph, &ExportOptions::default()).unwrap();
        assert!(diagnostics.is_empty());

        let canvas = doc.canvas().unwrap();
        assert_eq!(canvas.components.keys().collect::<Vec<_>>(), vec!["point", "point_2", "addition"]);
        assert_eq!(
            canvas.connections,
            vec![
                ConnectionRecord::new("point:Point", "addition:A"),
                ConnectionRecord::new("point_2:Point", "addition:B"),
            ]
        );
        assert_eq!(canvas.parent, None);
        assert_eq!(canvas.name, "Canvas");
    }

    #[test]
    fn test_connection_owned_by_lowest_common_ancestor() {
        let mut graph = Graph::new();
        let outer = graph
            .add_container(Container::new("Outer", Rectangle::new(0.0, 0.0, 500.0, 500.0)), None)
            .unwrap();
        let inner = graph
            .add_container(
                Container::new("Inner", Rectangle::new(50.0, 50.0, 100.0, 100.0)),
                Some(outer),
            )
            .unwrap();
        let x = graph.add_node(point("X"));
        let y = graph.add_node(adder().named("Y"));
        graph.assign_node(x, Some(outer)).unwrap();
        graph.assign_node(y, Some(inner)).unwrap();
        graph.connect(PortRef::new(x, "Point"), PortRef::new(y, "A")).unwrap();

        let (doc, _) = export_graph(&graph, &ExportOptions::default()).unwrap();

        assert_eq!(doc.groups.keys().collect::<Vec<_>>(), vec!["outer", "inner", "canvas"]);
        let outer_record = doc.group("outer").unwrap();
        assert_eq!(
            outer_record.connections,
            vec![ConnectionRecord::new("outer/x:Point", "outer/inner/y:A")]
        );
        assert!(doc.group("inner").unwrap().connections.is_empty());
        assert!(doc.canvas().unwrap().connections.is_empty());

        assert_eq!(outer_record.parent.as_deref(), Some("canvas"));
        assert_eq!(outer_record.children, vec!["inner"]);
        assert_eq!(doc.group("inner").unwrap().parent.as_deref(), Some("outer"));
        assert_eq!(doc.canvas().unwrap().children, vec!["outer"]);
        assert_eq!(outer_record.bounds, [0.0, 0.0, 500.0, 500.0]);
    }

    #[test]
    fn test_root_endpoint_goes_to_canvas() {
        let mut graph = Graph::new();
        let group = graph
            .add_container(Container::new("G", Rectangle::default()), None)
            .unwrap();
        let inside = graph.add_node(point("In"));
        let outside = graph.add_node(adder());
        graph.assign_node(inside, Some(group)).unwrap();
        graph.connect(PortRef::new(inside, "Point"), PortRef::new(outside, "A")).unwrap();

        let (doc, _) = export_graph(&graph, &ExportOptions::default()).unwrap();
        assert_eq!(
            doc.canvas().unwrap().connections,
            vec![ConnectionRecord::new("g/in:Point", "addition:A")]
        );
    }

    #[test]
    fn test_disjoint_trees_flagged() {
        let mut graph = Graph::new();
        let left = graph
            .add_container(Container::new("Left", Rectangle::default()), None)
            .unwrap();
        let right = graph
            .add_container(Container::new("Right", Rectangle::default()), None)
            .unwrap();
        let a = graph.add_node(point("A"));
        let b = graph.add_node(adder().named("B"));
        graph.assign_node(a, Some(left)).unwrap();
        graph.assign_node(b, Some(right)).unwrap();
        graph.connect(PortRef::new(a, "Point"), PortRef::new(b, "A")).unwrap();

        let (doc, diagnostics) = export_graph(&graph, &ExportOptions::default()).unwrap();
        assert_eq!(doc.canvas().unwrap().connections.len(), 1);
        assert_eq!(diagnostics.of_kind(DiagnosticKind::DisjointContainers).len(), 1);
    }

    #[test]
    fn test_container_named_canvas_gets_suffix() {
        let mut graph = Graph::new();
        graph
            .add_container(Container::new("Canvas", Rectangle::default()), None)
            .unwrap();
        let (doc, _) = export_graph(&graph, &ExportOptions::default()).unwrap();
        assert_eq!(doc.groups.keys().collect::<Vec<_>>(), vec!["canvas_2", "canvas"]);
    }

    #[test]
    fn test_export_selected() {
        let mut graph = Graph::new();
        let outer = graph
            .add_container(Container::new("Outer", Rectangle::default()), None)
            .unwrap();
        let inner = graph
            .add_container(Container::new("Inner", Rectangle::default()), Some(outer))
            .unwrap();
        let kept = graph.add_node(point("Kept"));
        let dropped = graph.add_node(adder().named("Dropped"));
        graph.assign_node(kept, Some(inner)).unwrap();
        graph.connect(PortRef::new(kept, "Point"), PortRef::new(dropped, "A")).unwrap();
        graph.select(kept);

        let options = ExportOptions {
            scope: ExportScope::Selected,
            ..ExportOptions::default()
        };
        let mut exporter = Exporter::new(options);
        let mut diagnostics = Diagnostics::new();
        let doc = exporter.export(&graph, &mut diagnostics).unwrap();

        // inner is unselected, so the node falls back to the canvas
        assert_eq!(doc.groups.keys().collect::<Vec<_>>(), vec!["canvas"]);
        assert_eq!(doc.canvas().unwrap().components.keys().collect::<Vec<_>>(), vec!["kept"]);
        assert!(doc.canvas().unwrap().connections.is_empty());
        assert_eq!(exporter.counts().nodes, 1);

        // selecting the outer container brings its subtree
        graph.clear_selection();
        graph.select(outer);
        let doc = exporter.export(&graph, &mut diagnostics).unwrap();
        assert_eq!(doc.groups.keys().collect::<Vec<_>>(), vec!["outer", "inner", "canvas"]);
        assert!(doc.group("inner").unwrap().components.contains_key("kept"));
    }

    #[test]
    fn test_empty_selection_warns() {
        let mut graph = Graph::new();
        graph.add_node(adder());
        let mut diagnostics = Diagnostics::new();
        let doc = Exporter::default()
            .export_graph(&graph, Some(&HashSet::new()), &mut diagnostics)
            .unwrap();

        assert_eq!(doc.groups.len(), 1);
        assert!(doc.canvas().unwrap().components.is_empty());
        assert_eq!(diagnostics.of_kind(DiagnosticKind::EmptySelection).len(), 1);
    }

    #[test]
    fn test_session_is_reset_between_exports() {
        let mut graph = Graph::new();
        graph.add_node(point("Point"));
        let mut exporter = Exporter::default();
        let mut diagnostics = Diagnostics::new();

        let first = exporter.export(&graph, &mut diagnostics).unwrap();
        let second = exporter.export(&graph, &mut diagnostics).unwrap();
        assert_eq!(first, second);
        assert!(second.canvas().unwrap().components.contains_key("point"));
    }
}
