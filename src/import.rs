use std::collections::{HashMap, HashSet};

use crate::config::ImportOptions;
use crate::connection::PortRef;
use crate::container::{Container, ContainerId, Rectangle};
use crate::converter::import_node;
use crate::diagnostics::{ConversionCounts, ConversionReport, DiagnosticKind, Diagnostics};
use crate::document::{parse_endpoint, Document, GroupRecord, CANVAS_ID};
use crate::error::Result;
use crate::graph::Graph;
use crate::hierarchy::ContainerForest;
use crate::node::{NodeId, Point2};
use crate::registry::NodeTypeRegistry;

/// Connection found in the document, keyed by node IDs and ports
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingConnection {
    from_id: String,
    from_port: String,
    to_id: String,
    to_port: String,
}

impl PendingConnection {
    fn describe(&self) -> String {
        format!(
            "{}:{} -> {}:{}",
            self.from_id, self.from_port, self.to_id, self.to_port
        )
    }
}

/// Import session
///
/// Containers are created shallowest first, then nodes, then connections.
/// The semantic ID tables live only for one import; they are cleared at the
/// start of every call.
pub struct Importer<'r, R: NodeTypeRegistry + ?Sized> {
    registry: &'r R,
    options: ImportOptions,
    nodes: HashMap<String, NodeId>,
    containers: HashMap<String, ContainerId>,
    counts: ConversionCounts,
}

impl<'r, R: NodeTypeRegistry + ?Sized> Importer<'r, R> {
    pub fn new(registry: &'r R, options: ImportOptions) -> Self {
        Self {
            registry,
            options,
            nodes: HashMap::new(),
            containers: HashMap::new(),
            counts: ConversionCounts::default(),
        }
    }

    /// Materialize a document into `graph`
    pub fn import(
        &mut self,
        document: &Document,
        graph: &mut Graph,
        diagnostics: &mut Diagnostics,
    ) -> Result<ConversionCounts> {
        self.nodes.clear();
        self.containers.clear();
        self.counts = ConversionCounts::default();

        let forest = build_forest(document, diagnostics);
        let order = forest.creation_order(diagnostics)?;

        // ========== Containers ==========
        for id in &order {
            let Some(record) = document.group(id) else {
                continue;
            };
            let parent = forest
                .parent(id)
                .and_then(|p| self.containers.get(p))
                .copied();
            let container = Container::new(record.name.clone(), Rectangle::from_corners(record.bounds))
                .with_position(Point2::from(record.position))
                .with_color(record.color);
            match graph.add_container(container, parent) {
                Ok(native) => {
                    self.containers.insert(id.clone(), native);
                    self.counts.containers += 1;
                }
                Err(err) => diagnostics.error(
                    DiagnosticKind::HierarchyMismatch,
                    Some(id),
                    format!("container could not be created: {}", err),
                ),
            }
        }
        check_children(document, &forest, diagnostics);

        // ========== Nodes ==========
        let slots = self.slots(&order, document);
        for (group_id, record) in &slots {
            let owner = group_id.and_then(|g| self.containers.get(g)).copied();
            for (sid, fragment) in record.components.iter() {
                let node = import_node(sid, fragment, self.registry, &self.options, diagnostics);
                let node_id = graph.add_node(node);
                self.counts.nodes += 1;

                if let Some(container) = owner {
                    if let Err(err) = graph.assign_node(node_id, Some(container)) {
                        diagnostics.warn(
                            DiagnosticKind::HierarchyMismatch,
                            Some(sid),
                            format!("left on the canvas: {}", err),
                        );
                    }
                }

                if self.nodes.contains_key(sid) {
                    diagnostics.warn(
                        DiagnosticKind::DuplicateSemanticId,
                        Some(sid),
                        "semantic ID used more than once; connections resolve to the first",
                    );
                } else {
                    self.nodes.insert(sid.to_string(), node_id);
                }
            }
        }

        // ========== Connections ==========
        for pending in collect_connections(&slots, diagnostics) {
            let (Some(from), Some(to)) = (self.nodes.get(&pending.from_id), self.nodes.get(&pending.to_id))
            else {
                let missing = if self.nodes.contains_key(&pending.from_id) {
                    &pending.to_id
                } else {
                    &pending.from_id
                };
                diagnostics.warn(
                    DiagnosticKind::UnresolvedEndpoint,
                    Some(&pending.describe()),
                    format!("no node with semantic ID '{}'; connection skipped", missing),
                );
                continue;
            };

            match graph.connect(
                PortRef::new(*from, pending.from_port.clone()),
                PortRef::new(*to, pending.to_port.clone()),
            ) {
                Ok(true) => self.counts.connections += 1,
                Ok(false) => log::debug!("Connection already present: {}", pending.describe()),
                Err(err) => {
                    log::debug!("Connect failed: {}", err);
                    let reason = match (graph.get_node(*from), graph.get_node(*to)) {
                        (Some(source), _) if !source.provides_output(&pending.from_port) => {
                            format!("'{}' has no output '{}'", pending.from_id, pending.from_port)
                        }
                        (_, Some(target)) if !target.accepts_input(&pending.to_port) => {
                            format!("'{}' has no input '{}'", pending.to_id, pending.to_port)
                        }
                        _ => "endpoints cannot be connected".to_string(),
                    };
                    diagnostics.warn(
                        DiagnosticKind::MissingPort,
                        Some(&pending.describe()),
                        format!("{}; connection skipped", reason),
                    );
                }
            }
        }

        if self.options.refresh {
            graph.request_recompute();
        }

        log::info!(
            "Imported {} containers, {} nodes, {} connections",
            self.counts.containers,
            self.counts.nodes,
            self.counts.connections
        );
        Ok(self.counts)
    }

    /// Native node created for a semantic ID in the last import
    pub fn node(&self, semantic_id: &str) -> Option<NodeId> {
        self.nodes.get(semantic_id).copied()
    }

    /// Native container created for a document ID in the last import
    pub fn container(&self, id: &str) -> Option<ContainerId> {
        self.containers.get(id).copied()
    }

    pub fn counts(&self) -> ConversionCounts {
        self.counts
    }

    /// Group records in creation order, canvas last
    fn slots<'d>(&self, order: &'d [String], document: &'d Document) -> Vec<(Option<&'d String>, &'d GroupRecord)> {
        let mut slots: Vec<(Option<&String>, &GroupRecord)> = order
            .iter()
            .filter_map(|id| document.group(id).map(|record| (Some(id), record)))
            .collect();
        if let Some(canvas) = document.canvas() {
            slots.push((None, canvas));
        }
        slots
    }
}

/// Import a document into `graph` and report the outcome
///
/// A cyclic hierarchy gives a failed report and leaves the graph untouched.
pub fn import_graph<R>(
    document: &Document,
    graph: &mut Graph,
    registry: &R,
    options: &ImportOptions,
) -> ConversionReport
where
    R: NodeTypeRegistry + ?Sized,
{
    let mut diagnostics = Diagnostics::new();
    let mut importer = Importer::new(registry, options.clone());
    match importer.import(document, graph, &mut diagnostics) {
        Ok(counts) => ConversionReport::success(counts, diagnostics),
        Err(err) => ConversionReport::failed(err.to_string(), diagnostics),
    }
}

/// Container forest keyed by document IDs
///
/// `"canvas"` and null parents both mean top level. Repeated group IDs keep
/// the first record.
pub fn build_forest(document: &Document, diagnostics: &mut Diagnostics) -> ContainerForest<String> {
    let mut forest = ContainerForest::new();
    let mut seen = HashSet::new();
    for (id, record) in document.groups.iter() {
        if id == CANVAS_ID {
            continue;
        }
        if !seen.insert(id) {
            diagnostics.warn(
                DiagnosticKind::DuplicateSemanticId,
                Some(id),
                "group ID used more than once; later record ignored",
            );
            continue;
        }
        let parent = record
            .parent
            .as_deref()
            .filter(|p| *p != CANVAS_ID)
            .map(str::to_string);
        forest.insert(id.to_string(), parent);
    }
    forest
}

/// Warn where a group's `children` list disagrees with the children's `parent`
fn check_children(document: &Document, forest: &ContainerForest<String>, diagnostics: &mut Diagnostics) {
    for id in forest.ids() {
        let Some(record) = document.group(id) else {
            continue;
        };
        for child in &record.children {
            if forest.declared_parent(child) != Some(id) {
                diagnostics.warn(
                    DiagnosticKind::HierarchyMismatch,
                    Some(id),
                    format!("lists '{}' as a child, but '{}' does not name it as parent", child, child),
                );
            }
        }
    }
}

/// Every connection named by group records or port lists, deduplicated
fn collect_connections(
    slots: &[(Option<&String>, &GroupRecord)],
    diagnostics: &mut Diagnostics,
) -> Vec<PendingConnection> {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();
    let mut push = |conn: PendingConnection| {
        if seen.insert(conn.clone()) {
            pending.push(conn);
        }
    };

    for (_, record) in slots {
        for conn in &record.connections {
            match (parse_endpoint(&conn.from), parse_endpoint(&conn.to)) {
                (Some(from), Some(to)) => push(PendingConnection {
                    from_id: from.id.to_string(),
                    from_port: from.port.to_string(),
                    to_id: to.id.to_string(),
                    to_port: to.port.to_string(),
                }),
                _ => diagnostics.warn(
                    DiagnosticKind::MalformedConnection,
                    Some(&format!("{} -> {}", conn.from, conn.to)),
                    "expected '<path>:<port>' on both sides; connection skipped",
                ),
            }
        }
    }

    // Port lists name the same edges from each end
    for (_, record) in slots {
        for (sid, fragment) in record.components.iter() {
            let sides = [(&fragment.inputs, true), (&fragment.outputs, false)];
            for (ports, is_input) in sides {
                let Some(ports) = ports else {
                    continue;
                };
                for (port, port_fragment) in ports.iter() {
                    for reference in &port_fragment.connections {
                        let Some(peer) = parse_endpoint(reference) else {
                            diagnostics.warn(
                                DiagnosticKind::MalformedConnection,
                                Some(sid),
                                format!("port '{}': bad reference '{}'", port, reference),
                            );
                            continue;
                        };
                        let (peer_id, peer_port) = (peer.id.to_string(), peer.port.to_string());
                        push(if is_input {
                            PendingConnection {
                                from_id: peer_id,
                                from_port: peer_port,
                                to_id: sid.to_string(),
                                to_port: port.to_string(),
                            }
                        } else {
                            PendingConnection {
                                from_id: sid.to_string(),
                                from_port: port.to_string(),
                                to_id: peer_id,
                                to_port: peer_port,
                            }
                        });
                    }
                }
            }
        }
    }

    pending
}
