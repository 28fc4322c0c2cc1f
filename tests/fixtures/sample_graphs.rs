// Helper functions to build test graphs with various layouts

#![allow(dead_code)]

use graph_document::{
    Container, ContainerId, DataHandling, Graph, Node, NodeId, NodeTypeRegistry, NodeValue,
    PortRef, PrototypeRegistry, Rectangle,
};

/// Instantiate a built-in node type
pub fn node(registry: &PrototypeRegistry, type_name: &str) -> Node {
    let prototype = registry.resolve(type_name).unwrap();
    registry.instantiate(prototype)
}

pub fn connect(graph: &mut Graph, from: NodeId, from_port: &str, to: NodeId, to_port: &str) {
    graph
        .connect(PortRef::new(from, from_port), PortRef::new(to, to_port))
        .unwrap();
}

pub struct NestedGraph {
    pub graph: Graph,
    pub outer: ContainerId,
    pub inner: ContainerId,
    pub width: NodeId,
    pub height: NodeId,
    pub sum: NodeId,
    pub panel: NodeId,
    pub series: NodeId,
    pub script: NodeId,
}

/// Two nested containers feeding nodes on the canvas
///
/// ```text
/// Outer: Width, Height
///   Inner: Addition (A flattened)
/// canvas: Panel <- Addition, Series (N = 5), Script (x <- Width)
/// ```
pub fn create_nested_graph() -> NestedGraph {
    let registry = PrototypeRegistry::builtin();
    let mut graph = Graph::new();

    let outer = graph
        .add_container(Container::new("Outer", Rectangle::new(0.0, 0.0, 600.0, 400.0)), None)
        .unwrap();
    let inner = graph
        .add_container(
            Container::new("Inner", Rectangle::new(50.0, 50.0, 200.0, 150.0)).with_color([255, 0, 0, 60]),
            Some(outer),
        )
        .unwrap();

    let width = graph.add_node(
        node(&registry, "Number")
            .named("Width")
            .at(10.0, 10.0)
            .with_value(NodeValue::Scalar(3.0)),
    );
    let height = graph.add_node(
        node(&registry, "Number")
            .named("Height")
            .at(10.0, 60.0)
            .with_value(NodeValue::Scalar(4.0)),
    );
    let mut addition = node(&registry, "Addition").at(80.0, 80.0);
    if let Some(port) = addition.input_mut("A") {
        port.data_handling.insert(DataHandling::Flatten);
    }
    let sum = graph.add_node(addition);

    let panel = graph.add_node(node(&registry, "Panel").at(700.0, 80.0));
    let mut series = node(&registry, "Series").at(700.0, 200.0);
    if let Some(port) = series.input_mut("N") {
        port.value = Some(NodeValue::Integer(5));
    }
    let series = graph.add_node(series);
    let script = graph.add_node(
        node(&registry, "Python 3 Script")
            .named("Script")
            .at(700.0, 300.0)
            .with_script("a = x * 2"),
    );

    graph.assign_node(width, Some(outer)).unwrap();
    graph.assign_node(height, Some(outer)).unwrap();
    graph.assign_node(sum, Some(inner)).unwrap();

    connect(&mut graph, width, "Number", sum, "A");
    connect(&mut graph, height, "Number", sum, "B");
    connect(&mut graph, sum, "Result", panel, "Panel");
    connect(&mut graph, width, "Number", script, "x");

    NestedGraph {
        graph,
        outer,
        inner,
        width,
        height,
        sum,
        panel,
        series,
        script,
    }
}

/// `count` unnamed nodes of one type on the canvas
pub fn create_repeated_nodes(type_name: &str, count: usize) -> (Graph, Vec<NodeId>) {
    let registry = PrototypeRegistry::builtin();
    let mut graph = Graph::new();
    let ids = (0..count)
        .map(|i| graph.add_node(node(&registry, type_name).at(i as f32 * 50.0, 0.0)))
        .collect();
    (graph, ids)
}

/// Chain of containers, each nested in the previous one
pub fn create_container_chain(depth: usize) -> (Graph, Vec<ContainerId>) {
    let mut graph = Graph::new();
    let mut chain: Vec<ContainerId> = Vec::new();
    for level in 0..depth {
        let size = 1000.0 - level as f32 * 100.0;
        let container = Container::new(format!("Level {}", level), Rectangle::new(0.0, 0.0, size, size));
        let id = graph.add_container(container, chain.last().copied()).unwrap();
        chain.push(id);
    }
    (graph, chain)
}
