use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::node::{NodeId, Point2};

pub type ContainerId = Ulid;

/// A named, bounded group of nodes and nested containers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Container {
    /// Unique identifier (sortable, timestamp-based)
    pub id: ContainerId,

    /// Display name, used to derive the document ID
    pub name: String,

    pub position: Point2,

    /// Rectangle the group occupies on the canvas
    pub bounds: Rectangle,

    /// RGBA
    pub color: [u8; 4],

    /// Directly owned nodes, in insertion order
    pub nodes: Vec<NodeId>,

    /// Directly nested containers, in insertion order
    pub children: Vec<ContainerId>,
}

pub const DEFAULT_COLOR: [u8; 4] = [150, 150, 150, 80];

impl Container {
    /// Create a new empty container
    pub fn new(name: impl Into<String>, bounds: Rectangle) -> Self {
        Self {
            id: Ulid::new(),
            name: name.into(),
            position: Point2::new(bounds.x, bounds.y),
            bounds,
            color: DEFAULT_COLOR,
            nodes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_position(mut self, position: Point2) -> Self {
        self.position = position;
        self
    }

    /// Add a directly owned node
    pub fn add_node(&mut self, node_id: NodeId) {
        if !self.nodes.contains(&node_id) {
            self.nodes.push(node_id);
        }
    }

    pub fn remove_node(&mut self, node_id: NodeId) {
        self.nodes.retain(|id| *id != node_id);
    }

    /// Add a nested container
    pub fn add_child(&mut self, child_id: ContainerId) {
        if !self.children.contains(&child_id) {
            self.children.push(child_id);
        }
    }

    pub fn owns_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains(&node_id)
    }
}

/// Rectangle representing position and size on canvas
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    /// Create a new rectangle
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners, in any order
    pub fn from_corners([x0, y0, x1, y1]: [f32; 4]) -> Self {
        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    /// Corners as [x0, y0, x1, y1]
    pub fn corners(&self) -> [f32; 4] {
        [self.x, self.y, self.right(), self.bottom()]
    }

    /// Get the right edge of the rectangle
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom edge of the rectangle
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_corners() {
        let rect = Rectangle::from_corners([100.0, 50.0, 0.0, 0.0]);
        assert_eq!(rect, Rectangle::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(rect.corners(), [0.0, 0.0, 100.0, 50.0]);
    }

    #[test]
    fn test_container_membership() {
        let mut group = Container::new("Walls", Rectangle::new(0.0, 0.0, 200.0, 100.0));
        let node = Ulid::new();
        group.add_node(node);
        group.add_node(node);
        assert_eq!(group.nodes.len(), 1);
        assert!(group.owns_node(node));

        group.remove_node(node);
        assert!(!group.owns_node(node));

        let child = Ulid::new();
        group.add_child(child);
        group.add_child(child);
        assert_eq!(group.children, vec![child]);
        assert_eq!(group.position, Point2::new(0.0, 0.0));
    }
}
