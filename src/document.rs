use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

use crate::error::Result;

/// ID of the implicit root container
pub const CANVAS_ID: &str = "canvas";

/// Separator between a node path and a port name
pub const PORT_SEPARATOR: char = ':';

/// Separator between path components
pub const PATH_SEPARATOR: char = '/';

/// String-keyed map that keeps insertion order
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Entries<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.0.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for Entries<V> {
    fn from_iter<T: IntoIterator<Item = (String, V)>>(iter: T) -> Self {
        let mut entries = Self::new();
        for (k, v) in iter {
            entries.insert(k, v);
        }
        entries
    }
}

impl<V: Serialize> Serialize for Entries<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct EntriesVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
    type Value = Entries<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        // Duplicate keys are kept so the importer can report them
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((k, v)) = access.next_entry::<String, V>()? {
            entries.push((k, v));
        }
        Ok(Entries(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

// ========== Schema ==========

/// Whole document
///
/// ```text
/// { "groups": { "<id>": { name, parent, children, position, bounds, color,
///                         components: { "<semantic id>": fragment },
///                         connections: [ { from, to } ] },
///               "canvas": { ..., parent: null } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub groups: Entries<GroupRecord>,
}

/// One container (or the canvas) with its nodes and owned connections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupRecord {
    pub name: String,
    /// Parent container ID, `"canvas"` for top-level groups, null for the canvas
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub position: [f32; 2],
    /// [x0, y0, x1, y1]
    pub bounds: [f32; 4],
    /// RGBA
    pub color: [u8; 4],
    pub components: Entries<NodeFragment>,
    pub connections: Vec<ConnectionRecord>,
}

/// One node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFragment {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub position: [f32; 2],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Entries<PortFragment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Entries<PortFragment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl NodeFragment {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            position: [0.0, 0.0],
            value_type: None,
            value: None,
            inputs: None,
            outputs: None,
            script: None,
        }
    }
}

/// One port of a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortFragment {
    #[serde(default)]
    pub data_handling: Vec<String>,

    /// `"<semantic id>:<port>"` of each source (inputs) or recipient (outputs)
    #[serde(default)]
    pub connections: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    /// Stored value of an unconnected input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Json>,
}

/// Compact connection entry, each side `"<path>:<port>"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub from: String,
    pub to: String,
}

impl ConnectionRecord {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

// ========== Endpoint references ==========

/// Parsed `"<group>/<group>/<id>:<port>"` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint<'a> {
    /// Enclosing container IDs, outermost first
    pub path: Vec<&'a str>,
    /// Semantic ID of the node
    pub id: &'a str,
    pub port: &'a str,
}

/// Split a reference into path, node ID and port
///
/// The port starts after the first `:`; the node ID is the last `/`
/// component before it.
pub fn parse_endpoint(reference: &str) -> Option<Endpoint<'_>> {
    let (path, port) = reference.split_once(PORT_SEPARATOR)?;
    let mut parts: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let id = parts.pop()?.trim();
    let port = port.trim();
    if id.is_empty() || port.is_empty() {
        return None;
    }
    Some(Endpoint {
        path: parts,
        id,
        port,
    })
}

/// Build a reference from container path, node ID and port
pub fn format_endpoint(path: &[String], id: &str, port: &str) -> String {
    let mut out = String::new();
    for group in path {
        out.push_str(group);
        out.push(PATH_SEPARATOR);
    }
    out.push_str(id);
    out.push(PORT_SEPARATOR);
    out.push_str(port);
    out
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document; missing `groups` or node `type` is an error
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn canvas(&self) -> Option<&GroupRecord> {
        self.groups.get(CANVAS_ID)
    }

    pub fn group(&self, id: &str) -> Option<&GroupRecord> {
        self.groups.get(id)
    }

    /// Container IDs, excluding the canvas, in document order
    pub fn container_ids(&self) -> Vec<&str> {
        self.groups.keys().filter(|k| *k != CANVAS_ID).collect()
    }

    pub fn node_count(&self) -> usize {
        self.groups.values().map(|g| g.components.len()).sum()
    }

    pub fn connection_count(&self) -> usize {
        self.groups.values().map(|g| g.connections.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConversionError;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_endpoint() {
        let ep = parse_endpoint("walls/frame/point_2:Point").unwrap();
        assert_eq!(ep.path, vec!["walls", "frame"]);
        assert_eq!(ep.id, "point_2");
        assert_eq!(ep.port, "Point");

        let ep = parse_endpoint("add:Result").unwrap();
        assert!(ep.path.is_empty());
        assert_eq!(ep.id, "add");

        assert!(parse_endpoint("no_port").is_none());
        assert!(parse_endpoint(":Result").is_none());
        assert!(parse_endpoint("walls/:Result").is_none());
        assert!(parse_endpoint("add:").is_none());
    }

    #[test]
    fn test_format_endpoint() {
        let path = vec!["walls".to_string(), "frame".to_string()];
        assert_eq!(format_endpoint(&path, "point", "Point"), "walls/frame/point:Point");
        assert_eq!(format_endpoint(&[], "add", "A"), "add:A");
    }

    #[test]
    fn test_entries_keep_order() {
        let json = r#"{"z": 1, "a": 2, "m": 3}"#;
        let entries: Entries<i32> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(serde_json::to_string(&entries).unwrap(), r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_entries_insert_replaces() {
        let mut entries = Entries::new();
        entries.insert("a", 1);
        entries.insert("b", 2);
        entries.insert("a", 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.get("a"), Some(&3));
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_minimal_document() {
        let doc = Document::from_json(
            r#"{"groups": {"canvas": {"components": {"n": {"type": "Number", "value": 2}}}}}"#,
        )
        .unwrap();
        let canvas = doc.canvas().unwrap();
        let fragment = canvas.components.get("n").unwrap();
        assert_eq!(fragment.type_name, "Number");
        assert_eq!(fragment.position, [0.0, 0.0]);
        assert_eq!(canvas.parent, None);
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_structural_errors() {
        assert_matches!(
            Document::from_json(r#"{"nodes": {}}"#),
            Err(ConversionError::Structural(_))
        );
        assert_matches!(
            Document::from_json(r#"{"groups": {"canvas": {"components": {"n": {"position": [0, 0]}}}}}"#),
            Err(ConversionError::Structural(_))
        );
    }

    #[test]
    fn test_fragment_skips_empty_fields() {
        let mut fragment = NodeFragment::new("Addition");
        fragment.position = [1.0, 2.0];
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Addition", "position": [1.0, 2.0]}));
    }
}
