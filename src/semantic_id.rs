/// Semantic ID registry for nodes and containers
/// Produces short, human-readable names like "point", "point_2", "add"
/// that are unique for the lifetime of one export or import session

use std::collections::{HashMap, HashSet};
use ulid::Ulid;

#[derive(Debug, Clone, Default)]
pub struct SemanticIdRegistry {
    /// Native identity -> assigned name (memoized per session)
    assigned: HashMap<Ulid, String>,
    /// Base name -> number of times it has been requested
    counts: HashMap<String, u32>,
    /// Every name handed out or reserved this session
    taken: HashSet<String>,
    /// Names that survive `reset`
    reserved: HashSet<String>,
}

impl SemanticIdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that never hands out the given names
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.reserve(name);
        }
        registry
    }

    /// Keep a name out of circulation, across resets as well
    pub fn reserve(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.taken.insert(name.clone());
        self.reserved.insert(name);
    }

    /// Get the semantic ID for a native identity, assigning one on first use
    pub fn id_for(&mut self, id: Ulid, display_name: Option<&str>, type_name: &str) -> String {
        if let Some(existing) = self.assigned.get(&id) {
            return existing.clone();
        }

        let base = base_name(display_name, type_name);
        let semantic_id = self.next_free(&base);

        log::debug!("Assigned semantic id '{}' to {}", semantic_id, id);
        self.taken.insert(semantic_id.clone());
        self.assigned.insert(id, semantic_id.clone());
        semantic_id
    }

    /// Look up an already-assigned ID without creating one
    pub fn get(&self, id: Ulid) -> Option<&str> {
        self.assigned.get(&id).map(String::as_str)
    }

    /// Number of identities assigned this session
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// Forget every assignment; reserved names stay reserved
    pub fn reset(&mut self) {
        self.assigned.clear();
        self.counts.clear();
        self.taken = self.reserved.clone();
    }

    fn next_free(&mut self, base: &str) -> String {
        loop {
            let count = self.counts.entry(base.to_string()).or_insert(0);
            *count += 1;
            let candidate = if *count == 1 {
                base.to_string()
            } else {
                format!("{}_{}", base, count)
            };
            if !self.taken.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Derive the base name from a display name, falling back to the type name
pub fn base_name(display_name: Option<&str>, type_name: &str) -> String {
    let source = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(type_name);

    let base: String = source
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | ':' | '/' => '_',
            other => other,
        })
        .collect();

    if base.is_empty() {
        "node".to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_suffixes() {
        let mut registry = SemanticIdRegistry::new();
        let ids: Vec<String> = (0..4)
            .map(|_| registry.id_for(Ulid::new(), Some("Point"), "Param_Point"))
            .collect();
        assert_eq!(ids, vec!["point", "point_2", "point_3", "point_4"]);
    }

    #[test]
    fn test_memoized_per_identity() {
        let mut registry = SemanticIdRegistry::new();
        let id = Ulid::new();
        let first = registry.id_for(id, Some("Number Slider"), "Slider");
        let second = registry.id_for(id, Some("Number Slider"), "Slider");
        assert_eq!(first, "number_slider");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_falls_back_to_type_name() {
        let mut registry = SemanticIdRegistry::new();
        assert_eq!(registry.id_for(Ulid::new(), None, "Addition"), "addition");
        assert_eq!(registry.id_for(Ulid::new(), Some("  "), "Addition"), "addition_2");
    }

    #[test]
    fn test_separators_are_replaced() {
        assert_eq!(base_name(Some("a:b/c d"), "X"), "a_b_c_d");
    }

    #[test]
    fn test_collision_with_literal_suffix() {
        let mut registry = SemanticIdRegistry::new();
        assert_eq!(registry.id_for(Ulid::new(), Some("point_2"), "P"), "point_2");
        assert_eq!(registry.id_for(Ulid::new(), Some("point"), "P"), "point");
        // "point_2" is taken, so the counter moves on
        assert_eq!(registry.id_for(Ulid::new(), Some("point"), "P"), "point_3");
    }

    #[test]
    fn test_reset_clears_session() {
        let mut registry = SemanticIdRegistry::with_reserved(["canvas"]);
        let id = Ulid::new();
        registry.id_for(id, Some("point"), "P");
        registry.reset();

        assert!(registry.get(id).is_none());
        assert_eq!(registry.id_for(Ulid::new(), Some("point"), "P"), "point");
        assert_eq!(registry.id_for(Ulid::new(), Some("Canvas"), "Group"), "canvas_2");
    }
}
