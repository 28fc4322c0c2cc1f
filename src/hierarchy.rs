use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{ConversionError, Result};

/// Declared parent of each container, keyed by native or document IDs
#[derive(Debug, Clone)]
pub struct ContainerForest<K> {
    /// Insertion order, used to break depth ties
    order: Vec<K>,
    /// Declared parent of every container (`None` = top level)
    parents: HashMap<K, Option<K>>,
}

impl<K> Default for ContainerForest<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            parents: HashMap::new(),
        }
    }
}

impl<K> ContainerForest<K>
where
    K: Eq + Hash + Clone + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a container and its parent; re-inserting updates the parent
    pub fn insert(&mut self, id: K, parent: Option<K>) {
        if self.parents.insert(id.clone(), parent).is_none() {
            self.order.push(id);
        }
    }

    pub fn contains(&self, id: &K) -> bool {
        self.parents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Containers in insertion order
    pub fn ids(&self) -> &[K] {
        &self.order
    }

    /// Declared parent, whether or not it exists in the forest
    pub fn declared_parent(&self, id: &K) -> Option<&K> {
        self.parents.get(id).and_then(|p| p.as_ref())
    }

    /// Parent, if it exists in the forest
    pub fn parent(&self, id: &K) -> Option<&K> {
        self.declared_parent(id).filter(|p| self.contains(p))
    }

    /// Containers whose declared parent is not in the forest
    pub fn dangling(&self) -> Vec<(K, K)> {
        self.order
            .iter()
            .filter_map(|id| match self.declared_parent(id) {
                Some(parent) if !self.contains(parent) => Some((id.clone(), parent.clone())),
                _ => None,
            })
            .collect()
    }

    /// Direct children in insertion order
    pub fn children(&self, id: &K) -> Vec<K> {
        self.order
            .iter()
            .filter(|child| self.parent(child) == Some(id))
            .cloned()
            .collect()
    }

    /// Containers with no resolvable parent
    pub fn roots(&self) -> Vec<K> {
        self.order
            .iter()
            .filter(|id| self.parent(id).is_none())
            .cloned()
            .collect()
    }

    /// Number of ancestor containers above `id`
    ///
    /// A dangling parent reference ends the walk, so such a container sits
    /// at depth 0. A loop in parent references is an error.
    pub fn depth_of(&self, id: &K) -> Result<usize> {
        let mut depth = 0;
        let mut seen = HashSet::new();
        let mut current = id;
        seen.insert(current);
        while let Some(parent) = self.parent(current) {
            if !seen.insert(parent) {
                return Err(ConversionError::HierarchyCycle(parent.to_string()));
            }
            depth += 1;
            current = parent;
        }
        Ok(depth)
    }

    /// Check the whole forest for parent loops
    pub fn validate(&self) -> Result<()> {
        for id in &self.order {
            self.depth_of(id)?;
        }
        Ok(())
    }

    /// Containers sorted by depth, shallowest first, ties in insertion order
    ///
    /// Every dangling parent reference is reported once as a warning.
    pub fn creation_order(&self, diagnostics: &mut Diagnostics) -> Result<Vec<K>> {
        for (id, parent) in self.dangling() {
            diagnostics.warn(
                DiagnosticKind::DanglingParent,
                Some(&id.to_string()),
                format!("parent '{}' does not exist; placed at top level", parent),
            );
        }

        let mut keyed = Vec::with_capacity(self.order.len());
        for id in &self.order {
            keyed.push((self.depth_of(id)?, id.clone()));
        }
        // sort_by_key is stable
        keyed.sort_by_key(|(depth, _)| *depth);
        Ok(keyed.into_iter().map(|(_, id)| id).collect())
    }

    /// Ancestor chain from the top level down to `id`, inclusive
    ///
    /// Unknown IDs give an empty chain.
    pub fn chain(&self, id: &K) -> Vec<K> {
        if !self.contains(id) {
            return Vec::new();
        }
        let mut chain = vec![id.clone()];
        let mut seen: HashSet<&K> = HashSet::from([id]);
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Chain for something owned by `owner` (`None` = root)
    pub fn chain_of_owner(&self, owner: Option<&K>) -> Vec<K> {
        owner.map(|o| self.chain(o)).unwrap_or_default()
    }
}

/// Deepest container shared by two root-first ancestor chains
///
/// `None` means the root owns it: one chain is empty, or the chains share
/// no container at all.
pub fn owning_container<K: PartialEq + Clone>(a: &[K], b: &[K]) -> Option<K> {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .last()
        .map(|(x, _)| x.clone())
}

/// Both chains are nested somewhere, yet in different top-level trees
pub fn is_disjoint<K: PartialEq>(a: &[K], b: &[K]) -> bool {
    match (a.first(), b.first()) {
        (Some(x), Some(y)) => x != y,
        _ => false,
    }
}
