use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::NodeValue;

/// One data-shape operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataHandling {
    Graft,
    Flatten,
    Simplify,
    Reverse,
}

impl DataHandling {
    /// Canonical application order
    pub const ALL: [DataHandling; 4] = [
        DataHandling::Graft,
        DataHandling::Flatten,
        DataHandling::Simplify,
        DataHandling::Reverse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataHandling::Graft => "graft",
            DataHandling::Flatten => "flatten",
            DataHandling::Simplify => "simplify",
            DataHandling::Reverse => "reverse",
        }
    }

    /// Apply this single operation
    pub fn apply(&self, value: &NodeValue) -> NodeValue {
        match self {
            DataHandling::Graft => graft(value),
            DataHandling::Flatten => flatten(value),
            DataHandling::Simplify => simplify(value),
            DataHandling::Reverse => reverse(value),
        }
    }
}

impl fmt::Display for DataHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataHandling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graft" => Ok(DataHandling::Graft),
            "flatten" => Ok(DataHandling::Flatten),
            "simplify" => Ok(DataHandling::Simplify),
            "reverse" => Ok(DataHandling::Reverse),
            other => Err(format!("Unknown data handling: {}", other)),
        }
    }
}

/// Set of operations declared on a port
///
/// Every member is a flag: inserting an operation twice has no effect, and
/// `reverse` in particular is applied at most once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataHandlingSet {
    pub graft: bool,
    pub flatten: bool,
    pub simplify: bool,
    pub reverse: bool,
}

impl DataHandlingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document names, returning the set and any names not recognised
    pub fn parse<I, S>(names: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        let mut unknown = Vec::new();
        for name in names {
            match name.as_ref().parse::<DataHandling>() {
                Ok(op) => set.insert(op),
                Err(_) => unknown.push(name.as_ref().to_string()),
            }
        }
        (set, unknown)
    }

    pub fn insert(&mut self, op: DataHandling) {
        *self.flag_mut(op) = true;
    }

    pub fn remove(&mut self, op: DataHandling) {
        *self.flag_mut(op) = false;
    }

    pub fn contains(&self, op: DataHandling) -> bool {
        match op {
            DataHandling::Graft => self.graft,
            DataHandling::Flatten => self.flatten,
            DataHandling::Simplify => self.simplify,
            DataHandling::Reverse => self.reverse,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.graft || self.flatten || self.simplify || self.reverse)
    }

    /// Members in canonical order
    pub fn ops(&self) -> Vec<DataHandling> {
        DataHandling::ALL
            .into_iter()
            .filter(|op| self.contains(*op))
            .collect()
    }

    /// Member names in canonical order, as written to documents
    pub fn names(&self) -> Vec<String> {
        self.ops().iter().map(|op| op.as_str().to_string()).collect()
    }

    /// Reshape a value by every member, in canonical order
    pub fn apply(&self, value: &NodeValue) -> NodeValue {
        self.ops()
            .iter()
            .fold(value.clone(), |acc, op| op.apply(&acc))
    }

    fn flag_mut(&mut self, op: DataHandling) -> &mut bool {
        match op {
            DataHandling::Graft => &mut self.graft,
            DataHandling::Flatten => &mut self.flatten,
            DataHandling::Simplify => &mut self.simplify,
            DataHandling::Reverse => &mut self.reverse,
        }
    }
}

impl FromIterator<DataHandling> for DataHandlingSet {
    fn from_iter<T: IntoIterator<Item = DataHandling>>(iter: T) -> Self {
        let mut set = Self::new();
        for op in iter {
            set.insert(op);
        }
        set
    }
}

// ========== Operations ==========

/// Splice every inner sequence up one level; other items pass through
pub fn graft(value: &NodeValue) -> NodeValue {
    match value {
        NodeValue::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    NodeValue::Sequence(inner) => out.extend(inner.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            NodeValue::Sequence(out)
        }
        other => other.clone(),
    }
}

/// Collect every leaf into one flat sequence, depth-first
///
/// A single item is not a sequence and is returned unchanged.
pub fn flatten(value: &NodeValue) -> NodeValue {
    match value {
        NodeValue::Sequence(_) => {
            let mut out = Vec::new();
            collect_leaves(value, &mut out);
            NodeValue::Sequence(out)
        }
        other => other.clone(),
    }
}

fn collect_leaves(value: &NodeValue, out: &mut Vec<NodeValue>) {
    match value {
        NodeValue::Sequence(items) => {
            for item in items {
                collect_leaves(item, out);
            }
        }
        leaf => out.push(leaf.clone()),
    }
}

/// Unwrap a one-element sequence
pub fn simplify(value: &NodeValue) -> NodeValue {
    match value {
        NodeValue::Sequence(items) if items.len() == 1 => items[0].clone(),
        other => other.clone(),
    }
}

/// Reverse the top-level order only
pub fn reverse(value: &NodeValue) -> NodeValue {
    match value {
        NodeValue::Sequence(items) => NodeValue::Sequence(items.iter().rev().cloned().collect()),
        other => other.clone(),
    }
}

// ========== Connections ==========

/// Reshape a value travelling from an output port into an input port
pub fn apply_connection(
    value: &NodeValue,
    source: &DataHandlingSet,
    target: &DataHandlingSet,
) -> NodeValue {
    target.apply(&source.apply(value))
}

/// Suggest the operations needed to fit source data to a target's shape
pub fn infer_handling(source: &NodeValue, target: &NodeValue) -> DataHandlingSet {
    let mut set = DataHandlingSet::new();
    if source.depth() > target.depth() {
        set.insert(DataHandling::Flatten);
    } else if source.depth() < target.depth() {
        set.insert(DataHandling::Graft);
    }
    if source.item_count() > 1 && target.item_count() == 1 {
        set.insert(DataHandling::Simplify);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ints(values: &[i64]) -> NodeValue {
        NodeValue::Sequence(values.iter().map(|v| NodeValue::Integer(*v)).collect())
    }

    fn seq(items: Vec<NodeValue>) -> NodeValue {
        NodeValue::Sequence(items)
    }

    fn leaf_count(value: &NodeValue) -> usize {
        match value {
            NodeValue::Sequence(items) => items.iter().map(leaf_count).sum(),
            _ => 1,
        }
    }

    #[test]
    fn test_graft_denests_one_level() {
        let value = seq(vec![ints(&[1, 2]), ints(&[3])]);
        assert_eq!(graft(&value), ints(&[1, 2, 3]));

        let mixed = seq(vec![NodeValue::Integer(0), seq(vec![ints(&[1])])]);
        assert_eq!(graft(&mixed), seq(vec![NodeValue::Integer(0), ints(&[1])]));
    }

    #[test]
    fn test_flatten() {
        let value = seq(vec![ints(&[1]), seq(vec![ints(&[2, 3]), NodeValue::Integer(4)])]);
        assert_eq!(flatten(&value), ints(&[1, 2, 3, 4]));
        assert_eq!(flatten(&NodeValue::Integer(7)), NodeValue::Integer(7));
    }

    #[test]
    fn test_simplify() {
        assert_eq!(simplify(&ints(&[5])), NodeValue::Integer(5));
        assert_eq!(simplify(&ints(&[5, 6])), ints(&[5, 6]));
        assert_eq!(simplify(&ints(&[])), ints(&[]));
    }

    #[test]
    fn test_reverse_top_level_only() {
        let value = seq(vec![ints(&[1, 2]), NodeValue::Integer(3)]);
        assert_eq!(reverse(&value), seq(vec![NodeValue::Integer(3), ints(&[1, 2])]));
    }

    #[test]
    fn test_set_parse_and_names() {
        let (set, unknown) = DataHandlingSet::parse(["Reverse", "graft", "shift", "reverse"]);
        assert!(set.graft && set.reverse);
        assert!(!set.flatten && !set.simplify);
        assert_eq!(unknown, vec!["shift".to_string()]);
        assert_eq!(set.names(), vec!["graft", "reverse"]);
    }

    #[test]
    fn test_reverse_is_a_flag() {
        let set: DataHandlingSet = [DataHandling::Reverse, DataHandling::Reverse]
            .into_iter()
            .collect();
        assert_eq!(set.apply(&ints(&[1, 2, 3])), ints(&[3, 2, 1]));
    }

    #[test]
    fn test_set_applies_in_canonical_order() {
        let set: DataHandlingSet = [DataHandling::Simplify, DataHandling::Flatten]
            .into_iter()
            .collect();
        let value = seq(vec![seq(vec![ints(&[9])])]);
        // flatten first gives [9], then simplify unwraps it
        assert_eq!(set.apply(&value), NodeValue::Integer(9));
    }

    #[test]
    fn test_apply_connection() {
        let source: DataHandlingSet = [DataHandling::Flatten].into_iter().collect();
        let target: DataHandlingSet = [DataHandling::Reverse].into_iter().collect();
        let value = seq(vec![ints(&[1, 2]), ints(&[3])]);
        assert_eq!(apply_connection(&value, &source, &target), ints(&[3, 2, 1]));
    }

    #[test]
    fn test_infer_handling() {
        let tree = seq(vec![ints(&[1, 2]), ints(&[3])]);
        let list = ints(&[1, 2, 3]);
        let single = NodeValue::Integer(1);

        assert_eq!(infer_handling(&tree, &list).names(), vec!["flatten"]);
        assert_eq!(infer_handling(&list, &tree).names(), vec!["graft"]);
        assert_eq!(infer_handling(&list, &single).names(), vec!["flatten", "simplify"]);
        assert!(infer_handling(&list, &list).is_empty());
    }

    fn nested_value() -> impl Strategy<Value = NodeValue> {
        let leaf = any::<i64>().prop_map(NodeValue::Integer);
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop::collection::vec(inner, 0..6).prop_map(NodeValue::Sequence)
        })
    }

    proptest! {
        #[test]
        fn test_flatten_is_idempotent(value in nested_value()) {
            let once = flatten(&value);
            prop_assert_eq!(flatten(&once), once);
        }

        #[test]
        fn test_double_reverse_is_identity(value in nested_value()) {
            prop_assert_eq!(reverse(&reverse(&value)), value);
        }

        #[test]
        fn test_shape_ops_keep_leaves(value in nested_value()) {
            prop_assert_eq!(leaf_count(&graft(&value)), leaf_count(&value));
            prop_assert_eq!(leaf_count(&flatten(&value)), leaf_count(&value));
            prop_assert!(flatten(&value).depth() <= 1);
        }

        #[test]
        fn test_graft_removes_one_level(value in nested_value()) {
            let depth = value.depth();
            let expected = if depth >= 2 { depth - 1 } else { depth };
            prop_assert_eq!(graft(&value).depth(), expected);
        }

        #[test]
        fn test_simplify_single(item in any::<i64>()) {
            let wrapped = NodeValue::Sequence(vec![NodeValue::Integer(item)]);
            prop_assert_eq!(simplify(&wrapped), NodeValue::Integer(item));
        }
    }
}
