//! Property selection: which parts of an object a read should return.

use std::collections::BTreeMap;

/// What is selected below a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectNode {
    /// The property and everything below it.
    All,
    /// Only the given properties of an embedded object.
    Nested(Selection),
}

impl SelectNode {
    /// Selection to apply inside the property, `None` meaning everything.
    pub fn sub_selection(&self) -> Option<&Selection> {
        match self {
            SelectNode::All => None,
            SelectNode::Nested(selection) => Some(selection),
        }
    }
}

/// A tree of selected property indices mirroring the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    nodes: BTreeMap<u32, SelectNode>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a property with everything below it.
    pub fn select(mut self, index: u32) -> Self {
        self.nodes.insert(index, SelectNode::All);
        self
    }

    /// Selects only part of an embedded object property.
    pub fn select_nested(mut self, index: u32, nested: Selection) -> Self {
        self.nodes.insert(index, SelectNode::Nested(nested));
        self
    }

    /// Returns the node for `index`, or `None` when the property is not selected.
    pub fn select_node_or_null(&self, index: u32) -> Option<&SelectNode> {
        self.nodes.get(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<u32> for Selection {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        iter.into_iter().fold(Selection::new(), Selection::select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_selection() {
        let selection = Selection::new()
            .select(1)
            .select_nested(3, Selection::from_iter([2]));

        assert_eq!(selection.select_node_or_null(1), Some(&SelectNode::All));
        assert!(selection.select_node_or_null(2).is_none());

        let nested = selection.select_node_or_null(3).unwrap().sub_selection().unwrap();
        assert!(nested.select_node_or_null(2).is_some());
        assert!(nested.select_node_or_null(1).is_none());
    }
}
