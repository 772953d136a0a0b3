//! Grouped tree structure.
//!
//! A tree is a synthetic root [`GroupNode`] (empty title, depth 0) whose
//! children are ungrouped rows and first-level groups. Group nodes are
//! rebuilt wholesale by every grouping pass; rows are shared with the store.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::store::{Row, RowId};

/// Rebuild-local group identifier.
///
/// Assigned sequentially by each grouping pass, so the same logical group
/// gets a different id after a rebuild. Persistent state keys off
/// [`GroupKey`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) u64);

impl GroupId {
    /// The id of every synthetic root.
    pub const ROOT: Self = Self(0);

    /// Get the raw u64 value of this group ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group-{}", self.0)
    }
}

/// Durable identity of a group: the titles from the top level down to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    /// Key of a top-level group.
    pub fn top_level(title: impl Into<String>) -> Self {
        Self(vec![title.into()])
    }

    /// Key of a group nested under this one.
    pub fn child(&self, title: impl Into<String>) -> Self {
        let mut titles = self.0.clone();
        titles.push(title.into());
        Self(titles)
    }

    /// The titles along the path.
    pub fn titles(&self) -> &[String] {
        &self.0
    }
}

/// A child of a group node.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEntry {
    /// A leaf row.
    Row(Arc<Row>),
    /// A nested group.
    Group(GroupNode),
}

impl TreeEntry {
    /// The group, if this entry is one.
    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            Self::Group(group) => Some(group),
            Self::Row(_) => None,
        }
    }

    /// The row, if this entry is one.
    pub fn as_row(&self) -> Option<&Arc<Row>> {
        match self {
            Self::Row(row) => Some(row),
            Self::Group(_) => None,
        }
    }
}

/// A synthetic aggregation node over rows sharing a group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    /// Display title (the shared key value).
    pub title: String,
    /// Rebuild-local id.
    pub group_id: GroupId,
    /// Durable identity.
    pub key: GroupKey,
    /// Nesting depth; the root is 0 and first-level groups are 1.
    pub depth: usize,
    /// Whether descendants are hidden from the flattened list.
    pub is_collapsed: bool,
    /// All leaves selected.
    pub is_selected: bool,
    /// Some but not all leaves selected.
    pub is_indeterminate: bool,
    /// Leaf rows in the subtree.
    pub child_count: usize,
    /// Group nodes in the subtree, excluding this one.
    pub group_count: usize,
    /// Selected leaf rows in the subtree.
    pub selected_count: usize,
    /// Rows and nested groups.
    pub children: Vec<TreeEntry>,
}

impl GroupNode {
    /// Creates the synthetic root over `children` and computes its counts.
    pub fn root(children: Vec<TreeEntry>) -> Self {
        let mut root = Self::new(String::new(), GroupId::ROOT, GroupKey::default(), 0, children);
        root.recompute_counts();
        root
    }

    pub(crate) fn new(
        title: String,
        group_id: GroupId,
        key: GroupKey,
        depth: usize,
        children: Vec<TreeEntry>,
    ) -> Self {
        Self {
            title,
            group_id,
            key,
            depth,
            is_collapsed: false,
            is_selected: false,
            is_indeterminate: false,
            child_count: 0,
            group_count: 0,
            selected_count: 0,
            children,
        }
    }

    /// Whether this is the synthetic root.
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Group-by level index of this node (`None` for the root).
    pub fn level(&self) -> Option<usize> {
        self.depth.checked_sub(1)
    }

    /// Recomputes `child_count` and `group_count` for the whole subtree.
    pub fn recompute_counts(&mut self) -> (usize, usize) {
        let mut leaves = 0;
        let mut groups = 0;
        for child in &mut self.children {
            match child {
                TreeEntry::Row(_) => leaves += 1,
                TreeEntry::Group(group) => {
                    let (child_leaves, child_groups) = group.recompute_counts();
                    leaves += child_leaves;
                    groups += child_groups + 1;
                }
            }
        }
        self.child_count = leaves;
        self.group_count = groups;
        (leaves, groups)
    }

    /// Recomputes selection counts and tri-state flags for the whole subtree.
    ///
    /// Returns the selected leaf count of this node.
    pub fn recompute_selection(&mut self, selected: &HashSet<RowId>) -> usize {
        let mut count = 0;
        for child in &mut self.children {
            match child {
                TreeEntry::Row(row) => {
                    if selected.contains(&row.id) {
                        count += 1;
                    }
                }
                TreeEntry::Group(group) => count += group.recompute_selection(selected),
            }
        }
        self.selected_count = count;
        self.is_selected = self.child_count > 0 && count == self.child_count;
        self.is_indeterminate = count > 0 && count < self.child_count;
        count
    }

    /// Leaf rows of the subtree in tree order.
    pub fn leaves(&self) -> Vec<&Arc<Row>> {
        let mut out = Vec::with_capacity(self.child_count);
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Arc<Row>>) {
        for child in &self.children {
            match child {
                TreeEntry::Row(row) => out.push(row),
                TreeEntry::Group(group) => group.collect_leaves(out),
            }
        }
    }

    /// Ids of the leaf rows in tree order.
    pub fn leaf_ids(&self) -> Vec<RowId> {
        self.leaves().into_iter().map(|row| row.id.clone()).collect()
    }

    /// Finds a group in the subtree (including this node) by id.
    pub fn find_group(&self, id: GroupId) -> Option<&GroupNode> {
        if self.group_id == id {
            return Some(self);
        }
        self.children
            .iter()
            .filter_map(TreeEntry::as_group)
            .find_map(|group| group.find_group(id))
    }

    /// Mutable variant of [`find_group`](Self::find_group).
    pub fn find_group_mut(&mut self, id: GroupId) -> Option<&mut GroupNode> {
        if self.group_id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| match child {
            TreeEntry::Group(group) => group.find_group_mut(id),
            TreeEntry::Row(_) => None,
        })
    }

    /// Visits every group below this node, depth-first, parents first.
    pub fn for_each_group_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut GroupNode),
    {
        for child in &mut self.children {
            if let TreeEntry::Group(group) = child {
                f(group);
                group.for_each_group_mut(f);
            }
        }
    }

    /// Visits every group below this node, depth-first, parents first.
    pub fn for_each_group<F>(&self, f: &mut F)
    where
        F: FnMut(&GroupNode),
    {
        for child in &self.children {
            if let TreeEntry::Group(group) = child {
                f(group);
                group.for_each_group(f);
            }
        }
    }

    /// Number of groups at each group-by level below this node.
    pub fn groups_per_level(&self, levels: usize) -> Vec<usize> {
        let mut counts = vec![0; levels];
        self.for_each_group(&mut |group| {
            if let Some(slot) = group.level().and_then(|level| counts.get_mut(level)) {
                *slot += 1;
            }
        });
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: &str) -> TreeEntry {
        TreeEntry::Row(Arc::new(Row::new(id, json!({}))))
    }

    fn group(id: u64, title: &str, depth: usize, children: Vec<TreeEntry>) -> TreeEntry {
        TreeEntry::Group(GroupNode::new(
            title.to_string(),
            GroupId(id),
            GroupKey::top_level(title),
            depth,
            children,
        ))
    }

    fn sample() -> GroupNode {
        GroupNode::root(vec![
            row("loose"),
            group(1, "A", 1, vec![group(2, "x", 2, vec![row("a1"), row("a2")]), row("a3")]),
            group(3, "B", 1, vec![row("b1")]),
        ])
    }

    #[test]
    fn test_counts_bottom_up() {
        let tree = sample();
        assert_eq!(tree.child_count, 5);
        assert_eq!(tree.group_count, 3);

        let a = tree.find_group(GroupId(1)).unwrap();
        assert_eq!(a.child_count, 3);
        assert_eq!(a.group_count, 1);
        assert_eq!(tree.find_group(GroupId(2)).unwrap().child_count, 2);
    }

    #[test]
    fn test_leaf_ids_in_order() {
        let ids: Vec<_> = sample().leaf_ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["loose", "a1", "a2", "a3", "b1"]);
    }

    #[test]
    fn test_selection_tri_state() {
        let mut tree = sample();
        let selected: HashSet<RowId> = ["a1", "a2", "b1"].into_iter().map(RowId::from).collect();
        assert_eq!(tree.recompute_selection(&selected), 3);

        let a = tree.find_group(GroupId(1)).unwrap();
        assert_eq!(a.selected_count, 2);
        assert!(a.is_indeterminate);
        assert!(!a.is_selected);

        let x = tree.find_group(GroupId(2)).unwrap();
        assert!(x.is_selected);
        assert!(!x.is_indeterminate);

        let b = tree.find_group(GroupId(3)).unwrap();
        assert!(b.is_selected);
    }

    #[test]
    fn test_groups_per_level() {
        assert_eq!(sample().groups_per_level(2), vec![2, 1]);
    }

    #[test]
    fn test_find_group_mut() {
        let mut tree = sample();
        tree.find_group_mut(GroupId(3)).unwrap().is_collapsed = true;
        assert!(tree.find_group(GroupId(3)).unwrap().is_collapsed);
        assert!(tree.find_group_mut(GroupId(99)).is_none());
    }
}
