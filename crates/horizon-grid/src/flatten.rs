//! Flattener.
//!
//! Walks the sorted tree depth-first and materializes the render-ready list.
//! Descendants of collapsed groups are omitted, but every count still covers
//! the full subtree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::store::{Row, RowId};
use crate::tree::{GroupId, GroupKey, GroupNode, TreeEntry};

/// A group header in the flattened list.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeader {
    /// Rebuild-local id; pass back to the engine for group operations.
    pub group_id: GroupId,
    /// Durable identity.
    pub key: GroupKey,
    /// Display title.
    pub title: String,
    /// Nesting depth (first-level groups are 1).
    pub depth: usize,
    /// Leaf rows under the group, after filtering.
    pub child_count: usize,
    /// Groups under the group.
    pub group_count: usize,
    /// Selected leaf rows under the group.
    pub selected_count: usize,
    /// Whether the group's descendants are hidden.
    pub is_collapsed: bool,
    /// All leaves selected.
    pub is_selected: bool,
    /// Some but not all leaves selected.
    pub is_indeterminate: bool,
}

impl GroupHeader {
    fn from_node(node: &GroupNode) -> Self {
        Self {
            group_id: node.group_id,
            key: node.key.clone(),
            title: node.title.clone(),
            depth: node.depth,
            child_count: node.child_count,
            group_count: node.group_count,
            selected_count: node.selected_count,
            is_collapsed: node.is_collapsed,
            is_selected: node.is_selected,
            is_indeterminate: node.is_indeterminate,
        }
    }
}

/// One line of the flattened list.
#[derive(Debug, Clone, PartialEq)]
pub enum FlattenedEntry {
    /// A visible leaf row.
    Row {
        /// The row, shared with the store snapshot it was built from.
        row: Arc<Row>,
        /// Depth of the enclosing group (0 when ungrouped).
        depth: usize,
        /// Whether the row is selected.
        is_selected: bool,
    },
    /// A group header.
    Group(GroupHeader),
}

impl FlattenedEntry {
    /// Presentation key: the row id, or `group-<id>` for headers.
    pub fn key(&self) -> String {
        match self {
            Self::Row { row, .. } => row.id.to_string(),
            Self::Group(header) => header.group_id.to_string(),
        }
    }

    /// The row id for row entries.
    pub fn row_id(&self) -> Option<&RowId> {
        match self {
            Self::Row { row, .. } => Some(&row.id),
            Self::Group(_) => None,
        }
    }

    /// The header for group entries.
    pub fn as_group(&self) -> Option<&GroupHeader> {
        match self {
            Self::Group(header) => Some(header),
            Self::Row { .. } => None,
        }
    }

    /// Nesting depth.
    pub fn depth(&self) -> usize {
        match self {
            Self::Row { depth, .. } => *depth,
            Self::Group(header) => header.depth,
        }
    }

    /// Whether the entry renders as selected.
    pub fn is_selected(&self) -> bool {
        match self {
            Self::Row { is_selected, .. } => *is_selected,
            Self::Group(header) => header.is_selected,
        }
    }
}

/// The result of one rebuild pass, as handed to the rendering layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RebuildSnapshot {
    /// Visible rows and group headers in display order.
    pub entries: Vec<FlattenedEntry>,
    /// Leaf rows that survived filtering, visible or not.
    pub total_leaf_count: usize,
    /// Number of groups at each group-by level.
    pub group_counts: Vec<usize>,
    /// Rows hidden by a collapsed group, mapped to the position of the
    /// visible header that encloses them.
    pub hidden_rows: HashMap<RowId, usize>,
}

impl RebuildSnapshot {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the entry with presentation key `key`.
    pub fn entry_index(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == key)
    }

    /// Position of a row.
    pub fn row_position(&self, id: &RowId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.row_id() == Some(id))
    }

    /// Position a row occupies for range purposes: its own entry, or the
    /// header of the collapsed group hiding it.
    pub fn row_bound(&self, id: &RowId) -> Option<usize> {
        self.row_position(id)
            .or_else(|| self.hidden_rows.get(id).copied())
    }

    /// The first visible row.
    pub fn first_row(&self) -> Option<&Arc<Row>> {
        self.entries.iter().find_map(|entry| match entry {
            FlattenedEntry::Row { row, .. } => Some(row),
            FlattenedEntry::Group(_) => None,
        })
    }

    /// Row ids between two positions, inclusive in either order. Headers are
    /// skipped.
    pub fn row_ids_between(&self, a: usize, b: usize) -> Vec<RowId> {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        self.entries
            .iter()
            .take(end + 1)
            .skip(start)
            .filter_map(|entry| entry.row_id().cloned())
            .collect()
    }
}

/// Refreshes selection state on `tree` and flattens it.
#[tracing::instrument(skip_all, level = "trace", fields(selected = selected.len()))]
pub fn flatten_tree(tree: &mut GroupNode, selected: &HashSet<RowId>, levels: usize) -> RebuildSnapshot {
    tree.recompute_selection(selected);

    let mut entries = Vec::with_capacity(tree.child_count + tree.group_count);
    let mut hidden_rows = HashMap::new();
    push_children(tree, selected, &mut entries, &mut hidden_rows);

    RebuildSnapshot {
        entries,
        total_leaf_count: tree.child_count,
        group_counts: tree.groups_per_level(levels),
        hidden_rows,
    }
}

fn push_children(
    node: &GroupNode,
    selected: &HashSet<RowId>,
    out: &mut Vec<FlattenedEntry>,
    hidden: &mut HashMap<RowId, usize>,
) {
    for child in &node.children {
        match child {
            TreeEntry::Row(row) => out.push(FlattenedEntry::Row {
                row: Arc::clone(row),
                depth: node.depth,
                is_selected: selected.contains(&row.id),
            }),
            TreeEntry::Group(group) => {
                let position = out.len();
                out.push(FlattenedEntry::Group(GroupHeader::from_node(group)));
                if group.is_collapsed {
                    hidden.extend(group.leaves().into_iter().map(|row| (row.id.clone(), position)));
                } else {
                    push_children(group, selected, out, hidden);
                }
            }
        }
    }
}
