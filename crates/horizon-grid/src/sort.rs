//! Sort engine.
//!
//! Sorts every child list of a tree in place. Rows always precede groups,
//! groups order among themselves by title, and rows order by the single
//! actively sorted column.

use std::cmp::Ordering;

use crate::cell::Cell;
use crate::column::{locale_compare, Column, SortDirection};
use crate::group::{CollapseState, GroupLevel};
use crate::tree::{GroupNode, TreeEntry};

/// The column currently sorting the grid, with its position.
pub fn active_sort(columns: &[Column]) -> Option<(usize, &Column)> {
    columns
        .iter()
        .enumerate()
        .find(|(_, column)| column.direction != SortDirection::None)
}

struct Sorter<'a> {
    active: Option<(usize, &'a Column)>,
    levels: &'a [GroupLevel],
}

impl Sorter<'_> {
    fn compare(&self, a: &TreeEntry, b: &TreeEntry) -> Ordering {
        match (a, b) {
            (TreeEntry::Row(_), TreeEntry::Group(_)) => Ordering::Less,
            (TreeEntry::Group(_), TreeEntry::Row(_)) => Ordering::Greater,
            (TreeEntry::Group(x), TreeEntry::Group(y)) => {
                let rule = x
                    .level()
                    .and_then(|level| self.levels.get(level))
                    .map_or(SortDirection::Asc, |level| level.sort_rule);
                rule.apply(locale_compare(&x.title, &y.title))
            }
            (TreeEntry::Row(x), TreeEntry::Row(y)) => match self.active {
                Some((index, column)) => {
                    let empty = Cell::default();
                    let x = x.cell(index).unwrap_or(&empty);
                    let y = y.cell(index).unwrap_or(&empty);
                    column.compare_cells(x, y, column.direction)
                }
                None => Ordering::Equal,
            },
        }
    }

    fn sort(&self, node: &mut GroupNode) {
        node.children.sort_by(|a, b| self.compare(a, b));
        for child in &mut node.children {
            if let TreeEntry::Group(group) = child {
                self.sort(group);
            }
        }
    }
}

/// Sorts `tree` in place, then re-resolves collapse state from `collapse`.
///
/// Without an actively sorted column the natural grouping order is kept.
#[tracing::instrument(skip_all, level = "trace")]
pub fn sort_tree(
    tree: &mut GroupNode,
    columns: &[Column],
    levels: &[GroupLevel],
    collapse: &CollapseState,
) {
    if let Some(active) = active_sort(columns) {
        tracing::trace!(column = %active.1.id, direction = ?active.1.direction, "sorting");
        Sorter { active: Some(active), levels }.sort(tree);
    }
    resolve_collapsed(tree, collapse);
}

/// Applies persisted collapse decisions to every group of `tree`.
pub fn resolve_collapsed(tree: &mut GroupNode, collapse: &CollapseState) {
    tree.for_each_group_mut(&mut |group| {
        if group.children.is_empty() {
            group.is_collapsed = true;
        } else if let Some(collapsed) = collapse.get(&group.key) {
            group.is_collapsed = collapsed;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::group::build_grouped_tree;
    use crate::store::{Row, RowStore};
    use crate::tree::GroupKey;
    use serde_json::json;

    fn fixture(levels: &[GroupLevel]) -> (GroupNode, Vec<Column>, CollapseState) {
        let columns = vec![Column::text("name"), Column::number("qty")];
        let config = GridConfig::default();
        let mut store = RowStore::new();
        for (id, name, qty, team) in [
            ("1", "pear", 10, "B"),
            ("2", "apple", 2, "A"),
            ("3", "fig", 9, ""),
            ("4", "kiwi", 1, "B"),
            ("5", "date", 5, ""),
        ] {
            store.add(
                Row::new(id, json!({ "name": name, "qty": qty, "team": team })),
                &columns,
                &config,
            );
        }
        let mut collapse = CollapseState::new();
        let tree = build_grouped_tree(store.rows(), levels, &mut collapse);
        (tree, columns, collapse)
    }

    fn order(entries: &[TreeEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                TreeEntry::Row(row) => row.id.to_string(),
                TreeEntry::Group(group) => format!("[{}]", group.title),
            })
            .collect()
    }

    #[test]
    fn test_no_active_column_keeps_order() {
        let levels = [GroupLevel::new("team")];
        let (mut tree, columns, collapse) = fixture(&levels);
        let before = order(&tree.children);
        sort_tree(&mut tree, &columns, &levels, &collapse);
        assert_eq!(order(&tree.children), before);
    }

    #[test]
    fn test_numeric_sort_within_groups() {
        let levels = [GroupLevel::new("team")];
        let (mut tree, mut columns, collapse) = fixture(&levels);
        columns[1].direction = SortDirection::Asc;
        sort_tree(&mut tree, &columns, &levels, &collapse);

        assert_eq!(order(&tree.children), ["5", "3", "[A]", "[B]"]);
        let b = tree.children[3].as_group().unwrap();
        assert_eq!(order(&b.children), ["4", "1"]);

        columns[1].direction = SortDirection::Desc;
        sort_tree(&mut tree, &columns, &levels, &collapse);
        assert_eq!(order(&tree.children), ["3", "5", "[A]", "[B]"]);
        assert_eq!(order(&tree.children[3].as_group().unwrap().children), ["1", "4"]);
    }

    #[test]
    fn test_groups_follow_level_rule() {
        let levels = [GroupLevel::new("team").with_sort_rule(SortDirection::Desc)];
        let (mut tree, mut columns, collapse) = fixture(&levels);
        columns[0].direction = SortDirection::Asc;
        sort_tree(&mut tree, &columns, &levels, &collapse);
        assert_eq!(order(&tree.children), ["5", "3", "[B]", "[A]"]);
    }

    #[test]
    fn test_flat_text_sort() {
        let (mut tree, mut columns, collapse) = fixture(&[]);
        columns[0].direction = SortDirection::Asc;
        sort_tree(&mut tree, &columns, &[], &collapse);
        assert_eq!(order(&tree.children), ["2", "5", "3", "4", "1"]);
    }

    #[test]
    fn test_collapse_reresolved() {
        let levels = [GroupLevel::new("team")];
        let (mut tree, columns, mut collapse) = fixture(&levels);
        collapse.set(GroupKey::top_level("B"), true);
        sort_tree(&mut tree, &columns, &levels, &collapse);
        assert!(tree.children[3].as_group().unwrap().is_collapsed);
        assert!(!tree.children[2].as_group().unwrap().is_collapsed);
    }
}
