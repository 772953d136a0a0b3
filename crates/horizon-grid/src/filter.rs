//! Filter engine.
//!
//! Produces a pruned copy of the grouped tree. Predicates apply to leaf rows
//! only; a group survives while at least one descendant row does. The input
//! tree is never touched, so re-filtering never requires re-grouping.

use crate::column::{Column, FilterType};
use crate::store::Row;
use crate::tree::{GroupNode, TreeEntry};

/// Filter value that matches rows with no text.
const MATCH_EMPTY: &str = "undefined";

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    /// Every term must occur in the lowercased text.
    Terms(Vec<String>),
    /// Matches cells without text.
    Empty,
    /// Inclusive numeric range.
    Range { min: Option<f64>, max: Option<f64> },
    /// Exact match on the displayed text.
    Exact(String),
}

/// An active filter bound to a column position.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    column: usize,
    predicate: Predicate,
}

impl CompiledFilter {
    /// Compiles the active filter of a column, if it has one.
    ///
    /// Columns without a filter type, or with a blank value, yield `None`.
    pub fn compile(column_index: usize, column: &Column) -> Option<Self> {
        let filter_type = column.filter_type?;
        let value = column.active_filter()?.trim();
        let predicate = match filter_type {
            FilterType::Text if value == MATCH_EMPTY => Predicate::Empty,
            FilterType::Text => {
                Predicate::Terms(value.split_whitespace().map(str::to_lowercase).collect())
            }
            FilterType::NumberRange => parse_range(value),
            FilterType::Exact => Predicate::Exact(value.to_string()),
        };
        Some(Self {
            column: column_index,
            predicate,
        })
    }

    /// Whether a row passes this filter.
    pub fn matches(&self, row: &Row) -> bool {
        let text = row
            .cell(self.column)
            .and_then(|cell| cell.text.as_deref())
            .unwrap_or("");
        match &self.predicate {
            Predicate::Empty => text.is_empty(),
            Predicate::Terms(terms) => {
                let text = text.to_lowercase();
                terms.iter().all(|term| text.contains(term.as_str()))
            }
            Predicate::Range { min: None, max: None } => true,
            Predicate::Range { min, max } => match text.trim().parse::<f64>() {
                Ok(n) => min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max),
                Err(_) => false,
            },
            Predicate::Exact(expected) => text == expected,
        }
    }
}

/// Parses `"min,max"`. A value without a comma matches that number exactly.
fn parse_range(value: &str) -> Predicate {
    let bound = |s: &str| s.trim().parse::<f64>().ok().filter(|n| n.is_finite());
    match value.split_once(',') {
        Some((min, max)) => Predicate::Range {
            min: bound(min),
            max: bound(max),
        },
        None => {
            let exact = bound(value);
            Predicate::Range {
                min: exact,
                max: exact,
            }
        }
    }
}

/// Compiles the active filters of every column.
pub fn compile_filters(columns: &[Column]) -> Vec<CompiledFilter> {
    columns
        .iter()
        .enumerate()
        .filter_map(|(index, column)| CompiledFilter::compile(index, column))
        .collect()
}

/// Whether a row passes all filters.
pub fn row_passes(row: &Row, filters: &[CompiledFilter]) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

/// Returns a filtered copy of `tree` with empty groups pruned and counts
/// recomputed.
#[tracing::instrument(skip_all, level = "trace", fields(leaves = tree.child_count))]
pub fn filter_tree(tree: &GroupNode, columns: &[Column]) -> GroupNode {
    let filters = compile_filters(columns);
    if filters.is_empty() {
        return tree.clone();
    }

    GroupNode::root(filter_children(&tree.children, &filters))
}

fn filter_children(children: &[TreeEntry], filters: &[CompiledFilter]) -> Vec<TreeEntry> {
    children
        .iter()
        .filter_map(|child| match child {
            TreeEntry::Row(row) => row_passes(row, filters).then(|| TreeEntry::Row(row.clone())),
            TreeEntry::Group(group) => {
                let children = filter_children(&group.children, filters);
                if children.is_empty() {
                    return None;
                }
                Some(TreeEntry::Group(GroupNode {
                    children,
                    ..shallow_clone(group)
                }))
            }
        })
        .collect()
}

fn shallow_clone(group: &GroupNode) -> GroupNode {
    GroupNode {
        title: group.title.clone(),
        key: group.key.clone(),
        children: Vec::new(),
        ..*group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::group::{build_grouped_tree, CollapseState, GroupLevel};
    use crate::store::RowStore;
    use serde_json::json;

    fn fixture() -> (RowStore, Vec<Column>) {
        let columns = vec![
            Column::text("name"),
            Column::number("qty"),
            Column::date("due"),
            Column::text("team"),
        ];
        let config = GridConfig::default();
        let mut store = RowStore::new();
        for (id, name, qty, due, team) in [
            ("1", "Red apple", json!(3), "2024-01-01", "A"),
            ("2", "Green apple", json!(12), "2024-01-02", "A"),
            ("3", "Banana", json!("n/a"), "2024-01-01", "B"),
            ("4", "", json!(7), "2024-01-03", "B"),
        ] {
            store.add(
                Row::new(id, json!({ "name": name, "qty": qty, "due": due, "team": team })),
                &columns,
                &config,
            );
        }
        (store, columns)
    }

    fn grouped(store: &RowStore) -> GroupNode {
        build_grouped_tree(store.rows(), &[GroupLevel::new("team")], &mut CollapseState::new())
    }

    fn with_filter(mut columns: Vec<Column>, index: usize, value: &str) -> Vec<Column> {
        columns[index].filter_value = Some(value.to_string());
        columns
    }

    fn ids(tree: &GroupNode) -> Vec<String> {
        tree.leaf_ids().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_text_terms_are_anded() {
        let (store, columns) = fixture();
        let tree = grouped(&store);

        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns.clone(), 0, "APPLE"))), ["1", "2"]);
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns.clone(), 0, "apple green"))), ["2"]);
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns, 0, "undefined"))), ["4"]);
    }

    #[test]
    fn test_number_range() {
        let (store, columns) = fixture();
        let tree = grouped(&store);

        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns.clone(), 1, "3,7"))), ["1", "4"]);
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns.clone(), 1, "5,"))), ["2", "4"]);
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns.clone(), 1, ",5"))), ["1"]);
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns.clone(), 1, "12"))), ["2"]);
        // No usable bound keeps everything, including non-numeric cells.
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns, 1, ","))).len(), 4);
    }

    #[test]
    fn test_date_exact() {
        let (store, columns) = fixture();
        let tree = grouped(&store);
        assert_eq!(ids(&filter_tree(&tree, &with_filter(columns, 2, "2024-01-01"))), ["1", "3"]);
    }

    #[test]
    fn test_filters_combine_and_prune_groups() {
        let (store, columns) = fixture();
        let tree = grouped(&store);
        let columns = with_filter(with_filter(columns, 0, "apple"), 1, "10,");

        let filtered = filter_tree(&tree, &columns);
        assert_eq!(ids(&filtered), ["2"]);
        assert_eq!(filtered.children.len(), 1);
        let a = filtered.children[0].as_group().unwrap();
        assert_eq!(a.title, "A");
        assert_eq!(a.child_count, 1);
        assert_eq!(filtered.child_count, 1);
        assert_eq!(filtered.group_count, 1);
    }

    #[test]
    fn test_input_untouched_and_idempotent() {
        let (store, columns) = fixture();
        let tree = grouped(&store);
        let before = tree.clone();
        let columns = with_filter(columns, 0, "apple");

        let once = filter_tree(&tree, &columns);
        let twice = filter_tree(&filter_tree(&tree, &columns), &columns);
        assert_eq!(once, twice);
        assert_eq!(once, filter_tree(&tree, &columns));
        assert_eq!(tree, before);
    }

    #[test]
    fn test_unfilterable_column_is_skipped() {
        let (store, mut columns) = fixture();
        columns[0] = Column::text("name").with_filter_type(None).with_filter_value("zzz");
        let tree = grouped(&store);
        assert_eq!(ids(&filter_tree(&tree, &columns)).len(), 4);
    }
}
