//! Grouping engine.
//!
//! Partitions the row store into nested [`GroupNode`]s, one nesting level per
//! [`GroupLevel`]. Expand/collapse decisions survive rebuilds through
//! [`CollapseState`], which is keyed by [`GroupKey`] rather than by the
//! rebuild-local [`GroupId`].

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::{lookup_field, parse_temporal, value_text};
use crate::column::{locale_compare, SortDirection};
use crate::store::Row;
use crate::tree::{GroupId, GroupKey, GroupNode, TreeEntry};

/// How group keys of a level compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupType {
    /// Locale-aware text comparison.
    #[default]
    Text,
    /// Numeric comparison; non-numeric keys order after numbers.
    Number,
    /// Chronological comparison; unparsable keys order after dates.
    Date,
}

impl GroupType {
    /// Compares two group key values ascending.
    pub fn compare(self, a: &Value, b: &Value) -> Ordering {
        match self {
            Self::Text => locale_compare(&key_text(a), &key_text(b)),
            Self::Number => compare_parsed(a, b, |v| {
                match v {
                    Value::Number(n) => n.as_f64(),
                    other => key_text(other).trim().parse::<f64>().ok(),
                }
                .filter(|n| n.is_finite())
            }),
            Self::Date => compare_parsed(a, b, parse_temporal),
        }
    }
}

fn compare_parsed<T, F>(a: &Value, b: &Value, parse: F) -> Ordering
where
    T: PartialOrd,
    F: Fn(&Value) -> Option<T>,
{
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => locale_compare(&key_text(a), &key_text(b)),
    }
}

fn key_text(value: &Value) -> String {
    value_text(value).unwrap_or_default()
}

/// Decides the initial collapse state of a freshly seen group.
pub type CollapseEvaluator = Arc<dyn Fn(&GroupNode) -> bool + Send + Sync>;

/// One group-by level.
#[derive(Clone)]
pub struct GroupLevel {
    /// Row field holding the group key.
    pub property: String,
    /// Key comparison.
    pub group_type: GroupType,
    /// Order of this level's groups. `None` keeps first-appearance order.
    pub sort_rule: SortDirection,
    /// Collapse state of this level's groups on the first grouping pass.
    pub is_collapsed: Option<CollapseEvaluator>,
}

impl GroupLevel {
    /// Creates a text level over `property`, ordered ascending.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            group_type: GroupType::Text,
            sort_rule: SortDirection::Asc,
            is_collapsed: None,
        }
    }

    /// Sets the key comparison.
    pub fn with_type(mut self, group_type: GroupType) -> Self {
        self.group_type = group_type;
        self
    }

    /// Sets the group order.
    pub fn with_sort_rule(mut self, sort_rule: SortDirection) -> Self {
        self.sort_rule = sort_rule;
        self
    }

    /// Installs the initial-collapse evaluator.
    pub fn with_collapsed<F>(mut self, evaluator: F) -> Self
    where
        F: Fn(&GroupNode) -> bool + Send + Sync + 'static,
    {
        self.is_collapsed = Some(Arc::new(evaluator));
        self
    }

    /// The group key of a row, or `None` when the row is ungrouped here.
    fn key_of<'a>(&self, row: &'a Row) -> Option<&'a Value> {
        lookup_field(&row.fields, &self.property).filter(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
    }

    fn evaluate(&self, group: &GroupNode) -> bool {
        self.is_collapsed
            .as_ref()
            .is_some_and(|evaluator| evaluator(group))
    }
}

impl fmt::Debug for GroupLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupLevel")
            .field("property", &self.property)
            .field("group_type", &self.group_type)
            .field("sort_rule", &self.sort_rule)
            .field("has_evaluator", &self.is_collapsed.is_some())
            .finish()
    }
}

/// Persisted expand/collapse decisions, keyed by group title path.
///
/// Only groups present in the last grouped tree are remembered. On the first
/// pass after a tree with no groups, each level's evaluator seeds the state;
/// afterwards a group missing from the map starts collapsed.
#[derive(Debug, Clone)]
pub struct CollapseState {
    collapsed: HashMap<GroupKey, bool>,
    /// Set while the last grouped tree had no groups; the next pass reseeds.
    reseed: bool,
}

impl Default for CollapseState {
    fn default() -> Self {
        Self {
            collapsed: HashMap::new(),
            reseed: true,
        }
    }
}

impl CollapseState {
    /// Creates an empty state that seeds from the level evaluators.
    pub fn new() -> Self {
        Self::default()
    }

    /// The persisted decision for a group, if any.
    pub fn get(&self, key: &GroupKey) -> Option<bool> {
        self.collapsed.get(key).copied()
    }

    /// Records a decision.
    pub fn set(&mut self, key: GroupKey, collapsed: bool) {
        self.collapsed.insert(key, collapsed);
    }

    /// Number of remembered groups.
    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }

    /// Forgets everything; the next grouping pass consults the evaluators.
    pub fn reset(&mut self) {
        self.collapsed.clear();
        self.reseed = true;
    }

    /// Resolves the collapse state of a group during a grouping pass.
    fn resolve(&mut self, group: &GroupNode, level: &GroupLevel) -> bool {
        let collapsed = if group.children.is_empty() {
            true
        } else {
            match self.collapsed.get(&group.key) {
                Some(&collapsed) => collapsed,
                None if self.reseed => level.evaluate(group),
                None => true,
            }
        };
        self.collapsed.insert(group.key.clone(), collapsed);
        collapsed
    }
}

struct GroupBuilder<'a> {
    levels: &'a [GroupLevel],
    collapse: &'a mut CollapseState,
    next_id: u64,
}

impl GroupBuilder<'_> {
    fn build(&mut self, rows: Vec<Arc<Row>>, depth: usize, parent: &GroupKey) -> Vec<TreeEntry> {
        let Some(level) = self.levels.get(depth) else {
            return rows.into_iter().map(TreeEntry::Row).collect();
        };

        let (keyed, ungrouped): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|row| level.key_of(row).is_some());

        let mut entries: Vec<TreeEntry> = ungrouped.into_iter().map(TreeEntry::Row).collect();
        for (title, chunk) in chunk_by_key(level, keyed) {
            self.next_id += 1;
            let group_id = GroupId(self.next_id);
            let key = parent.child(title.clone());
            let children = self.build(chunk, depth + 1, &key);
            let mut node = GroupNode::new(title, group_id, key, depth + 1, children);
            node.recompute_counts();
            node.is_collapsed = self.collapse.resolve(&node, level);
            entries.push(TreeEntry::Group(node));
        }
        entries
    }
}

/// Orders rows by the level key and gathers runs sharing a title.
///
/// Stable: rows keep their store order within a group.
fn chunk_by_key(level: &GroupLevel, mut rows: Vec<Arc<Row>>) -> Vec<(String, Vec<Arc<Row>>)> {
    match level.sort_rule {
        SortDirection::None => {}
        direction => rows.sort_by(|a, b| match (level.key_of(a), level.key_of(b)) {
            (Some(x), Some(y)) => direction.apply(level.group_type.compare(x, y)),
            _ => Ordering::Equal,
        }),
    }

    let mut chunks: Vec<(String, Vec<Arc<Row>>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let title = level.key_of(&row).map(key_text).unwrap_or_default();
        match positions.get(&title) {
            Some(&pos) => chunks[pos].1.push(row),
            None => {
                positions.insert(title.clone(), chunks.len());
                chunks.push((title, vec![row]));
            }
        }
    }
    chunks
}

/// Builds the grouped tree over `rows`.
///
/// With no levels the tree is the flat row list under the root.
#[tracing::instrument(skip_all, level = "trace", fields(rows = rows.len(), levels = levels.len()))]
pub fn build_grouped_tree(
    rows: &[Arc<Row>],
    levels: &[GroupLevel],
    collapse: &mut CollapseState,
) -> GroupNode {
    if collapse.reseed {
        collapse.collapsed.clear();
    }

    let mut builder = GroupBuilder {
        levels,
        collapse: &mut *collapse,
        next_id: 0,
    };
    let children = builder.build(rows.to_vec(), 0, &GroupKey::default());
    let root = GroupNode::root(children);

    let mut live = HashSet::with_capacity(root.group_count);
    root.for_each_group(&mut |group| {
        live.insert(group.key.clone());
    });
    collapse.collapsed.retain(|key, _| live.contains(key));

    collapse.reseed = root.group_count == 0;
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(data: &[(&str, Value)]) -> Vec<Arc<Row>> {
        data.iter()
            .map(|(id, fields)| Arc::new(Row::new(*id, fields.clone())))
            .collect()
    }

    fn titles(entries: &[TreeEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                TreeEntry::Row(row) => format!("row:{}", row.id),
                TreeEntry::Group(group) => format!("group:{}", group.title),
            })
            .collect()
    }

    fn team_rows() -> Vec<Arc<Row>> {
        rows(&[
            ("1", json!({ "team": "B" })),
            ("2", json!({ "team": "A" })),
            ("3", json!({ "team": "" })),
            ("4", json!({ "team": "B" })),
        ])
    }

    #[test]
    fn test_no_levels_is_flat() {
        let mut collapse = CollapseState::new();
        let tree = build_grouped_tree(&team_rows(), &[], &mut collapse);
        assert_eq!(titles(&tree.children), vec!["row:1", "row:2", "row:3", "row:4"]);
        assert_eq!(tree.group_count, 0);
    }

    #[test]
    fn test_single_level_ascending() {
        let mut collapse = CollapseState::new();
        let tree = build_grouped_tree(&team_rows(), &[GroupLevel::new("team")], &mut collapse);

        assert_eq!(titles(&tree.children), vec!["row:3", "group:A", "group:B"]);
        let b = tree.children[2].as_group().unwrap();
        assert_eq!(titles(&b.children), vec!["row:1", "row:4"]);
        assert_eq!(b.child_count, 2);
        assert_eq!(b.depth, 1);
        assert_eq!(tree.child_count, 4);
    }

    #[test]
    fn test_sort_rules() {
        let mut collapse = CollapseState::new();
        let desc = GroupLevel::new("team").with_sort_rule(SortDirection::Desc);
        let tree = build_grouped_tree(&team_rows(), &[desc], &mut collapse);
        assert_eq!(titles(&tree.children), vec!["row:3", "group:B", "group:A"]);

        let natural = GroupLevel::new("team").with_sort_rule(SortDirection::None);
        let tree = build_grouped_tree(&team_rows(), &[natural], &mut collapse);
        assert_eq!(titles(&tree.children), vec!["row:3", "group:B", "group:A"]);
        assert_eq!(tree.children[1].as_group().unwrap().child_count, 2);
    }

    #[test]
    fn test_number_groups_compare_numerically() {
        let data = rows(&[
            ("a", json!({ "size": 10 })),
            ("b", json!({ "size": 9 })),
            ("c", json!({ "size": "100" })),
        ]);
        let level = GroupLevel::new("size").with_type(GroupType::Number);
        let tree = build_grouped_tree(&data, &[level], &mut CollapseState::new());
        assert_eq!(titles(&tree.children), vec!["group:9", "group:10", "group:100"]);
    }

    #[test]
    fn test_nested_levels() {
        let data = rows(&[
            ("1", json!({ "team": "A", "role": "dev" })),
            ("2", json!({ "team": "A", "role": "ops" })),
            ("3", json!({ "team": "A" })),
            ("4", json!({ "team": "B", "role": "dev" })),
        ]);
        let levels = [GroupLevel::new("team"), GroupLevel::new("role")];
        let tree = build_grouped_tree(&data, &levels, &mut CollapseState::new());

        assert_eq!(tree.group_count, 5);
        let a = tree.children[0].as_group().unwrap();
        assert_eq!(titles(&a.children), vec!["row:3", "group:dev", "group:ops"]);
        assert_eq!(a.group_count, 2);
        let dev = a.children[1].as_group().unwrap();
        assert_eq!(dev.depth, 2);
        assert_eq!(dev.key.titles(), ["A".to_string(), "dev".to_string()]);
        assert_eq!(tree.groups_per_level(2), vec![2, 3]);
    }

    #[test]
    fn test_missing_property_yields_leaves() {
        let tree = build_grouped_tree(
            &team_rows(),
            &[GroupLevel::new("nope")],
            &mut CollapseState::new(),
        );
        assert_eq!(tree.group_count, 0);
        assert_eq!(tree.children.len(), 4);
    }

    #[test]
    fn test_collapse_state_survives_rebuild() {
        let levels = [GroupLevel::new("team").with_collapsed(|_| true)];
        let mut collapse = CollapseState::new();

        let tree = build_grouped_tree(&team_rows(), &levels, &mut collapse);
        assert!(tree.children[1].as_group().unwrap().is_collapsed);

        collapse.set(GroupKey::top_level("A"), false);
        let mut more = team_rows();
        more.push(Arc::new(Row::new("5", json!({ "team": "C" }))));
        let tree = build_grouped_tree(&more, &levels, &mut collapse);

        let by_title = |title: &str| {
            tree.children
                .iter()
                .filter_map(TreeEntry::as_group)
                .find(|g| g.title == title)
                .unwrap()
                .is_collapsed
        };
        assert!(!by_title("A"));
        assert!(by_title("B"));
        assert!(by_title("C"));
    }

    #[test]
    fn test_unseen_group_starts_collapsed_without_evaluator() {
        let levels = [GroupLevel::new("team")];
        let mut collapse = CollapseState::new();

        let tree = build_grouped_tree(&team_rows(), &levels, &mut collapse);
        assert!(tree.children.iter().filter_map(TreeEntry::as_group).all(|g| !g.is_collapsed));

        let mut more = team_rows();
        more.push(Arc::new(Row::new("5", json!({ "team": "C" }))));
        let tree = build_grouped_tree(&more, &levels, &mut collapse);
        let states: Vec<_> = tree
            .children
            .iter()
            .filter_map(TreeEntry::as_group)
            .map(|g| (g.title.as_str(), g.is_collapsed))
            .collect();
        assert_eq!(states, [("A", false), ("B", false), ("C", true)]);
    }

    #[test]
    fn test_vanished_groups_are_forgotten() {
        let levels = [GroupLevel::new("day")];
        let mut collapse = CollapseState::new();
        for day in 0..50 {
            let data = rows(&[
                ("fixed", json!({ "day": "keep" })),
                ("moving", json!({ "day": format!("d{day}") })),
            ]);
            build_grouped_tree(&data, &levels, &mut collapse);
        }
        assert_eq!(collapse.len(), 2);
        assert_eq!(collapse.get(&GroupKey::top_level("keep")), Some(false));
        assert_eq!(collapse.get(&GroupKey::top_level("d48")), None);
        assert_eq!(collapse.get(&GroupKey::top_level("d49")), Some(true));
    }

    #[test]
    fn test_non_finite_number_keys_order_last() {
        let data = rows(&[
            ("a", json!({ "size": "NaN" })),
            ("b", json!({ "size": 3 })),
            ("c", json!({ "size": "inf" })),
            ("d", json!({ "size": 1 })),
        ]);
        let level = GroupLevel::new("size").with_type(GroupType::Number);
        let tree = build_grouped_tree(&data, &[level], &mut CollapseState::new());
        assert_eq!(
            titles(&tree.children),
            vec!["group:1", "group:3", "group:inf", "group:NaN"]
        );
    }

    #[test]
    fn test_reseeds_after_empty_tree() {
        let levels = [GroupLevel::new("team").with_collapsed(|_| true)];
        let mut collapse = CollapseState::new();
        build_grouped_tree(&team_rows(), &levels, &mut collapse);
        collapse.set(GroupKey::top_level("A"), false);

        build_grouped_tree(&[], &levels, &mut collapse);
        let tree = build_grouped_tree(&team_rows(), &levels, &mut collapse);
        assert!(tree.children[1].as_group().unwrap().is_collapsed);
    }
}
