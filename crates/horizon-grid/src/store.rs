//! The authoritative, ungrouped row collection.
//!
//! Rows are stored behind `Arc` so rebuilt trees and flattened snapshots can
//! share them without copying. A mutation replaces the `Arc` in the store;
//! snapshots already handed out keep the old version.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use horizon_grid_core::logging::targets;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cell::{preprocess_cells, Cell};
use crate::column::Column;
use crate::config::GridConfig;

/// Stable identifier of a row.
///
/// The empty id means "not assigned yet"; the store replaces it with a
/// generated one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    /// Creates a row id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id is unassigned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RowId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A row record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Caller-assigned or generated id.
    pub id: RowId,
    /// Raw field data.
    pub fields: Map<String, Value>,
    /// Derived cells, one per column.
    pub cells: Vec<Cell>,
}

impl Row {
    /// Creates a row with an id and fields. Non-object values yield no fields.
    pub fn new(id: impl Into<RowId>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields: into_object(fields),
            cells: Vec::new(),
        }
    }

    /// Creates a row whose id the store will generate.
    pub fn from_fields(fields: Value) -> Self {
        Self {
            id: RowId::default(),
            fields: into_object(fields),
            cells: Vec::new(),
        }
    }

    /// A field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        crate::cell::lookup_field(&self.fields, name)
    }

    /// The cell for column index `column`.
    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Holds the authoritative row collection in insertion order.
#[derive(Debug, Default)]
pub struct RowStore {
    rows: Vec<Arc<Row>>,
    /// Position of each id. Duplicate ids resolve to the last one written.
    index: HashMap<RowId, usize>,
    next_generated: u64,
}

impl RowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> &[Arc<Row>] {
        &self.rows
    }

    /// Looks up a row by id.
    pub fn get(&self, id: &RowId) -> Option<&Arc<Row>> {
        self.index.get(id).and_then(|&pos| self.rows.get(pos))
    }

    /// Whether a row with this id exists.
    pub fn contains(&self, id: &RowId) -> bool {
        self.index.contains_key(id)
    }

    fn assign_id(&mut self, row: &mut Row) -> RowId {
        if !row.id.is_empty() {
            return row.id.clone();
        }
        loop {
            self.next_generated += 1;
            let candidate = RowId::new(format!("row-{}", self.next_generated));
            if !self.index.contains_key(&candidate) {
                row.id = candidate.clone();
                return candidate;
            }
        }
    }

    /// Appends a row, computing its cells. Returns its id.
    pub fn add(&mut self, mut row: Row, columns: &[Column], config: &GridConfig) -> RowId {
        let id = self.assign_id(&mut row);
        row.cells = preprocess_cells(&row.fields, columns, config);
        self.index.insert(id.clone(), self.rows.len());
        self.rows.push(Arc::new(row));
        tracing::trace!(target: targets::STORE, %id, "row added");
        id
    }

    /// Removes every row matching `predicate`, returning them in store order.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<Arc<Row>>
    where
        F: FnMut(&Row) -> bool,
    {
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.rows).into_iter().partition(|row| predicate(row.as_ref()));
        self.rows = kept;
        if !removed.is_empty() {
            self.reindex();
            tracing::trace!(target: targets::STORE, count = removed.len(), "rows removed");
        }
        removed
    }

    /// Removes the first row matching `predicate`.
    pub fn remove_first<F>(&mut self, predicate: F) -> Option<Arc<Row>>
    where
        F: Fn(&Row) -> bool,
    {
        let pos = self.rows.iter().position(|row| predicate(row.as_ref()))?;
        let removed = self.rows.remove(pos);
        self.reindex();
        tracing::trace!(target: targets::STORE, id = %removed.id, "row removed");
        Some(removed)
    }

    /// Shallow-merges `patch` into a row's fields and recomputes its cells.
    ///
    /// A `null` in the patch removes that key. Returns `false` for unknown ids.
    pub fn update(
        &mut self,
        id: &RowId,
        patch: Map<String, Value>,
        columns: &[Column],
        config: &GridConfig,
    ) -> bool {
        let Some(&pos) = self.index.get(id) else {
            return false;
        };
        let row = Arc::make_mut(&mut self.rows[pos]);
        for (key, value) in patch {
            if value.is_null() {
                row.fields.remove(&key);
            } else {
                row.fields.insert(key, value);
            }
        }
        row.cells = preprocess_cells(&row.fields, columns, config);
        tracing::trace!(target: targets::STORE, %id, "row updated");
        true
    }

    /// Recomputes the cells of every row, e.g. after the columns changed.
    pub fn reprocess(&mut self, columns: &[Column], config: &GridConfig) {
        for row in &mut self.rows {
            let row = Arc::make_mut(row);
            row.cells = preprocess_cells(&row.fields, columns, config);
        }
    }

    /// Removes every row.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.index.clear();
    }

    fn reindex(&mut self) {
        self.index = self
            .rows
            .iter()
            .enumerate()
            .map(|(pos, row)| (row.id.clone(), pos))
            .collect();
    }
}
