//! The grid engine facade.
//!
//! [`GridEngine`] owns the row store, the three rebuild trees, the selection
//! and the scheduler. Mutations return immediately and mark the engine dirty;
//! the host drives rebuilds with [`poll`](GridEngine::poll) (or
//! [`flush`](GridEngine::flush)) and receives each result through
//! [`rebuild_complete`](GridEngine::rebuild_complete).
//!
//! # Example
//!
//! ```
//! use horizon_grid::{Column, GridConfig, GridEngine, GroupLevel, Row};
//! use serde_json::json;
//!
//! let mut grid = GridEngine::new(GridConfig::default());
//! grid.set_columns(vec![Column::text("name"), Column::text("team")]);
//! grid.set_group_by(vec![GroupLevel::new("team")]);
//! grid.add_rows([
//!     Row::new("1", json!({ "name": "Ada", "team": "A" })),
//!     Row::new("2", json!({ "name": "Bo", "team": "B" })),
//! ]);
//!
//! assert!(grid.is_rendering());
//! grid.flush();
//! assert_eq!(grid.flattened().total_leaf_count, 2);
//! assert_eq!(grid.flattened().group_counts, vec![2]);
//! ```

use std::sync::Arc;
use std::time::Duration;

use horizon_grid_core::logging::targets;
use horizon_grid_core::{Clock, PerfSpan, Signal, SystemClock, TaskId};
use serde_json::Value;

use crate::column::{Column, SortDirection};
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::filter::filter_tree;
use crate::flatten::{flatten_tree, RebuildSnapshot};
use crate::group::{build_grouped_tree, CollapseState, GroupLevel};
use crate::scheduler::{RebuildScheduler, RebuildStage};
use crate::selection::{SelectModifiers, SelectionManager, SelectionSet, SelectionSummary, TriState};
use crate::sort::sort_tree;
use crate::store::{Row, RowId, RowStore};
use crate::tree::{GroupId, GroupNode};

/// Hierarchical grid data engine.
///
/// # Signals
///
/// - `rebuild_complete`: emitted after every rebuild pass with the new
///   flattened list, total leaf count and group counts per level
/// - `selection_changed`: emitted with the header checkbox summary whenever
///   the selection or the filtered row set changes it
pub struct GridEngine {
    config: GridConfig,
    store: RowStore,
    columns: Vec<Column>,
    levels: Vec<GroupLevel>,
    collapse: CollapseState,
    grouped: GroupNode,
    filtered: GroupNode,
    sorted: GroupNode,
    snapshot: Arc<RebuildSnapshot>,
    selection: SelectionManager,
    last_summary: SelectionSummary,
    scheduler: RebuildScheduler<GridEngine>,
    rebuild_count: u64,

    /// Emitted after each rebuild pass.
    pub rebuild_complete: Signal<Arc<RebuildSnapshot>>,
    /// Emitted when the selection summary changes.
    pub selection_changed: Signal<SelectionSummary>,
}

impl GridEngine {
    /// Creates an engine on the system clock.
    pub fn new(config: GridConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an engine whose debounce window reads `clock`.
    pub fn with_clock(config: GridConfig, clock: Arc<dyn Clock>) -> Self {
        let scheduler = RebuildScheduler::new(clock, &config);
        Self::with_scheduler(config, scheduler)
    }

    /// Creates an engine around an existing scheduler.
    pub fn with_scheduler(config: GridConfig, scheduler: RebuildScheduler<GridEngine>) -> Self {
        Self {
            selection: SelectionManager::new(config.multi_select),
            config,
            store: RowStore::new(),
            columns: Vec::new(),
            levels: Vec::new(),
            collapse: CollapseState::new(),
            grouped: GroupNode::root(Vec::new()),
            filtered: GroupNode::root(Vec::new()),
            sorted: GroupNode::root(Vec::new()),
            snapshot: Arc::new(RebuildSnapshot::default()),
            last_summary: SelectionSummary::default(),
            scheduler,
            rebuild_count: 0,
            rebuild_complete: Signal::new(),
            selection_changed: Signal::new(),
        }
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Adds a row. Rows without an id get a generated one, which is returned.
    pub fn add_row(&mut self, row: Row) -> RowId {
        let id = self.store.add(row, &self.columns, &self.config);
        self.scheduler.mark_dirty(RebuildStage::Group);
        id
    }

    /// Adds several rows, returning their ids in order.
    pub fn add_rows<I>(&mut self, rows: I) -> Vec<RowId>
    where
        I: IntoIterator<Item = Row>,
    {
        let ids: Vec<RowId> = rows
            .into_iter()
            .map(|row| self.store.add(row, &self.columns, &self.config))
            .collect();
        if !ids.is_empty() {
            self.scheduler.mark_dirty(RebuildStage::Group);
        }
        ids
    }

    /// Removes the first row matching `predicate`.
    pub fn remove_row<F>(&mut self, predicate: F) -> Option<Arc<Row>>
    where
        F: Fn(&Row) -> bool,
    {
        let removed = self.store.remove_first(predicate)?;
        self.scheduler.mark_dirty(RebuildStage::Group);
        Some(removed)
    }

    /// Removes every row matching `predicate`.
    pub fn remove_rows<F>(&mut self, predicate: F) -> Vec<Arc<Row>>
    where
        F: FnMut(&Row) -> bool,
    {
        let removed = self.store.remove_where(predicate);
        if !removed.is_empty() {
            self.scheduler.mark_dirty(RebuildStage::Group);
        }
        removed
    }

    /// Shallow-merges `patch` (a JSON object) into a row's fields.
    ///
    /// Returns `false` when the row does not exist or `patch` is not an object.
    pub fn update_row_data(&mut self, id: &RowId, patch: Value) -> bool {
        let Value::Object(patch) = patch else {
            return false;
        };
        let updated = self.store.update(id, patch, &self.columns, &self.config);
        if updated {
            self.scheduler.mark_dirty(RebuildStage::Group);
        }
        updated
    }

    /// Replaces every row and clears the selection.
    pub fn replace_rows<I>(&mut self, rows: I) -> Vec<RowId>
    where
        I: IntoIterator<Item = Row>,
    {
        self.store.clear();
        self.clear_selection_state();
        let ids = rows
            .into_iter()
            .map(|row| self.store.add(row, &self.columns, &self.config))
            .collect();
        self.scheduler.mark_dirty(RebuildStage::Group);
        ids
    }

    /// Removes every row and clears the selection.
    pub fn empty_content(&mut self) {
        self.store.clear();
        self.clear_selection_state();
        self.scheduler.mark_dirty(RebuildStage::Group);
    }

    fn clear_selection_state(&mut self) {
        if self.selection.clear() {
            tracing::debug!(target: targets::SELECTION, "selection cleared with content");
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replaces the column definitions and recomputes every cell.
    pub fn set_columns(&mut self, columns: Vec<Column>) {
        self.columns = columns;
        self.store.reprocess(&self.columns, &self.config);
        self.scheduler.mark_dirty(RebuildStage::Filter);
    }

    /// Replaces the group-by levels.
    ///
    /// Persisted collapse decisions refer to the old levels and are dropped.
    pub fn set_group_by(&mut self, levels: Vec<GroupLevel>) {
        self.levels = levels;
        self.collapse.reset();
        self.scheduler.mark_dirty(RebuildStage::Group);
    }

    fn column_mut(&mut self, column_id: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|column| column.id == column_id)
            .ok_or_else(|| GridError::unknown_column(column_id))
    }

    /// Sets a column's filter value. An empty value clears the filter.
    pub fn set_filter(&mut self, column_id: &str, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        let column = self.column_mut(column_id)?;
        column.filter_value = (!value.is_empty()).then_some(value);
        self.scheduler.mark_dirty(RebuildStage::Filter);
        Ok(())
    }

    /// Clears every column filter.
    pub fn clear_filters(&mut self) {
        for column in &mut self.columns {
            column.filter_value = None;
        }
        self.scheduler.mark_dirty(RebuildStage::Filter);
    }

    /// Sorts by one column. Every other column stops sorting.
    pub fn set_sort(&mut self, column_id: &str, direction: SortDirection) -> Result<()> {
        let column = self.column_mut(column_id)?;
        if !column.can_sort && direction != SortDirection::None {
            return Err(GridError::ColumnNotSortable(column_id.to_string()));
        }
        for column in &mut self.columns {
            column.direction = if column.id == column_id {
                direction
            } else {
                SortDirection::None
            };
        }
        self.scheduler.mark_dirty(RebuildStage::Sort);
        Ok(())
    }

    /// Enables or disables multi-row selection.
    pub fn set_multi_select(&mut self, multi_select: bool) {
        self.config.multi_select = multi_select;
        self.selection.set_multi_select(multi_select);
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Applies a row click. Unknown ids are ignored.
    ///
    /// Returns whether the selection changed.
    pub fn select_row(&mut self, id: &RowId, is_selected: bool, modifiers: SelectModifiers) -> bool {
        if !self.store.contains(id) {
            tracing::trace!(target: targets::SELECTION, %id, "ignoring unknown row");
            return false;
        }
        let changed = self
            .selection
            .select_row(id, is_selected, modifiers, &self.snapshot);
        if changed {
            self.selection_updated();
        }
        changed
    }

    /// Selects or deselects every filtered row under a group.
    pub fn select_group(&mut self, group_id: GroupId, is_selected: bool) -> Result<bool> {
        let ids = self
            .sorted
            .find_group(group_id)
            .filter(|group| !group.is_root())
            .ok_or(GridError::UnknownGroup(group_id))?
            .leaf_ids();
        let changed = self.selection.select_ids(ids, is_selected);
        if changed {
            self.selection_updated();
        }
        Ok(changed)
    }

    /// Selects or deselects every filtered row.
    pub fn select_all_groups(&mut self, is_selected: bool) -> bool {
        let ids = self.sorted.leaf_ids();
        let changed = self.selection.select_ids(ids, is_selected);
        if changed {
            self.selection_updated();
        }
        changed
    }

    /// Deselects everything and forgets the range anchor.
    pub fn clear_selected(&mut self) -> bool {
        let changed = self.selection.clear();
        if changed {
            self.selection_updated();
        }
        changed
    }

    /// Refreshes tri-state flags now and schedules a flatten for the list.
    fn selection_updated(&mut self) {
        self.sorted.recompute_selection(self.selection.selected_ids());
        self.publish_summary(true);
        self.scheduler.mark_dirty(RebuildStage::Flatten);
    }

    fn publish_summary(&mut self, force: bool) {
        let summary = SelectionSummary::from_tree(&self.sorted);
        if force || summary != self.last_summary {
            self.last_summary = summary;
            tracing::debug!(
                target: targets::SELECTION,
                selected = summary.selected_count,
                total = summary.total,
                "selection changed"
            );
            self.selection_changed.emit(summary);
        }
    }

    // =========================================================================
    // Expand / collapse
    // =========================================================================

    /// Toggles a group's collapse state. Returns the new state.
    pub fn expand_collapse_group(&mut self, group_id: GroupId) -> Result<bool> {
        let group = self
            .sorted
            .find_group_mut(group_id)
            .filter(|group| !group.is_root())
            .ok_or(GridError::UnknownGroup(group_id))?;
        group.is_collapsed = !group.is_collapsed;
        let collapsed = group.is_collapsed;
        self.collapse.set(group.key.clone(), collapsed);
        tracing::debug!(target: targets::REBUILD, %group_id, collapsed, "group toggled");
        self.scheduler.mark_dirty(RebuildStage::Flatten);
        Ok(collapsed)
    }

    /// Collapses or expands every group, including filtered-out ones.
    pub fn expand_collapse_all_groups(&mut self, collapsed: bool) {
        let collapse = &mut self.collapse;
        self.grouped.for_each_group(&mut |group| {
            collapse.set(group.key.clone(), collapsed);
        });
        self.sorted.for_each_group_mut(&mut |group| {
            group.is_collapsed = collapsed;
        });
        self.scheduler.mark_dirty(RebuildStage::Flatten);
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Runs `continuation` once the pending rebuild completes, or right away
    /// when the engine is idle.
    ///
    /// Returns the id of the queued continuation, or `None` if it already ran.
    pub fn when_done_rendering<F>(&mut self, continuation: F) -> Option<TaskId>
    where
        F: FnOnce(&mut GridEngine) + Send + 'static,
    {
        if self.is_rendering() {
            Some(self.scheduler.defer(continuation))
        } else {
            continuation(self);
            None
        }
    }

    /// Drops a queued continuation.
    pub fn cancel_continuation(&mut self, id: TaskId) -> Result<()> {
        self.scheduler.cancel(id)
    }

    /// Whether a rebuild is pending.
    pub fn is_rendering(&self) -> bool {
        self.scheduler.is_dirty()
    }

    /// Time until the pending rebuild is due.
    pub fn time_until_rebuild(&self) -> Option<Duration> {
        self.scheduler.time_until_rebuild()
    }

    /// Rebuilds if the debounce window has elapsed. Returns whether it did.
    pub fn poll(&mut self) -> bool {
        match self.scheduler.take_due() {
            Some(stage) => {
                self.rebuild(stage);
                true
            }
            None => false,
        }
    }

    /// Rebuilds now if anything is pending. Returns whether it did.
    pub fn flush(&mut self) -> bool {
        match self.scheduler.take_now() {
            Some(stage) => {
                self.rebuild(stage);
                true
            }
            None => false,
        }
    }

    /// Waits out the debounce window and rebuilds, until nothing is pending.
    #[cfg(feature = "tokio")]
    pub async fn settle(&mut self) {
        while let Some(wait) = self.time_until_rebuild() {
            tokio::time::sleep(wait).await;
            if !self.poll() {
                self.flush();
            }
        }
    }

    #[tracing::instrument(skip(self), target = "horizon_grid::rebuild", level = "debug")]
    fn rebuild(&mut self, stage: RebuildStage) {
        let _perf = PerfSpan::new("grid_rebuild");

        if stage <= RebuildStage::Group {
            self.grouped = build_grouped_tree(self.store.rows(), &self.levels, &mut self.collapse);
            let store = &self.store;
            let dropped = self.selection.retain(|id| store.contains(id));
            if dropped > 0 {
                tracing::debug!(target: targets::SELECTION, dropped, "removed rows left the selection");
            }
        }
        if stage <= RebuildStage::Filter {
            self.filtered = filter_tree(&self.grouped, &self.columns);
        }
        if stage <= RebuildStage::Sort {
            let mut sorted = self.filtered.clone();
            sort_tree(&mut sorted, &self.columns, &self.levels, &self.collapse);
            self.sorted = sorted;
        }

        let snapshot = flatten_tree(&mut self.sorted, self.selection.selected_ids(), self.levels.len());
        self.snapshot = Arc::new(snapshot);
        self.rebuild_count += 1;

        tracing::debug!(
            target: targets::REBUILD,
            ?stage,
            entries = self.snapshot.len(),
            leaves = self.snapshot.total_leaf_count,
            rebuild = self.rebuild_count,
            "rebuild complete"
        );

        self.rebuild_complete.emit(Arc::clone(&self.snapshot));
        self.publish_summary(false);

        let continuations = self.scheduler.take_continuations();
        if continuations.has_pending() {
            let ran = continuations.process_all(self);
            tracing::trace!(target: targets::SCHEDULER, ran, "continuations ran");
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// The configuration.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// All rows in insertion order.
    pub fn rows(&self) -> &[Arc<Row>] {
        self.store.rows()
    }

    /// A row by id.
    pub fn row(&self, id: &RowId) -> Option<&Arc<Row>> {
        self.store.get(id)
    }

    /// Column definitions.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Group-by levels.
    pub fn group_levels(&self) -> &[GroupLevel] {
        &self.levels
    }

    /// The result of the last rebuild.
    pub fn flattened(&self) -> &Arc<RebuildSnapshot> {
        &self.snapshot
    }

    /// The grouped tree of the last rebuild.
    pub fn grouped_tree(&self) -> &GroupNode {
        &self.grouped
    }

    /// The filtered tree of the last rebuild, before sorting.
    pub fn filtered_tree(&self) -> &GroupNode {
        &self.filtered
    }

    /// The sorted tree the flattened list was built from.
    pub fn sorted_tree(&self) -> &GroupNode {
        &self.sorted
    }

    /// Position of an entry in the flattened list by presentation key.
    pub fn entry_index(&self, key: &str) -> Option<usize> {
        self.snapshot.entry_index(key)
    }

    /// The first row of the flattened list.
    pub fn first_visible_row(&self) -> Option<&Arc<Row>> {
        self.snapshot.first_row()
    }

    /// Selected rows still in the store, in store order.
    pub fn selected_rows(&self) -> Vec<Arc<Row>> {
        self.store
            .rows()
            .iter()
            .filter(|row| self.selection.is_selected(&row.id))
            .cloned()
            .collect()
    }

    /// The selection set.
    pub fn selection(&self) -> &SelectionSet {
        self.selection.set()
    }

    /// Header checkbox summary over the filtered rows.
    pub fn selection_summary(&self) -> SelectionSummary {
        SelectionSummary::from_tree(&self.sorted)
    }

    /// Tri-state of a group in the current tree.
    pub fn group_selection_state(&self, group_id: GroupId) -> Option<TriState> {
        self.sorted
            .find_group(group_id)
            .filter(|group| !group.is_root())
            .map(TriState::of)
    }

    /// Number of rebuild passes so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }
}

impl std::fmt::Debug for GridEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridEngine")
            .field("rows", &self.store.len())
            .field("columns", &self.columns.len())
            .field("levels", &self.levels)
            .field("selected", &self.selection.len())
            .field("scheduler", &self.scheduler)
            .field("rebuild_count", &self.rebuild_count)
            .finish()
    }
}
