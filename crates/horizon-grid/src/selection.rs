//! Selection management.
//!
//! [`SelectionManager`] owns the set of selected row ids and the anchor used
//! for range selection. Selection is keyed by [`RowId`] only, so it survives
//! rebuilds untouched. Range operations read positions from the most recent
//! [`RebuildSnapshot`].

use std::collections::HashSet;

use horizon_grid_core::logging::targets;

use crate::flatten::RebuildSnapshot;
use crate::store::RowId;
use crate::tree::GroupNode;

/// Input modifiers accompanying a row click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectModifiers {
    /// Add or remove the row without disturbing the rest (Ctrl/Cmd).
    pub multi: bool,
    /// Select the run between the anchor and the row (Shift).
    pub range: bool,
    /// The click landed on a checkbox-like control.
    pub checkbox: bool,
}

impl SelectModifiers {
    /// A plain click.
    pub const NONE: Self = Self {
        multi: false,
        range: false,
        checkbox: false,
    };

    /// Ctrl/Cmd-click.
    pub const MULTI: Self = Self {
        multi: true,
        ..Self::NONE
    };

    /// Shift-click.
    pub const RANGE: Self = Self {
        range: true,
        ..Self::NONE
    };

    /// Click on the row checkbox.
    pub const CHECKBOX: Self = Self {
        checkbox: true,
        ..Self::NONE
    };

    /// Adds the multi modifier.
    pub fn with_multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Adds the range modifier.
    pub fn with_range(mut self) -> Self {
        self.range = true;
        self
    }

    /// Whether any keyboard modifier is held.
    pub fn has_modifier(self) -> bool {
        self.multi || self.range
    }
}

/// The selected ids and the range anchor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    /// Selected row ids.
    pub selected_ids: HashSet<RowId>,
    /// The last explicitly clicked row.
    pub last_selected_id: Option<RowId>,
}

/// Header checkbox state over the filtered rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionSummary {
    /// Selected rows among the filtered rows.
    pub selected_count: usize,
    /// Filtered rows.
    pub total: usize,
    /// Every filtered row is selected (and there is at least one).
    pub all_selected: bool,
    /// Some but not all filtered rows are selected.
    pub some_selected: bool,
}

impl SelectionSummary {
    /// Summarizes a tree whose selection counts are current.
    pub fn from_tree(tree: &GroupNode) -> Self {
        let selected_count = tree.selected_count;
        let total = tree.child_count;
        Self {
            selected_count,
            total,
            all_selected: total > 0 && selected_count == total,
            some_selected: selected_count > 0 && selected_count < total,
        }
    }

    /// The header checkbox state.
    pub fn tri_state(&self) -> TriState {
        if self.all_selected {
            TriState::All
        } else if self.some_selected {
            TriState::Some
        } else {
            TriState::None
        }
    }
}

/// Selected/indeterminate/unselected status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TriState {
    /// Nothing selected.
    #[default]
    None,
    /// Partially selected.
    Some,
    /// Everything selected.
    All,
}

impl TriState {
    /// The state of a group node.
    pub fn of(group: &GroupNode) -> Self {
        if group.is_selected {
            Self::All
        } else if group.is_indeterminate {
            Self::Some
        } else {
            Self::None
        }
    }
}

/// State machine over a [`SelectionSet`].
#[derive(Debug, Clone)]
pub struct SelectionManager {
    set: SelectionSet,
    multi_select: bool,
}

impl SelectionManager {
    /// Creates an empty selection.
    pub fn new(multi_select: bool) -> Self {
        Self {
            set: SelectionSet::default(),
            multi_select,
        }
    }

    /// Whether more than one row may be selected.
    pub fn multi_select(&self) -> bool {
        self.multi_select
    }

    /// Enables or disables multi-selection. Does not change the current set.
    pub fn set_multi_select(&mut self, multi_select: bool) {
        self.multi_select = multi_select;
    }

    /// The current set.
    pub fn set(&self) -> &SelectionSet {
        &self.set
    }

    /// Selected ids.
    pub fn selected_ids(&self) -> &HashSet<RowId> {
        &self.set.selected_ids
    }

    /// The range anchor.
    pub fn anchor(&self) -> Option<&RowId> {
        self.set.last_selected_id.as_ref()
    }

    /// Whether a row is selected.
    pub fn is_selected(&self, id: &RowId) -> bool {
        self.set.selected_ids.contains(id)
    }

    /// Number of selected ids.
    pub fn len(&self) -> usize {
        self.set.selected_ids.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.set.selected_ids.is_empty()
    }

    /// Applies a row click. Returns whether the selected set changed.
    ///
    /// The caller is responsible for ignoring ids that are not in the store.
    pub fn select_row(
        &mut self,
        id: &RowId,
        is_selected: bool,
        modifiers: SelectModifiers,
        snapshot: &RebuildSnapshot,
    ) -> bool {
        let before = self.set.selected_ids.clone();

        if !self.multi_select || (modifiers.checkbox && !modifiers.has_modifier()) {
            self.toggle_only(id, is_selected);
            self.set.last_selected_id = Some(id.clone());
        } else if modifiers.range && self.select_range(id, is_selected, modifiers.multi, snapshot) {
            tracing::trace!(target: targets::SELECTION, %id, "range selection");
        } else if modifiers.multi {
            self.apply(id, is_selected);
            self.set.last_selected_id = Some(id.clone());
        } else {
            if is_selected {
                self.set.selected_ids.clear();
            }
            self.apply(id, is_selected);
            self.set.last_selected_id = Some(id.clone());
        }

        self.set.selected_ids != before
    }

    /// Selects only `id`, keeping an existing multi-row selection intact.
    fn toggle_only(&mut self, id: &RowId, is_selected: bool) {
        let keep_others = self.multi_select && self.set.selected_ids.len() > 1;
        if is_selected && !keep_others {
            self.set.selected_ids.clear();
        }
        self.apply(id, is_selected);
    }

    /// Applies a range click. Returns `false` when there is no usable anchor.
    ///
    /// A bound hidden inside a collapsed group resolves to that group's
    /// header; only visible rows in the run are affected.
    fn select_range(
        &mut self,
        id: &RowId,
        is_selected: bool,
        merge: bool,
        snapshot: &RebuildSnapshot,
    ) -> bool {
        let Some(anchor) = self.set.last_selected_id.as_ref() else {
            return false;
        };
        let (Some(from), Some(to)) = (snapshot.row_bound(anchor), snapshot.row_bound(id))
        else {
            return false;
        };

        let run = snapshot.row_ids_between(from, to);
        if is_selected {
            if !merge {
                self.set.selected_ids.clear();
            }
            self.set.selected_ids.extend(run);
        } else {
            for id in &run {
                self.set.selected_ids.remove(id);
            }
        }
        true
    }

    fn apply(&mut self, id: &RowId, is_selected: bool) {
        if is_selected {
            self.set.selected_ids.insert(id.clone());
        } else {
            self.set.selected_ids.remove(id);
        }
    }

    /// Selects or deselects many rows at once without moving the anchor.
    ///
    /// With multi-selection disabled, selecting keeps only the last id.
    pub fn select_ids<I>(&mut self, ids: I, is_selected: bool) -> bool
    where
        I: IntoIterator<Item = RowId>,
    {
        let before = self.set.selected_ids.clone();
        if is_selected && !self.multi_select {
            if let Some(last) = ids.into_iter().last() {
                self.set.selected_ids.clear();
                self.set.selected_ids.insert(last);
            }
        } else {
            for id in ids {
                self.apply(&id, is_selected);
            }
        }
        self.set.selected_ids != before
    }

    /// Clears the selection and the anchor.
    pub fn clear(&mut self) -> bool {
        self.set.last_selected_id = None;
        if self.set.selected_ids.is_empty() {
            return false;
        }
        self.set.selected_ids.clear();
        true
    }

    /// Drops ids for which `keep` is false. The anchor goes too if dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&RowId) -> bool,
    {
        let before = self.set.selected_ids.len();
        self.set.selected_ids.retain(|id| keep(id));
        if self
            .set
            .last_selected_id
            .as_ref()
            .is_some_and(|anchor| !keep(anchor))
        {
            self.set.last_selected_id = None;
        }
        before - self.set.selected_ids.len()
    }
}
