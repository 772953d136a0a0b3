//! Horizon Grid - hierarchical grid data engine.
//!
//! Turns a flat collection of rows into the grouped, filtered, sorted and
//! flattened model a data grid renders, and keeps multi-row selection
//! consistent across rebuilds.
//!
//! # Pipeline
//!
//! Every rebuild runs some suffix of:
//!
//! 1. [`group`]: partition rows into nested [`GroupNode`]s
//! 2. [`filter`]: prune rows failing the column filters, then empty groups
//! 3. [`sort`]: order children by the active column
//! 4. [`flatten`]: emit visible rows and headers as a [`RebuildSnapshot`]
//!
//! Mutations only mark the engine dirty; the [`scheduler`] coalesces them
//! into one rebuild per debounce window. Callers that need the settled state
//! register a continuation with [`GridEngine::when_done_rendering`].
//!
//! # Example
//!
//! ```
//! use horizon_grid::{Column, GridConfig, GridEngine, GroupLevel, Row, SelectModifiers};
//! use serde_json::json;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let mut grid = GridEngine::new(GridConfig::default());
//! grid.set_columns(vec![Column::text("name"), Column::number("qty")]);
//!
//! let rebuilds = Arc::new(AtomicUsize::new(0));
//! let counter = rebuilds.clone();
//! grid.rebuild_complete.connect(move |_| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! for n in 0..10 {
//!     grid.add_row(Row::new(n.to_string(), json!({ "name": format!("item {n}"), "qty": n })));
//! }
//! grid.when_done_rendering(|grid| {
//!     let first = grid.first_visible_row().unwrap().id.clone();
//!     grid.select_row(&first, true, SelectModifiers::NONE);
//! });
//!
//! grid.flush();
//! assert_eq!(rebuilds.load(Ordering::SeqCst), 1);
//! assert_eq!(grid.selection_summary().selected_count, 1);
//! ```

pub mod cell;
pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod group;
pub mod scheduler;
pub mod selection;
pub mod sort;
pub mod store;
pub mod tree;

pub use cell::Cell;
pub use column::{CellKey, Column, ColumnType, CompareFn, FilterType, SortDirection, SortValue};
pub use config::GridConfig;
pub use engine::GridEngine;
pub use error::{GridError, Result};
pub use flatten::{FlattenedEntry, GroupHeader, RebuildSnapshot};
pub use group::{CollapseEvaluator, CollapseState, GroupLevel, GroupType};
pub use scheduler::{RebuildScheduler, RebuildStage};
pub use selection::{SelectModifiers, SelectionManager, SelectionSet, SelectionSummary, TriState};
pub use store::{Row, RowId, RowStore};
pub use tree::{GroupId, GroupKey, GroupNode, TreeEntry};

pub use horizon_grid_core::{Clock, ConnectionGuard, ConnectionId, ManualClock, Signal, SystemClock, TaskId};
