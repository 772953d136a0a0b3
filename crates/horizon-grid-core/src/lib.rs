//! Core systems for Horizon Grid.
//!
//! This crate provides the foundational components the grid engine is built on:
//!
//! - **Signal/Slot System**: Type-safe change notification
//! - **Task Queue**: One-shot continuations that run once pending work settles
//! - **Timers**: Injectable clocks and trailing-edge debounce timers
//! - **Logging**: `tracing` targets and performance spans
//!
//! # Debounce Example
//!
//! ```
//! use horizon_grid_core::{DebounceTimer, ManualClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut timer = DebounceTimer::new(clock.clone(), Duration::from_millis(16));
//!
//! timer.trigger();
//! timer.trigger();
//! clock.advance(Duration::from_millis(16));
//!
//! assert!(timer.fire_if_expired());
//! assert!(!timer.fire_if_expired());
//! ```

mod error;
pub mod logging;
pub mod signal;
pub mod task;
pub mod timer;

pub use error::{CoreError, Result};
pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use task::{BoxedTask, TaskId, TaskQueue};
pub use timer::{Clock, DebounceTimer, ManualClock, SystemClock};
