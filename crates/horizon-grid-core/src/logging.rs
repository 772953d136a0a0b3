//! Logging facilities for Horizon Grid.
//!
//! Horizon Grid uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_grid=debug,horizon_grid::perf=info")
//!     .init();
//! ```
//!
//! Every event is emitted with one of the [`targets`] below so subsystems can
//! be filtered independently.

/// Target names for log filtering.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "horizon_grid_core";
    /// Rebuild passes (grouping, filtering, sorting, flattening).
    pub const REBUILD: &str = "horizon_grid::rebuild";
    /// Rebuild scheduling and barrier continuations.
    pub const SCHEDULER: &str = "horizon_grid::scheduler";
    /// Selection changes.
    pub const SELECTION: &str = "horizon_grid::selection";
    /// Row store mutations.
    pub const STORE: &str = "horizon_grid::store";
    /// Performance spans.
    pub const PERF: &str = "horizon_grid::perf";
}

/// A guard for performance tracing spans.
///
/// Creates an info-level span on the [`targets::PERF`] target that stays
/// entered until the guard is dropped.
///
/// # Example
///
/// ```
/// use horizon_grid_core::logging::PerfSpan;
///
/// fn expensive_operation() {
///     let _span = PerfSpan::new("expensive_operation");
///     // ... do work ...
/// }
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_grid::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span_nests() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("horizon_grid::perf=info")
            .with_test_writer()
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let _outer = PerfSpan::new("outer");
        let _inner = PerfSpan::new("inner");
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::REBUILD,
            targets::SCHEDULER,
            targets::SELECTION,
            targets::STORE,
            targets::PERF,
        ] {
            assert!(target.starts_with("horizon_grid::"));
        }
    }
}
