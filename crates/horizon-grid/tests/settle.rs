//! Async settling on a real clock.
#![cfg(feature = "tokio")]

use horizon_grid::{Column, GridConfig, GridEngine, Row};
use serde_json::json;

#[tokio::test]
async fn test_settle_runs_pending_rebuilds() {
    let mut grid = GridEngine::new(GridConfig::default().with_debounce_ms(5));
    grid.set_columns(vec![Column::text("name")]);
    grid.add_rows((0..3).map(|n| Row::new(n as u64, json!({ "name": format!("n{n}") }))));
    grid.when_done_rendering(|grid| {
        let id = grid.rows()[0].id.clone();
        grid.update_row_data(&id, json!({ "name": "renamed" }));
    });

    grid.settle().await;

    assert!(!grid.is_rendering());
    assert_eq!(grid.rebuild_count(), 2);
    assert_eq!(
        grid.flattened().first_row().unwrap().cells[0].text.as_deref(),
        Some("renamed")
    );
}
