//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `planboard_core` linkage.
//! - Run one deterministic in-memory planner pass for quick local checks.

use chrono::NaiveDate;
use planboard_core::{
    open_db_in_memory, BoardView, ContainerKey, DragEntity, DragEvent, DragSession, FixedClock,
    MoveExecutor, PlannerConfig, SqlitePositionStore,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("planboard_core ping={}", planboard_core::ping());
    println!("planboard_core version={}", planboard_core::core_version());

    let conn = open_db_in_memory()?;
    let store = SqlitePositionStore::try_new(&conn)?;
    let config = PlannerConfig::default();
    let mut executor = MoveExecutor::load(store)?.with_view_options(config.view_options());
    for container in config.seed_containers() {
        executor.register_container(container)?;
    }

    let big = ContainerKey::category("big");
    let little = ContainerKey::category("little");
    let first = executor.create_item(big.clone(), "ship release")?;
    executor.create_item(big.clone(), "review budget")?;
    let chore = executor.create_item(little.clone(), "water plants")?;

    // Drag the chore onto the first big item.
    let mut session = DragSession::new();
    session.start(DragEntity::Item(chore.id))?;
    let drop = DragEvent {
        dragged: DragEntity::Item(chore.id),
        over: Some(DragEntity::Item(first.id)),
    };
    if let Some(intent) = session.finish(&drop, &executor.view())? {
        executor.apply_intent(intent)?;
    }

    let yesterday = NaiveDate::from_ymd_opt(2024, 5, 6).ok_or("invalid demo date")?;
    let today = NaiveDate::from_ymd_opt(2024, 5, 7).ok_or("invalid demo date")?;
    executor.create_item(ContainerKey::day(yesterday), "call plumber")?;
    let report = executor.roll_forward_overdue(&FixedClock(today));
    println!(
        "planboard roll_forward moved={} failed={}",
        report.moved.len(),
        report.failed.len()
    );

    print_board(&executor.view());
    Ok(())
}

fn print_board(view: &BoardView) {
    for container in view.containers() {
        let capacity = container
            .container
            .capacity
            .map_or_else(|| "-".to_string(), |capacity| capacity.to_string());
        println!(
            "{} active={} capacity={capacity}",
            container.container.key, container.active_count
        );
        for item in &container.items {
            println!("  {} {}", item.position, item.title);
        }
    }
}
