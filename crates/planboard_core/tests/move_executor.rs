use planboard_core::db::open_db_in_memory;
use planboard_core::{
    Container, ContainerKey, EngineError, Item, ItemId, MoveExecutor, PlannerConfig,
    PositionStore, PositionUpdate, SqlitePositionStore, StoreError, StoreResult,
};
use rusqlite::Connection;
use std::cell::Cell;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Store wrapper whose writes can be switched to fail.
struct FlakyStore<'conn> {
    inner: SqlitePositionStore<'conn>,
    fail_writes: Cell<bool>,
}

impl<'conn> FlakyStore<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqlitePositionStore::try_new(conn).unwrap(),
            fail_writes: Cell::new(false),
        }
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_writes.get() {
            return Err(StoreError::Rejected("disk full".to_string()));
        }
        Ok(())
    }
}

impl PositionStore for FlakyStore<'_> {
    fn save_item_positions(&self, updates: &[PositionUpdate]) -> StoreResult<()> {
        self.check()?;
        self.inner.save_item_positions(updates)
    }

    fn delete_item(&self, id: ItemId, renumbered: &[PositionUpdate]) -> StoreResult<()> {
        self.check()?;
        self.inner.delete_item(id, renumbered)
    }

    fn insert_item(&self, item: &Item) -> StoreResult<()> {
        self.check()?;
        self.inner.insert_item(item)
    }

    fn update_item(&self, item: &Item) -> StoreResult<()> {
        self.check()?;
        self.inner.update_item(item)
    }

    fn load_container(&self, key: &ContainerKey) -> StoreResult<Vec<Item>> {
        self.inner.load_container(key)
    }

    fn load_all_items(&self) -> StoreResult<Vec<Item>> {
        self.inner.load_all_items()
    }

    fn save_container(&self, container: &Container) -> StoreResult<()> {
        self.check()?;
        self.inner.save_container(container)
    }

    fn load_containers(&self) -> StoreResult<Vec<Container>> {
        self.inner.load_containers()
    }

    fn save_container_positions(&self, containers: &[Container]) -> StoreResult<()> {
        self.check()?;
        self.inner.save_container_positions(containers)
    }
}

fn planner<S: PositionStore>(store: S) -> MoveExecutor<S> {
    let mut executor = MoveExecutor::load(store).unwrap();
    for container in PlannerConfig::default().seed_containers() {
        executor.register_container(container).unwrap();
    }
    executor
}

fn big() -> ContainerKey {
    ContainerKey::category("big")
}

fn medium() -> ContainerKey {
    ContainerKey::category("medium")
}

fn titles<S: PositionStore>(executor: &MoveExecutor<S>, key: &ContainerKey) -> Vec<String> {
    executor
        .items()
        .ordered_in(key)
        .into_iter()
        .map(|item| item.title)
        .collect()
}

fn positions<S: PositionStore>(executor: &MoveExecutor<S>, key: &ContainerKey) -> Vec<i64> {
    executor
        .items()
        .ordered_in(key)
        .into_iter()
        .map(|item| item.position)
        .collect()
}

fn stored_titles(conn: &Connection, key: &ContainerKey) -> Vec<String> {
    SqlitePositionStore::try_new(conn)
        .unwrap()
        .load_container(key)
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect()
}

#[test]
fn reorder_to_front_renumbers_whole_container() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let t1 = executor.create_item(big(), "T1").unwrap();
    let t2 = executor.create_item(big(), "T2").unwrap();
    let t3 = executor.create_item(big(), "T3").unwrap();

    let outcome = executor.reorder_within_container(t3.id, 0).unwrap();

    let changed: Vec<(ItemId, i64)> = outcome
        .changed
        .iter()
        .map(|update| (update.id, update.position))
        .collect();
    assert_eq!(changed, vec![(t3.id, 0), (t1.id, 1), (t2.id, 2)]);
    assert!(outcome.changed.iter().all(|update| update.container == big()));
    assert_eq!(titles(&executor, &big()), vec!["T3", "T1", "T2"]);
    assert_eq!(positions(&executor, &big()), vec![0, 1, 2]);
    assert_eq!(stored_titles(&conn, &big()), vec!["T3", "T1", "T2"]);
}

#[test]
fn reorder_to_current_index_is_a_noop() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    executor.create_item(big(), "T1").unwrap();
    let t2 = executor.create_item(big(), "T2").unwrap();

    let outcome = executor.reorder_within_container(t2.id, 1).unwrap();

    assert!(outcome.changed.is_empty());
    assert_eq!(titles(&executor, &big()), vec!["T1", "T2"]);
}

#[test]
fn reorder_clamps_index_past_the_end() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let t1 = executor.create_item(medium(), "T1").unwrap();
    executor.create_item(medium(), "T2").unwrap();
    executor.create_item(medium(), "T3").unwrap();

    executor.reorder_within_container(t1.id, 99).unwrap();

    assert_eq!(titles(&executor, &medium()), vec!["T2", "T3", "T1"]);
    assert_eq!(positions(&executor, &medium()), vec![0, 1, 2]);
}

#[test]
fn move_into_full_container_is_rejected_without_mutation() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    for title in ["B1", "B2", "B3"] {
        executor.create_item(big(), title).unwrap();
    }
    executor.create_item(medium(), "T4").unwrap();
    let t5 = executor.create_item(medium(), "T5").unwrap();

    let err = executor.move_to_container(t5.id, big(), 0).unwrap_err();

    match err {
        EngineError::CapacityExceeded {
            container,
            capacity,
        } => {
            assert_eq!(container, big());
            assert_eq!(capacity, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err_is_rejection(&executor.move_to_container(t5.id, big(), 0)));
    let t5_now = executor.items().get(t5.id).unwrap();
    assert_eq!(t5_now.container, medium());
    assert_eq!(t5_now.position, 1);
    assert_eq!(titles(&executor, &big()), vec!["B1", "B2", "B3"]);
}

fn err_is_rejection<T>(result: &Result<T, EngineError>) -> bool {
    matches!(result, Err(err) if err.is_rejection())
}

#[test]
fn completed_items_do_not_count_against_capacity() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let b1 = executor.create_item(big(), "B1").unwrap();
    executor.create_item(big(), "B2").unwrap();
    executor.create_item(big(), "B3").unwrap();
    let t5 = executor.create_item(medium(), "T5").unwrap();

    executor.set_completed(b1.id, true).unwrap();
    executor.move_to_container(t5.id, big(), 0).unwrap();

    assert_eq!(titles(&executor, &big()), vec!["T5", "B1", "B2", "B3"]);
    assert_eq!(positions(&executor, &big()), vec![0, 1, 2, 3]);
    assert!(executor.items().ordered_in(&medium()).is_empty());

    // Re-activating B1 would make four active items in `big`.
    let err = executor.set_completed(b1.id, false).unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded { .. }));
    assert!(executor.items().get(b1.id).unwrap().completed);
}

#[test]
fn completed_item_may_move_into_full_container() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    for title in ["B1", "B2", "B3"] {
        executor.create_item(big(), title).unwrap();
    }
    let done = executor.create_item(medium(), "done").unwrap();
    executor.set_completed(done.id, true).unwrap();

    executor.move_to_container(done.id, big(), usize::MAX).unwrap();

    assert_eq!(titles(&executor, &big()), vec!["B1", "B2", "B3", "done"]);
}

#[test]
fn cross_container_move_renumbers_both_sides() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    executor.create_item(medium(), "M1").unwrap();
    let m2 = executor.create_item(medium(), "M2").unwrap();
    executor.create_item(medium(), "M3").unwrap();
    executor.create_item(big(), "B1").unwrap();

    let outcome = executor.move_to_container(m2.id, big(), 0).unwrap();

    assert_eq!(titles(&executor, &medium()), vec!["M1", "M3"]);
    assert_eq!(positions(&executor, &medium()), vec![0, 1]);
    assert_eq!(titles(&executor, &big()), vec!["M2", "B1"]);
    assert_eq!(positions(&executor, &big()), vec![0, 1]);
    let moved = outcome
        .changed
        .iter()
        .find(|update| update.id == m2.id)
        .unwrap();
    assert_eq!(moved.container, big());
    assert_eq!(stored_titles(&conn, &medium()), vec!["M1", "M3"]);
    assert_eq!(stored_titles(&conn, &big()), vec!["M2", "B1"]);
    assert_eq!(executor.items().len(), 4);
}

#[test]
fn failed_write_rolls_memory_back_to_store() {
    let conn = setup();
    let mut executor = planner(FlakyStore::new(&conn));
    executor.create_item(medium(), "M1").unwrap();
    let m2 = executor.create_item(medium(), "M2").unwrap();
    executor.create_item(big(), "B1").unwrap();

    executor.store().fail_writes.set(true);
    let err = executor.move_to_container(m2.id, big(), 0).unwrap_err();

    assert!(matches!(
        err,
        EngineError::PersistenceFailure(StoreError::Rejected(_))
    ));
    assert!(!executor.has_pending());
    assert_eq!(titles(&executor, &medium()), vec!["M1", "M2"]);
    assert_eq!(titles(&executor, &big()), vec!["B1"]);
    assert_eq!(executor.items().get(m2.id).unwrap().container, medium());

    executor.store().fail_writes.set(false);
    executor.move_to_container(m2.id, big(), 0).unwrap();
    assert_eq!(titles(&executor, &big()), vec!["M2", "B1"]);
}

#[test]
fn delete_closes_the_gap() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    executor.create_item(medium(), "M1").unwrap();
    let m2 = executor.create_item(medium(), "M2").unwrap();
    let m3 = executor.create_item(medium(), "M3").unwrap();

    let outcome = executor.delete_item(m2.id).unwrap();

    assert_eq!(outcome.changed.len(), 1);
    assert_eq!(outcome.changed[0].id, m3.id);
    assert_eq!(outcome.changed[0].position, 1);
    assert!(!executor.items().contains(m2.id));
    assert_eq!(positions(&executor, &medium()), vec![0, 1]);
    assert_eq!(stored_titles(&conn, &medium()), vec!["M1", "M3"]);

    let err = executor.delete_item(m2.id).unwrap_err();
    assert!(matches!(err, EngineError::ItemNotFound(id) if id == m2.id));
}

#[test]
fn failed_delete_restores_the_item() {
    let conn = setup();
    let mut executor = planner(FlakyStore::new(&conn));
    executor.create_item(medium(), "M1").unwrap();
    let m2 = executor.create_item(medium(), "M2").unwrap();

    executor.store().fail_writes.set(true);
    executor.delete_item(m2.id).unwrap_err();

    assert!(executor.items().contains(m2.id));
    assert_eq!(titles(&executor, &medium()), vec!["M1", "M2"]);
}

#[test]
fn unknown_references_are_rejected() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let m1 = executor.create_item(medium(), "M1").unwrap();

    let missing = ItemId::new_v4();
    let err = executor.reorder_within_container(missing, 0).unwrap_err();
    assert!(matches!(err, EngineError::ItemNotFound(id) if id == missing));
    assert!(err.is_stale_reference());

    let ghost = ContainerKey::list("ghost");
    let err = executor.move_to_container(m1.id, ghost.clone(), 0).unwrap_err();
    assert!(matches!(err, EngineError::ContainerNotFound(key) if key == ghost));
    assert_eq!(executor.items().get(m1.id).unwrap().container, medium());
}

#[test]
fn create_item_checks_title_and_capacity() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());

    assert!(matches!(
        executor.create_item(big(), "   ").unwrap_err(),
        EngineError::InvalidTitle
    ));
    let first = executor.create_item(big(), "  padded  ").unwrap();
    assert_eq!(first.title, "padded");
    assert_eq!(first.position, 0);
    executor.create_item(big(), "B2").unwrap();
    executor.create_item(big(), "B3").unwrap();

    let err = executor.create_item(big(), "B4").unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded { capacity: 3, .. }));
    assert_eq!(executor.items().ordered_in(&big()).len(), 3);
}

#[test]
fn rename_keeps_order_and_persists() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let m1 = executor.create_item(medium(), "M1").unwrap();
    executor.create_item(medium(), "M2").unwrap();

    executor.rename_item(m1.id, "first").unwrap();

    assert_eq!(titles(&executor, &medium()), vec!["first", "M2"]);
    assert_eq!(stored_titles(&conn, &medium()), vec!["first", "M2"]);
}

#[test]
fn reload_from_store_matches_memory() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let m1 = executor.create_item(medium(), "M1").unwrap();
    executor.create_item(medium(), "M2").unwrap();
    executor.create_item(big(), "B1").unwrap();
    executor.move_to_container(m1.id, big(), 1).unwrap();

    let reloaded = MoveExecutor::load(SqlitePositionStore::try_new(&conn).unwrap()).unwrap();

    assert_eq!(reloaded.items(), executor.items());
    assert_eq!(reloaded.containers().len(), 3);
}

#[test]
fn register_container_rejects_day_keys() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

    let err = executor
        .register_container(Container::day_bucket(date, None))
        .unwrap_err();
    assert!(matches!(err, EngineError::ContainerNotFound(_)));

    let list = executor
        .register_container(Container::list("todo", "To do"))
        .unwrap();
    assert_eq!(list.position, 3);
}

#[test]
fn day_lane_uses_its_category_capacity() {
    let conn = setup();
    let mut executor = planner(SqlitePositionStore::try_new(&conn).unwrap());
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let big_lane = ContainerKey::day_lane(day, "big");
    let medium_lane = ContainerKey::day_lane(day, "medium");
    for title in ["B1", "B2", "B3"] {
        executor.create_item(big_lane.clone(), title).unwrap();
    }

    let err = executor.create_item(big_lane.clone(), "B4").unwrap_err();
    assert!(matches!(
        err,
        EngineError::CapacityExceeded { ref container, capacity: 3 } if *container == big_lane
    ));

    let m1 = executor.create_item(medium_lane.clone(), "M1").unwrap();
    let err = executor
        .move_to_container(m1.id, big_lane.clone(), 0)
        .unwrap_err();
    assert!(matches!(err, EngineError::CapacityExceeded { .. }));
    assert_eq!(executor.items().get(m1.id).unwrap().container, medium_lane);
    assert_eq!(executor.items().active_count_in(&big_lane), 3);
}
