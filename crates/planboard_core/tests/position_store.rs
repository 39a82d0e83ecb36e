use chrono::NaiveDate;
use planboard_core::db::migrations::latest_version;
use planboard_core::db::{open_db, open_db_in_memory, DbError};
use planboard_core::{
    Container, ContainerKey, Item, PositionStore, PositionUpdate, SqlitePositionStore, StoreError,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "containers");
    assert_table_exists(&conn, "items");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("planboard.db");

    let conn_first = open_db(&path).unwrap();
    let store = SqlitePositionStore::try_new(&conn_first).unwrap();
    store
        .save_container(&Container::category("big", Some(3)))
        .unwrap();
    drop(store);
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    let store = SqlitePositionStore::try_new(&conn_second).unwrap();
    let containers = store.load_containers().unwrap();
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].capacity, Some(3));
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn failed_migration_names_its_version_and_leaves_schema_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clashing.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE items (legacy TEXT);").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::Migration { version, .. } => assert_eq!(version, 1),
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
    let containers: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'containers';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(containers, 0);
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqlitePositionStore::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn day_keys_round_trip_through_storage() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePositionStore::try_new(&conn).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
    let key = ContainerKey::day_lane(date, "big");
    let mut item = Item::new(key.clone(), "call plumber");
    item.completed = true;

    store.insert_item(&item).unwrap();
    let loaded = store.load_container(&key).unwrap();

    assert_eq!(loaded, vec![item]);
    let raw: String = conn
        .query_row("SELECT container_key FROM items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(raw, "day:2024-05-06/big");
}

#[test]
fn position_batch_with_missing_row_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePositionStore::try_new(&conn).unwrap();
    let key = ContainerKey::list("todo");
    let mut first = Item::new(key.clone(), "first");
    first.position = 0;
    store.insert_item(&first).unwrap();

    let ghost = Uuid::new_v4();
    let err = store
        .save_item_positions(&[
            PositionUpdate {
                id: first.id,
                container: key.clone(),
                position: 5,
            },
            PositionUpdate {
                id: ghost,
                container: key.clone(),
                position: 0,
            },
        ])
        .unwrap_err();

    assert!(matches!(err, StoreError::ItemNotFound(id) if id == ghost));
    assert_eq!(store.load_container(&key).unwrap()[0].position, 0);
}

#[test]
fn delete_with_renumbering_is_one_batch() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePositionStore::try_new(&conn).unwrap();
    let key = ContainerKey::list("todo");
    let mut first = Item::new(key.clone(), "first");
    let mut second = Item::new(key.clone(), "second");
    first.position = 0;
    second.position = 1;
    store.insert_item(&first).unwrap();
    store.insert_item(&second).unwrap();

    store
        .delete_item(
            first.id,
            &[PositionUpdate {
                id: second.id,
                container: key.clone(),
                position: 0,
            }],
        )
        .unwrap();

    let remaining = store.load_container(&key).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    assert_eq!(remaining[0].position, 0);
    assert!(matches!(
        store.delete_item(first.id, &[]).unwrap_err(),
        StoreError::ItemNotFound(_)
    ));
}

#[test]
fn container_rank_updates_require_registered_rows() {
    let conn = open_db_in_memory().unwrap();
    let store = SqlitePositionStore::try_new(&conn).unwrap();
    let mut big = Container::category("big", Some(3));
    store.save_container(&big).unwrap();

    big.position = 2;
    store.save_container_positions(&[big.clone()]).unwrap();
    assert_eq!(store.load_containers().unwrap()[0].position, 2);

    let unknown = Container::list("ghost", "Ghost");
    assert!(matches!(
        store.save_container_positions(&[unknown]).unwrap_err(),
        StoreError::InvalidData(_)
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "expected table `{table_name}` to exist");
}
