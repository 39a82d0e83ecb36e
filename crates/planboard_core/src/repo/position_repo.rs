//! Position store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist item/container ordering writes produced by the engine.
//! - Serve fresh container snapshots for resync after failed writes.
//!
//! # Invariants
//! - `save_item_positions` and `delete_item` run inside one immediate
//!   transaction; a missing row aborts the whole batch.
//! - Container keys are stored in their canonical text form.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::container::{Container, ContainerKey};
use crate::model::item::{Item, ItemId, PositionUpdate};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    item_uuid,
    container_key,
    position,
    completed,
    title
FROM items";

const CONTAINER_SELECT_SQL: &str = "SELECT
    container_key,
    title,
    capacity,
    position
FROM containers";

/// Result type used by position store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from position store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target item row does not exist.
    ItemNotFound(ItemId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Store refused the write without touching any row.
    Rejected(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item row not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "position store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted ordering data: {message}"),
            Self::Rejected(reason) => write!(f, "write rejected: {reason}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence collaborator consumed by the move executor.
pub trait PositionStore {
    /// Persists one batch of `(id, container, position)` writes.
    fn save_item_positions(&self, updates: &[PositionUpdate]) -> StoreResult<()>;
    /// Deletes one item and persists the renumbered followers with it.
    fn delete_item(&self, id: ItemId, renumbered: &[PositionUpdate]) -> StoreResult<()>;
    /// Inserts one new item row.
    fn insert_item(&self, item: &Item) -> StoreResult<()>;
    /// Persists field edits (`title`, `completed`) that do not affect order.
    fn update_item(&self, item: &Item) -> StoreResult<()>;
    /// Loads one container's items in position order.
    fn load_container(&self, key: &ContainerKey) -> StoreResult<Vec<Item>>;
    /// Loads every item.
    fn load_all_items(&self) -> StoreResult<Vec<Item>>;
    /// Inserts or updates one registered container.
    fn save_container(&self, container: &Container) -> StoreResult<()>;
    /// Loads registered containers in position order.
    fn load_containers(&self) -> StoreResult<Vec<Container>>;
    /// Persists one batch of container rank writes.
    fn save_container_positions(&self, containers: &[Container]) -> StoreResult<()>;
    /// Whether multi-row batches are applied atomically.
    fn supports_atomic_batches(&self) -> bool {
        true
    }
}

/// SQLite-backed position store.
pub struct SqlitePositionStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePositionStore<'conn> {
    /// Creates store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn query_items(&self, sql: &str, key: Option<&ContainerKey>) -> StoreResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match key {
            Some(key) => stmt.query([key.to_string()])?,
            None => stmt.query([])?,
        };
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }
}

impl PositionStore for SqlitePositionStore<'_> {
    fn save_item_positions(&self, updates: &[PositionUpdate]) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        write_positions(&tx, updates)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_item(&self, id: ItemId, renumbered: &[PositionUpdate]) -> StoreResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let deleted = tx.execute(
            "DELETE FROM items WHERE item_uuid = ?1;",
            [id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StoreError::ItemNotFound(id));
        }
        write_positions(&tx, renumbered)?;
        tx.commit()?;
        Ok(())
    }

    fn insert_item(&self, item: &Item) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO items (
                item_uuid,
                container_key,
                position,
                completed,
                title
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                item.id.to_string(),
                item.container.to_string(),
                item.position,
                bool_to_int(item.completed),
                item.title.as_str(),
            ],
        )?;
        Ok(())
    }

    fn update_item(&self, item: &Item) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET completed = ?2,
                 title = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![
                item.id.to_string(),
                bool_to_int(item.completed),
                item.title.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::ItemNotFound(item.id));
        }
        Ok(())
    }

    fn load_container(&self, key: &ContainerKey) -> StoreResult<Vec<Item>> {
        self.query_items(
            &format!(
                "{ITEM_SELECT_SQL}
                 WHERE container_key = ?1
                 ORDER BY position ASC, item_uuid ASC;"
            ),
            Some(key),
        )
    }

    fn load_all_items(&self) -> StoreResult<Vec<Item>> {
        self.query_items(
            &format!("{ITEM_SELECT_SQL} ORDER BY container_key ASC, position ASC, item_uuid ASC;"),
            None,
        )
    }

    fn save_container(&self, container: &Container) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO containers (container_key, title, capacity, position)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(container_key) DO UPDATE SET
                title = excluded.title,
                capacity = excluded.capacity,
                position = excluded.position,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                container.key.to_string(),
                container.title.as_str(),
                container.capacity,
                container.position,
            ],
        )?;
        Ok(())
    }

    fn load_containers(&self) -> StoreResult<Vec<Container>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONTAINER_SELECT_SQL} ORDER BY position ASC, container_key ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut containers = Vec::new();
        while let Some(row) = rows.next()? {
            containers.push(parse_container_row(row)?);
        }
        Ok(containers)
    }

    fn save_container_positions(&self, containers: &[Container]) -> StoreResult<()> {
        if containers.is_empty() {
            return Ok(());
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for container in containers {
            let changed = tx.execute(
                "UPDATE containers
                 SET position = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE container_key = ?1;",
                params![container.key.to_string(), container.position],
            )?;
            if changed == 0 {
                return Err(StoreError::InvalidData(format!(
                    "container `{}` is not registered",
                    container.key
                )));
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn write_positions(tx: &Transaction<'_>, updates: &[PositionUpdate]) -> StoreResult<()> {
    for update in updates {
        let changed = tx.execute(
            "UPDATE items
             SET container_key = ?2,
                 position = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![
                update.id.to_string(),
                update.container.to_string(),
                update.position,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::ItemNotFound(update.id));
        }
    }
    Ok(())
}

fn parse_item_row(row: &Row<'_>) -> StoreResult<Item> {
    let id_text: String = row.get("item_uuid")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid `{id_text}` in items.item_uuid"))
    })?;

    let key_text: String = row.get("container_key")?;
    let container = parse_container_key(&key_text, "items.container_key")?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid completed value `{other}` in items.completed"
            )));
        }
    };

    Ok(Item {
        id,
        container,
        position: row.get("position")?,
        completed,
        title: row.get("title")?,
    })
}

fn parse_container_row(row: &Row<'_>) -> StoreResult<Container> {
    let key_text: String = row.get("container_key")?;
    Ok(Container {
        key: parse_container_key(&key_text, "containers.container_key")?,
        title: row.get("title")?,
        capacity: row.get("capacity")?,
        position: row.get("position")?,
    })
}

fn parse_container_key(value: &str, column: &'static str) -> StoreResult<ContainerKey> {
    value
        .parse()
        .map_err(|err| StoreError::InvalidData(format!("{err} in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
