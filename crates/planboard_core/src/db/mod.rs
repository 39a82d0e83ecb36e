//! Position-store database bootstrap.
//!
//! # Responsibility
//! - Open planboard databases (file or in-memory) with the pragmas the
//!   position store relies on.
//! - Bring the `containers`/`items` schema up to the version this build
//!   understands.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - A database written by a newer build is refused, never downgraded.
//! - No item or container row is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Errors from opening or migrating a planboard database.
#[derive(Debug)]
pub enum DbError {
    /// Connection or pragma failure outside any migration step.
    Sqlite(rusqlite::Error),
    /// One migration script failed; the whole upgrade was rolled back and
    /// `user_version` is unchanged.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// File was written by a build with a newer ordering schema.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration { version, source } => {
                write!(f, "planboard migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "planboard schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
