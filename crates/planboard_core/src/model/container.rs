//! Container model and canonical container keys.
//!
//! # Responsibility
//! - Identify the bucket an item lives in (category, list column, or day).
//! - Carry optional capacity limits for active items.
//!
//! # Invariants
//! - Text form is `category:<name>`, `list:<id>`, `day:<YYYY-MM-DD>` or
//!   `day:<YYYY-MM-DD>/<lane>` and round-trips through `FromStr`.
//! - Day buckets never declare a capacity of their own; lanes borrow their
//!   category's limit at resolution time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Identity of one container.
///
/// Ordering is `Category < List < Day`, days by date then lane, which keeps
/// `BTreeMap` iteration deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerKey {
    /// Planner category such as `big`, `medium` or `little`.
    Category(String),
    /// Kanban list/column.
    List(String),
    /// Implicit day bucket, optionally split by a category lane.
    Day {
        date: NaiveDate,
        lane: Option<String>,
    },
}

/// Structural kind of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Category,
    List,
    DayBucket,
}

impl ContainerKey {
    /// Category key.
    pub fn category(name: impl Into<String>) -> Self {
        Self::Category(name.into())
    }

    /// Kanban list key.
    pub fn list(id: impl Into<String>) -> Self {
        Self::List(id.into())
    }

    /// Day bucket key without a lane.
    pub fn day(date: NaiveDate) -> Self {
        Self::Day { date, lane: None }
    }

    /// Day bucket key for one category lane.
    pub fn day_lane(date: NaiveDate, lane: impl Into<String>) -> Self {
        Self::Day {
            date,
            lane: Some(lane.into()),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::Category(_) => ContainerKind::Category,
            Self::List(_) => ContainerKind::List,
            Self::Day { .. } => ContainerKind::DayBucket,
        }
    }

    /// Returns the bucket date for day keys.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Day { date, .. } => Some(*date),
            _ => None,
        }
    }

    /// Returns the same lane on another day. `None` for non-day keys.
    pub fn on_day(&self, new_date: NaiveDate) -> Option<Self> {
        match self {
            Self::Day { lane, .. } => Some(Self::Day {
                date: new_date,
                lane: lane.clone(),
            }),
            _ => None,
        }
    }
}

impl Display for ContainerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Category(name) => write!(f, "category:{name}"),
            Self::List(id) => write!(f, "list:{id}"),
            Self::Day { date, lane: None } => write!(f, "day:{}", date.format(DAY_FORMAT)),
            Self::Day {
                date,
                lane: Some(lane),
            } => write!(f, "day:{}/{lane}", date.format(DAY_FORMAT)),
        }
    }
}

/// Errors from parsing a container key text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerKeyError {
    /// Value has no `<kind>:` prefix.
    MissingKind(String),
    /// Prefix is not one of `category|list|day`.
    UnknownKind(String),
    /// Name, id or lane is blank.
    EmptyName(String),
    /// Day part is not `YYYY-MM-DD`.
    InvalidDate(String),
}

impl Display for ContainerKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingKind(value) => write!(f, "container key has no kind prefix: `{value}`"),
            Self::UnknownKind(kind) => write!(f, "unknown container kind `{kind}`"),
            Self::EmptyName(value) => write!(f, "container key has an empty name: `{value}`"),
            Self::InvalidDate(value) => write!(f, "invalid day bucket date `{value}`"),
        }
    }
}

impl Error for ContainerKeyError {}

impl FromStr for ContainerKey {
    type Err = ContainerKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = value
            .split_once(':')
            .ok_or_else(|| ContainerKeyError::MissingKind(value.to_string()))?;
        if rest.trim().is_empty() {
            return Err(ContainerKeyError::EmptyName(value.to_string()));
        }

        match kind {
            "category" => Ok(Self::Category(rest.to_string())),
            "list" => Ok(Self::List(rest.to_string())),
            "day" => {
                let (date_text, lane) = match rest.split_once('/') {
                    Some((_, lane)) if lane.trim().is_empty() => {
                        return Err(ContainerKeyError::EmptyName(value.to_string()));
                    }
                    Some((date_text, lane)) => (date_text, Some(lane.to_string())),
                    None => (rest, None),
                };
                let date = NaiveDate::parse_from_str(date_text, DAY_FORMAT)
                    .map_err(|_| ContainerKeyError::InvalidDate(date_text.to_string()))?;
                Ok(Self::Day { date, lane })
            }
            other => Err(ContainerKeyError::UnknownKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for ContainerKey {
    type Error = ContainerKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContainerKey> for String {
    fn from(value: ContainerKey) -> Self {
        value.to_string()
    }
}

/// One named ordered bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Canonical container identity.
    pub key: ContainerKey,
    /// User-facing label.
    pub title: String,
    /// Maximum count of active items. `None` means unbounded.
    pub capacity: Option<u32>,
    /// Rank among sibling containers (board column order).
    pub position: i64,
}

impl Container {
    /// Creates a planner category container.
    pub fn category(name: impl Into<String>, capacity: Option<u32>) -> Self {
        let name = name.into();
        Self {
            key: ContainerKey::Category(name.clone()),
            title: name,
            capacity,
            position: 0,
        }
    }

    /// Creates an unbounded kanban list container.
    pub fn list(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: ContainerKey::List(id.into()),
            title: title.into(),
            capacity: None,
            position: 0,
        }
    }

    /// Materialises the implicit container behind a day key.
    pub fn day_bucket(date: NaiveDate, lane: Option<String>) -> Self {
        let title = match &lane {
            Some(lane) => format!("{} {lane}", date.format(DAY_FORMAT)),
            None => date.format(DAY_FORMAT).to_string(),
        };
        Self {
            key: ContainerKey::Day { date, lane },
            title,
            capacity: None,
            position: 0,
        }
    }

    /// Sets an active-item capacity limit.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn kind(&self) -> ContainerKind {
        self.key.kind()
    }

    /// Returns whether one more active item would exceed capacity.
    pub fn is_full(&self, active_count: usize) -> bool {
        match self.capacity {
            Some(capacity) => active_count >= capacity as usize,
            None => false,
        }
    }
}
