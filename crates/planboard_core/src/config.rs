//! Planner configuration.
//!
//! # Responsibility
//! - Declare planner categories and their active-item capacities.
//! - Carry view and logging defaults for embedding applications.
//!
//! # Invariants
//! - Category names are non-blank and unique.
//! - Declared capacities are at least 1.

use crate::engine::view::ViewOptions;
use crate::logging::default_log_level;
use crate::model::container::Container;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// One planner category declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    /// Maximum active items; absent means unbounded.
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// Engine-level configuration loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Categories in display order.
    pub categories: Vec<CategoryConfig>,
    /// Log level used when the host does not pass one explicitly.
    pub log_level: Option<String>,
    pub completed_overflow_visible: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                CategoryConfig {
                    name: "big".to_string(),
                    capacity: Some(3),
                },
                CategoryConfig {
                    name: "medium".to_string(),
                    capacity: None,
                },
                CategoryConfig {
                    name: "little".to_string(),
                    capacity: None,
                },
            ],
            log_level: None,
            completed_overflow_visible: true,
        }
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read planner config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse planner config: {err}"),
            Self::Invalid(message) => write!(f, "invalid planner config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl PlannerConfig {
    /// Parses and validates a JSON document. Missing fields use defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = Vec::new();
        for category in &self.categories {
            let name = category.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid(
                    "category name must not be blank".to_string(),
                ));
            }
            if seen.contains(&name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate category `{name}`"
                )));
            }
            if category.capacity == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "category `{name}` capacity must be at least 1"
                )));
            }
            seen.push(name);
        }
        Ok(())
    }

    /// Category containers to register, ranked in declaration order.
    pub fn seed_containers(&self) -> Vec<Container> {
        self.categories
            .iter()
            .enumerate()
            .map(|(index, category)| {
                let mut container =
                    Container::category(category.name.trim(), category.capacity);
                container.position = index as i64;
                container
            })
            .collect()
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            completed_overflow_visible: self.completed_overflow_visible,
        }
    }

    /// Configured log level, or the build-mode default.
    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }
}
