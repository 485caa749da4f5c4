//! Process-wide parameter catalog
//!
//! The catalog records the calculation rules of every distinct parameter key seen
//! across all definitions. The first definition to declare a key wins; later
//! declarations of the same key are ignored.

use crate::parameters::definition::{ParameterType, SettingState};
use crate::parameters::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when querying the catalog
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Unknown parameter '{key}'")]
    UnknownParameter { key: String },
}

/// Calculation rules recorded for one parameter key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterItem {
    /// Parameter key
    pub key: String,

    /// Kind of the parameter
    #[serde(rename = "type")]
    pub param_type: ParameterType,

    /// Value declared by the first definition, used when a definition lacks the key
    pub default_value: Value,

    /// Value expression
    pub default_expr: Option<String>,

    /// Lower-bound expression
    pub min_expr: Option<String>,

    /// Upper-bound expression
    pub max_expr: Option<String>,

    /// Visibility expression
    pub visible_expr: Option<String>,
}

/// Treat empty and whitespace-only expressions as absent
fn non_empty(expr: &Option<String>) -> Option<String> {
    expr.as_ref()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

impl ParameterItem {
    /// Capture the rules declared by a setting
    pub fn from_setting(key: &str, setting: &SettingState) -> Self {
        Self {
            key: key.to_string(),
            param_type: setting.param_type,
            default_value: setting.default_value.clone(),
            default_expr: non_empty(&setting.calcu_value),
            min_expr: non_empty(&setting.min_expr),
            max_expr: non_empty(&setting.max_expr),
            visible_expr: non_empty(&setting.visible_expr),
        }
    }

    /// Whether the value is computed rather than literal
    pub fn has_expr(&self) -> bool {
        self.default_expr.is_some()
    }

    /// Expressions feeding the constraint graph (visibility and bounds)
    pub fn constraint_exprs(&self) -> impl Iterator<Item = &str> {
        [&self.visible_expr, &self.min_expr, &self.max_expr]
            .into_iter()
            .filter_map(|e| e.as_deref())
    }
}

/// Registry of every distinct parameter key seen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterCatalog {
    items: IndexMap<String, ParameterItem>,
}

impl ParameterCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Record `key` unless it is a category or already known
    ///
    /// Returns `true` if a new entry was created.
    pub fn register(&mut self, key: &str, setting: &SettingState) -> bool {
        if setting.param_type.is_category() || self.items.contains_key(key) {
            return false;
        }

        self.items
            .insert(key.to_string(), ParameterItem::from_setting(key, setting));
        true
    }

    /// Get an entry by key
    pub fn get(&self, key: &str) -> Option<&ParameterItem> {
        self.items.get(key)
    }

    /// Get an entry that must exist
    pub fn require(&self, key: &str) -> Result<&ParameterItem, CatalogError> {
        self.items
            .get(key)
            .ok_or_else(|| CatalogError::UnknownParameter {
                key: key.to_string(),
            })
    }

    /// Check whether a key is known
    pub fn contains(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Number of known keys
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no key has been seen yet
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Known keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterItem)> {
        self.items.iter()
    }
}
