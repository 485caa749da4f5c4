//! Host-facing parameter definitions
//!
//! A [`Definition`] is the object the host hands to the resolver: an id plus the
//! materialized state of every setting. The resolver mutates `default_value`,
//! `min`, `max`, `visible` and `mismatch` in place and the host re-renders from it.

use crate::parameters::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when working with definitions
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Setting '{key}' is not present in definition '{definition}'")]
    MissingEntry { definition: String, key: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Kind of a parameter, as spelled by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    #[serde(rename = "float")]
    Float,

    #[serde(rename = "int")]
    Int,

    #[serde(rename = "bool")]
    Bool,

    #[serde(rename = "enum")]
    Enum,

    #[serde(rename = "string", alias = "str")]
    String,

    #[serde(rename = "color")]
    Color,

    /// Grouping entry, carries no expressions
    #[serde(rename = "category")]
    Category,

    /// Top-level grouping entry, carries no expressions
    #[serde(rename = "mainCategory")]
    MainCategory,
}

impl ParameterType {
    /// Numeric types get bounds, clamping and epsilon mismatch comparison
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParameterType::Float | ParameterType::Int)
    }

    /// Category entries are excluded from the catalog and the graphs
    pub fn is_category(&self) -> bool {
        matches!(self, ParameterType::Category | ParameterType::MainCategory)
    }
}

/// Materialized state of one setting inside a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingState {
    /// Kind of the parameter
    #[serde(rename = "type")]
    pub param_type: ParameterType,

    /// Current (live) value
    #[serde(default, skip_serializing_if = "Value::is_undefined")]
    pub default_value: Value,

    /// Current lower bound, numeric types only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Current upper bound, numeric types only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Current visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    /// Whether the live value diverges from the calculated value
    #[serde(default)]
    pub mismatch: bool,

    /// Expression computing the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calcu_value: Option<String>,

    /// Expression computing the lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_expr: Option<String>,

    /// Expression computing the upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_expr: Option<String>,

    /// Expression computing visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_expr: Option<String>,
}

impl SettingState {
    /// Create a literal setting with the given type and value
    ///
    /// # Examples
    ///
    /// ```
    /// use param_resolver::parameters::{ParameterType, SettingState, Value};
    ///
    /// let setting = SettingState::new(ParameterType::Float, 0.2);
    /// assert_eq!(setting.default_value, Value::Number(0.2));
    /// assert!(setting.calcu_value.is_none());
    /// ```
    pub fn new(param_type: ParameterType, default_value: impl Into<Value>) -> Self {
        Self {
            param_type,
            default_value: default_value.into(),
            min: None,
            max: None,
            visible: None,
            mismatch: false,
            calcu_value: None,
            min_expr: None,
            max_expr: None,
            visible_expr: None,
        }
    }

    /// Create a category entry
    pub fn category() -> Self {
        Self::new(ParameterType::Category, Value::Undefined)
    }

    /// Set the value expression
    pub fn with_expr(mut self, expr: &str) -> Self {
        self.calcu_value = Some(expr.to_string());
        self
    }

    /// Set the lower-bound expression
    pub fn with_min_expr(mut self, expr: &str) -> Self {
        self.min_expr = Some(expr.to_string());
        self
    }

    /// Set the upper-bound expression
    pub fn with_max_expr(mut self, expr: &str) -> Self {
        self.max_expr = Some(expr.to_string());
        self
    }

    /// Set the visibility expression
    pub fn with_visible_expr(mut self, expr: &str) -> Self {
        self.visible_expr = Some(expr.to_string());
        self
    }
}

/// A machine configuration as seen by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    /// Unique id, the default context key
    #[serde(rename = "definitionId")]
    pub definition_id: String,

    /// Settings by key, in declaration order
    #[serde(default)]
    pub settings: IndexMap<String, SettingState>,
}

impl Definition {
    /// Create an empty definition
    pub fn new(definition_id: &str) -> Self {
        Self {
            definition_id: definition_id.to_string(),
            settings: IndexMap::new(),
        }
    }

    /// Builder-style insertion of a setting
    ///
    /// # Examples
    ///
    /// ```
    /// use param_resolver::parameters::{Definition, ParameterType, SettingState};
    ///
    /// let definition = Definition::new("printer")
    ///     .with_setting("layer_height", SettingState::new(ParameterType::Float, 0.2))
    ///     .with_setting(
    ///         "initial_layer_height",
    ///         SettingState::new(ParameterType::Float, 0.3).with_expr("layer_height * 1.5"),
    ///     );
    /// assert_eq!(definition.len(), 2);
    /// ```
    pub fn with_setting(mut self, key: &str, setting: SettingState) -> Self {
        self.insert(key, setting);
        self
    }

    /// Insert or replace a setting
    pub fn insert(&mut self, key: &str, setting: SettingState) -> Option<SettingState> {
        self.settings.insert(key.to_string(), setting)
    }

    /// Get a setting by key
    pub fn get(&self, key: &str) -> Option<&SettingState> {
        self.settings.get(key)
    }

    /// Get a mutable setting by key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut SettingState> {
        self.settings.get_mut(key)
    }

    /// Get a setting that must exist
    pub fn require(&self, key: &str) -> Result<&SettingState, DefinitionError> {
        self.settings
            .get(key)
            .ok_or_else(|| DefinitionError::MissingEntry {
                definition: self.definition_id.clone(),
                key: key.to_string(),
            })
    }

    /// Current value of a setting
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.settings.get(key).map(|s| &s.default_value)
    }

    /// Check whether the definition declares a setting
    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(key)
    }

    /// Number of settings
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Whether the definition declares no settings
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Setting keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.settings.keys()
    }

    /// Load a definition from a JSON string
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the definition to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String, DefinitionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a definition from a JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, DefinitionError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_json(&contents)
    }
}
