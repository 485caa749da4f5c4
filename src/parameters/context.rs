//! Per-configuration evaluation contexts
//!
//! A [`ParameterContext`] holds the live variable bindings that expressions are
//! evaluated against. Parameter keys are usually bound as accessors: the context
//! stores no copy of the value, reads and writes go straight to the backing
//! definition's `default_value`. Every read of a bound variable during an
//! execution is recorded so callers can see which properties an expression used.

use crate::parameters::cache::ExpressionCache;
use crate::parameters::definition::SettingState;
use crate::parameters::expression::{Builtin, EvaluationContext, EvaluationError};
use crate::parameters::value::Value;
use indexmap::{IndexMap, IndexSet};

/// Lifecycle of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No context exists for the key
    Uninitialized,

    /// Context and accessor bindings exist
    Built,

    /// At least one full resolve pass completed
    Ready,
}

/// How a variable is bound inside a context
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Accessor backed by `settings[key].default_value`
    ///
    /// Holds the value read and written when the settings lack the key.
    Setting(Value),

    /// Plain value stored in the context
    Value(Value),

    /// Helper function or namespace
    Helper(Builtin),
}

/// Settings map a context's accessors resolve against
pub type Settings = IndexMap<String, SettingState>;

/// Live variable bindings for one configuration
#[derive(Debug, Clone)]
pub struct ParameterContext {
    key: String,
    bindings: IndexMap<String, Binding>,
    used: IndexSet<String>,
    state: ContextState,
}

impl ParameterContext {
    /// Create an empty context with helpers installed
    pub fn new(key: &str) -> Self {
        let mut context = Self {
            key: key.to_string(),
            bindings: IndexMap::new(),
            used: IndexSet::new(),
            state: ContextState::Built,
        };
        context.install_helpers();
        context
    }

    /// Key this context is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current lifecycle state
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Record that a full resolve pass completed
    pub fn mark_ready(&mut self) {
        self.state = ContextState::Ready;
    }

    /// Bind every top-level helper under its expression name
    pub fn install_helpers(&mut self) {
        for builtin in Builtin::TOP_LEVEL {
            self.bindings
                .insert(builtin.name().to_string(), Binding::Helper(builtin));
        }
    }

    /// Replace the live variable map with plain values
    ///
    /// Accessor bindings are dropped; helpers are reinstalled.
    pub fn set_context<I, K, V>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.bindings.clear();
        self.install_helpers();
        for (key, value) in bindings {
            self.bindings
                .insert(key.into(), Binding::Value(value.into()));
        }
    }

    /// Bind `key` to a plain value, replacing any accessor
    pub fn set_value(&mut self, key: &str, value: impl Into<Value>) {
        self.bindings
            .insert(key.to_string(), Binding::Value(value.into()));
    }

    /// Set what `key` reads when the settings lack it
    ///
    /// Accessors keep writing through and only swap their fallback. Any other
    /// key becomes a plain value.
    pub fn set_fallback(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(Binding::Setting(fallback)) = self.bindings.get_mut(key) {
            *fallback = value;
            return;
        }
        self.bindings.insert(key.to_string(), Binding::Value(value));
    }

    /// Install an accessor for `key` backed by the settings' `default_value`
    pub fn define_property(&mut self, key: &str) {
        self.bindings
            .insert(key.to_string(), Binding::Setting(Value::Undefined));
    }

    /// How `key` is bound, if at all
    pub fn binding(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(key)
    }

    /// Whether `key` is backed by an accessor
    pub fn is_accessor(&self, key: &str) -> bool {
        matches!(self.bindings.get(key), Some(Binding::Setting(_)))
    }

    /// Read a variable without recording the access
    pub fn get(&self, settings: &Settings, key: &str) -> Value {
        match self.bindings.get(key) {
            Some(Binding::Setting(fallback)) => settings
                .get(key)
                .map(|s| s.default_value.clone())
                .unwrap_or_else(|| fallback.clone()),
            Some(Binding::Value(value)) => value.clone(),
            Some(Binding::Helper(builtin)) => Value::Builtin(*builtin),
            None => Value::Undefined,
        }
    }

    /// Write a variable
    ///
    /// Accessor-backed keys write through to the settings, or into the
    /// accessor's fallback when `settings` lacks the key. Anything else is
    /// stored as a plain value.
    pub fn assign(&mut self, settings: &mut Settings, key: &str, value: Value) {
        if let Some(Binding::Setting(fallback)) = self.bindings.get_mut(key) {
            match settings.get_mut(key) {
                Some(setting) => setting.default_value = value,
                None => *fallback = value,
            }
            return;
        }
        self.bindings.insert(key.to_string(), Binding::Value(value));
    }

    /// Keys read since the last execution started
    pub fn used_properties(&self) -> &IndexSet<String> {
        &self.used
    }

    /// Execute `expression` on behalf of parameter `key`
    ///
    /// Clears the used-properties set first, then parses (through the cache) and
    /// evaluates the expression against this context and `settings`.
    pub fn execute(
        &mut self,
        settings: &Settings,
        cache: &mut ExpressionCache,
        key: &str,
        expression: &str,
    ) -> Result<Value, EvaluationError> {
        self.used.clear();

        let to_error = |source| EvaluationError {
            key: key.to_string(),
            expression: expression.to_string(),
            source,
        };

        let parsed = cache.get_or_parse(expression).map_err(to_error)?;
        let mut scope = Scope {
            context: self,
            settings,
        };
        parsed.evaluate(&mut scope).map_err(to_error)
    }
}

/// A context paired with the settings its accessors read from
pub struct Scope<'a> {
    context: &'a mut ParameterContext,
    settings: &'a Settings,
}

impl<'a> Scope<'a> {
    /// Pair a context with its backing settings
    pub fn new(context: &'a mut ParameterContext, settings: &'a Settings) -> Self {
        Self { context, settings }
    }
}

impl EvaluationContext for Scope<'_> {
    fn read_variable(&mut self, name: &str) -> Value {
        match self.context.bindings.get(name) {
            Some(Binding::Helper(builtin)) => Value::Builtin(*builtin),
            Some(_) => {
                self.context.used.insert(name.to_string());
                self.context.get(self.settings, name)
            }
            None => Value::Undefined,
        }
    }
}
