//! # Resolver Engine
//!
//! [`ResolverService`] owns the process-wide state of the resolver: the parameter
//! catalog, the value and constraint dependency graphs, the parsed-expression cache
//! and one [`ParameterContext`] per configuration. Hosts create one service and pass
//! it to whatever needs to resolve definitions.
//!
//! A resolve call runs these passes over a [`Definition`], mutating it in place:
//!
//! 1. acquire (or create) the context for the call and register new catalog keys
//! 2. build both dependency graphs, once, from the catalog
//! 3. sync the context's plain bindings with the definition and catalog defaults
//! 4. baseline pass: recompute `visible`, `min`, `max` and `mismatch` for every
//!    catalog key; the first evaluation failure aborts the whole call
//! 5. collect the keys transitively affected by the modified keys
//! 6. cascade: recompute, override, clamp and write each affected value in
//!    topological order; failures skip only the failing key
//! 7. recompute `visible` for every key whose visibility reads a touched key
//!
//! ```rust
//! use param_resolver::parameters::{Definition, ParameterType, SettingState, Value};
//! use param_resolver::resolver::{ResolveOptions, ResolverService};
//!
//! let mut definition = Definition::new("printer")
//!     .with_setting("x", SettingState::new(ParameterType::Float, 1.0))
//!     .with_setting(
//!         "y",
//!         SettingState::new(ParameterType::Float, 2.0).with_expr("x + 1"),
//!     );
//!
//! let mut resolver = ResolverService::new();
//! let modified = [("x".to_string(), Value::from(5.0))];
//! let report = resolver.resolve(&mut definition, &modified, &ResolveOptions::default());
//!
//! assert!(report.is_clean());
//! assert_eq!(definition.value("y"), Some(&Value::Number(6.0)));
//! ```

pub mod config;
#[cfg(feature = "shared")]
pub mod shared;

pub use config::{ResolveOptions, ResolverConfig};
#[cfg(feature = "shared")]
pub use shared::SharedResolver;

use crate::parameters::{
    Bounds, ContextState, Definition, DependencyGraph, EvaluationError, ExpressionCache,
    ParameterCatalog, ParameterContext, ParameterItem, ParameterType, Settings, Value,
};
use std::collections::HashMap;
use tracing::{debug, error, trace, warn};

/// Name of the graph built from value expressions
pub const VALUE_GRAPH: &str = "value";

/// Name of the graph built from visibility and bound expressions
pub const CONSTRAINT_GRAPH: &str = "constraint";

/// Summary of what a resolve call did
///
/// Evaluation failures never escape a resolve call; they are logged and collected
/// here instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveReport {
    /// Context the call resolved in
    pub context_key: String,

    /// Failure that aborted the baseline pass; the definition was left untouched
    pub aborted: Option<EvaluationError>,

    /// Keys whose value was written by the cascade, in write order
    pub updated: Vec<String>,

    /// Keys whose visibility was recomputed after the cascade
    pub visibility_updated: Vec<String>,

    /// Per-key failures skipped during the cascades
    pub failures: Vec<EvaluationError>,
}

impl ResolveReport {
    fn new(context_key: &str) -> Self {
        Self {
            context_key: context_key.to_string(),
            ..Self::default()
        }
    }

    /// Whether the baseline pass aborted the call
    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// Whether the call completed without any evaluation failure
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.failures.is_empty()
    }
}

/// Writes computed by the baseline pass, applied only if the pass completes
#[derive(Debug, Default)]
struct BaselineUpdate {
    key: String,
    visible: Option<bool>,
    min: Option<f64>,
    max: Option<f64>,
    mismatch: Option<bool>,
}

/// Owner of the catalog, dependency graphs and per-configuration contexts
#[derive(Debug, Clone)]
pub struct ResolverService {
    config: ResolverConfig,
    catalog: ParameterCatalog,
    value_graph: DependencyGraph,
    constraint_graph: DependencyGraph,
    contexts: HashMap<String, ParameterContext>,
    cache: ExpressionCache,
}

impl Default for ResolverService {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverService {
    /// Create a service with the default configuration
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    /// Create a service with a custom configuration
    pub fn with_config(config: ResolverConfig) -> Self {
        Self {
            cache: ExpressionCache::with_enabled(config.cache_expressions),
            config,
            catalog: ParameterCatalog::new(),
            value_graph: DependencyGraph::new(VALUE_GRAPH),
            constraint_graph: DependencyGraph::new(CONSTRAINT_GRAPH),
            contexts: HashMap::new(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Every parameter key seen so far with its calculation rules
    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    /// Graph of value-expression dependencies
    pub fn value_graph(&self) -> &DependencyGraph {
        &self.value_graph
    }

    /// Graph of visibility and bound-expression dependencies
    pub fn constraint_graph(&self) -> &DependencyGraph {
        &self.constraint_graph
    }

    /// Record the calculation rules of every new key in `definition`
    ///
    /// Keys already in the catalog keep their first-seen rules. Returns the number
    /// of keys added.
    pub fn register_definition(&mut self, definition: &Definition) -> usize {
        let mut added = 0;
        for (key, setting) in &definition.settings {
            if self.catalog.register(key, setting) {
                added += 1;
            }
        }
        added
    }

    /// Catalog entry for `key`, available before any resolve has run on it
    pub fn get_parameter_item(&self, key: &str) -> Option<&ParameterItem> {
        self.catalog.get(key)
    }

    /// Write `default_value` for each item without any recomputation
    ///
    /// Keys the definition does not declare, and category entries, are skipped.
    /// Returns the number of values written.
    pub fn apply_parameter_modifications(
        &self,
        definition: &mut Definition,
        items: &[(String, Value)],
    ) -> usize {
        let mut written = 0;
        for (key, value) in items {
            match definition.settings.get_mut(key) {
                Some(setting) if !setting.param_type.is_category() => {
                    setting.default_value = value.clone();
                    written += 1;
                }
                _ => trace!(key = %key, "Skipping modification of undeclared parameter"),
            }
        }
        written
    }

    /// Drop every context; the catalog and graphs are kept
    pub fn reset_all_contexts(&mut self) {
        debug!(contexts = self.contexts.len(), "Resetting all parameter contexts");
        self.contexts.clear();
    }

    /// Lifecycle state of the context stored under `context_key`
    pub fn context_state(&self, context_key: &str) -> ContextState {
        self.contexts
            .get(context_key)
            .map(ParameterContext::state)
            .unwrap_or(ContextState::Uninitialized)
    }

    /// Context stored under `context_key`
    pub fn context(&self, context_key: &str) -> Option<&ParameterContext> {
        self.contexts.get(context_key)
    }

    /// Number of live contexts
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Recompute derived state of `definition` after applying `modified_items`
    ///
    /// # Arguments
    ///
    /// * `definition` - The configuration to resolve; mutated in place
    /// * `modified_items` - Explicit `(key, value)` overrides applied during the cascade
    /// * `options` - Per-call options such as the context key
    ///
    /// # Returns
    ///
    /// A [`ResolveReport`] describing what was written and what failed. If the
    /// baseline pass fails the definition is left exactly as it was passed in.
    #[tracing::instrument(
        skip_all,
        fields(definition = %definition.definition_id, modified = modified_items.len())
    )]
    pub fn resolve(
        &mut self,
        definition: &mut Definition,
        modified_items: &[(String, Value)],
        options: &ResolveOptions,
    ) -> ResolveReport {
        let context_key = options
            .context_key
            .clone()
            .unwrap_or_else(|| definition.definition_id.clone());

        let added = self.register_definition(definition);
        if added > 0 {
            debug!(added, total = self.catalog.len(), "Registered new catalog entries");
        }

        let mut context = match self.contexts.remove(&context_key) {
            Some(context) => context,
            None => Self::create_context(&context_key, definition),
        };

        let report = self.run_passes(&mut context, definition, modified_items);
        self.contexts.insert(context_key, context);
        report
    }

    fn create_context(context_key: &str, definition: &Definition) -> ParameterContext {
        let mut context = ParameterContext::new(context_key);
        for (key, setting) in &definition.settings {
            if !setting.param_type.is_category() {
                context.define_property(key);
            }
        }
        debug!(context = context_key, "Created parameter context");
        context
    }

    fn run_passes(
        &mut self,
        context: &mut ParameterContext,
        definition: &mut Definition,
        modified_items: &[(String, Value)],
    ) -> ResolveReport {
        let mut report = ResolveReport::new(context.key());

        if self.value_graph.is_empty() && self.constraint_graph.is_empty() {
            self.build_graphs();
        }

        self.sync_context(context, definition);

        if let Err(err) = self.baseline_pass(context, definition) {
            warn!(
                key = %err.key,
                expression = %err.expression,
                error = %err.source,
                "Baseline pass failed, resolve aborted"
            );
            report.aborted = Some(err);
            return report;
        }

        let affected = self.affected_keys(modified_items);
        trace!(?affected, "Cascade order");

        self.cascade(context, definition, &affected, modified_items, &mut report);
        self.visibility_cascade(context, definition, &mut report);

        context.mark_ready();
        debug!(
            updated = report.updated.len(),
            visibility_updated = report.visibility_updated.len(),
            failures = report.failures.len(),
            "Resolve complete"
        );
        report
    }

    /// Build both graphs from the catalog and order them
    fn build_graphs(&mut self) {
        let Self {
            catalog,
            cache,
            value_graph,
            constraint_graph,
            ..
        } = self;

        for (key, item) in catalog.iter() {
            if let Some(expression) = &item.default_expr {
                add_edges(value_graph, cache, key, expression);
            }
            for expression in item.constraint_exprs() {
                add_edges(constraint_graph, cache, key, expression);
            }
        }

        for key in catalog.keys() {
            value_graph.add_key(key);
            constraint_graph.add_key(key);
        }

        for graph in [value_graph, constraint_graph] {
            let name = graph.name().to_string();
            match graph.compute_topological_order() {
                Ok(order) => debug!(graph = %name, nodes = order.len(), "Dependency graph ordered"),
                Err(err) => error!(graph = %name, error = %err, "Dependency graph is unorderable"),
            }
        }
    }

    /// Make every catalog key read the current value
    ///
    /// Keys the definition declares read through an accessor, installed here if
    /// the context was created by a definition without them. Keys the definition
    /// lacks read the catalog's stored default. Existing accessors are never
    /// replaced, since a shared context serves definitions with other key sets.
    fn sync_context(&self, context: &mut ParameterContext, definition: &Definition) {
        for (key, item) in self.catalog.iter() {
            match definition.settings.get(key) {
                Some(_) if context.is_accessor(key) => {}
                Some(_) => context.define_property(key),
                None => context.set_fallback(key, item.default_value.clone()),
            }
        }
    }

    /// Recompute visibility, bounds and mismatch for every catalog key
    ///
    /// Nothing is written unless every expression evaluates.
    fn baseline_pass(
        &mut self,
        context: &mut ParameterContext,
        definition: &mut Definition,
    ) -> Result<(), EvaluationError> {
        let epsilon = self.config.mismatch_epsilon;
        let settings = &definition.settings;
        let mut staged = Vec::new();

        for (key, item) in self.catalog.iter() {
            let Some(setting) = settings.get(key) else {
                trace!(key = %key, "Definition has no entry, using catalog default");
                continue;
            };

            let mut update = BaselineUpdate {
                key: key.clone(),
                ..BaselineUpdate::default()
            };

            if let Some(expression) = &item.visible_expr {
                let visible = context.execute(settings, &mut self.cache, key, expression)?;
                update.visible = Some(visible.truthy());
            }

            if let Some(expression) = &item.default_expr {
                let calculated = context.execute(settings, &mut self.cache, key, expression)?;
                update.mismatch = Some(is_mismatch(
                    item.param_type,
                    &calculated,
                    &setting.default_value,
                    epsilon,
                ));
            }

            if item.param_type.is_numeric() {
                let (min, max) = evaluate_limits(context, settings, &mut self.cache, item)?;
                update.min = min;
                update.max = max;
            }

            staged.push(update);
        }

        for update in staged {
            if let Some(setting) = definition.settings.get_mut(&update.key) {
                if update.visible.is_some() {
                    setting.visible = update.visible;
                }
                if update.min.is_some() {
                    setting.min = update.min;
                }
                if update.max.is_some() {
                    setting.max = update.max;
                }
                if let Some(mismatch) = update.mismatch {
                    setting.mismatch = mismatch;
                }
            }
        }

        Ok(())
    }

    /// Keys transitively affected by the modifications, in topological order
    fn affected_keys(&self, modified_items: &[(String, Value)]) -> Vec<String> {
        let roots = modified_items.iter().filter_map(|(key, _)| {
            if self.catalog.contains(key) {
                Some(key.as_str())
            } else {
                debug!(key = %key, "Skipping modification of unknown parameter");
                None
            }
        });

        let mut affected: Vec<String> = self
            .value_graph
            .transitive_affects(roots)
            .into_iter()
            .collect();
        self.value_graph.sort_by_order(&mut affected);
        affected
    }

    /// Recompute, override, clamp and write each affected key
    fn cascade(
        &mut self,
        context: &mut ParameterContext,
        definition: &mut Definition,
        affected: &[String],
        modified_items: &[(String, Value)],
        report: &mut ResolveReport,
    ) {
        let epsilon = self.config.mismatch_epsilon;

        for key in affected {
            let Some(item) = self.catalog.get(key) else {
                continue;
            };

            let calculated = match &item.default_expr {
                Some(expression) => {
                    match context.execute(&definition.settings, &mut self.cache, key, expression) {
                        Ok(value) => value,
                        Err(err) => {
                            log_failure(&err);
                            report.failures.push(err);
                            continue;
                        }
                    }
                }
                None => Value::Undefined,
            };

            let modification = modified_items
                .iter()
                .rev()
                .find(|(modified, _)| modified == key)
                .map(|(_, value)| value.clone());
            let mut value = modification.unwrap_or_else(|| calculated.clone());

            if item.param_type.is_numeric() {
                let limits =
                    evaluate_limits(context, &definition.settings, &mut self.cache, item);
                let (min, max) = match limits {
                    Ok(limits) => limits,
                    Err(err) => {
                        log_failure(&err);
                        report.failures.push(err);
                        continue;
                    }
                };

                let mut bounds = Bounds::from_limits(min, max);
                if let Some(setting) = definition.settings.get_mut(key) {
                    if min.is_some() {
                        setting.min = min;
                    }
                    if max.is_some() {
                        setting.max = max;
                    }
                    bounds = Bounds::from_limits(setting.min, setting.max);
                }

                if self.config.clamp_to_bounds && bounds.is_bounded() {
                    if let Value::Number(n) = value {
                        value = Value::Number(bounds.clamp(n));
                    }
                }
            }

            if value.is_undefined() {
                trace!(key = %key, "Nothing calculated, value left as is");
                continue;
            }

            context.assign(&mut definition.settings, key, value);

            if item.has_expr() {
                let current = context.get(&definition.settings, key);
                if let Some(setting) = definition.settings.get_mut(key) {
                    setting.mismatch = is_mismatch(item.param_type, &calculated, &current, epsilon);
                }
            }

            report.updated.push(key.clone());
        }
    }

    /// Recompute visibility of keys whose visibility reads a touched key
    fn visibility_cascade(
        &mut self,
        context: &mut ParameterContext,
        definition: &mut Definition,
        report: &mut ResolveReport,
    ) {
        if report.updated.is_empty() {
            return;
        }

        let mut keys: Vec<String> = self
            .constraint_graph
            .transitive_affects(report.updated.iter().map(String::as_str))
            .into_iter()
            .collect();
        self.constraint_graph.sort_by_order(&mut keys);

        for key in keys {
            let Some(expression) = self
                .catalog
                .get(&key)
                .and_then(|item| item.visible_expr.as_ref())
            else {
                continue;
            };
            if !definition.contains(&key) {
                continue;
            }

            match context.execute(&definition.settings, &mut self.cache, &key, expression) {
                Ok(visible) => {
                    if let Some(setting) = definition.settings.get_mut(&key) {
                        setting.visible = Some(visible.truthy());
                    }
                    report.visibility_updated.push(key);
                }
                Err(err) => {
                    log_failure(&err);
                    report.failures.push(err);
                }
            }
        }
    }
}

/// Add an edge from `key` to every parameter `expression` reads
fn add_edges(
    graph: &mut DependencyGraph,
    cache: &mut ExpressionCache,
    key: &str,
    expression: &str,
) {
    match cache.get_or_parse(expression) {
        Ok(parsed) => {
            for dependency in parsed.variables() {
                graph.add_dependency(key, &dependency);
            }
        }
        Err(err) => warn!(
            key,
            expression,
            error = %err,
            "Expression does not parse, no dependencies recorded"
        ),
    }
}

/// Evaluate the bound expressions of a numeric parameter
fn evaluate_limits(
    context: &mut ParameterContext,
    settings: &Settings,
    cache: &mut ExpressionCache,
    item: &ParameterItem,
) -> Result<(Option<f64>, Option<f64>), EvaluationError> {
    let mut limit = |expression: &Option<String>| -> Result<Option<f64>, EvaluationError> {
        match expression {
            Some(expression) => Ok(context
                .execute(settings, cache, &item.key, expression)?
                .to_bound()),
            None => Ok(None),
        }
    };

    let min = limit(&item.min_expr)?;
    let max = limit(&item.max_expr)?;
    Ok((min, max))
}

/// Whether the live value diverges from the calculated one
///
/// An undefined calculation never mismatches. Numeric parameters compare within
/// `epsilon`, everything else strictly.
fn is_mismatch(param_type: ParameterType, calculated: &Value, current: &Value, epsilon: f64) -> bool {
    if calculated.is_undefined() {
        return false;
    }

    if param_type.is_numeric() {
        (calculated.to_number() - current.to_number()).abs() > epsilon
    } else {
        !calculated.strict_eq(current)
    }
}

fn log_failure(err: &EvaluationError) {
    warn!(
        key = %err.key,
        expression = %err.expression,
        error = %err.source,
        "Expression evaluation failed, parameter skipped"
    );
}
