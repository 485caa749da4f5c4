//! Thread-safe handle to a [`ResolverService`].
//!
//! Resolve calls must not interleave: catalog registration, the one-time graph
//! build and cascaded context writes all mutate shared state. A single
//! `parking_lot::Mutex` serialises every call made through the handle.

use super::{ResolveOptions, ResolveReport, ResolverConfig, ResolverService};
use crate::parameters::{ContextState, Definition, ParameterItem, Value};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, lock-guarded resolver shared between threads
#[derive(Debug, Clone, Default)]
pub struct SharedResolver {
    inner: Arc<Mutex<ResolverService>>,
}

impl SharedResolver {
    /// Wrap an existing service
    pub fn new(service: ResolverService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    /// Create a handle around a fresh service with `config`
    pub fn with_config(config: ResolverConfig) -> Self {
        Self::new(ResolverService::with_config(config))
    }

    /// Lock the service for a sequence of operations
    pub fn lock(&self) -> MutexGuard<'_, ResolverService> {
        self.inner.lock()
    }

    /// See [`ResolverService::resolve`]
    pub fn resolve(
        &self,
        definition: &mut Definition,
        modified_items: &[(String, Value)],
        options: &ResolveOptions,
    ) -> ResolveReport {
        self.inner.lock().resolve(definition, modified_items, options)
    }

    /// See [`ResolverService::get_parameter_item`]; the entry is cloned out of the lock
    pub fn get_parameter_item(&self, key: &str) -> Option<ParameterItem> {
        self.inner.lock().get_parameter_item(key).cloned()
    }

    /// See [`ResolverService::apply_parameter_modifications`]
    pub fn apply_parameter_modifications(
        &self,
        definition: &mut Definition,
        items: &[(String, Value)],
    ) -> usize {
        self.inner
            .lock()
            .apply_parameter_modifications(definition, items)
    }

    /// See [`ResolverService::reset_all_contexts`]
    pub fn reset_all_contexts(&self) {
        self.inner.lock().reset_all_contexts();
    }

    /// See [`ResolverService::context_state`]
    pub fn context_state(&self, context_key: &str) -> ContextState {
        self.inner.lock().context_state(context_key)
    }
}
