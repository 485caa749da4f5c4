//! Parsed-expression cache
//!
//! Every expression string is parsed at most once; later evaluations reuse the
//! stored tree. Parse failures are cached as well so a broken expression is not
//! re-parsed on every pass.

use crate::parameters::expression::{Expression, ExpressionError};
use std::collections::HashMap;
use std::sync::Arc;

/// Cache of parsed expressions keyed by their source text
#[derive(Debug, Clone)]
pub struct ExpressionCache {
    entries: HashMap<String, Result<Arc<Expression>, ExpressionError>>,
    enabled: bool,
}

impl ExpressionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Create a cache that can be switched off (every lookup re-parses)
    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            entries: HashMap::new(),
            enabled,
        }
    }

    /// Get the parsed form of `source`, parsing it on first use
    pub fn get_or_parse(&mut self, source: &str) -> Result<Arc<Expression>, ExpressionError> {
        if !self.enabled {
            return Expression::parse(source).map(Arc::new);
        }

        if let Some(entry) = self.entries.get(source) {
            return entry.clone();
        }

        let parsed = Expression::parse(source).map(Arc::new);
        self.entries.insert(source.to_string(), parsed.clone());
        parsed
    }

    /// Number of cached expressions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new()
    }
}
