//! Configuration options for the resolver.
//!
//! [`ResolverConfig`] holds service-wide settings and is loadable from JSON.
//! [`ResolveOptions`] carries the per-call options of a resolve pass.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Service-wide resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Tolerance used when comparing numeric values for mismatch. Default: 1e-6
    pub mismatch_epsilon: f64,

    /// Clamp cascaded numeric values into their recomputed bounds. Default: true
    pub clamp_to_bounds: bool,

    /// Parse each expression string once and reuse the tree. Default: true
    pub cache_expressions: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mismatch_epsilon: 1e-6,
            clamp_to_bounds: true,
            cache_expressions: true,
        }
    }
}

impl ResolverConfig {
    /// Load a configuration from a JSON string; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the mismatch tolerance
    pub fn with_mismatch_epsilon(mut self, epsilon: f64) -> Self {
        self.mismatch_epsilon = epsilon;
        self
    }

    /// Enable or disable clamping during the cascade
    pub fn with_clamp_to_bounds(mut self, clamp: bool) -> Self {
        self.clamp_to_bounds = clamp;
        self
    }

    /// Enable or disable the parsed-expression cache
    pub fn with_cache_expressions(mut self, cache: bool) -> Self {
        self.cache_expressions = cache;
        self
    }
}

/// Options for a single resolve call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Context to resolve in; defaults to the definition's id
    pub context_key: Option<String>,
}

impl ResolveOptions {
    /// Resolve in the named context instead of the definition's own
    pub fn with_context_key(mut self, key: &str) -> Self {
        self.context_key = Some(key.to_string());
        self
    }
}
