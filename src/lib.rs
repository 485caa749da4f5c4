//! # param-resolver
//!
//! `param-resolver` maintains a machine-configuration model: named parameters whose
//! values, bounds and visibility are defined by small expressions over other
//! parameters. When a subset of parameters is modified, the resolver recomputes
//! every derived value in dependency order and writes the results back into the
//! host's definition.
//!
//! The library provides:
//! - A safe expression language, parsed once and interpreted against recorded lookups
//! - Value and constraint dependency graphs with deterministic topological ordering
//!   and cycle detection
//! - Incremental, ordered re-evaluation of only the affected parameters
//! - Mismatch tracking between live and calculated values
//!
//! ## Basic Usage
//!
//! ```
//! use param_resolver::parameters::{Definition, ParameterType, SettingState, Value};
//! use param_resolver::resolver::{ResolveOptions, ResolverService};
//!
//! let mut definition = Definition::new("printer")
//!     .with_setting("layer_height", SettingState::new(ParameterType::Float, 0.2))
//!     .with_setting(
//!         "initial_layer_height",
//!         SettingState::new(ParameterType::Float, 0.3)
//!             .with_expr("layer_height * 1.5")
//!             .with_max_expr("0.4"),
//!     );
//!
//! let mut resolver = ResolverService::new();
//! let modified = [("layer_height".to_string(), Value::from(0.4))];
//! resolver.resolve(&mut definition, &modified, &ResolveOptions::default());
//!
//! // 0.4 * 1.5 clamped to the upper bound
//! assert_eq!(definition.value("initial_layer_height"), Some(&Value::Number(0.4)));
//! ```

pub mod error;

// Parameter system
pub mod parameters;

// Resolver engine
pub mod resolver;

// Re-exports for convenience
pub use error::{ResolverError, Result};
pub use parameters::{Definition, ParameterType, SettingState, Value};
pub use resolver::{ResolveOptions, ResolveReport, ResolverConfig, ResolverService};

#[cfg(feature = "shared")]
pub use resolver::SharedResolver;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
