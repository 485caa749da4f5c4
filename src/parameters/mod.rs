//! # Parameter System
//!
//! Building blocks of the resolver: the machine-profile data model, the expression
//! language parameters are written in, per-configuration evaluation contexts and the
//! dependency graphs that order recomputation.
//!
//! ## Core Components
//!
//! - [`Definition`] and [`SettingState`]: the host-facing configuration the resolver mutates
//! - [`ParameterCatalog`]: first-seen calculation rules of every parameter key
//! - [`Expression`] and [`Value`]: parse and evaluate parameter expressions
//! - [`ParameterContext`]: live bindings for one configuration, recording every read
//! - [`DependencyGraph`]: dependency/affects relations with a topological order
//! - [`Bounds`]: clamping of numeric values
//!
//! ## Example Usage
//!
//! ```rust
//! use param_resolver::parameters::{Expression, SimpleContext, Value};
//!
//! let expr = Expression::parse("round(line_width * 2, 1)").unwrap();
//! assert_eq!(expr.variables(), vec!["line_width".to_string()]);
//!
//! let mut context = SimpleContext::new();
//! context.set_variable("line_width", 0.44);
//! assert_eq!(expr.evaluate(&mut context).unwrap(), Value::Number(0.9));
//! ```

pub mod bounds;
pub mod cache;
pub mod catalog;
pub mod context;
pub mod definition;
pub mod expression;
pub mod graph;
pub mod value;


pub use bounds::Bounds;
pub use cache::ExpressionCache;
pub use catalog::{CatalogError, ParameterCatalog, ParameterItem};
pub use context::{Binding, ContextState, ParameterContext, Settings};
pub use definition::{Definition, DefinitionError, ParameterType, SettingState};
pub use expression::{
    Builtin, EvaluationContext, EvaluationError, Expression, ExpressionError, SimpleContext,
};
pub use graph::{DependencyGraph, GraphError};
pub use value::Value;
