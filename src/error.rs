use crate::parameters::{
    CatalogError, DefinitionError, EvaluationError, ExpressionError, GraphError,
};
use thiserror::Error;

/// Error types for the param-resolver library.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Expression failed to parse or evaluate.
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// A parameter's expression failed during a resolve pass.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Dependency graph could not be ordered.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Catalog lookup for a key that was never registered.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Definition-level failure (missing entry, loading).
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for param-resolver operations.
pub type Result<T> = std::result::Result<T, ResolverError>;
