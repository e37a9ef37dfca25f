//! Error types for definitions assembly, resources and single-unit execution.

use thiserror::Error;

/// Kind of component, used to give errors context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Asset,
    AssetCheck,
    Job,
    Schedule,
    Sensor,
    Resource,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ComponentKind::Asset => "asset",
            ComponentKind::AssetCheck => "asset check",
            ComponentKind::Job => "job",
            ComponentKind::Schedule => "schedule",
            ComponentKind::Sensor => "sensor",
            ComponentKind::Resource => "resource",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised while loading modules or assembling [`crate::Definitions`].
///
/// All of them are fatal: a host that receives one must not start.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DefinitionsError {
    /// Two components of the same kind share a name.
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: ComponentKind, name: String },

    /// A component name is empty or contains characters outside `[A-Za-z0-9_]`.
    #[error("Invalid {kind} name: {name:?}")]
    InvalidName { kind: ComponentKind, name: String },

    /// An asset check targets an asset that is not registered.
    #[error("Asset check {check} targets unknown asset {asset}")]
    MissingCheckTarget { check: String, asset: String },

    /// A component requires a resource key that is not registered.
    #[error("{component} requires resource {resource:?}, which is not provided")]
    MissingResource { component: String, resource: String },

    /// A job selection names an asset that is not registered.
    #[error("Job {job} selects unknown asset {asset}")]
    UnresolvedSelection { job: String, asset: String },

    /// Lookup by name failed.
    #[error("{kind} not found: {name}")]
    NotFound { kind: ComponentKind, name: String },
}

/// Errors raised when a resource is used.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Opening the database failed after all retries.
    #[error("Failed to open DuckDB database {database:?}: {source}")]
    Connection {
        database: String,
        #[source]
        source: duckdb::Error,
    },

    /// No resource under the requested key.
    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// Errors raised while materializing one asset, running one check or
/// evaluating one sensor tick.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Definitions(#[from] DefinitionsError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// SQL error reported by DuckDB.
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    /// The asset has no SQL body to run.
    #[error("Asset {0} has no computation attached")]
    NoComputation(String),

    /// A SQL parameter has no value in the run config.
    #[error("Run config for {asset} is missing field {field:?}")]
    MissingConfig { asset: String, field: String },

    /// A check query returned something other than a single count.
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    /// Sensor evaluation failed.
    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_display() {
        let err = DefinitionsError::DuplicateName {
            kind: ComponentKind::Asset,
            name: "products".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate asset name: products");
    }

    #[test]
    fn test_missing_resource_display() {
        let err = DefinitionsError::MissingResource {
            component: "asset products".to_string(),
            resource: "duckdb".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "asset products requires resource \"duckdb\", which is not provided"
        );
    }

    #[test]
    fn test_execution_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such dir");
        let err: ExecutionError = io_err.into();
        assert!(matches!(err, ExecutionError::Io(_)));
    }
}
