use thiserror::Error;

/// Structural errors detected at module construction. Nothing in this
/// category ever reaches execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("duplicate future id: {id}")]
    DuplicateFutureId { id: String },

    #[error("future {future_id} references unknown future {missing}")]
    MissingDependency { future_id: String, missing: String },

    #[error("result binding {key} references unknown future {missing}")]
    MissingResultTarget { key: String, missing: String },

    #[error("dependency cycle: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },
}
