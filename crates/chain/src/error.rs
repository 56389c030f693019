use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("artifact not found: {name}")]
    ArtifactNotFound { name: String },

    #[error("rpc error: {reason}")]
    Rpc { reason: String },

    #[error("state store error: {reason}")]
    Store { reason: String },
}
