use std::collections::HashMap;

use caravan_types::Artifact;

use crate::ChainError;

/// Where compiled artifacts come from. Lookup failures fail the owning
/// future at validation time, before any network interaction.
pub trait ArtifactSource: Send + Sync {
    fn get_artifact(&self, name: &str) -> Result<Artifact, ChainError>;

    fn has_artifact(&self, name: &str) -> bool;
}

/// Artifact source backed by a plain map. Useful for tests and for callers
/// that load artifacts ahead of time.
#[derive(Debug, Default, Clone)]
pub struct InMemoryArtifacts {
    artifacts: HashMap<String, Artifact>,
}

impl InMemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, artifact: Artifact) {
        self.artifacts
            .insert(artifact.contract_name.clone(), artifact);
    }

    pub fn with(mut self, artifact: Artifact) -> Self {
        self.insert(artifact);
        self
    }
}

impl ArtifactSource for InMemoryArtifacts {
    fn get_artifact(&self, name: &str) -> Result<Artifact, ChainError> {
        self.artifacts
            .get(name)
            .cloned()
            .ok_or_else(|| ChainError::ArtifactNotFound {
                name: name.to_string(),
            })
    }

    fn has_artifact(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }
}
