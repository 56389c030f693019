use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::record::{replay, JournalLine};
use crate::{DeploymentSnapshot, Journal, JournalError, JournalRecord};

/// In-memory journal, primarily for tests and dry runs. Same replay
/// semantics as the durable backends.
#[derive(Debug, Default, Clone)]
pub struct InMemoryJournal {
    lines: Arc<RwLock<HashMap<String, Vec<JournalLine>>>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records appended for a module (for testing).
    pub fn len(&self, module_id: &str) -> usize {
        self.lines
            .read()
            .unwrap()
            .get(module_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, module_id: &str) -> bool {
        self.len(module_id) == 0
    }
}

#[async_trait]
impl Journal for InMemoryJournal {
    async fn load(&self, module_id: &str) -> Result<DeploymentSnapshot, JournalError> {
        let lines = self.lines.read().unwrap();
        let module_lines = lines.get(module_id).cloned().unwrap_or_default();

        Ok(DeploymentSnapshot {
            module_id: module_id.to_string(),
            states: replay(&module_lines),
        })
    }

    async fn append(
        &self,
        module_id: &str,
        future_id: &str,
        record: JournalRecord,
    ) -> Result<(), JournalError> {
        let at = chrono::Utc::now().timestamp() as u64;
        self.lines
            .write()
            .unwrap()
            .entry(module_id.to_string())
            .or_default()
            .push(JournalLine::new(future_id, at, record));
        Ok(())
    }
}
