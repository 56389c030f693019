use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use crate::record::{replay, JournalLine};
use crate::{DeploymentSnapshot, Journal, JournalError, JournalRecord};

/// Durable journal: one JSONL file per module, one record per line.
///
/// Appends are a single write of a complete line. On load, a trailing line
/// that does not parse (torn by a crash mid-write) is skipped; every earlier
/// record replays unaffected.
#[derive(Debug, Clone)]
pub struct FileJournal {
    dir: PathBuf,
}

impl FileJournal {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, module_id: &str) -> PathBuf {
        // Module ids may contain separators (`mod:Token`); keep filenames flat.
        let safe: String = module_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.jsonl"))
    }

    fn read_lines(path: &Path) -> Result<Vec<JournalLine>, JournalError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let raw_lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut lines = Vec::with_capacity(raw_lines.len());
        for (index, raw) in raw_lines.iter().enumerate() {
            match serde_json::from_str::<JournalLine>(raw) {
                Ok(line) => lines.push(line),
                Err(e) if index + 1 == raw_lines.len() => {
                    // Torn tail from an interrupted append.
                    warn!(path = %path.display(), error = %e, "skipping torn journal tail");
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "skipping unreadable journal line"
                    );
                }
            }
        }
        Ok(lines)
    }
}

#[async_trait]
impl Journal for FileJournal {
    async fn load(&self, module_id: &str) -> Result<DeploymentSnapshot, JournalError> {
        let lines = Self::read_lines(&self.path_for(module_id))?;
        Ok(DeploymentSnapshot {
            module_id: module_id.to_string(),
            states: replay(&lines),
        })
    }

    async fn append(
        &self,
        module_id: &str,
        future_id: &str,
        record: JournalRecord,
    ) -> Result<(), JournalError> {
        fs::create_dir_all(&self.dir)?;

        let at = chrono::Utc::now().timestamp() as u64;
        let line = serde_json::to_string(&JournalLine::new(future_id, at, record))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(module_id))?;
        writeln!(file, "{line}")?;
        file.sync_data()?;
        Ok(())
    }
}
