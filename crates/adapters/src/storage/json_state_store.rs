use std::io;
use std::path::PathBuf;

use domain::alert::entity::AlertRecord;
use domain::alert::error::AlertError;
use ports::secondary::state_store::StateStore;

/// Persistent registry snapshot backed by a single JSON file.
///
/// The file holds the JSON array of all currently active records and is
/// replaced wholesale on every save: the new snapshot is written to a
/// sibling temp file and renamed into place, so a crash mid-write leaves
/// the previous snapshot intact.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<Vec<AlertRecord>, AlertError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AlertError::LoadFailed(format!(
                    "read {}: {e}",
                    self.path.display()
                )));
            }
        };

        match serde_json::from_str(&content) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "snapshot file is malformed, starting with an empty registry"
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, records: &[AlertRecord]) -> Result<(), AlertError> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| AlertError::StoreFailed(format!("serialize snapshot: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AlertError::StoreFailed(format!("create {}: {e}", parent.display()))
                })?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| AlertError::StoreFailed(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AlertError::StoreFailed(format!("rename {}: {e}", tmp.display())))?;
        Ok(())
    }
}
