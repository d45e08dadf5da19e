use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// Sink for forensic copies of rows about to be deleted. One JSON file per
/// deleted row, keyed by entity type and id. Opened once at startup; the
/// directory is created eagerly so a missing path fails the boot, not the
/// first delete.
#[derive(Debug)]
pub struct AuditSink {
    dir: PathBuf,
}

impl AuditSink {
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(AuditSink { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the field set of a row that is about to be removed. Callers
    /// strip `created_at`/`updated_at` before handing the value over.
    pub async fn record(&self, entity_type: &str, id: i32, data: &Value) -> io::Result<()> {
        let path = self.dir.join(format!("{entity_type}_{id}.json"));
        let body = serde_json::to_vec_pretty(data)?;
        tokio::fs::write(path, body).await
    }
}
