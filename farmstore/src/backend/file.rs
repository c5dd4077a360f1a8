use super::Backend;
use crate::document::Document;
use crate::error::{FarmStoreError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// The document as a single JSON file.
///
/// Writes go to a temporary file in the same directory, are synced, and are
/// then renamed over the target, so readers see the old file or the new one.
pub struct FileBackend {
    path: PathBuf,
    pretty: bool,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackend {
            path: path.into(),
            pretty: true,
        }
    }

    /// Write compact JSON instead of the indented default.
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl Backend for FileBackend {
    fn name(&self) -> &'static str {
        "json"
    }

    fn load(&self) -> Result<Option<Document>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Document::from_json(&raw)
            .map(Some)
            .map_err(|e| match e {
                FarmStoreError::CorruptState(msg) => FarmStoreError::CorruptState(format!(
                    "{}: {msg}",
                    self.path.display()
                )),
                other => other,
            })
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let json = doc.to_json(self.pretty)?;
        let dir = self.directory();
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        sync_dir(dir)?;

        log::debug!("Wrote {} bytes to {}", json.len(), self.path.display());
        Ok(())
    }
}

/// Flush the directory entry so the rename itself survives a power loss.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    std::fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
