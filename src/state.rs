use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Demo document assembled line by line from stdin edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub lines: Vec<String>,
}

/// JSON snapshot store writing atomically via a temp file and rename.
pub struct DocumentStore {
    path: PathBuf,
}

impl DocumentStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load the last snapshot, resetting to an empty document if the file
    /// is missing or not valid JSON.
    pub fn load(&self) -> io::Result<Document> {
        match fs::read_to_string(&self.path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(doc) => Ok(doc),
                Err(_) => {
                    tracing::warn!("corrupted snapshot {:?}, resetting", self.path);
                    Ok(Document::default())
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e),
        }
    }

    /// Write a snapshot atomically using a temporary file and rename.
    pub fn save(&self, doc: &Document) -> io::Result<()> {
        let data = serde_json::to_vec(doc)?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("doc.json"));
        let doc = Document {
            lines: vec!["one".into(), "two".into()],
        };
        store.save(&doc).unwrap();
        assert_eq!(store.load().unwrap(), doc);
    }

    #[test]
    fn test_missing_snapshot_is_empty() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");
        fs::write(&path, b"not json").unwrap();
        let store = DocumentStore::new(path);
        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_atomic_overwrite() {
        let dir = tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("doc.json"));
        store
            .save(&Document {
                lines: vec!["first".into()],
            })
            .unwrap();
        store
            .save(&Document {
                lines: vec!["second".into()],
            })
            .unwrap();
        assert_eq!(store.load().unwrap().lines, vec!["second"]);
    }
}
