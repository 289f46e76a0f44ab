//! Filesystem-backed artifact store.
//!
//! Artifacts are written to a temp file in the store directory and atomically
//! renamed into place, so a concurrent reader never observes a half-written
//! blob and a rebuild can swap artifacts under live readers.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::traits::ArtifactStore;

/// Well-known artifact names.
pub const INDEX_ARTIFACT: &str = "index.json";
pub const CHUNK_STORE_ARTIFACT: &str = "chunk_store.json";
pub const DOC_EMBEDDINGS_ARTIFACT: &str = "doc_embeddings.json";

pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Operation(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl ArtifactStore for FsArtifactStore {
    fn get(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name);
        if !path.exists() {
            return Err(Error::MissingArtifact(name.to_string()));
        }
        std::fs::read(&path).map_err(|e| Error::CorruptArtifact {
            name: name.to_string(),
            cause: e.to_string(),
        })
    }

    fn put(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| Error::Operation(format!("cannot create temp file: {e}")))?;
        std::io::Write::write_all(&mut tmp, bytes)
            .map_err(|e| Error::Operation(format!("cannot write artifact {name}: {e}")))?;
        tmp.persist(self.path_of(name))
            .map_err(|e| Error::Operation(format!("cannot persist artifact {name}: {e}")))?;
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }
}
