use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{
    CollectionPath, DocPath, Document, DocumentStore, Fields, MemoryStore, Query, StoreError,
    WriteBatch,
};

/// A [`MemoryStore`] mirrored to a single JSON file.
///
/// Every write is staged on a copy, persisted through a temp file in the same
/// directory and renamed into place; the in-memory view only advances once
/// the file is on disk.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    #[tracing::instrument(skip(path))]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let inner = if path.exists() {
            let raw = fs::read_to_string(path)?;
            if raw.trim().is_empty() {
                MemoryStore::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            MemoryStore::new()
        };

        info!(
            file = %path.display(),
            documents = inner.document_count(),
            "opened file store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    fn write_with<T>(
        &mut self,
        f: impl FnOnce(&mut MemoryStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut staged = self.inner.clone();
        let out = f(&mut staged)?;
        save_atomic(&self.path, &staged)?;
        self.inner = staged;
        Ok(out)
    }
}

impl DocumentStore for FileStore {
    fn add(&mut self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        self.write_with(|store| store.add(collection, fields))
    }

    fn get(&self, doc: &DocPath) -> Result<Option<Document>, StoreError> {
        self.inner.get(doc)
    }

    fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, query)
    }

    fn update(&mut self, doc: &DocPath, fields: Fields) -> Result<(), StoreError> {
        self.write_with(|store| store.update(doc, fields))
    }

    fn delete(&mut self, doc: &DocPath) -> Result<(), StoreError> {
        self.write_with(|store| store.delete(doc))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        self.write_with(|store| store.commit(batch))
    }
}

#[tracing::instrument(skip(path, store))]
fn save_atomic(path: &Path, store: &MemoryStore) -> Result<(), StoreError> {
    debug!(
        file = %path.display(),
        documents = store.document_count(),
        "saving store atomically"
    );

    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, store)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| StoreError::Persist(format!("{}: {}", path.display(), err)))?;

    Ok(())
}
