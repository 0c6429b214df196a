use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{
    CollectionPath, DocPath, Document, DocumentStore, Fields, Query, StoreError, WriteBatch,
    WriteOp,
};

/// Collections keyed by path, documents keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    fn apply(&mut self, op: WriteOp) -> Result<(), StoreError> {
        match op {
            WriteOp::Set(doc, fields) => {
                trace!(doc = %doc, "set");
                self.collections
                    .entry(doc.collection.as_str().to_string())
                    .or_default()
                    .insert(doc.id, fields);
                Ok(())
            }
            WriteOp::Update(doc, fields) => {
                trace!(doc = %doc, "update");
                let existing = self
                    .collections
                    .get_mut(doc.collection.as_str())
                    .and_then(|docs| docs.get_mut(&doc.id))
                    .ok_or_else(|| StoreError::NotFound(doc.clone()))?;
                existing.extend(fields);
                Ok(())
            }
            WriteOp::Delete(doc) => {
                trace!(doc = %doc, "delete");
                let docs = self
                    .collections
                    .get_mut(doc.collection.as_str())
                    .ok_or_else(|| StoreError::NotFound(doc.clone()))?;
                if docs.remove(&doc.id).is_none() {
                    return Err(StoreError::NotFound(doc));
                }
                if docs.is_empty() {
                    self.collections.remove(doc.collection.as_str());
                }
                Ok(())
            }
        }
    }
}

impl DocumentStore for MemoryStore {
    fn add(&mut self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let id = self.allocate_id();
        self.apply(WriteOp::Set(collection.doc(&id), fields))?;
        debug!(collection = %collection, id = %id, "added document");
        Ok(id)
    }

    fn get(&self, doc: &DocPath) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .get(doc.collection.as_str())
            .and_then(|docs| docs.get(&doc.id))
            .map(|fields| Document {
                id: doc.id.clone(),
                fields: fields.clone(),
            }))
    }

    fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        let Some(docs) = self.collections.get(collection.as_str()) else {
            return Ok(vec![]);
        };
        let out: Vec<Document> = docs
            .iter()
            .filter(|(_, fields)| query.matches(fields))
            .map(|(id, fields)| Document {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        debug!(collection = %collection, count = out.len(), "query");
        Ok(out)
    }

    fn update(&mut self, doc: &DocPath, fields: Fields) -> Result<(), StoreError> {
        self.apply(WriteOp::Update(doc.clone(), fields))
    }

    fn delete(&mut self, doc: &DocPath) -> Result<(), StoreError> {
        self.apply(WriteOp::Delete(doc.clone()))
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        let ops = batch.len();
        let mut staged = self.clone();
        for op in batch.into_ops() {
            staged.apply(op)?;
        }
        *self = staged;
        debug!(ops, "committed batch");
        Ok(())
    }
}
