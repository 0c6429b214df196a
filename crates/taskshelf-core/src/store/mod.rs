//! Document store seam.
//!
//! Documents live in collections addressed by slash-separated paths
//! (`lists`, `lists/{listId}/tasks`). A document is a flat JSON object keyed
//! by an opaque identifier. Sub-collections are independent of their parent
//! document: deleting `lists/{id}` leaves `lists/{id}/tasks` untouched.

mod file;
mod memory;

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde_json::{Map, Value};

pub use file::FileStore;
pub use memory::MemoryStore;

pub type Fields = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocPath),
    #[error("invalid collection path: {0:?}")]
    InvalidPath(String),
    #[error("failed to decode {path}: {reason}")]
    Decode { path: DocPath, reason: String },
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("failed to persist store: {0}")]
    Persist(String),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top-level collection such as `lists`.
    pub fn root(name: &str) -> Result<Self, StoreError> {
        validate_segment(name)?;
        Ok(Self(name.to_string()))
    }

    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let segments: Vec<&str> = raw.split('/').collect();
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(raw.to_string()));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(raw.to_string()))
    }

    pub fn doc(&self, id: &str) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocPath {
    pub collection: CollectionPath,
    pub id: String,
}

impl DocPath {
    /// A sub-collection nested under this document.
    pub fn collection(&self, name: &str) -> Result<CollectionPath, StoreError> {
        validate_segment(name)?;
        validate_segment(&self.id)?;
        Ok(CollectionPath(format!(
            "{}/{}/{}",
            self.collection, self.id, name
        )))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

fn validate_segment(segment: &str) -> Result<(), StoreError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(StoreError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl FieldFilter {
    pub fn matches(&self, fields: &Fields) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };
        if self.op == Op::Eq {
            return actual == &self.value;
        }
        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
        }
    }
}

/// Conjunction of field filters. An empty query reads the whole collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<FieldFilter>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.where_op(field, Op::Eq, value)
    }

    pub fn where_op(mut self, field: &str, op: Op, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters.iter().all(|filter| filter.matches(fields))
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite.
    Set(DocPath, Fields),
    /// Merge into an existing document.
    Update(DocPath, Fields),
    /// Remove an existing document.
    Delete(DocPath),
}

/// Ordered writes applied all-or-nothing by [`DocumentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, doc: DocPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Set(doc, fields));
        self
    }

    pub fn update(&mut self, doc: DocPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Update(doc, fields));
        self
    }

    pub fn delete(&mut self, doc: DocPath) -> &mut Self {
        self.ops.push(WriteOp::Delete(doc));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serde(serde_json::Error::custom(format!(
            "document must encode to an object, got {other}"
        )))),
    }
}

pub fn decode<T: DeserializeOwned>(path: &DocPath, fields: &Fields) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(fields.clone())).map_err(|err| StoreError::Decode {
        path: path.clone(),
        reason: err.to_string(),
    })
}

pub trait DocumentStore {
    /// Fresh identifier for a document that does not exist yet.
    fn allocate_id(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    fn add(&mut self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError>;

    fn get(&self, doc: &DocPath) -> Result<Option<Document>, StoreError>;

    fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError>;

    fn update(&mut self, doc: &DocPath, fields: Fields) -> Result<(), StoreError>;

    fn delete(&mut self, doc: &DocPath) -> Result<(), StoreError>;

    /// Applies every write or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &mut S {
    fn allocate_id(&self) -> String {
        (**self).allocate_id()
    }

    fn add(&mut self, collection: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        (**self).add(collection, fields)
    }

    fn get(&self, doc: &DocPath) -> Result<Option<Document>, StoreError> {
        (**self).get(doc)
    }

    fn query(
        &self,
        collection: &CollectionPath,
        query: &Query,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).query(collection, query)
    }

    fn update(&mut self, doc: &DocPath, fields: Fields) -> Result<(), StoreError> {
        (**self).update(doc, fields)
    }

    fn delete(&mut self, doc: &DocPath) -> Result<(), StoreError> {
        (**self).delete(doc)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CollectionPath, Fields, Op, Query};

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn nested_paths_alternate_collection_and_document() {
        let lists = CollectionPath::root("lists").expect("root path");
        let tasks = lists.doc("abc").collection("tasks").expect("sub path");
        assert_eq!(tasks.as_str(), "lists/abc/tasks");
        assert_eq!(tasks.doc("t1").to_string(), "lists/abc/tasks/t1");

        assert!(CollectionPath::parse("lists/abc").is_err());
        assert!(CollectionPath::parse("lists//tasks").is_err());
        assert!(CollectionPath::parse("lists/abc/tasks").is_ok());
    }

    #[test]
    fn range_filters_compare_strings_and_numbers() {
        let doc = fields(json!({ "dueDate": "2026-10-15", "rank": 3 }));

        assert!(Query::all().where_op("dueDate", Op::Ge, "2026-10-15").matches(&doc));
        assert!(!Query::all().where_op("dueDate", Op::Gt, "2026-10-15").matches(&doc));
        assert!(Query::all().where_op("rank", Op::Lt, 4).matches(&doc));
        assert!(!Query::all().where_op("rank", Op::Lt, "4").matches(&doc));
        assert!(!Query::all().where_eq("missing", "x").matches(&doc));
    }
}
