//! CRUD over the per-user `lists` collection.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::error::{Error, Result, ValidationError};
use crate::model::{LISTS, List, ListDoc, TASKS};
use crate::store::{CollectionPath, DocumentStore, Fields, Query, StoreError, WriteBatch, encode};

pub fn collection() -> Result<CollectionPath, StoreError> {
    CollectionPath::root(LISTS)
}

pub fn tasks_collection(list_id: &str) -> Result<CollectionPath, StoreError> {
    collection()?.doc(list_id).collection(TASKS)
}

/// Lists owned by `uid`, sorted by name ascending.
#[tracing::instrument(skip(store))]
pub fn fetch_all<S: DocumentStore + ?Sized>(
    store: &S,
    uid: &str,
) -> Result<Vec<List>, StoreError> {
    let lists = collection()?;
    let mut out = store
        .query(&lists, &Query::all().where_eq("uid", uid))?
        .iter()
        .map(|doc| List::from_document(&lists.doc(&doc.id), doc))
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(count = out.len(), "fetched lists");
    Ok(out)
}

pub fn find_by_name<'a>(lists: &'a [List], name: &str) -> Option<&'a List> {
    lists.iter().find(|list| list.name == name)
}

/// Client-side lookup of a list by name against the loaded list set.
pub fn resolve<'a>(lists: &'a [List], name: &str) -> Result<&'a List, ValidationError> {
    find_by_name(lists, name).ok_or_else(|| ValidationError::UnknownList(name.to_string()))
}

#[tracing::instrument(skip(store, existing, now))]
pub fn create<S: DocumentStore + ?Sized>(
    store: &mut S,
    uid: &str,
    existing: &[List],
    name: &str,
    now: DateTime<Utc>,
) -> Result<List> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyListName.into());
    }
    if find_by_name(existing, name).is_some() {
        return Err(ValidationError::DuplicateListName(name.to_string()).into());
    }

    let doc = ListDoc {
        uid: uid.to_string(),
        name: name.to_string(),
        created_at: now,
    };
    let id = store.add(&collection()?, encode(&doc)?)?;
    info!(id = %id, name, "created list");

    Ok(List {
        id,
        uid: doc.uid,
        name: doc.name,
        created_at: now,
    })
}

/// Renames a list and rewrites the denormalized `list` field of its tasks in
/// the same batch.
#[tracing::instrument(skip(store, existing))]
pub fn rename<S: DocumentStore + ?Sized>(
    store: &mut S,
    existing: &[List],
    id: &str,
    new_name: &str,
) -> Result<List> {
    let new_name = new_name.trim();
    if new_name.is_empty() {
        return Err(ValidationError::EmptyListName.into());
    }
    let current = existing
        .iter()
        .find(|list| list.id == id)
        .ok_or_else(|| Error::ListNotFound(id.to_string()))?;
    if current.name == new_name {
        return Ok(current.clone());
    }
    if existing
        .iter()
        .any(|list| list.name == new_name && list.id != id)
    {
        return Err(ValidationError::DuplicateListName(new_name.to_string()).into());
    }

    let lists = collection()?;
    let tasks = tasks_collection(id)?;
    let mut batch = WriteBatch::new();
    batch.update(lists.doc(id), name_fields("name", new_name));
    for task in store.query(&tasks, &Query::all())? {
        batch.update(tasks.doc(&task.id), name_fields("list", new_name));
    }
    let writes = batch.len();
    store.commit(batch)?;
    info!(id, from = %current.name, to = new_name, writes, "renamed list");

    Ok(List {
        name: new_name.to_string(),
        ..current.clone()
    })
}

/// Deletes a list together with every task in its sub-collection.
#[tracing::instrument(skip(store))]
pub fn delete<S: DocumentStore + ?Sized>(store: &mut S, id: &str) -> Result<usize> {
    let lists = collection()?;
    let tasks = tasks_collection(id)?;

    let mut batch = WriteBatch::new();
    let children = store.query(&tasks, &Query::all())?;
    for task in &children {
        batch.delete(tasks.doc(&task.id));
    }
    batch.delete(lists.doc(id));
    store.commit(batch)?;

    info!(id, tasks = children.len(), "deleted list");
    Ok(children.len())
}

fn name_fields(key: &str, value: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(key.to_string(), json!(value));
    fields
}
