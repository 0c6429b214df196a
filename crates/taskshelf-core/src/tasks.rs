//! CRUD over the `lists/{listId}/tasks` sub-collections.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::datetime::format_date;
use crate::error::{Error, Result, ValidationError};
use crate::lists;
use crate::model::{List, Status, Task, TaskDoc, TaskDraft, TaskPatch};
use crate::store::{DocumentStore, Fields, Query, StoreError, WriteBatch, encode};

/// Every task of every list owned by `uid`, newest first.
#[tracing::instrument(skip(store))]
pub fn fetch_all<S: DocumentStore + ?Sized>(
    store: &S,
    uid: &str,
) -> Result<Vec<Task>, StoreError> {
    let mut out = Vec::new();
    for list in lists::fetch_all(store, uid)? {
        let tasks = lists::tasks_collection(&list.id)?;
        for doc in store.query(&tasks, &Query::all())? {
            out.push(Task::from_document(&tasks.doc(&doc.id), &doc, &list)?);
        }
    }
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    debug!(count = out.len(), "fetched tasks");
    Ok(out)
}

/// Finds a task by full id, or by a prefix that matches exactly one task.
pub fn resolve<'a>(tasks: &'a [Task], id_or_prefix: &str) -> Result<&'a Task> {
    if let Some(task) = tasks.iter().find(|task| task.id == id_or_prefix) {
        return Ok(task);
    }

    let mut matches = tasks
        .iter()
        .filter(|task| !id_or_prefix.is_empty() && task.id.starts_with(id_or_prefix));
    let first = matches
        .next()
        .ok_or_else(|| Error::TaskNotFound(id_or_prefix.to_string()))?;
    let rest = matches.count();
    if rest > 0 {
        return Err(Error::AmbiguousTask {
            prefix: id_or_prefix.to_string(),
            count: rest + 1,
        });
    }
    Ok(first)
}

#[tracing::instrument(skip(store, lists, draft, now), fields(list = %draft.list))]
pub fn create<S: DocumentStore + ?Sized>(
    store: &mut S,
    lists: &[List],
    draft: TaskDraft,
    now: DateTime<Utc>,
) -> Result<Task> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle.into());
    }
    if lists.is_empty() {
        return Err(ValidationError::NoLists.into());
    }
    let list = lists::resolve(lists, &draft.list)?;

    let doc = TaskDoc {
        task: title.to_string(),
        status: Status::Pending,
        created_at: now,
        list: list.name.clone(),
        description: draft.description.clone().unwrap_or_default(),
        due_date: draft.due,
        core_view_tag: draft.core_view_tag.clone(),
    };
    let id = store.add(&lists::tasks_collection(&list.id)?, encode(&doc)?)?;
    info!(id = %id, list_id = %list.id, "created task");

    Ok(Task {
        id,
        list: list.name.clone(),
        list_id: list.id.clone(),
        title: doc.task,
        description: draft.description.filter(|d| !d.is_empty()),
        due: draft.due,
        status: Status::Pending,
        core_view_tag: draft.core_view_tag,
        created_at: now,
    })
}

/// Advances the status one step and returns the new status.
#[tracing::instrument(skip(store, lists, task), fields(id = %task.id))]
pub fn cycle_status<S: DocumentStore + ?Sized>(
    store: &mut S,
    lists: &[List],
    task: &Task,
) -> Result<Status> {
    let list = lists::resolve(lists, &task.list)?;
    let next = task.status.next();
    let mut fields = Fields::new();
    fields.insert("status".to_string(), json!(next));
    store.update(&lists::tasks_collection(&list.id)?.doc(&task.id), fields)?;
    info!(from = %task.status, to = %next, "cycled status");
    Ok(next)
}

/// Inline title edit. A blank title keeps the current one.
#[tracing::instrument(skip(store, lists, task), fields(id = %task.id))]
pub fn rename<S: DocumentStore + ?Sized>(
    store: &mut S,
    lists: &[List],
    task: &Task,
    title: &str,
) -> Result<()> {
    let title = title.trim();
    if title.is_empty() || title == task.title {
        debug!("title unchanged");
        return Ok(());
    }
    let list = lists::resolve(lists, &task.list)?;
    let mut fields = Fields::new();
    fields.insert("task".to_string(), json!(title));
    store.update(&lists::tasks_collection(&list.id)?.doc(&task.id), fields)?;
    Ok(())
}

/// Applies detail-panel edits. A list change turns into a move, so the
/// returned id may differ from `task.id`.
#[tracing::instrument(skip(store, lists, task, patch), fields(id = %task.id))]
pub fn update_fields<S: DocumentStore + ?Sized>(
    store: &mut S,
    lists: &[List],
    task: &Task,
    patch: TaskPatch,
) -> Result<String> {
    if patch.is_empty() {
        debug!("nothing to update");
        return Ok(task.id.clone());
    }
    let mut updated = task.clone();
    let mut fields = Fields::new();
    if let Some(title) = patch.title {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        updated.title = title.to_string();
        fields.insert("task".to_string(), json!(updated.title));
    }
    if let Some(description) = patch.description {
        updated.description = description.filter(|d| !d.is_empty());
        fields.insert(
            "description".to_string(),
            json!(updated.description.clone().unwrap_or_default()),
        );
    }
    if let Some(due) = patch.due {
        updated.due = due;
        fields.insert(
            "dueDate".to_string(),
            json!(due.map(format_date).unwrap_or_default()),
        );
    }

    let source = lists::resolve(lists, &task.list)?;
    let target = match patch.list.as_deref() {
        Some(name) => lists::resolve(lists, name)?,
        None => source,
    };

    if source.id == target.id {
        // Only the edited keys are written; status and the rest stay as stored.
        if patch.list.is_some() {
            fields.insert("list".to_string(), json!(source.name));
        }
        let tasks = lists::tasks_collection(&source.id)?;
        let keys = fields.len();
        store.update(&tasks.doc(&task.id), fields)?;
        info!(keys, "updated task in place");
        return Ok(task.id.clone());
    }

    move_doc(store, &updated, source, target)
}

/// Moves a task to another list as one atomic batch: the copy under the
/// target list gets a fresh id and the source document is deleted.
#[tracing::instrument(skip(store, lists, task), fields(id = %task.id, from = %task.list))]
pub fn move_to_list<S: DocumentStore + ?Sized>(
    store: &mut S,
    lists: &[List],
    task: &Task,
    target: &str,
) -> Result<String> {
    let source = lists::resolve(lists, &task.list)?;
    let target = lists::resolve(lists, target)?;
    if source.id == target.id {
        debug!("task already in target list");
        return Ok(task.id.clone());
    }
    move_doc(store, task, source, target)
}

fn move_doc<S: DocumentStore + ?Sized>(
    store: &mut S,
    task: &Task,
    source: &List,
    target: &List,
) -> Result<String> {
    let mut moved = task.clone();
    moved.list = target.name.clone();
    moved.list_id = target.id.clone();

    let new_id = store.allocate_id();
    let mut batch = WriteBatch::new();
    batch
        .set(
            lists::tasks_collection(&target.id)?.doc(&new_id),
            encode(&moved.to_doc())?,
        )
        .delete(lists::tasks_collection(&source.id)?.doc(&task.id));

    if let Err(err) = store.commit(batch) {
        warn!(error = %err, to = %target.name, "move failed; nothing applied");
        return Err(err.into());
    }
    info!(new_id = %new_id, to = %target.name, "moved task");
    Ok(new_id)
}

#[tracing::instrument(skip(store, lists, task), fields(id = %task.id))]
pub fn delete<S: DocumentStore + ?Sized>(
    store: &mut S,
    lists: &[List],
    task: &Task,
) -> Result<()> {
    let list = lists::resolve(lists, &task.list)?;
    store.delete(&lists::tasks_collection(&list.id)?.doc(&task.id))?;
    info!("deleted task");
    Ok(())
}
