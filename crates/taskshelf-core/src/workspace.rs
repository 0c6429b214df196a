//! Store-facing boundary around [`AppState`].
//!
//! Every mutation goes to the store first and is followed by a full
//! re-fetch; state only changes through [`reduce`]. Read failures during a
//! re-fetch are logged and leave the previous state in place.

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::error::{Error, Result, ValidationError};
use crate::lists;
use crate::model::{CoreView, List, Selection, Status, Task, TaskDraft, TaskPatch, User};
use crate::state::{Action, AppState, reduce};
use crate::store::DocumentStore;
use crate::tasks;
use crate::view::{self, VisibleTasks};

pub struct Workspace<S> {
    store: S,
    state: AppState,
}

impl<S: DocumentStore> Workspace<S> {
    pub fn new(store: S, default_view: CoreView) -> Self {
        Self {
            store,
            state: AppState::new(default_view),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    /// Session observer entry point. A new session triggers a full load.
    pub fn apply_session(&mut self, user: Option<User>) {
        let signed_in = user.is_some();
        self.dispatch(Action::SessionChanged(user));
        if signed_in {
            self.refresh();
        }
    }

    pub fn refresh(&mut self) {
        self.refresh_lists();
        self.refresh_tasks();
    }

    #[tracing::instrument(skip(self))]
    pub fn refresh_lists(&mut self) {
        let Some(uid) = self.state.uid() else {
            return;
        };
        match lists::fetch_all(&self.store, uid) {
            Ok(lists) => self.dispatch(Action::ListsLoaded(lists)),
            Err(err) => warn!(error = %err, "failed to fetch lists; keeping previous state"),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn refresh_tasks(&mut self) {
        let Some(uid) = self.state.uid() else {
            return;
        };
        match tasks::fetch_all(&self.store, uid) {
            Ok(tasks) => self.dispatch(Action::TasksLoaded(tasks)),
            Err(err) => warn!(error = %err, "failed to fetch tasks; keeping previous state"),
        }
    }

    fn uid(&self) -> Result<String> {
        self.state
            .uid()
            .map(str::to_string)
            .ok_or_else(|| ValidationError::NoSession.into())
    }

    pub fn list_by_name(&self, name: &str) -> Result<&List> {
        lists::find_by_name(&self.state.lists, name)
            .ok_or_else(|| Error::ListNotFound(name.to_string()))
    }

    pub fn task(&self, id_or_prefix: &str) -> Result<&Task> {
        tasks::resolve(&self.state.tasks, id_or_prefix)
    }

    pub fn create_list(&mut self, name: &str) -> Result<List> {
        let uid = self.uid()?;
        let list = lists::create(&mut self.store, &uid, &self.state.lists, name, Utc::now())?;
        self.refresh_lists();
        Ok(list)
    }

    pub fn rename_list(&mut self, name: &str, new_name: &str) -> Result<List> {
        self.uid()?;
        let id = self.list_by_name(name)?.id.clone();
        let renamed = lists::rename(&mut self.store, &self.state.lists, &id, new_name)?;
        self.dispatch(Action::ListRenamed {
            from: name.to_string(),
            to: renamed.name.clone(),
        });
        self.refresh();
        Ok(renamed)
    }

    /// Deletes the list and its tasks, returning how many tasks went with it.
    pub fn delete_list(&mut self, name: &str) -> Result<usize> {
        self.uid()?;
        let id = self.list_by_name(name)?.id.clone();
        let removed = lists::delete(&mut self.store, &id)?;
        self.refresh();
        Ok(removed)
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Result<Task> {
        self.uid()?;
        let task = tasks::create(&mut self.store, &self.state.lists, draft, Utc::now())?;
        self.refresh_tasks();
        Ok(task)
    }

    pub fn cycle_status(&mut self, id_or_prefix: &str) -> Result<Status> {
        self.uid()?;
        let task = self.task(id_or_prefix)?.clone();
        let next = tasks::cycle_status(&mut self.store, &self.state.lists, &task)?;
        self.refresh_tasks();
        Ok(next)
    }

    pub fn rename_task(&mut self, id_or_prefix: &str, title: &str) -> Result<()> {
        self.uid()?;
        let task = self.task(id_or_prefix)?.clone();
        tasks::rename(&mut self.store, &self.state.lists, &task, title)?;
        self.refresh_tasks();
        Ok(())
    }

    /// Returns the task id after the edit; a list change assigns a new one.
    pub fn update_task(&mut self, id_or_prefix: &str, patch: TaskPatch) -> Result<String> {
        self.uid()?;
        let task = self.task(id_or_prefix)?.clone();
        let id = tasks::update_fields(&mut self.store, &self.state.lists, &task, patch)?;
        self.after_move(&task.id, &id);
        Ok(id)
    }

    pub fn move_task(&mut self, id_or_prefix: &str, target: &str) -> Result<String> {
        self.uid()?;
        let task = self.task(id_or_prefix)?.clone();
        let id = tasks::move_to_list(&mut self.store, &self.state.lists, &task, target)?;
        self.after_move(&task.id, &id);
        Ok(id)
    }

    fn after_move(&mut self, old: &str, new: &str) {
        if old != new {
            info!(old, new, "task re-keyed by move");
            self.dispatch(Action::TaskReplaced {
                old: old.to_string(),
                new: new.to_string(),
            });
        }
        self.refresh_tasks();
    }

    pub fn delete_task(&mut self, id_or_prefix: &str) -> Result<()> {
        self.uid()?;
        let task = self.task(id_or_prefix)?.clone();
        tasks::delete(&mut self.store, &self.state.lists, &task)?;
        self.refresh_tasks();
        Ok(())
    }

    /// Selecting a list requires it to exist in the loaded lists.
    pub fn select(&mut self, selection: Selection) -> Result<()> {
        match selection {
            Selection::View(view) => self.dispatch(Action::SelectView(view)),
            Selection::List(name) => {
                self.list_by_name(&name)?;
                self.dispatch(Action::SelectList(name));
            }
        }
        Ok(())
    }

    pub fn toggle_task(&mut self, id_or_prefix: &str) -> Result<()> {
        let id = self.task(id_or_prefix)?.id.clone();
        self.dispatch(Action::ToggleTask(id));
        Ok(())
    }

    pub fn close_details(&mut self) {
        self.dispatch(Action::CloseDetails);
    }

    pub fn visible(&self, today: NaiveDate) -> VisibleTasks<'_> {
        view::visible(&self.state.tasks, &self.state.selection, today)
    }
}
