//! Application state and the pure reducer that advances it.
//!
//! The reducer never touches the store. [`crate::workspace::Workspace`]
//! performs the remote calls and feeds their results back in as actions.

use tracing::debug;

use crate::model::{CoreView, List, Selection, Task, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub user: Option<User>,
    pub lists: Vec<List>,
    pub tasks: Vec<Task>,
    pub selection: Selection,
    /// Task shown in the detail panel.
    pub selected_task: Option<String>,
    pub default_view: CoreView,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CoreView::Today)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SessionChanged(Option<User>),
    ListsLoaded(Vec<List>),
    TasksLoaded(Vec<Task>),
    ListRenamed { from: String, to: String },
    SelectView(CoreView),
    SelectList(String),
    /// Opens the detail panel, or closes it when the task is already open.
    ToggleTask(String),
    /// Re-points the detail panel after a move assigned a new id.
    TaskReplaced { old: String, new: String },
    CloseDetails,
}

impl AppState {
    pub fn new(default_view: CoreView) -> Self {
        Self {
            user: None,
            lists: vec![],
            tasks: vec![],
            selection: Selection::View(default_view),
            selected_task: None,
            default_view,
        }
    }

    pub fn uid(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.uid.as_str())
    }

    pub fn selected(&self) -> Option<&Task> {
        let id = self.selected_task.as_deref()?;
        self.tasks.iter().find(|task| task.id == id)
    }

    /// List a new task goes to when none is given: the selected list, else
    /// the first list.
    pub fn default_target_list(&self) -> Option<&str> {
        if let Some(name) = self.selection.list_name()
            && self.lists.iter().any(|list| list.name == name)
        {
            return Some(name);
        }
        self.lists.first().map(|list| list.name.as_str())
    }
}

#[must_use]
pub fn reduce(mut state: AppState, action: Action) -> AppState {
    debug!(action = action_name(&action), "reduce");
    match action {
        Action::SessionChanged(None) => AppState::new(state.default_view),
        Action::SessionChanged(Some(user)) => {
            if state.uid() != Some(user.uid.as_str()) {
                state = AppState::new(state.default_view);
            }
            state.user = Some(user);
            state.selected_task = None;
            state
        }
        Action::ListsLoaded(lists) => {
            state.lists = lists;
            if let Selection::List(name) = &state.selection
                && !state.lists.iter().any(|list| &list.name == name)
            {
                state.selection = match state.lists.first() {
                    Some(first) => Selection::List(first.name.clone()),
                    None => Selection::View(state.default_view),
                };
            }
            state
        }
        Action::TasksLoaded(tasks) => {
            state.tasks = tasks;
            if let Some(id) = &state.selected_task
                && !state.tasks.iter().any(|task| &task.id == id)
            {
                state.selected_task = None;
            }
            state
        }
        Action::ListRenamed { from, to } => {
            if state.selection == Selection::List(from) {
                state.selection = Selection::List(to);
            }
            state
        }
        Action::SelectView(view) => {
            state.selection = Selection::View(view);
            state.selected_task = None;
            state
        }
        Action::SelectList(name) => {
            state.selection = Selection::List(name);
            state.selected_task = None;
            state
        }
        Action::ToggleTask(id) => {
            if state.selected_task.as_deref() == Some(id.as_str()) {
                state.selected_task = None;
            } else if state.tasks.iter().any(|task| task.id == id) {
                state.selected_task = Some(id);
            }
            state
        }
        Action::TaskReplaced { old, new } => {
            if state.selected_task.as_deref() == Some(old.as_str()) {
                state.selected_task = Some(new);
            }
            state
        }
        Action::CloseDetails => {
            state.selected_task = None;
            state
        }
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::SessionChanged(_) => "session_changed",
        Action::ListsLoaded(_) => "lists_loaded",
        Action::TasksLoaded(_) => "tasks_loaded",
        Action::ListRenamed { .. } => "list_renamed",
        Action::SelectView(_) => "select_view",
        Action::SelectList(_) => "select_list",
        Action::ToggleTask(_) => "toggle_task",
        Action::TaskReplaced { .. } => "task_replaced",
        Action::CloseDetails => "close_details",
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{Action, AppState, reduce};
    use crate::model::{CoreView, List, Selection, Status, Task, User};

    fn list(id: &str, name: &str) -> List {
        List {
            id: id.to_string(),
            uid: "u1".to_string(),
            name: name.to_string(),
            created_at: Utc
                .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn user(uid: &str) -> User {
        User {
            uid: uid.to_string(),
            email: format!("{uid}@example.com"),
        }
    }

    fn signed_in() -> AppState {
        reduce(AppState::default(), Action::SessionChanged(Some(user("u1"))))
    }

    #[test]
    fn sign_out_clears_everything_and_resets_selection() {
        let mut state = signed_in();
        state = reduce(state, Action::ListsLoaded(vec![list("l1", "Work")]));
        state = reduce(state, Action::SelectList("Work".to_string()));

        let state = reduce(state, Action::SessionChanged(None));
        assert_eq!(state, AppState::default());
        assert_eq!(state.selection, Selection::View(CoreView::Today));
    }

    #[test]
    fn missing_selected_list_falls_back_to_first_then_default_view() {
        let mut state = signed_in();
        state = reduce(
            state,
            Action::ListsLoaded(vec![list("l1", "Home"), list("l2", "Work")]),
        );
        state = reduce(state, Action::SelectList("Work".to_string()));

        state = reduce(state, Action::ListsLoaded(vec![list("l1", "Home")]));
        assert_eq!(state.selection, Selection::List("Home".to_string()));

        state = reduce(state, Action::ListsLoaded(vec![]));
        assert_eq!(state.selection, Selection::View(CoreView::Today));
    }

    #[test]
    fn built_in_view_survives_list_reload() {
        let mut state = signed_in();
        state = reduce(state, Action::SelectView(CoreView::Upcoming));
        state = reduce(state, Action::ListsLoaded(vec![list("l1", "Home")]));
        assert_eq!(state.selection, Selection::View(CoreView::Upcoming));
    }

    #[test]
    fn rename_keeps_renamed_list_selected() {
        let mut state = signed_in();
        state = reduce(state, Action::ListsLoaded(vec![list("l1", "Work")]));
        state = reduce(state, Action::SelectList("Work".to_string()));
        state = reduce(
            state,
            Action::ListRenamed {
                from: "Work".to_string(),
                to: "Office".to_string(),
            },
        );
        state = reduce(state, Action::ListsLoaded(vec![list("l1", "Office")]));
        assert_eq!(state.selection, Selection::List("Office".to_string()));
    }

    #[test]
    fn toggling_the_open_task_closes_the_panel() {
        let mut state = signed_in();
        let task = Task {
            id: "t1".to_string(),
            list: "Work".to_string(),
            list_id: "l1".to_string(),
            title: "Write report".to_string(),
            description: None,
            due: None,
            status: Status::Pending,
            core_view_tag: "Today".to_string(),
            created_at: Utc
                .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        };
        state = reduce(state, Action::TasksLoaded(vec![task]));

        state = reduce(state, Action::ToggleTask("t1".to_string()));
        assert_eq!(state.selected_task.as_deref(), Some("t1"));
        state = reduce(state, Action::ToggleTask("t1".to_string()));
        assert_eq!(state.selected_task, None);

        state = reduce(state, Action::ToggleTask("t1".to_string()));
        state = reduce(state, Action::TasksLoaded(vec![]));
        assert_eq!(state.selected_task, None);
    }
}
