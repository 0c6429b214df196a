//! Input forms: the add-task modal and the detail panel.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::model::{CoreView, List, Task, TaskDraft, TaskPatch};

/// Add-task modal. Holds no state between openings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub open: bool,
    pub title: String,
    pub description: String,
    pub due: Option<NaiveDate>,
    pub list: String,
    pub core_view: CoreView,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            open: false,
            title: String::new(),
            description: String::new(),
            due: None,
            list: String::new(),
            core_view: CoreView::Today,
        }
    }
}

impl TaskForm {
    /// Resets every field. An initial list that is not among `lists` is
    /// replaced by the first list.
    pub fn open(&mut self, initial_list: &str, lists: &[List]) {
        *self = Self {
            open: true,
            list: initial_list.to_string(),
            ..Self::default()
        };
        if !lists.iter().any(|list| list.name == self.list)
            && let Some(first) = lists.first()
        {
            self.list = first.name.clone();
        }
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Produces the draft for the task accessor and closes the form.
    pub fn submit(&mut self, lists: &[List]) -> Result<TaskDraft, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let Some(first) = lists.first() else {
            return Err(ValidationError::NoLists);
        };
        let list = lists
            .iter()
            .find(|list| list.name == self.list)
            .unwrap_or(first);

        let draft = TaskDraft {
            title: self.title.clone(),
            description: Some(self.description.clone()).filter(|d| !d.trim().is_empty()),
            due: self.due,
            list: list.name.clone(),
            core_view_tag: self.core_view.as_str().to_string(),
        };
        self.close();
        Ok(draft)
    }
}

/// Editable copy of the selected task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailForm {
    pub task_id: String,
    pub title: String,
    pub description: String,
    pub due: Option<NaiveDate>,
    pub list: String,
}

impl DetailForm {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone().unwrap_or_default(),
            due: task.due,
            list: task.list.clone(),
        }
    }

    /// Full field replacement, as the panel saves every field at once.
    pub fn to_patch(&self) -> Result<TaskPatch, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(TaskPatch {
            title: Some(title.to_string()),
            description: Some(Some(self.description.clone()).filter(|d| !d.is_empty())),
            due: Some(self.due),
            list: Some(self.list.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{DetailForm, TaskForm};
    use crate::error::ValidationError;
    use crate::model::{CoreView, List, Status, Task};

    fn list(name: &str) -> List {
        List {
            id: format!("{name}-id"),
            uid: "u1".to_string(),
            name: name.to_string(),
            created_at: Utc
                .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn opening_resets_fields_and_repairs_unknown_list() {
        let lists = vec![list("Home"), list("Work")];
        let mut form = TaskForm::default();
        form.open("Work", &lists);
        form.title = "Draft".to_string();
        form.core_view = CoreView::Upcoming;
        form.due = NaiveDate::from_ymd_opt(2026, 10, 20);

        form.open("Today", &lists);
        assert!(form.open);
        assert_eq!(form.title, "");
        assert_eq!(form.due, None);
        assert_eq!(form.core_view, CoreView::Today);
        assert_eq!(form.list, "Home");
    }

    #[test]
    fn submit_requires_title_and_a_list() {
        let mut form = TaskForm::default();
        form.open("Work", &[]);
        form.title = "Write report".to_string();
        assert_eq!(form.submit(&[]), Err(ValidationError::NoLists));

        let lists = vec![list("Work")];
        form.title = "   ".to_string();
        assert_eq!(form.submit(&lists), Err(ValidationError::EmptyTitle));
        assert!(form.open);

        form.title = "Write report".to_string();
        let draft = form.submit(&lists).expect("valid form");
        assert_eq!(draft.list, "Work");
        assert_eq!(draft.description, None);
        assert_eq!(draft.core_view_tag, "Today");
        assert!(!form.open);
    }

    #[test]
    fn detail_form_rejects_blank_title() {
        let task = Task {
            id: "t1".to_string(),
            list: "Work".to_string(),
            list_id: "Work-id".to_string(),
            title: "Write report".to_string(),
            description: Some("quarterly".to_string()),
            due: None,
            status: Status::Pending,
            core_view_tag: "Today".to_string(),
            created_at: Utc
                .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        };
        let mut form = DetailForm::from_task(&task);
        let patch = form.to_patch().expect("patch");
        assert_eq!(patch.description, Some(Some("quarterly".to_string())));
        assert_eq!(patch.list.as_deref(), Some("Work"));

        form.title = " ".to_string();
        assert_eq!(form.to_patch(), Err(ValidationError::EmptyTitle));
    }
}
