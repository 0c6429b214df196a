//! Derived task views. Nothing here is stored.

use chrono::{Days, NaiveDate};
use tracing::trace;

use crate::model::{CoreView, List, Selection, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleTasks<'a> {
    pub active: Vec<&'a Task>,
    pub completed: Vec<&'a Task>,
}

impl VisibleTasks<'_> {
    pub fn len(&self) -> usize {
        self.active.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn matches(task: &Task, selection: &Selection, today: NaiveDate) -> bool {
    match selection {
        Selection::List(name) => task.list == *name,
        Selection::View(CoreView::Today) => task.due == Some(today),
        Selection::View(CoreView::Upcoming) => {
            let Some(tomorrow) = today.checked_add_days(Days::new(1)) else {
                return false;
            };
            task.due.is_some_and(|due| due >= tomorrow)
        }
        Selection::View(CoreView::Calendar | CoreView::StickyWall) => true,
    }
}

/// Tasks visible under `selection`, in input order.
pub fn filter<'a>(tasks: &'a [Task], selection: &Selection, today: NaiveDate) -> Vec<&'a Task> {
    let out: Vec<&Task> = tasks
        .iter()
        .filter(|task| matches(task, selection, today))
        .collect();
    trace!(selection = %selection, visible = out.len(), total = tasks.len(), "filtered tasks");
    out
}

/// Splits the filtered set into active and completed.
pub fn visible<'a>(tasks: &'a [Task], selection: &Selection, today: NaiveDate) -> VisibleTasks<'a> {
    let (completed, active): (Vec<&Task>, Vec<&Task>) = filter(tasks, selection, today)
        .into_iter()
        .partition(|task| task.status.is_done());
    VisibleTasks { active, completed }
}

/// Active task count shown next to a list in the sidebar.
pub fn active_count(tasks: &[Task], list: &List) -> usize {
    tasks
        .iter()
        .filter(|task| task.list == list.name && !task.status.is_done())
        .count()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::{active_count, filter, visible};
    use crate::model::{CoreView, List, Selection, Status, Task};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).expect("valid date")
    }

    fn task(id: &str, list: &str, due: Option<NaiveDate>, status: Status) -> Task {
        Task {
            id: id.to_string(),
            list: list.to_string(),
            list_id: format!("{list}-id"),
            title: id.to_string(),
            description: None,
            due,
            status,
            core_view_tag: "Today".to_string(),
            created_at: Utc
                .with_ymd_and_hms(2026, 10, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn ids(tasks: Vec<&Task>) -> Vec<&str> {
        tasks.into_iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn today_and_upcoming_split_on_the_calendar_day() {
        let today = day(14);
        let tasks = vec![
            task("yesterday", "Work", Some(day(13)), Status::Pending),
            task("today", "Work", Some(today), Status::Pending),
            task("tomorrow", "Home", Some(day(15)), Status::Pending),
            task("later", "Home", Some(day(30)), Status::Done),
            task("undated", "Home", None, Status::Pending),
        ];

        assert_eq!(
            ids(filter(&tasks, &Selection::View(CoreView::Today), today)),
            vec!["today"]
        );
        assert_eq!(
            ids(filter(&tasks, &Selection::View(CoreView::Upcoming), today)),
            vec!["tomorrow", "later"]
        );
        assert_eq!(
            filter(&tasks, &Selection::View(CoreView::Calendar), today).len(),
            tasks.len()
        );
        assert_eq!(
            filter(&tasks, &Selection::View(CoreView::StickyWall), today).len(),
            tasks.len()
        );
    }

    #[test]
    fn custom_list_selection_partitions_by_status() {
        let today = day(14);
        let tasks = vec![
            task("a", "Home", None, Status::Pending),
            task("b", "Home", None, Status::Done),
            task("c", "Home", None, Status::InProgress),
            task("d", "Work", None, Status::Pending),
        ];

        let view = visible(&tasks, &Selection::List("Home".to_string()), today);
        assert_eq!(ids(view.active), vec!["a", "c"]);
        assert_eq!(ids(view.completed), vec!["b"]);

        let home = List {
            id: "Home-id".to_string(),
            uid: "u1".to_string(),
            name: "Home".to_string(),
            created_at: tasks[0].created_at,
        };
        assert_eq!(active_count(&tasks, &home), 2);
    }
}
