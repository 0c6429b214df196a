use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::{DocPath, Document, StoreError, decode};

pub const LISTS: &str = "lists";
pub const TASKS: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Stored shape of `lists/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDoc {
    pub uid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl List {
    pub fn from_document(path: &DocPath, doc: &Document) -> Result<Self, StoreError> {
        let raw: ListDoc = decode(path, &doc.fields)?;
        Ok(Self {
            id: doc.id.clone(),
            uid: raw.uid,
            name: raw.name,
            created_at: raw.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl Status {
    /// Pending -> In Progress -> Done -> Pending.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Pending => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Pending,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    pub const fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in views shown above the custom lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreView {
    Today,
    Upcoming,
    Calendar,
    #[serde(rename = "Sticky Wall")]
    StickyWall,
}

impl CoreView {
    pub const ALL: [Self; 4] = [Self::Today, Self::Upcoming, Self::Calendar, Self::StickyWall];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Upcoming => "Upcoming",
            Self::Calendar => "Calendar",
            Self::StickyWall => "Sticky Wall",
        }
    }
}

impl fmt::Display for CoreView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view: {0}")]
pub struct UnknownView(pub String);

impl FromStr for CoreView {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "today" => Ok(Self::Today),
            "upcoming" => Ok(Self::Upcoming),
            "calendar" => Ok(Self::Calendar),
            "stickywall" => Ok(Self::StickyWall),
            _ => Err(UnknownView(s.to_string())),
        }
    }
}

/// What the task column is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    View(CoreView),
    List(String),
}

impl Selection {
    /// View names win over list names.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<CoreView>() {
            Ok(view) => Self::View(view),
            Err(_) => Self::List(raw.trim().to_string()),
        }
    }

    pub fn list_name(&self) -> Option<&str> {
        match self {
            Self::List(name) => Some(name),
            Self::View(_) => None,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::View(CoreView::Today)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(view) => write!(f, "{view}"),
            Self::List(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    /// Owning list name, attached at fetch time.
    pub list: String,
    /// Owning list id, attached at fetch time.
    pub list_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due: Option<NaiveDate>,
    pub status: Status,
    pub core_view_tag: String,
    pub created_at: DateTime<Utc>,
}

/// Stored shape of `lists/{listId}/tasks/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDoc {
    pub task: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub list: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "due_date_serde")]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_core_view_tag")]
    pub core_view_tag: String,
}

fn default_core_view_tag() -> String {
    CoreView::Today.as_str().to_string()
}

impl Task {
    /// Decodes a task document, tagging it with the list it was read from.
    pub fn from_document(
        path: &DocPath,
        doc: &Document,
        list: &List,
    ) -> Result<Self, StoreError> {
        let raw: TaskDoc = decode(path, &doc.fields)?;
        Ok(Self {
            id: doc.id.clone(),
            list: list.name.clone(),
            list_id: list.id.clone(),
            title: raw.task,
            description: Some(raw.description).filter(|d| !d.is_empty()),
            due: raw.due_date,
            status: raw.status,
            core_view_tag: raw.core_view_tag,
            created_at: raw.created_at,
        })
    }

    pub fn to_doc(&self) -> TaskDoc {
        TaskDoc {
            task: self.title.clone(),
            status: self.status,
            created_at: self.created_at,
            list: self.list.clone(),
            description: self.description.clone().unwrap_or_default(),
            due_date: self.due,
            core_view_tag: self.core_view_tag.clone(),
        }
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }
}

/// Input for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub due: Option<NaiveDate>,
    pub list: String,
    pub core_view_tag: String,
}

/// Field edits from the detail panel. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due: Option<Option<NaiveDate>>,
    pub list: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due.is_none()
            && self.list.is_none()
    }
}

/// `dueDate` is an ISO date string; the empty string means no due date.
pub mod due_date_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::json;

    use super::{CoreView, List, Selection, Status, Task};
    use crate::store::{CollectionPath, Document};

    #[test]
    fn status_cycle_has_period_three() {
        let start = Status::Pending;
        assert_eq!(start.next(), Status::InProgress);
        assert_eq!(start.next().next(), Status::Done);
        assert_eq!(start.next().next().next(), Status::Pending);
    }

    #[test]
    fn view_names_parse_loosely_and_win_over_lists() {
        assert_eq!("sticky wall".parse::<CoreView>(), Ok(CoreView::StickyWall));
        assert_eq!("Sticky-Wall".parse::<CoreView>(), Ok(CoreView::StickyWall));
        assert_eq!(Selection::parse("today"), Selection::View(CoreView::Today));
        assert_eq!(
            Selection::parse(" Work "),
            Selection::List("Work".to_string())
        );
    }

    #[test]
    fn task_document_reads_empty_due_date_and_description_as_absent() {
        let created = Utc
            .with_ymd_and_hms(2026, 10, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        let list = List {
            id: "l1".to_string(),
            uid: "u1".to_string(),
            name: "Work".to_string(),
            created_at: created,
        };
        let path = CollectionPath::parse("lists/l1/tasks")
            .expect("path")
            .doc("t1");
        let doc = Document {
            id: "t1".to_string(),
            fields: json!({
                "task": "Write report",
                "status": "In Progress",
                "createdAt": "2026-10-01T09:00:00Z",
                "list": "Old name",
                "description": "",
                "dueDate": "",
                "coreViewTag": "Upcoming"
            })
            .as_object()
            .cloned()
            .expect("object"),
        };

        let task = Task::from_document(&path, &doc, &list).expect("decode");
        assert_eq!(task.list, "Work");
        assert_eq!(task.list_id, "l1");
        assert_eq!(task.status, Status::InProgress);
        assert_eq!(task.description, None);
        assert_eq!(task.due, None);

        let mut dated = task.clone();
        dated.due = NaiveDate::from_ymd_opt(2026, 10, 14);
        let encoded = crate::store::encode(&dated.to_doc()).expect("encode");
        assert_eq!(encoded["dueDate"], "2026-10-14");
        assert_eq!(encoded["status"], "In Progress");
    }
}
