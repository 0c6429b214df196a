use crate::identity::IdentityError;
use crate::store::StoreError;

/// Input rejected before any store call was issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("list name cannot be empty")]
    EmptyListName,
    #[error("a list named \"{0}\" already exists")]
    DuplicateListName(String),
    #[error("no list exists yet; create one first")]
    NoLists,
    #[error("unknown list: {0}")]
    UnknownList(String),
    #[error("not signed in")]
    NoSession,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("task not found: {0}")]
    TaskNotFound(String),
    #[error("list not found: {0}")]
    ListNotFound(String),
    #[error("ambiguous task id prefix {prefix}: matches {count} tasks")]
    AmbiguousTask { prefix: String, count: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
