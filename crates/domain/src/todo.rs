use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::todos::{ReplaceOutcome, TodoRepository};

const MAX_TITLE_LENGTH: usize = 200;

/// One task. `guid` is the externally supplied natural key: re-submitting a
/// guid overwrites title/completed in place, never duplicates.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub guid: String,
    pub title: String,
    pub completed: bool,
}

/// Read/replace operations over the graph store. Nothing is cached between
/// requests; every call is a fresh round trip.
#[derive(Clone)]
pub struct TodoService {
    repository: Arc<dyn TodoRepository>,
}

impl TodoService {
    pub fn new(repository: Arc<dyn TodoRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> DomainResult<Vec<Todo>> {
        self.repository.list().await
    }

    pub async fn count(&self) -> DomainResult<i64> {
        self.repository.count().await
    }

    /// Full-replace synchronization: the client transmits the complete
    /// desired list and the store is reconciled by delete-then-recreate.
    pub async fn replace_all(&self, todos: Vec<Todo>) -> DomainResult<ReplaceOutcome> {
        let todos = validate_todos(todos)?;
        self.repository.replace_all(&todos).await
    }
}

fn validate_todos(todos: Vec<Todo>) -> Result<Vec<Todo>, DomainError> {
    todos
        .into_iter()
        .map(|todo| {
            if todo.title.chars().count() > MAX_TITLE_LENGTH {
                return Err(DomainError::Validation(format!(
                    "title exceeds max length of {MAX_TITLE_LENGTH}"
                )));
            }
            // An empty guid is not rejected here: the merge for that one
            // item fails downstream without halting the rest of the batch.
            Ok(Todo {
                guid: todo.guid.trim().to_string(),
                title: todo.title,
                completed: todo.completed,
            })
        })
        .collect()
}
