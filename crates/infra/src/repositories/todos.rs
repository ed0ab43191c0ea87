use std::sync::Arc;

use knotlist_domain::DomainResult;
use knotlist_domain::error::DomainError;
use knotlist_domain::ports::BoxFuture;
use knotlist_domain::ports::graph::{GraphError, GraphQuery, Params, Row};
use knotlist_domain::ports::todos::{ReplaceOutcome, TodoRepository};
use knotlist_domain::todo::Todo;
use metrics::counter;
use serde_json::Value;

const REPLACE_RUNS_TOTAL: &str = "knotlist_todo_replace_runs_total";
const REPLACE_ITEMS_TOTAL: &str = "knotlist_todo_replace_items_total";

const LIST_TODOS: &str = "SELECT guid, title, completed FROM todo";
const COUNT_TODOS: &str = "SELECT count() FROM todo GROUP ALL";
const DELETE_TODOS: &str = "DELETE todo";
const UPSERT_TODO: &str =
    "UPSERT type::thing('todo', $guid) SET guid = $guid, title = $title, completed = $completed";

/// Todo persistence over the resolved graph backend. Stateless between
/// calls; the store owns all state.
pub struct GraphTodoRepository {
    graph: Arc<dyn GraphQuery>,
}

impl GraphTodoRepository {
    pub fn new(graph: Arc<dyn GraphQuery>) -> Self {
        Self { graph }
    }

    fn decode_todo(row: &Row) -> DomainResult<Todo> {
        Ok(Todo {
            guid: row.str("guid").map_err(map_graph_error)?.to_string(),
            title: row.str("title").map_err(map_graph_error)?.to_string(),
            completed: row.bool("completed").map_err(map_graph_error)?,
        })
    }
}

impl TodoRepository for GraphTodoRepository {
    fn list(&self) -> BoxFuture<'_, DomainResult<Vec<Todo>>> {
        Box::pin(async move {
            let rows = self
                .graph
                .run(LIST_TODOS, Vec::new())
                .await
                .map_err(map_graph_error)?;
            let todos = rows
                .iter()
                .map(Self::decode_todo)
                .collect::<DomainResult<Vec<_>>>()?;
            tracing::debug!(count = todos.len(), "loaded todos");
            Ok(todos)
        })
    }

    fn count(&self) -> BoxFuture<'_, DomainResult<i64>> {
        Box::pin(async move {
            let rows = self
                .graph
                .run(COUNT_TODOS, Vec::new())
                .await
                .map_err(map_graph_error)?;
            match rows.first() {
                Some(row) => row.i64("count").map_err(map_graph_error),
                None => Ok(0),
            }
        })
    }

    fn replace_all(&self, todos: &[Todo]) -> BoxFuture<'_, DomainResult<ReplaceOutcome>> {
        let todos = todos.to_vec();
        Box::pin(async move {
            self.graph
                .run(DELETE_TODOS, Vec::new())
                .await
                .map_err(map_graph_error)?;

            let mut outcome = ReplaceOutcome::default();
            for todo in todos {
                if todo.guid.is_empty() {
                    tracing::warn!(title = %todo.title, "skipping todo without a guid");
                    counter!(REPLACE_ITEMS_TOTAL, "result" => "skipped").increment(1);
                    outcome.skipped += 1;
                    continue;
                }
                let params: Params = vec![
                    ("guid", Value::String(todo.guid.clone())),
                    ("title", Value::String(todo.title.clone())),
                    ("completed", Value::Bool(todo.completed)),
                ];
                match self.graph.run(UPSERT_TODO, params).await {
                    Ok(_) => {
                        counter!(REPLACE_ITEMS_TOTAL, "result" => "replaced").increment(1);
                        outcome.replaced += 1;
                    }
                    Err(err) => {
                        tracing::warn!(guid = %todo.guid, error = %err, "todo upsert failed; continuing");
                        counter!(REPLACE_ITEMS_TOTAL, "result" => "failed").increment(1);
                        outcome.skipped += 1;
                    }
                }
            }
            counter!(REPLACE_RUNS_TOTAL).increment(1);
            Ok(outcome)
        })
    }
}

fn map_graph_error(err: GraphError) -> DomainError {
    match err {
        GraphError::Unavailable(message) => DomainError::Unavailable(message),
        GraphError::Query(message) | GraphError::Decode(message) => DomainError::Query(message),
    }
}
