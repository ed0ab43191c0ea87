use serde_json::{Map, Value};
use thiserror::Error;

use super::BoxFuture;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph backend unavailable: {0}")]
    Unavailable(String),
    #[error("graph query failed: {0}")]
    Query(String),
    #[error("graph row decode failed: {0}")]
    Decode(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Named statement parameters, bound through the driver. Statements never
/// see values by interpolation.
pub type Params = Vec<(&'static str, Value)>;

/// One result row, fully materialized before it reaches callers. Column
/// access is by alias and expected type; a mismatch is a decode error, not
/// a cast.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn from_value(value: Value) -> GraphResult<Self> {
        match value {
            Value::Object(columns) => Ok(Self(columns)),
            other => Err(GraphError::Decode(format!(
                "expected an object row, got {other}"
            ))),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn str(&self, column: &str) -> GraphResult<&str> {
        match self.require(column)? {
            Value::String(value) => Ok(value),
            other => Err(mismatch(column, "string", other)),
        }
    }

    pub fn bool(&self, column: &str) -> GraphResult<bool> {
        match self.require(column)? {
            Value::Bool(value) => Ok(*value),
            other => Err(mismatch(column, "bool", other)),
        }
    }

    pub fn i64(&self, column: &str) -> GraphResult<i64> {
        match self.require(column)? {
            Value::Number(value) => value
                .as_i64()
                .ok_or_else(|| GraphError::Decode(format!("column '{column}' is not an integer"))),
            other => Err(mismatch(column, "integer", other)),
        }
    }

    fn require(&self, column: &str) -> GraphResult<&Value> {
        self.0
            .get(column)
            .ok_or_else(|| GraphError::Decode(format!("missing column '{column}'")))
    }
}

fn mismatch(column: &str, expected: &str, got: &Value) -> GraphError {
    GraphError::Decode(format!("column '{column}': expected {expected}, got {got}"))
}

/// Capability over the one graph backend resolved at startup.
pub trait GraphQuery: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Runs one parameterized statement and materializes every result row.
    /// Each call is its own round trip; nothing is batched across calls and
    /// the driver cursor never escapes.
    fn run(&self, statement: &str, params: Params) -> BoxFuture<'_, GraphResult<Vec<Row>>>;

    fn health_check(&self) -> BoxFuture<'_, GraphResult<()>>;
}
