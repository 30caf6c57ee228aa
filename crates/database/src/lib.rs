use std::collections::HashMap;
use std::fmt;

pub mod memory;
pub mod postgres;
pub mod query;

pub use query::Query;

/// A single untyped column value as read back from the store. Readers in
/// `public_transport` are responsible for interpreting these into typed
/// entity fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// A row of untyped, named columns, per §4.C ("rows expose untyped columns
/// by name").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: HashMap<String, ColumnValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ColumnValue) -> Self {
        self.columns.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: ColumnValue) {
        self.columns.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ColumnValue> {
        self.columns.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ColumnValue::as_text)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ColumnValue::as_integer)
    }

    pub fn real(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ColumnValue::as_real)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ColumnValue::as_bool)
    }
}

/// Raised by a `ScheduleStore` operation. Carries the query that failed so
/// callers can log or retry with context.
#[derive(Debug)]
pub struct StoreError {
    pub query: Query,
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl StoreError {
    pub fn new(query: Query, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            query,
            source: Box::new(source),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query {:?} failed: {}", self.query, self.source)
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A capability providing row-level reads over the schedule snapshot.
/// Pull-only: callers never mutate through this contract (§1 non-goal:
/// "live updates to schedule data").
#[async_trait::async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Returns the first matched row, or `None` if the query has no match.
    async fn get(&self, query: Query) -> Result<Option<Row>>;

    /// Returns every matched row, in store-defined order.
    async fn select(&self, query: Query) -> Result<Vec<Row>>;
}
