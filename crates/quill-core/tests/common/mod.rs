#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use quill_core::{
    Connection, ConnectionConfig, DatabaseError, Driver, Executor, QueryResult, Result, Row,
    SqlValue,
};

pub fn mysql() -> Connection {
    Connection::new(ConnectionConfig::new(Driver::MySql))
}

pub fn postgres() -> Connection {
    Connection::new(ConnectionConfig::new(Driver::Postgre))
}

pub fn sqlite() -> Connection {
    Connection::new(ConnectionConfig::new(Driver::Sqlite))
}

/// A connection for `driver` with a table prefix and generated aliases.
pub fn hashed(driver: Driver, prefix: &str) -> Connection {
    Connection::new(
        ConnectionConfig::new(driver)
            .with_prefix(prefix)
            .with_hashed_aliases(true),
    )
}

/// Executor that records every statement and answers with canned rows.
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    pub statements: Rc<RefCell<Vec<String>>>,
    pub rows: Vec<Row>,
    pub fail_with: Option<String>,
}

impl RecordingExecutor {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.statements.borrow_mut().push(sql.to_string());
        if let Some(message) = &self.fail_with {
            return Err(DatabaseError::Execution(message.clone()));
        }
        if sql.starts_with("SELECT") {
            Ok(QueryResult::with_rows(self.rows.clone()))
        } else {
            Ok(QueryResult::affected(1))
        }
    }
}

/// Connects `driver` to a recording executor and returns the statement log.
pub fn recorded(driver: Driver, rows: Vec<Row>) -> (Connection, Rc<RefCell<Vec<String>>>) {
    let executor = RecordingExecutor::with_rows(rows);
    let log = Rc::clone(&executor.statements);
    let conn = Connection::new(ConnectionConfig::new(driver)).with_executor(executor);
    (conn, log)
}

pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    Row::new(pairs.iter().map(|(k, v)| (*k, v.clone())))
}
