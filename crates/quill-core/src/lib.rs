//! # quill-core
//!
//! A fluent SQL query builder for MySQL, PostgreSQL and SQLite.
//!
//! This crate provides:
//! - A chainable [`Builder`] that compiles to dialect-specific SQL
//! - Per-connection table alias tracking, with optional generated aliases
//! - Identifier and literal escaping through a [`Dialect`] trait
//!
//! ## Building Queries
//!
//! ```rust
//! use quill_core::{Connection, ConnectionConfig, Driver};
//!
//! let conn = Connection::new(ConnectionConfig::new(Driver::MySql));
//!
//! let sql = conn
//!     .builder()
//!     .from(["users u", "jobs j"])
//!     .where_column("users.id", "jobs.user_id")
//!     .where_("j.title LIKE", "%cook%")
//!     .sort_desc("j.created_at")
//!     .limit(10)
//!     .sql();
//!
//! assert_eq!(
//!     sql,
//!     "SELECT * FROM users As u, jobs As j WHERE u.id = j.user_id AND j.title LIKE '%cook%' ORDER BY j.created_at DESC LIMIT 10"
//! );
//! ```
//!
//! ## Writes
//!
//! Terminal writes run through the connection's [`Executor`]. In test mode
//! they return the compiled statement instead:
//!
//! ```rust
//! use quill_core::{Connection, ConnectionConfig, Driver, Record};
//!
//! let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
//! let job = Record::new().set("id", 1).set("name", "Grocery Sales");
//!
//! let outcome = conn.table("jobs").test_mode().insert(&job)?;
//! assert_eq!(outcome.sql(), Some("INSERT INTO jobs (id,name) VALUES (1,'Grocery Sales')"));
//! # Ok::<(), quill_core::DatabaseError>(())
//! ```

pub mod alias;
pub mod builder;
pub mod config;
pub mod connection;
pub mod date;
pub mod dialect;
pub mod error;
pub mod escape;
pub mod record;
pub mod value;

pub use alias::{AliasRegistry, TableRef};
pub use builder::{
    Builder, Condition, Connective, Direction, IntoColumns, JoinCondition, JoinKind, Operator,
    Outcome,
};
pub use config::{ConnectionConfig, Driver};
pub use connection::{Connection, Executor, QueryResult, Row};
pub use date::ToSqlDate;
pub use dialect::{Dialect, MySqlDialect, PostgresDialect, SqliteDialect};
pub use error::{DatabaseError, Result};
pub use escape::Escaper;
pub use record::Record;
pub use value::{SqlValue, ToSqlValue};
