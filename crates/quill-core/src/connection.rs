//! Connection: dialect, configuration, alias registry and execution.
//!
//! A [`Connection`] is the single collaborator of every [`Builder`]. It is
//! meant to be owned by one thread: the alias registry uses interior
//! mutability without synchronization.

use std::cell::{Ref, RefCell};
use std::fmt;

use tracing::debug;

use crate::alias::{strip_prefix, AliasRegistry, TableRef};
use crate::builder::Builder;
use crate::config::ConnectionConfig;
use crate::dialect::Dialect;
use crate::error::{DatabaseError, Result};
use crate::escape::{split_alias, Escaper};
use crate::value::{is_numeric_str, SqlValue, ToSqlValue};

/// Runs compiled SQL against a database.
pub trait Executor {
    /// Executes one statement.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Execution`] when the database rejects the
    /// statement or the link fails.
    fn execute(&self, sql: &str) -> Result<QueryResult>;
}

/// One result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row from ordered pairs.
    #[must_use]
    pub fn new<K: Into<String>>(pairs: impl IntoIterator<Item = (K, SqlValue)>) -> Self {
        let (columns, values) = pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self { columns, values }
    }

    /// Returns the value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

/// Outcome of executing a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Returned rows, empty for writes.
    pub rows: Vec<Row>,
    /// Rows touched by a write.
    pub affected_rows: u64,
}

impl QueryResult {
    /// Creates a result holding rows.
    #[must_use]
    pub const fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            affected_rows: 0,
        }
    }

    /// Creates a result of a write.
    #[must_use]
    pub const fn affected(affected_rows: u64) -> Self {
        Self {
            rows: Vec::new(),
            affected_rows,
        }
    }
}

/// A database connection as seen by the query builder.
pub struct Connection {
    config: ConnectionConfig,
    dialect: Box<dyn Dialect>,
    aliases: RefCell<AliasRegistry>,
    executor: Option<Box<dyn Executor>>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("config", &self.config)
            .field("dialect", &self.dialect.name())
            .field("aliases", &self.aliases)
            .field("connected", &self.executor.is_some())
            .finish()
    }
}

impl Connection {
    /// Creates a connection using the dialect of the configured driver.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let dialect = config.driver.dialect();
        Self {
            config,
            dialect,
            aliases: RefCell::new(AliasRegistry::new()),
            executor: None,
        }
    }

    /// Creates a connection with an explicit dialect.
    #[must_use]
    pub fn with_dialect(config: ConnectionConfig, dialect: impl Dialect + 'static) -> Self {
        Self {
            config,
            dialect: Box::new(dialect),
            aliases: RefCell::new(AliasRegistry::new()),
            executor: None,
        }
    }

    /// Attaches the executor that runs compiled statements.
    #[must_use]
    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    /// Starts a new query.
    #[must_use]
    pub fn builder(&self) -> Builder<'_> {
        Builder::new(self)
    }

    /// Starts a new query on a table.
    #[must_use]
    pub fn table(&self, table: &str) -> Builder<'_> {
        Builder::new(self).table(table)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Returns the escaping service of this connection.
    #[must_use]
    pub fn escaper(&self) -> Escaper<'_> {
        Escaper::new(self.dialect.as_ref(), self.config.like_escape_char)
    }

    /// Returns whether debug mode is on.
    #[must_use]
    pub const fn is_debug(&self) -> bool {
        self.config.debug
    }

    // ==================== Escaping ====================

    /// Quotes a single identifier segment.
    #[must_use]
    pub fn escape_identifier(&self, name: &str) -> String {
        self.escaper().escape_identifier(name)
    }

    /// Quotes a possibly qualified identifier.
    #[must_use]
    pub fn escape_identifiers(&self, item: &str) -> String {
        self.escaper().escape_identifiers(item)
    }

    /// Quotes each identifier of a list.
    #[must_use]
    pub fn escape_identifiers_list(&self, items: &[&str]) -> Vec<String> {
        let escaper = self.escaper();
        items.iter().map(|i| escaper.escape_identifiers(i)).collect()
    }

    /// Renders a value as an escaped SQL literal.
    #[must_use]
    pub fn escape(&self, value: impl ToSqlValue) -> String {
        self.escaper().escape_value(&value.to_sql_value(), true)
    }

    /// Escapes string literal content; with `like`, LIKE wildcards too.
    #[must_use]
    pub fn escape_string(&self, value: &str, like: bool) -> String {
        self.escaper().escape_string(value, like)
    }

    /// Shorthand for `escape_string(value, true)`.
    #[must_use]
    pub fn escape_like_str(&self, value: &str) -> String {
        self.escape_string(value, true)
    }

    /// Prefixes and optionally quotes an identifier.
    ///
    /// - `prefix_single`: prefix an unqualified name (it is a table).
    /// - `protect`: quote the result.
    /// - `field_exists`: a qualified name carries a field, so its table
    ///   segment is prefixed unless it is a known alias.
    #[must_use]
    pub fn protect_identifiers(
        &self,
        item: &str,
        prefix_single: bool,
        protect: bool,
        field_exists: bool,
    ) -> String {
        let item = item.trim();
        let escaper = self.escaper();
        if item.is_empty() || item == "*" || item.contains('(') || is_numeric_str(item) {
            return item.to_string();
        }
        if item.starts_with(self.dialect.identifier_quote()) || item.starts_with('\'') {
            return item.to_string();
        }

        let (body, alias) = match split_alias(item) {
            Some((body, alias)) => (body, Some(alias)),
            None => (item, None),
        };

        let prefix = self.config.prefix.as_str();
        let aliases = self.aliases.borrow();
        let mut segments: Vec<String> = body.split('.').map(String::from).collect();
        if !prefix.is_empty() {
            // `db.table.field` carries the table second.
            let table_index = match segments.len() {
                1 if prefix_single => Some(0),
                2 if field_exists => Some(0),
                3 => Some(1),
                _ => None,
            };
            if let Some(i) = table_index {
                let table = segments[i].clone();
                if !table.starts_with(prefix) && !aliases.is_alias(&table) {
                    segments[i] = format!("{prefix}{table}");
                }
            }
        }
        drop(aliases);

        let body = segments.join(".");
        let body = if protect {
            escaper.escape_identifiers(&body)
        } else {
            body
        };
        match alias {
            Some(alias) if protect => format!("{body} AS {}", escaper.escape_identifiers(alias)),
            Some(alias) => format!("{body} AS {alias}"),
            None => body,
        }
    }

    // ==================== Prefix and aliases ====================

    /// Returns the table prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Prepends the prefix to a table name that does not carry it yet.
    #[must_use]
    pub fn prefix_table(&self, table: &str) -> String {
        let prefix = self.prefix();
        if prefix.is_empty() || table.starts_with(prefix) {
            table.to_string()
        } else {
            format!("{prefix}{table}")
        }
    }

    /// Returns `(alias, table)` for a table; the alias is the table itself
    /// when none is registered.
    #[must_use]
    pub fn get_table_alias(&self, table: &str) -> (String, String) {
        let table = strip_prefix(table.trim(), self.prefix());
        let alias = self
            .aliases
            .borrow()
            .alias_of(table)
            .map_or_else(|| table.to_string(), str::to_string);
        (alias, table.to_string())
    }

    /// Registers explicit `table => alias` mappings.
    pub fn set_aliased_tables<K, V>(&self, map: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut aliases = self.aliases.borrow_mut();
        for (table, alias) in map {
            aliases.set(table, alias);
        }
    }

    /// Resolves a table expression, registering its alias.
    pub fn add_table_alias(&self, table: &str) -> TableRef {
        self.aliases
            .borrow_mut()
            .resolve(table, &self.config.prefix, self.config.hashed_aliases)
    }

    /// Forgets every alias mapping.
    pub fn reset_data_cache(&self) {
        self.aliases.borrow_mut().clear();
    }

    /// Read access to the alias registry.
    #[must_use]
    pub fn aliases(&self) -> Ref<'_, AliasRegistry> {
        self.aliases.borrow()
    }

    // ==================== Execution ====================

    /// Replaces `?` placeholders outside string literals with escaped binds.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidArgument`] when the number of binds
    /// differs from the number of placeholders.
    pub fn compile_binds(&self, sql: &str, binds: &[SqlValue]) -> Result<String> {
        if binds.is_empty() {
            return Ok(sql.to_string());
        }

        let escaper = self.escaper();
        let mut out = String::with_capacity(sql.len() + binds.len() * 8);
        let mut remaining = binds.iter();
        let mut in_literal = false;
        let mut used = 0usize;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_literal = !in_literal;
                    out.push(ch);
                }
                '?' if !in_literal => {
                    let bind = remaining.next().ok_or_else(|| {
                        DatabaseError::InvalidArgument(format!(
                            "statement has more placeholders than the {} binds supplied",
                            binds.len()
                        ))
                    })?;
                    out.push_str(&escaper.escape_value(bind, true));
                    used += 1;
                }
                _ => out.push(ch),
            }
        }

        if used != binds.len() {
            return Err(DatabaseError::InvalidArgument(format!(
                "{} binds supplied for {used} placeholders",
                binds.len()
            )));
        }
        Ok(out)
    }

    /// Compiles binds into `sql` and runs it through the executor.
    ///
    /// # Errors
    ///
    /// Fails on a bind mismatch, without an executor, or when the executor
    /// reports an error.
    pub fn query(&self, sql: &str, binds: &[SqlValue]) -> Result<QueryResult> {
        let sql = self.compile_binds(sql, binds)?;
        let executor = self.executor.as_ref().ok_or(DatabaseError::NotConnected)?;
        debug!(dialect = self.dialect.name(), sql = %sql, "executing statement");
        executor.execute(&sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Driver;

    fn mysql() -> Connection {
        Connection::new(ConnectionConfig::new(Driver::MySql).with_prefix("db_"))
    }

    #[test]
    fn test_prefix_table() {
        let conn = mysql();
        assert_eq!(conn.prefix_table("users"), "db_users");
        assert_eq!(conn.prefix_table("db_users"), "db_users");
    }

    #[test]
    fn test_table_alias_bookkeeping() {
        let conn = mysql();
        assert_eq!(conn.get_table_alias("users"), (String::from("users"), String::from("users")));
        conn.add_table_alias("users u");
        assert_eq!(conn.get_table_alias("db_users"), (String::from("u"), String::from("users")));
        conn.set_aliased_tables([("jobs", "j")]);
        assert_eq!(conn.get_table_alias("jobs").0, "j");
        conn.reset_data_cache();
        assert!(conn.aliases().is_empty());
    }

    #[test]
    fn test_protect_identifiers() {
        let conn = mysql();
        conn.add_table_alias("users u");
        assert_eq!(conn.protect_identifiers("users", true, false, false), "db_users");
        assert_eq!(conn.protect_identifiers("users", true, true, false), "`db_users`");
        assert_eq!(conn.protect_identifiers("jobs.id", false, true, true), "`db_jobs`.`id`");
        assert_eq!(conn.protect_identifiers("u.id", false, true, true), "`u`.`id`");
        assert_eq!(conn.protect_identifiers("name", false, true, true), "`name`");
        assert_eq!(conn.protect_identifiers("COUNT(id)", false, true, true), "COUNT(id)");
        assert_eq!(
            conn.protect_identifiers("users.name AS n", false, true, true),
            "`db_users`.`name` AS `n`"
        );
    }

    #[test]
    fn test_compile_binds() {
        let conn = mysql();
        let sql = conn
            .compile_binds(
                "SELECT * FROM t WHERE a = ? AND b = '?' AND c = ?",
                &[SqlValue::Int(1), SqlValue::Text(String::from("x'y"))],
            )
            .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE a = 1 AND b = '?' AND c = 'x''y'");
    }

    #[test]
    fn test_compile_binds_count_mismatch() {
        let conn = mysql();
        assert!(matches!(
            conn.compile_binds("SELECT ?", &[SqlValue::Int(1), SqlValue::Int(2)]),
            Err(DatabaseError::InvalidArgument(_))
        ));
        assert!(matches!(
            conn.compile_binds("SELECT ?, ?", &[SqlValue::Int(1)]),
            Err(DatabaseError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_query_without_executor() {
        let conn = mysql();
        assert!(matches!(
            conn.query("SELECT 1", &[]),
            Err(DatabaseError::NotConnected)
        ));
    }

    #[test]
    fn test_escape_helpers() {
        let conn = mysql();
        assert_eq!(conn.escape("O'Brien"), "'O''Brien'");
        assert_eq!(conn.escape(3), "3");
        assert_eq!(conn.escape_identifier("id"), "`id`");
        assert_eq!(conn.escape_identifiers_list(&["a.b", "*"]), vec!["`a`.`b`", "*"]);
        assert_eq!(conn.escape_like_str("5%"), "5\\\\%");
    }
}
