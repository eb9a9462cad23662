//! Fluent query builder.
//!
//! A [`Builder`] accumulates clause state through chained calls and
//! compiles it to dialect-specific SQL on demand. Rendering is a pure
//! function of the builder state and the connection configuration, so
//! calling [`Builder::sql`] twice yields the same text.
//!
//! # Example
//!
//! ```rust
//! use quill_core::{Connection, ConnectionConfig, Driver};
//!
//! let conn = Connection::new(ConnectionConfig::new(Driver::MySql));
//! let sql = conn
//!     .builder()
//!     .from("user u")
//!     .where_("u.active", true)
//!     .sort_asc("name")
//!     .sql();
//!
//! assert_eq!(sql, "SELECT * FROM user As u WHERE u.active = 1 ORDER BY name ASC");
//! ```

mod compile;
mod condition;
mod join;
mod operator;
mod order;
mod where_clause;

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

pub use compile::Outcome;
pub use condition::{Condition, Connective};
pub use join::{JoinCondition, JoinKind};
pub use operator::{split_operator, Operator};
pub use order::Direction;

use crate::alias::{strip_prefix, TableRef};
use crate::connection::Connection;
use crate::error::{DatabaseError, Result};
use crate::escape::split_alias;
use crate::value::SqlValue;
use condition::ConditionTree;
use join::Join;
use order::OrderTerm;

static QUALIFIED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)$")
        .expect("valid qualified column regex")
});

static BARE_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("valid identifier regex")
});

/// Conversion into a list of column or table expressions.
///
/// Strings are split on top-level commas, so `"jobs j, users u"` names
/// two tables while `"COUNT(a, b)"` stays one expression.
pub trait IntoColumns {
    /// Returns the trimmed, non-empty items.
    fn into_columns(self) -> Vec<String>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<String> {
        split_top_level(self)
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<String> {
        split_top_level(&self)
    }
}

impl IntoColumns for &String {
    fn into_columns(self) -> Vec<String> {
        split_top_level(self)
    }
}

impl IntoColumns for &[&str] {
    fn into_columns(self) -> Vec<String> {
        self.iter().flat_map(|s| split_top_level(s)).collect()
    }
}

impl<const N: usize> IntoColumns for [&str; N] {
    fn into_columns(self) -> Vec<String> {
        self.as_slice().into_columns()
    }
}

impl IntoColumns for Vec<&str> {
    fn into_columns(self) -> Vec<String> {
        self.as_slice().into_columns()
    }
}

impl IntoColumns for Vec<String> {
    fn into_columns(self) -> Vec<String> {
        self.iter().flat_map(|s| split_top_level(s)).collect()
    }
}

/// Splits on commas outside parentheses and quotes.
fn split_top_level(input: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match (ch, quote) {
            (c, Some(q)) if c == q => {
                quote = None;
                current.push(c);
            }
            (_, Some(_)) => current.push(ch),
            ('\'' | '"' | '`', None) => {
                quote = Some(ch);
                current.push(ch);
            }
            ('(', None) => {
                depth += 1;
                current.push(ch);
            }
            (')', None) => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            (',', None) if depth == 0 => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A query under construction, bound to one connection.
#[derive(Debug, Clone)]
pub struct Builder<'c> {
    conn: &'c Connection,
    from: Vec<TableRef>,
    columns: Vec<String>,
    distinct: bool,
    joins: Vec<Join>,
    wheres: ConditionTree<'c>,
    groups: Vec<String>,
    havings: ConditionTree<'c>,
    orders: Vec<OrderTerm>,
    limit: Option<u64>,
    offset: Option<u64>,
    test_mode: bool,
    /// Tables of enclosing queries, set while rendering a subquery.
    outer: Vec<TableRef>,
}

impl<'c> Builder<'c> {
    /// Creates an empty builder on a connection.
    #[must_use]
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            from: Vec::new(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            wheres: ConditionTree::default(),
            groups: Vec::new(),
            havings: ConditionTree::default(),
            orders: Vec::new(),
            limit: None,
            offset: None,
            test_mode: false,
            outer: Vec::new(),
        }
    }

    /// Returns the connection this builder renders for.
    #[must_use]
    pub const fn connection(&self) -> &'c Connection {
        self.conn
    }

    /// Adds one or more FROM targets (`"users u"`, `"jobs AS j"`,
    /// `["users u", "jobs j"]`, `"jobs j, users u"`).
    #[must_use]
    pub fn from(mut self, tables: impl IntoColumns) -> Self {
        for table in tables.into_columns() {
            let resolved = self.conn.add_table_alias(&table);
            if !self.from.contains(&resolved) {
                self.from.push(resolved);
            }
        }
        self
    }

    /// Replaces the FROM targets with a single table.
    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.from.clear();
        self.from(table)
    }

    /// Alias of [`Builder::table`], reads better for inserts.
    #[must_use]
    pub fn into(self, table: &str) -> Self {
        self.table(table)
    }

    /// Adds columns to the select list.
    #[must_use]
    pub fn select(mut self, columns: impl IntoColumns) -> Self {
        self.columns.extend(columns.into_columns());
        self
    }

    /// Sets SELECT DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Sets the LIMIT.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets the OFFSET.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Makes mutating operations return their SQL instead of executing it.
    #[must_use]
    pub const fn test_mode(mut self) -> Self {
        self.test_mode = true;
        self
    }

    /// Clears every clause, keeping the connection and test mode.
    #[must_use]
    pub fn reset(mut self) -> Self {
        self.from.clear();
        self.columns.clear();
        self.distinct = false;
        self.joins.clear();
        self.wheres.clear();
        self.groups.clear();
        self.havings.clear();
        self.orders.clear();
        self.limit = None;
        self.offset = None;
        self
    }

    // ==================== Resolution ====================

    /// Every table this builder knows: FROM targets then joined tables.
    fn tables(&self) -> impl Iterator<Item = &TableRef> {
        self.from.iter().chain(self.joins.iter().map(|j| &j.table))
    }

    /// Maps a qualifier to the name it renders as, if it denotes a known table.
    fn qualifier_alias(&self, qualifier: &str) -> Option<String> {
        let table = strip_prefix(qualifier, self.conn.prefix());

        if self.tables().any(|t| t.has_alias() && t.alias == qualifier) {
            return Some(qualifier.to_string());
        }
        if let Some(t) = self.tables().find(|t| t.table == table) {
            return Some(self.table_qualifier(t));
        }

        let aliases = self.conn.aliases();
        if aliases.is_alias(qualifier) {
            return Some(qualifier.to_string());
        }
        aliases.alias_of(table).map(str::to_string)
    }

    /// Rewrites the qualifier of `table.column` to the resolved alias.
    fn qualify(&self, reference: &str) -> String {
        let Some((qualifier, rest)) = reference.split_once('.') else {
            return reference.to_string();
        };
        if rest.contains('.') || reference.contains('(') {
            return reference.to_string();
        }
        self.qualifier_alias(qualifier)
            .map_or_else(|| reference.to_string(), |alias| format!("{alias}.{rest}"))
    }

    /// Renders a column reference: aliases resolved, prefix and quoting applied.
    pub(crate) fn resolve_column(&self, reference: &str) -> String {
        let reference = reference.trim();
        let protect = self.conn.config().protect_identifiers;
        let qualified = match split_alias(reference) {
            Some((body, alias)) => format!("{} AS {alias}", self.qualify(body)),
            None => self.qualify(reference),
        };
        self.conn.protect_identifiers(&qualified, false, protect, true)
    }

    /// Returns whether a text value denotes a column of a table in this
    /// query or an enclosing one. Aliases registered by unrelated queries
    /// do not count.
    fn is_column_reference(&self, value: &str) -> bool {
        let Some(caps) = QUALIFIED_COLUMN.captures(value) else {
            return false;
        };
        let qualifier = &caps[1];
        let table = strip_prefix(qualifier, self.conn.prefix());
        self.tables()
            .chain(&self.outer)
            .any(|t| (t.has_alias() && t.alias == qualifier) || t.table == table)
    }

    /// Renders a compared value.
    ///
    /// Escaped text naming a column of a known table (`p.user_id`) is
    /// rendered as a column; unescaped bare identifiers always are.
    pub(crate) fn render_value(&self, value: &SqlValue, escape: bool) -> String {
        if let SqlValue::Text(text) = value {
            let text = text.trim();
            if self.is_column_reference(text) || (!escape && BARE_IDENTIFIER.is_match(text)) {
                return self.resolve_column(text);
            }
        }
        self.conn.escaper().escape_value(value, escape)
    }

    /// Name a table is qualified with: its alias, or its prefixed name.
    fn table_qualifier(&self, table: &TableRef) -> String {
        if table.has_alias() {
            table.alias.clone()
        } else {
            self.conn.prefix_table(&table.table)
        }
    }

    /// Renders `prefixed_table` or `prefixed_table As alias`.
    pub(crate) fn render_table(&self, table: &TableRef) -> String {
        let protect = self.conn.config().protect_identifiers;
        let name = self.conn.protect_identifiers(&table.table, true, protect, false);
        if !table.has_alias() {
            return name;
        }
        if protect {
            format!("{name} As {}", self.conn.escape_identifier(&table.alias))
        } else {
            format!("{name} As {}", table.alias)
        }
    }

    /// Checks a dialect capability.
    ///
    /// Returns `Ok(false)` when the feature is missing outside debug mode,
    /// so the caller can skip it.
    fn check_feature(&self, supported: bool, feature: &'static str) -> Result<bool> {
        if supported {
            return Ok(true);
        }
        let dialect = self.conn.dialect().name();
        if self.conn.is_debug() {
            return Err(DatabaseError::Unsupported { feature, dialect });
        }
        warn!(feature, dialect, "feature not available for this database, ignoring");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionConfig, Driver};

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("jobs j, users u"), vec!["jobs j", "users u"]);
        assert_eq!(split_top_level("COUNT(a, b), name"), vec!["COUNT(a, b)", "name"]);
        assert_eq!(split_top_level("'a,b', c"), vec!["'a,b'", "c"]);
        assert!(split_top_level(" , ").is_empty());
    }

    #[test]
    fn test_from_deduplicates() {
        let conn = Connection::new(ConnectionConfig::new(Driver::MySql));
        let sql = conn.builder().from("users u").from("users u").sql();
        assert_eq!(sql, "SELECT * FROM users As u");
    }

    #[test]
    fn test_resolve_column_prefixes_unaliased_tables() {
        let conn = Connection::new(ConnectionConfig::new(Driver::MySql).with_prefix("db_"));
        let b = conn.builder().from("users");
        assert_eq!(b.resolve_column("users.id"), "db_users.id");
        assert_eq!(b.resolve_column("id"), "id");
    }

    #[test]
    fn test_render_value_column_detection() {
        let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
        let b = conn.builder().from("posts p");
        assert_eq!(b.render_value(&SqlValue::Text(String::from("p.user_id")), true), "p.user_id");
        assert_eq!(
            b.render_value(&SqlValue::Text(String::from("john.doe")), true),
            "'john.doe'"
        );
        assert_eq!(b.render_value(&SqlValue::Text(String::from("other")), false), "other");
    }

    #[test]
    fn test_value_heuristic_ignores_foreign_aliases() {
        let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
        let _ = conn.builder().from("users u");
        let sql = conn.table("emails").where_("domain", "u.example").sql();
        assert_eq!(sql, "SELECT * FROM emails WHERE domain = 'u.example'");
    }

    #[test]
    fn test_value_heuristic_sees_enclosing_query() {
        let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
        let sql = conn
            .builder()
            .from("users u")
            .where_exists(|q| {
                q.from("posts p")
                    .where_("p.user_id", "u.id")
                    .where_exists(|qq| qq.from("likes l").where_("l.user_id", "u.id"))
            })
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users As u WHERE EXISTS (SELECT * FROM posts As p WHERE p.user_id = u.id \
             AND EXISTS (SELECT * FROM likes As l WHERE l.user_id = u.id))"
        );
    }

    #[test]
    fn test_check_feature() {
        let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
        assert!(!conn.builder().check_feature(false, "NATURAL JOIN").unwrap());
        let debug = Connection::new(ConnectionConfig::new(Driver::Sqlite).with_debug(true));
        assert!(matches!(
            debug.builder().check_feature(false, "NATURAL JOIN"),
            Err(DatabaseError::Unsupported { .. })
        ));
    }
}
