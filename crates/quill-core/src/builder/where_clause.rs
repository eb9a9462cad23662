//! WHERE and HAVING methods.

use super::condition::{Condition, ConditionTree, Connective, Predicate};
use super::operator::{split_operator, Operator};
use super::{Builder, IntoColumns};
use crate::date::ToSqlDate;
use crate::error::Result;
use crate::value::{SqlValue, ToSqlValue};

/// Which condition tree a call feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Where,
    Having,
}

impl<'c> Builder<'c> {
    fn tree_mut(&mut self, target: Target) -> &mut ConditionTree<'c> {
        match target {
            Target::Where => &mut self.wheres,
            Target::Having => &mut self.havings,
        }
    }

    fn push(
        mut self,
        target: Target,
        connective: Connective,
        negated: bool,
        predicate: Predicate<'c>,
    ) -> Self {
        self.tree_mut(target).push(connective, negated, predicate);
        self
    }

    fn push_compare(
        self,
        target: Target,
        connective: Connective,
        negated: bool,
        key: &str,
        value: SqlValue,
        escape: bool,
    ) -> Self {
        let (column, operator) = split_operator(key);
        self.push(
            target,
            connective,
            negated,
            Predicate::Compare {
                column,
                operator,
                value,
                escape,
            },
        )
    }

    fn push_condition(
        self,
        target: Target,
        connective: Connective,
        negated: bool,
        condition: Condition<'c>,
    ) -> Self {
        match condition {
            Condition::Simple { key, value, escape } => {
                self.push_compare(target, connective, negated, &key, value, escape)
            }
            Condition::Raw(sql) => self.push(target, connective, negated, Predicate::Raw(sql)),
            Condition::ColumnArray(pairs) => {
                let mut builder = self;
                for (i, (key, value)) in pairs.into_iter().enumerate() {
                    let (connective, key) = match key.strip_prefix('|') {
                        Some(rest) => (Connective::Or, rest.to_string()),
                        None if i == 0 => (connective, key),
                        None => (Connective::And, key),
                    };
                    builder = builder.push_compare(target, connective, negated, &key, value, true);
                }
                builder
            }
            Condition::Callback(build) => {
                let mut sub = build(Builder::new(self.conn));
                let tree = std::mem::take(sub.tree_mut(target));
                if tree.is_empty() {
                    return self;
                }
                self.push(target, connective, negated, Predicate::Group(tree))
            }
        }
    }

    fn push_nulls(self, connective: Connective, negated: bool, columns: impl IntoColumns) -> Self {
        let mut builder = self;
        for (i, column) in columns.into_columns().into_iter().enumerate() {
            let connective = if i == 0 { connective } else { Connective::And };
            builder = builder.push(Target::Where, connective, negated, Predicate::Null { column });
        }
        builder
    }

    fn push_date(
        self,
        connective: Connective,
        key: &str,
        date: &(impl ToSqlDate + ?Sized),
    ) -> Result<Self> {
        let (column, operator) = split_operator(key);
        let date = date.to_sql_date()?;
        Ok(self.push(
            Target::Where,
            connective,
            false,
            Predicate::Date {
                column,
                operator,
                date,
            },
        ))
    }

    fn push_exists<F>(self, connective: Connective, negated: bool, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c>,
    {
        let inner = build(Builder::new(self.conn));
        self.push(
            Target::Where,
            connective,
            negated,
            Predicate::Exists(Box::new(inner)),
        )
    }

    fn push_columns(self, connective: Connective, negated: bool, left: &str, right: &str) -> Self {
        let (left, operator) = split_operator(left);
        self.push(
            Target::Where,
            connective,
            negated,
            Predicate::Columns {
                left,
                operator,
                right: right.trim().to_string(),
            },
        )
    }

    fn push_like(self, connective: Connective, negated: bool, column: &str, needle: &str) -> Self {
        let pattern = format!("%{}%", self.conn.escaper().escape_like(needle));
        self.push(
            Target::Where,
            connective,
            negated,
            Predicate::Like {
                column: column.trim().to_string(),
                pattern,
            },
        )
    }

    // ==================== WHERE ====================

    /// Adds `key value` joined with AND. The key may end with an operator
    /// (`"age >"`, `"name !="`, `"title LIKE"`); `=` is the default.
    ///
    /// A text value naming a column of a known table (`"p.user_id"`) is
    /// compared as a column, anything else is escaped as a literal.
    #[must_use]
    pub fn where_(self, key: &str, value: impl ToSqlValue) -> Self {
        self.push_compare(Target::Where, Connective::And, false, key, value.to_sql_value(), true)
    }

    /// Like [`Builder::where_`], joined with OR.
    #[must_use]
    pub fn or_where(self, key: &str, value: impl ToSqlValue) -> Self {
        self.push_compare(Target::Where, Connective::Or, false, key, value.to_sql_value(), true)
    }

    /// Adds the negated comparison, joined with AND.
    #[must_use]
    pub fn where_not(self, key: &str, value: impl ToSqlValue) -> Self {
        self.push_compare(Target::Where, Connective::And, true, key, value.to_sql_value(), true)
    }

    /// Adds the negated comparison, joined with OR.
    #[must_use]
    pub fn or_where_not(self, key: &str, value: impl ToSqlValue) -> Self {
        self.push_compare(Target::Where, Connective::Or, true, key, value.to_sql_value(), true)
    }

    /// Adds a comparison whose value is not escaped.
    ///
    /// A bare identifier value is resolved as a column, so
    /// `where_unescaped("users.id", "jobs.user_id")` compares two columns.
    /// Any other value is emitted verbatim.
    #[must_use]
    pub fn where_unescaped(self, key: &str, value: &str) -> Self {
        let value = SqlValue::Text(value.to_string());
        self.push_compare(Target::Where, Connective::And, false, key, value, false)
    }

    /// Like [`Builder::where_unescaped`], joined with OR.
    #[must_use]
    pub fn or_where_unescaped(self, key: &str, value: &str) -> Self {
        let value = SqlValue::Text(value.to_string());
        self.push_compare(Target::Where, Connective::Or, false, key, value, false)
    }

    /// Adds a boolean expression verbatim.
    ///
    /// **Warning**: the expression is not escaped.
    #[must_use]
    pub fn where_raw(self, sql: &str) -> Self {
        self.push(Target::Where, Connective::And, false, Predicate::Raw(sql.to_string()))
    }

    /// Like [`Builder::where_raw`], joined with OR.
    #[must_use]
    pub fn or_where_raw(self, sql: &str) -> Self {
        self.push(Target::Where, Connective::Or, false, Predicate::Raw(sql.to_string()))
    }

    /// Adds each `key => value` pair in order, joined with AND; a key
    /// starting with `|` is joined with OR instead.
    #[must_use]
    pub fn where_map<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToSqlValue,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.to_sql_value())).collect();
        self.push_condition(Target::Where, Connective::And, false, Condition::ColumnArray(pairs))
    }

    /// Like [`Builder::where_map`], the first pair joined with OR.
    #[must_use]
    pub fn or_where_map<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToSqlValue,
    {
        let pairs = pairs.into_iter().map(|(k, v)| (k.into(), v.to_sql_value())).collect();
        self.push_condition(Target::Where, Connective::Or, false, Condition::ColumnArray(pairs))
    }

    /// Adds any [`Condition`], joined with AND.
    ///
    /// ```rust
    /// use quill_core::{Connection, ConnectionConfig, Driver};
    ///
    /// let conn = Connection::new(ConnectionConfig::new(Driver::Sqlite));
    /// let sql = conn
    ///     .table("users")
    ///     .where_condition(("age >", 18))
    ///     .where_condition("deleted_at IS NULL")
    ///     .or_where_condition(vec![("role", "admin"), ("|role", "owner")])
    ///     .sql();
    ///
    /// assert_eq!(
    ///     sql,
    ///     "SELECT * FROM users WHERE age > 18 AND deleted_at IS NULL OR role = 'admin' OR role = 'owner'"
    /// );
    /// ```
    #[must_use]
    pub fn where_condition(self, condition: impl Into<Condition<'c>>) -> Self {
        self.push_condition(Target::Where, Connective::And, false, condition.into())
    }

    /// Adds any [`Condition`], joined with OR.
    #[must_use]
    pub fn or_where_condition(self, condition: impl Into<Condition<'c>>) -> Self {
        self.push_condition(Target::Where, Connective::Or, false, condition.into())
    }

    /// Adds a parenthesised group built on a fresh builder.
    #[must_use]
    pub fn where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c> + 'c,
    {
        self.push_condition(
            Target::Where,
            Connective::And,
            false,
            Condition::Callback(Box::new(build)),
        )
    }

    /// Like [`Builder::where_group`], joined with OR.
    #[must_use]
    pub fn or_where_group<F>(self, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c> + 'c,
    {
        self.push_condition(
            Target::Where,
            Connective::Or,
            false,
            Condition::Callback(Box::new(build)),
        )
    }

    // ==================== Column comparisons ====================

    /// Compares two columns. `left` may carry an operator (`"a.x >"`).
    #[must_use]
    pub fn where_column(self, left: &str, right: &str) -> Self {
        self.push_columns(Connective::And, false, left, right)
    }

    /// Adds the negated column comparison, joined with AND.
    #[must_use]
    pub fn not_where_column(self, left: &str, right: &str) -> Self {
        self.push_columns(Connective::And, true, left, right)
    }

    /// Compares two columns, joined with OR.
    #[must_use]
    pub fn or_where_column(self, left: &str, right: &str) -> Self {
        self.push_columns(Connective::Or, false, left, right)
    }

    /// Adds the negated column comparison, joined with OR.
    #[must_use]
    pub fn or_not_where_column(self, left: &str, right: &str) -> Self {
        self.push_columns(Connective::Or, true, left, right)
    }

    // ==================== NULL checks ====================

    /// Adds `column IS NULL` for each column.
    #[must_use]
    pub fn where_null(self, columns: impl IntoColumns) -> Self {
        self.push_nulls(Connective::And, false, columns)
    }

    /// Adds `column IS NOT NULL` for each column.
    #[must_use]
    pub fn where_not_null(self, columns: impl IntoColumns) -> Self {
        self.push_nulls(Connective::And, true, columns)
    }

    /// Like [`Builder::where_null`], the first column joined with OR.
    #[must_use]
    pub fn or_where_null(self, columns: impl IntoColumns) -> Self {
        self.push_nulls(Connective::Or, false, columns)
    }

    /// Like [`Builder::where_not_null`], the first column joined with OR.
    #[must_use]
    pub fn or_where_not_null(self, columns: impl IntoColumns) -> Self {
        self.push_nulls(Connective::Or, true, columns)
    }

    // ==================== Dates ====================

    /// Compares the date part of a column with a date.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidArgument`](crate::DatabaseError::InvalidArgument)
    /// when the input is not a date.
    pub fn where_date(self, key: &str, date: &(impl ToSqlDate + ?Sized)) -> Result<Self> {
        self.push_date(Connective::And, key, date)
    }

    /// Like [`Builder::where_date`], joined with OR.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::InvalidArgument`](crate::DatabaseError::InvalidArgument)
    /// when the input is not a date.
    pub fn or_where_date(self, key: &str, date: &(impl ToSqlDate + ?Sized)) -> Result<Self> {
        self.push_date(Connective::Or, key, date)
    }

    // ==================== EXISTS ====================

    /// Adds `EXISTS (subquery)`; the closure receives a fresh builder on
    /// the same connection.
    #[must_use]
    pub fn where_exists<F>(self, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c>,
    {
        self.push_exists(Connective::And, false, build)
    }

    /// Adds `NOT EXISTS (subquery)`.
    #[must_use]
    pub fn where_not_exists<F>(self, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c>,
    {
        self.push_exists(Connective::And, true, build)
    }

    /// Adds `EXISTS (subquery)`, joined with OR.
    #[must_use]
    pub fn or_where_exists<F>(self, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c>,
    {
        self.push_exists(Connective::Or, false, build)
    }

    /// Adds `NOT EXISTS (subquery)`, joined with OR.
    #[must_use]
    pub fn or_where_not_exists<F>(self, build: F) -> Self
    where
        F: FnOnce(Builder<'c>) -> Builder<'c>,
    {
        self.push_exists(Connective::Or, true, build)
    }

    // ==================== IN ====================

    /// Adds `column IN (values)`. An empty list matches nothing.
    #[must_use]
    pub fn where_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        self.push_in(Target::Where, Connective::And, Operator::In, column, values)
    }

    /// Adds `column NOT IN (values)`. An empty list matches everything.
    #[must_use]
    pub fn where_not_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        self.push_in(Target::Where, Connective::And, Operator::NotIn, column, values)
    }

    /// Like [`Builder::where_in`], joined with OR.
    #[must_use]
    pub fn or_where_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        self.push_in(Target::Where, Connective::Or, Operator::In, column, values)
    }

    /// Like [`Builder::where_not_in`], joined with OR.
    #[must_use]
    pub fn or_where_not_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        self.push_in(Target::Where, Connective::Or, Operator::NotIn, column, values)
    }

    fn push_in<I, T>(
        self,
        target: Target,
        connective: Connective,
        operator: Operator,
        column: &str,
        values: I,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        self.push(
            target,
            connective,
            false,
            Predicate::Compare {
                column: column.trim().to_string(),
                operator,
                value: SqlValue::list(values),
                escape: true,
            },
        )
    }

    // ==================== LIKE ====================

    /// Adds `column LIKE '%needle%'`; wildcards in `needle` match literally.
    #[must_use]
    pub fn where_like(self, column: &str, needle: &str) -> Self {
        self.push_like(Connective::And, false, column, needle)
    }

    /// Like [`Builder::where_like`], joined with OR.
    #[must_use]
    pub fn or_where_like(self, column: &str, needle: &str) -> Self {
        self.push_like(Connective::Or, false, column, needle)
    }

    /// Adds `column NOT LIKE '%needle%'`.
    #[must_use]
    pub fn where_not_like(self, column: &str, needle: &str) -> Self {
        self.push_like(Connective::And, true, column, needle)
    }

    // ==================== HAVING ====================

    /// Adds a HAVING comparison, joined with AND.
    #[must_use]
    pub fn having(self, key: &str, value: impl ToSqlValue) -> Self {
        self.push_compare(Target::Having, Connective::And, false, key, value.to_sql_value(), true)
    }

    /// Adds a HAVING comparison, joined with OR.
    #[must_use]
    pub fn or_having(self, key: &str, value: impl ToSqlValue) -> Self {
        self.push_compare(Target::Having, Connective::Or, false, key, value.to_sql_value(), true)
    }

    /// Adds a HAVING expression verbatim.
    #[must_use]
    pub fn having_raw(self, sql: &str) -> Self {
        self.push(Target::Having, Connective::And, false, Predicate::Raw(sql.to_string()))
    }

    /// Adds a HAVING expression verbatim, joined with OR.
    #[must_use]
    pub fn or_having_raw(self, sql: &str) -> Self {
        self.push(Target::Having, Connective::Or, false, Predicate::Raw(sql.to_string()))
    }

    /// Adds `HAVING column IN (values)`.
    #[must_use]
    pub fn having_in<I, T>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToSqlValue,
    {
        self.push_in(Target::Having, Connective::And, Operator::In, column, values)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConnectionConfig, Driver};
    use crate::connection::Connection;
    use crate::value::SqlValue;

    fn sqlite() -> Connection {
        Connection::new(ConnectionConfig::new(Driver::Sqlite))
    }

    #[test]
    fn test_operators_in_keys() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_("id >", 2)
            .where_("name !=", "X")
            .or_where("age <=", 30)
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE id > 2 AND name != 'X' OR age <= 30"
        );
    }

    #[test]
    fn test_null_values_become_is_null() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_("deleted_at", SqlValue::Null)
            .where_("banned_at !=", None::<i64>)
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE deleted_at IS NULL AND banned_at IS NOT NULL"
        );
    }

    #[test]
    fn test_where_not_inverts_operator() {
        let conn = sqlite();
        let sql = conn.table("users").where_not("age >", 18).where_not("id", 1).sql();
        assert_eq!(sql, "SELECT * FROM users WHERE age <= 18 AND id != 1");
    }

    #[test]
    fn test_where_map_with_or_prefix() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_("active", true)
            .where_map([("role", "admin"), ("|role", "owner")])
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE active = 1 AND role = 'admin' OR role = 'owner'"
        );
    }

    #[test]
    fn test_raw_conditions() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_raw("id > 2 AND name != 'X'")
            .or_where_raw("vip = 1")
            .sql();
        assert_eq!(sql, "SELECT * FROM users WHERE id > 2 AND name != 'X' OR vip = 1");
    }

    #[test]
    fn test_unescaped_values() {
        let conn = sqlite();
        let sql = conn
            .builder()
            .from("users, jobs")
            .where_unescaped("users.id", "jobs.user_id")
            .where_unescaped("score >", "1 + 1")
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users, jobs WHERE users.id = jobs.user_id AND score > 1 + 1"
        );
    }

    #[test]
    fn test_where_in_and_empty_lists() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_in("id", [1, 2, 3])
            .where_not_in("role", ["guest"])
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE id IN (1,2,3) AND role NOT IN ('guest')"
        );

        let empty: [i64; 0] = [];
        let sql = conn.table("users").where_in("id", empty).or_where_not_in("id", empty).sql();
        assert_eq!(sql, "SELECT * FROM users WHERE 1 = 0 OR 1 = 1");
    }

    #[test]
    fn test_where_like_escapes_wildcards() {
        let conn = sqlite();
        let sql = conn.table("items").where_like("name", "50%_off").sql();
        assert_eq!(
            sql,
            "SELECT * FROM items WHERE name LIKE '%50\\%\\_off%' ESCAPE '\\'"
        );

        let mysql = Connection::new(ConnectionConfig::new(Driver::MySql));
        let sql = mysql.table("items").where_not_like("name", "it's").sql();
        assert_eq!(sql, "SELECT * FROM items WHERE name NOT LIKE '%it''s%'");
    }

    #[test]
    fn test_null_lists() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_null(["deleted_at", "banned_at"])
            .or_where_not_null("verified_at")
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE deleted_at IS NULL AND banned_at IS NULL OR verified_at IS NOT NULL"
        );
    }

    #[test]
    fn test_groups() {
        let conn = sqlite();
        let sql = conn
            .table("users")
            .where_("active", true)
            .or_where_group(|q| q.where_("role", "admin").where_("level >", 3))
            .where_group(|q| q)
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE active = 1 OR (role = 'admin' AND level > 3)"
        );
    }

    #[test]
    fn test_not_exists() {
        let conn = sqlite();
        let sql = conn
            .builder()
            .from("users u")
            .where_not_exists(|q| q.from("bans b").where_column("b.user_id", "u.id"))
            .sql();
        assert_eq!(
            sql,
            "SELECT * FROM users As u WHERE NOT EXISTS (SELECT * FROM bans As b WHERE b.user_id = u.id)"
        );
    }

    #[test]
    fn test_where_date_rejects_garbage() {
        let conn = sqlite();
        assert!(conn.table("users").where_date("created_at", "yesterday").is_err());
    }

    #[test]
    fn test_having_family() {
        let conn = sqlite();
        let sql = conn
            .table("orders")
            .select("customer_id, COUNT(*) AS total")
            .group_by("customer_id")
            .having("total >", 5)
            .or_having_raw("SUM(amount) > 100")
            .having_in("customer_id", [1, 2])
            .sql();
        assert_eq!(
            sql,
            "SELECT customer_id, COUNT(*) AS total FROM orders GROUP BY customer_id HAVING total > 5 OR SUM(amount) > 100 AND customer_id IN (1,2)"
        );
    }
}
