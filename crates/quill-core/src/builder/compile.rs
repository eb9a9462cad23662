//! Statement assembly and terminal operations.

use super::{Builder, IntoColumns};
use crate::alias::TableRef;
use crate::connection::{QueryResult, Row};
use crate::error::{DatabaseError, Result};
use crate::record::Record;
use crate::value::SqlValue;

/// Result of a terminal write.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The compiled statement, returned instead of executed in test mode.
    Sql(String),
    /// What the executor reported.
    Executed(QueryResult),
}

impl Outcome {
    /// Returns the compiled SQL in test mode.
    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Sql(sql) => Some(sql),
            Self::Executed(_) => None,
        }
    }

    /// Consumes the outcome, returning the compiled SQL in test mode.
    #[must_use]
    pub fn into_sql(self) -> Option<String> {
        match self {
            Self::Sql(sql) => Some(sql),
            Self::Executed(_) => None,
        }
    }

    /// Returns the execution result outside test mode.
    #[must_use]
    pub const fn result(&self) -> Option<&QueryResult> {
        match self {
            Self::Sql(_) => None,
            Self::Executed(result) => Some(result),
        }
    }
}

impl<'c> Builder<'c> {
    // ==================== Rendering ====================

    /// Compiles the SELECT statement.
    #[must_use]
    pub fn sql(&self) -> String {
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.render_columns());
        sql.push_str(&self.render_body());
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.render_orders());
        }
        sql.push_str(&self.conn.dialect().limit_clause(self.limit, self.offset));
        sql
    }

    /// Compiles a `COUNT(*)` of the rows the SELECT would return.
    ///
    /// Grouped or distinct queries are counted through a subquery.
    #[must_use]
    pub fn count_sql(&self) -> String {
        if self.distinct || !self.groups.is_empty() {
            let mut inner = String::from("SELECT ");
            if self.distinct {
                inner.push_str("DISTINCT ");
            }
            inner.push_str(&self.render_columns());
            inner.push_str(&self.render_body());
            return format!("SELECT COUNT(*) AS aggregate FROM ({inner}) AS aggregate_table");
        }
        format!("SELECT COUNT(*) AS aggregate{}", self.render_body())
    }

    fn render_columns(&self) -> String {
        if self.columns.is_empty() {
            return String::from("*");
        }
        self.columns
            .iter()
            .map(|column| self.resolve_column(column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// FROM, JOIN, WHERE, GROUP BY and HAVING, each with a leading space.
    fn render_body(&self) -> String {
        let mut sql = String::new();
        if !self.from.is_empty() {
            let tables: Vec<String> = self.from.iter().map(|t| self.render_table(t)).collect();
            sql.push_str(" FROM ");
            sql.push_str(&tables.join(", "));
        }
        sql.push_str(&self.render_joins());
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.render(self));
        }
        if !self.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.render_groups());
        }
        if !self.havings.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.havings.render(self));
        }
        sql
    }

    fn target(&self, operation: &'static str) -> Result<&TableRef> {
        self.from.first().ok_or(DatabaseError::NoTable { operation })
    }

    /// Renders a table name without alias, for INSERT.
    fn render_target(&self, table: &TableRef) -> String {
        let protect = self.conn.config().protect_identifiers;
        self.conn.protect_identifiers(&table.table, true, protect, false)
    }

    fn render_column_name(&self, column: &str) -> String {
        if self.conn.config().protect_identifiers {
            self.conn.escape_identifiers(column)
        } else {
            column.to_string()
        }
    }

    fn render_insert(
        &self,
        operation: &'static str,
        data: &Record,
        ignore: bool,
        escape: bool,
    ) -> Result<String> {
        let table = self.target(operation)?;
        if data.is_empty() {
            return Err(DatabaseError::EmptyData { operation });
        }
        let escaper = self.conn.escaper();
        let columns: Vec<String> = data.columns().map(|c| self.render_column_name(c)).collect();
        let values: Vec<String> = data.values().map(|v| escaper.escape_value(v, escape)).collect();
        let dialect = self.conn.dialect();
        Ok(format!(
            "{} {} ({}) VALUES ({}){}",
            dialect.insert_keyword(ignore),
            self.render_target(table),
            columns.join(","),
            values.join(","),
            dialect.insert_suffix(ignore)
        ))
    }

    fn render_bulk_insert(
        &self,
        operation: &'static str,
        rows: &[Record],
        ignore: bool,
        escape: bool,
    ) -> Result<Vec<String>> {
        self.target(operation)?;
        let Some(first) = rows.first() else {
            return Err(DatabaseError::EmptyData { operation });
        };
        let columns: Vec<&str> = first.columns().collect();

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != columns.len() {
                    return Err(DatabaseError::InvalidArgument(format!(
                        "row {i} has {} columns, expected {}",
                        row.len(),
                        columns.len()
                    )));
                }
                // Values follow the column order of the first row.
                let ordered = columns
                    .iter()
                    .map(|column| {
                        row.get(column).cloned().map(|v| (*column, v)).ok_or_else(|| {
                            DatabaseError::InvalidArgument(format!(
                                "row {i} has no value for column '{column}'"
                            ))
                        })
                    })
                    .collect::<Result<Record>>()?;
                self.render_insert(operation, &ordered, ignore, escape)
            })
            .collect()
    }

    /// Compiles an INSERT of one record.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoTable`] without a table and
    /// [`DatabaseError::EmptyData`] for an empty record.
    pub fn insert_sql(&self, data: &Record) -> Result<String> {
        self.render_insert("insert", data, false, true)
    }

    /// Compiles an INSERT that skips rows conflicting with existing keys.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::insert_sql`].
    pub fn insert_ignore_sql(&self, data: &Record) -> Result<String> {
        self.render_insert("insert_ignore", data, true, true)
    }

    /// Compiles one INSERT per row, joined by `; `.
    ///
    /// Every row must carry the columns of the first row. With `escape`
    /// off, values are emitted verbatim: only pass trusted SQL fragments.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoTable`], [`DatabaseError::EmptyData`]
    /// for no rows, or [`DatabaseError::InvalidArgument`] for a row whose
    /// columns differ from the first.
    pub fn bulk_insert_sql(&self, rows: &[Record], escape: bool) -> Result<String> {
        Ok(self
            .render_bulk_insert("bulk_insert", rows, false, escape)?
            .join("; "))
    }

    /// Like [`Builder::bulk_insert_sql`], with the dialect's ignore form.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::bulk_insert_sql`].
    pub fn bulk_insert_ignore_sql(&self, rows: &[Record], escape: bool) -> Result<String> {
        Ok(self
            .render_bulk_insert("bulk_insert_ignore", rows, true, escape)?
            .join("; "))
    }

    /// Compiles an INSERT that updates the non-key columns on conflict.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::insert_sql`], and
    /// [`DatabaseError::InvalidArgument`] without key columns.
    pub fn upsert_sql(&self, data: &Record, unique_by: impl IntoColumns) -> Result<String> {
        let unique_by = unique_by.into_columns();
        if unique_by.is_empty() {
            return Err(DatabaseError::InvalidArgument(String::from(
                "upsert needs at least one unique column",
            )));
        }
        let insert = self.render_insert("upsert", data, false, true)?;
        let update: Vec<String> = data
            .columns()
            .filter(|c| !unique_by.iter().any(|u| u.as_str() == *c))
            .map(|c| self.render_column_name(c))
            .collect();
        let unique_by: Vec<String> = unique_by.iter().map(|c| self.render_column_name(c)).collect();
        Ok(format!(
            "{insert}{}",
            self.conn.dialect().upsert_clause(&unique_by, &update)
        ))
    }

    /// Compiles an UPDATE of the matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoTable`], [`DatabaseError::EmptyData`],
    /// or [`DatabaseError::Unsupported`] in debug mode for a LIMIT the
    /// dialect does not allow on UPDATE.
    pub fn update_sql(&self, data: &Record) -> Result<String> {
        let table = self.target("update")?;
        if data.is_empty() {
            return Err(DatabaseError::EmptyData { operation: "update" });
        }
        let escaper = self.conn.escaper();
        let sets: Vec<String> = data
            .iter()
            .map(|(c, v)| {
                format!(
                    "{} = {}",
                    self.render_column_name(c),
                    escaper.escape_value(v, true)
                )
            })
            .collect();

        let mut sql = format!("UPDATE {} SET {}", self.render_table(table), sets.join(", "));
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.render(self));
        }
        let supported = self.conn.dialect().supports_update_limit();
        self.push_write_limit(&mut sql, supported, "LIMIT on UPDATE")?;
        Ok(sql)
    }

    /// Compiles a DELETE of the matching rows.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoTable`], or [`DatabaseError::Unsupported`]
    /// in debug mode for a LIMIT the dialect does not allow on DELETE.
    pub fn delete_sql(&self) -> Result<String> {
        let table = self.target("delete")?;
        let mut sql = format!("DELETE FROM {}", self.render_table(table));
        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.render(self));
        }
        let supported = self.conn.dialect().supports_delete_limit();
        self.push_write_limit(&mut sql, supported, "LIMIT on DELETE")?;
        Ok(sql)
    }

    fn push_write_limit(
        &self,
        sql: &mut String,
        supported: bool,
        feature: &'static str,
    ) -> Result<()> {
        if let Some(limit) = self.limit {
            if self.check_feature(supported, feature)? {
                sql.push_str(&format!(" LIMIT {limit}"));
            }
        }
        Ok(())
    }

    // ==================== Execution ====================

    fn run(&self, statements: &[String]) -> Result<Outcome> {
        if self.test_mode {
            return Ok(Outcome::Sql(statements.join("; ")));
        }
        let mut affected_rows = 0;
        let mut rows = Vec::new();
        for statement in statements {
            let result = self.conn.query(statement, &[])?;
            affected_rows += result.affected_rows;
            rows.extend(result.rows);
        }
        Ok(Outcome::Executed(QueryResult {
            rows,
            affected_rows,
        }))
    }

    /// Runs the SELECT.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NotConnected`] without an executor, or the
    /// executor's error.
    pub fn get(&self) -> Result<QueryResult> {
        self.conn.query(&self.sql(), &[])
    }

    /// Runs the SELECT limited to one row and returns that row.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::get`].
    pub fn first(&self) -> Result<Option<Row>> {
        let query = self.clone().limit(1);
        Ok(query.get()?.rows.into_iter().next())
    }

    /// Runs [`Builder::count_sql`] and returns the count.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::get`].
    pub fn count(&self) -> Result<u64> {
        let result = self.conn.query(&self.count_sql(), &[])?;
        let count = result
            .rows
            .first()
            .and_then(|row| row.get("aggregate").or_else(|| row.values().first()))
            .and_then(SqlValue::as_i64)
            .unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Inserts one record.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::insert_sql`], or the execution error.
    pub fn insert(&self, data: &Record) -> Result<Outcome> {
        let sql = self.insert_sql(data)?;
        self.run(&[sql])
    }

    /// Inserts one record, skipping it on key conflict.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::insert_ignore_sql`], or the
    /// execution error.
    pub fn insert_ignore(&self, data: &Record) -> Result<Outcome> {
        let sql = self.insert_ignore_sql(data)?;
        self.run(&[sql])
    }

    /// Inserts several records, one statement each.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::bulk_insert_sql`], or the first
    /// execution error.
    pub fn bulk_insert(&self, rows: &[Record], escape: bool) -> Result<Outcome> {
        let statements = self.render_bulk_insert("bulk_insert", rows, false, escape)?;
        self.run(&statements)
    }

    /// Inserts several records, skipping those with key conflicts.
    ///
    /// # Errors
    ///
    /// Same as [`Builder::bulk_insert`].
    pub fn bulk_insert_ignore(&self, rows: &[Record], escape: bool) -> Result<Outcome> {
        let statements = self.render_bulk_insert("bulk_insert_ignore", rows, true, escape)?;
        self.run(&statements)
    }

    /// Inserts a record or updates its non-key columns.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::upsert_sql`], or the execution error.
    pub fn upsert(&self, data: &Record, unique_by: impl IntoColumns) -> Result<Outcome> {
        let sql = self.upsert_sql(data, unique_by)?;
        self.run(&[sql])
    }

    /// Updates the matching rows.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::update_sql`], or the execution error.
    pub fn update(&self, data: &Record) -> Result<Outcome> {
        let sql = self.update_sql(data)?;
        self.run(&[sql])
    }

    /// Deletes the matching rows.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Builder::delete_sql`], or the execution error.
    pub fn delete(&self) -> Result<Outcome> {
        let sql = self.delete_sql()?;
        self.run(&[sql])
    }
}
