//! SQL dialect support.
//!
//! Each database changes escaping rules, function names and a few clause
//! forms. The builder renders everything through a [`Dialect`], which
//! carries shared defaults and lets each variant override what differs.

mod mysql;
mod postgres;
mod sqlite;

use std::fmt;

use chrono::NaiveDate;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect: fmt::Debug {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Wraps a single identifier segment in quotes, doubling embedded quotes.
    fn escape_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        let doubled = format!("{quote}{quote}");
        format!("{quote}{}{quote}", name.replace(quote, &doubled))
    }

    /// Escapes the content of a string literal (without the surrounding quotes).
    fn escape_string(&self, value: &str) -> String {
        value.replace('\0', "").replace('\'', "''")
    }

    /// Returns the literal for a boolean.
    fn bool_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    /// Returns the literal for a binary blob.
    fn blob_literal(&self, bytes: &[u8]) -> String {
        let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
        format!("X'{hex}'")
    }

    /// Returns the `ESCAPE` clause appended to LIKE comparisons, if any.
    fn like_escape_clause(&self, escape_char: char) -> String {
        if escape_char == '\\' {
            String::new()
        } else {
            format!(" ESCAPE '{escape_char}'")
        }
    }

    /// Renders a comparison of a column truncated to its date against a date.
    fn date_comparison(&self, column: &str, operator: &str, date: NaiveDate) -> String;

    /// Returns the random-order function.
    fn random_function(&self) -> &'static str {
        "RANDOM()"
    }

    /// Returns the statement head of an INSERT.
    fn insert_keyword(&self, ignore: bool) -> &'static str {
        let _ = ignore;
        "INSERT INTO"
    }

    /// Returns what follows the VALUES list of an INSERT.
    fn insert_suffix(&self, ignore: bool) -> &'static str {
        let _ = ignore;
        ""
    }

    /// Renders the conflict clause of an upsert.
    ///
    /// Column names arrive already rendered.
    fn upsert_clause(&self, unique_by: &[String], update: &[String]) -> String {
        let sets: Vec<String> = update.iter().map(|c| format!("{c} = excluded.{c}")).collect();
        if sets.is_empty() {
            format!(" ON CONFLICT ({}) DO NOTHING", unique_by.join(","))
        } else {
            format!(
                " ON CONFLICT ({}) DO UPDATE SET {}",
                unique_by.join(","),
                sets.join(", ")
            )
        }
    }

    /// Renders the LIMIT/OFFSET tail of a SELECT, including the leading space.
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (limit, offset) {
            (Some(n), Some(m)) if m > 0 => format!(" LIMIT {n} OFFSET {m}"),
            (Some(n), _) => format!(" LIMIT {n}"),
            (None, Some(m)) if m > 0 => format!(" OFFSET {m}"),
            _ => String::new(),
        }
    }

    /// Returns whether NATURAL JOIN is available.
    fn supports_natural_join(&self) -> bool {
        false
    }

    /// Returns whether RIGHT JOIN is available.
    fn supports_right_join(&self) -> bool {
        true
    }

    /// Returns whether UPDATE accepts a LIMIT.
    fn supports_update_limit(&self) -> bool {
        false
    }

    /// Returns whether DELETE accepts a LIMIT.
    fn supports_delete_limit(&self) -> bool {
        false
    }
}
