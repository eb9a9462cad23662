//! Identifier and value escaping.
//!
//! [`Escaper`] binds a dialect to the LIKE escape character configured on
//! the connection. It never fails: input it cannot classify falls back to
//! plain quote doubling.

use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;
use crate::value::{is_numeric_str, SqlValue};

/// Identifiers that are never quoted.
const RESERVED_IDENTIFIERS: &[&str] = &["*"];

/// Bare SQL words that read like identifiers but must stay unquoted.
const SQL_FUNCTIONS: &[&str] = &[
    "AVG",
    "COALESCE",
    "CONCAT",
    "COUNT",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "DATE",
    "FALSE",
    "LOWER",
    "MAX",
    "MIN",
    "NOW",
    "NULL",
    "RAND",
    "RANDOM",
    "SUM",
    "TRUE",
    "UPPER",
];

static ALIAS_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+?)\s+as\s+(\S+)$").expect("valid alias regex"));

/// Returns whether `name` is a known SQL function or keyword literal.
#[must_use]
pub fn is_sql_function(name: &str) -> bool {
    SQL_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name.trim()))
}

/// Splits `expr AS alias` (any casing) into its two halves.
#[must_use]
pub fn split_alias(item: &str) -> Option<(&str, &str)> {
    ALIAS_SPLIT.captures(item.trim()).and_then(|caps| {
        let left = caps.get(1)?.as_str();
        let alias = caps.get(2)?.as_str();
        Some((left, alias))
    })
}

/// Escaping service for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Escaper<'a> {
    dialect: &'a dyn Dialect,
    like_escape_char: char,
}

impl<'a> Escaper<'a> {
    /// Creates an escaper for a dialect and LIKE escape character.
    #[must_use]
    pub const fn new(dialect: &'a dyn Dialect, like_escape_char: char) -> Self {
        Self {
            dialect,
            like_escape_char,
        }
    }

    /// Returns the dialect this escaper renders for.
    #[must_use]
    pub const fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Wraps a single identifier segment in the dialect's quote character.
    #[must_use]
    pub fn escape_identifier(&self, name: &str) -> String {
        self.dialect.escape_identifier(name)
    }

    /// Escapes a possibly qualified identifier (`db.table.column`).
    ///
    /// Numeric literals, already quoted items, function calls, `*` and
    /// known SQL functions are returned unchanged. An `AS alias` tail is
    /// escaped separately.
    #[must_use]
    pub fn escape_identifiers(&self, item: &str) -> String {
        let item = item.trim();
        if self.is_protected(item) {
            return item.to_string();
        }

        if let Some((left, alias)) = split_alias(item) {
            return format!(
                "{} AS {}",
                self.escape_identifiers(left),
                self.escape_identifiers(alias)
            );
        }

        item.split('.')
            .map(|segment| {
                if RESERVED_IDENTIFIERS.contains(&segment) || self.is_quoted(segment) {
                    segment.to_string()
                } else {
                    self.escape_identifier(segment)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Escapes the content of a string literal, without surrounding quotes.
    ///
    /// With `like`, the LIKE wildcards and the escape character itself are
    /// prefixed with the escape character first.
    #[must_use]
    pub fn escape_string(&self, value: &str, like: bool) -> String {
        if like {
            self.dialect.escape_string(&self.escape_like(value))
        } else {
            self.dialect.escape_string(value)
        }
    }

    /// Prefixes `%`, `_` and the escape character with the escape character.
    #[must_use]
    pub fn escape_like(&self, value: &str) -> String {
        let esc = self.like_escape_char;
        let mut out = String::with_capacity(value.len());
        for ch in value.chars() {
            if ch == esc || ch == '%' || ch == '_' {
                out.push(esc);
            }
            out.push(ch);
        }
        out
    }

    /// Returns the `ESCAPE` clause to append after a LIKE pattern.
    #[must_use]
    pub fn like_escape_clause(&self) -> String {
        self.dialect.like_escape_clause(self.like_escape_char)
    }

    /// Renders a value as a SQL literal.
    ///
    /// With `escape` off, text is emitted verbatim.
    #[must_use]
    pub fn escape_value(&self, value: &SqlValue, escape: bool) -> String {
        match value {
            SqlValue::Null => String::from("NULL"),
            SqlValue::Bool(b) => self.dialect.bool_literal(*b).to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(f) if !f.is_finite() => String::from("NULL"),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) if !escape || Self::is_quote_delimited(s) => s.clone(),
            SqlValue::Text(s) => format!("'{}'", self.escape_string(s, false)),
            SqlValue::Blob(b) => self.dialect.blob_literal(b),
            SqlValue::Raw(s) => s.clone(),
            SqlValue::List(items) => {
                let rendered: Vec<String> =
                    items.iter().map(|v| self.escape_value(v, escape)).collect();
                format!("({})", rendered.join(","))
            }
        }
    }

    fn is_protected(&self, item: &str) -> bool {
        item.is_empty()
            || RESERVED_IDENTIFIERS.contains(&item)
            || is_numeric_str(item)
            || self.is_quoted(item)
            || item.contains('(')
            || is_sql_function(item)
    }

    fn is_quoted(&self, item: &str) -> bool {
        item.starts_with(self.dialect.identifier_quote()) || item.starts_with('\'')
    }

    /// A single well-formed literal: wrapped in quotes, inner quotes doubled.
    fn is_quote_delimited(s: &str) -> bool {
        let Some(inner) = s
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
        else {
            return false;
        };
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            if ch == '\'' && chars.next() != Some('\'') {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqliteDialect};

    const MYSQL: MySqlDialect = MySqlDialect::new();
    const SQLITE: SqliteDialect = SqliteDialect::new();
    const POSTGRES: PostgresDialect = PostgresDialect::new();

    #[test]
    fn test_escape_identifiers_qualified() {
        let e = Escaper::new(&MYSQL, '\\');
        assert_eq!(e.escape_identifiers("users.name"), "`users`.`name`");
        assert_eq!(e.escape_identifiers("db.users.name"), "`db`.`users`.`name`");
        assert_eq!(e.escape_identifiers("users.*"), "`users`.*");
    }

    #[test]
    fn test_escape_identifiers_skips_safe_tokens() {
        let e = Escaper::new(&SQLITE, '\\');
        assert_eq!(e.escape_identifiers("*"), "*");
        assert_eq!(e.escape_identifiers("42"), "42");
        assert_eq!(e.escape_identifiers("COUNT(*)"), "COUNT(*)");
        assert_eq!(e.escape_identifiers("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
        assert_eq!(e.escape_identifiers("\"users\".\"id\""), "\"users\".\"id\"");
    }

    #[test]
    fn test_escape_identifiers_is_idempotent() {
        let e = Escaper::new(&POSTGRES, '\\');
        let once = e.escape_identifiers("jobs.name");
        assert_eq!(e.escape_identifiers(&once), once);
    }

    #[test]
    fn test_escape_identifiers_alias() {
        let e = Escaper::new(&SQLITE, '\\');
        assert_eq!(e.escape_identifiers("users.name as n"), "\"users\".\"name\" AS \"n\"");
    }

    #[test]
    fn test_escape_value() {
        let e = Escaper::new(&SQLITE, '\\');
        assert_eq!(e.escape_value(&SqlValue::Null, true), "NULL");
        assert_eq!(e.escape_value(&SqlValue::Bool(true), true), "1");
        assert_eq!(e.escape_value(&SqlValue::Int(7), true), "7");
        assert_eq!(
            e.escape_value(&SqlValue::Text(String::from("There's")), true),
            "'There''s'"
        );
        assert_eq!(
            e.escape_value(&SqlValue::Text(String::from("'quoted'")), true),
            "'quoted'"
        );
        assert_eq!(
            e.escape_value(&SqlValue::Text(String::from("1 + 1")), false),
            "1 + 1"
        );
        assert_eq!(e.escape_value(&SqlValue::list([1, 2, 3]), true), "(1,2,3)");
    }

    #[test]
    fn test_quote_wrapped_injection_is_escaped() {
        let e = Escaper::new(&MYSQL, '\\');
        assert_eq!(
            e.escape_value(&SqlValue::Text(String::from("'' OR '1'='1'")), true),
            "''''' OR ''1''=''1'''"
        );
        assert_eq!(
            e.escape_value(&SqlValue::Text(String::from("'it''s'")), true),
            "'it''s'"
        );
        assert_eq!(e.escape_value(&SqlValue::Text(String::from("''")), true), "''");
        assert_eq!(e.escape_value(&SqlValue::Text(String::from("'")), true), "''''");
    }

    #[test]
    fn test_non_finite_floats_render_null() {
        let e = Escaper::new(&SQLITE, '\\');
        assert_eq!(e.escape_value(&SqlValue::Float(f64::NAN), true), "NULL");
        assert_eq!(e.escape_value(&SqlValue::Float(f64::INFINITY), true), "NULL");
        assert_eq!(e.escape_value(&SqlValue::Float(1.5), true), "1.5");
    }

    #[test]
    fn test_postgres_booleans() {
        let e = Escaper::new(&POSTGRES, '\\');
        assert_eq!(e.escape_value(&SqlValue::Bool(false), true), "FALSE");
    }

    #[test]
    fn test_escape_like() {
        let e = Escaper::new(&SQLITE, '!');
        assert_eq!(e.escape_string("50%_off!", true), "50!%!_off!!");
        let e = Escaper::new(&SQLITE, '\\');
        assert_eq!(e.escape_string("it's 5%", true), "it''s 5\\%");
    }

    #[test]
    fn test_split_alias() {
        assert_eq!(split_alias("users AS u"), Some(("users", "u")));
        assert_eq!(split_alias("users as u"), Some(("users", "u")));
        assert_eq!(split_alias("users u"), None);
    }
}
