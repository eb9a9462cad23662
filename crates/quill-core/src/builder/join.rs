//! JOIN clauses.

use std::sync::LazyLock;

use regex::Regex;

use super::operator::split_operator;
use super::{Builder, BARE_IDENTIFIER};
use crate::alias::TableRef;
use crate::error::Result;

static LOGICAL_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(AND|OR)\s+").expect("valid logical split regex"));

static COMPARISON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*(<=|>=|<>|!=|=|<|>)\s*(.+)$").expect("valid comparison regex")
});

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `NATURAL JOIN`, without condition.
    Natural,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Natural => "NATURAL JOIN",
        }
    }
}

/// The ON part of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    /// A column both tables share: `first.col = joined.col`.
    Using(String),
    /// `left => right` column pairs ANDed together; a left side starting
    /// with `|` is ORed instead.
    Pairs(Vec<(String, String)>),
    /// A free-form expression such as `"u.id = j.user_id AND j.active = 1"`.
    Raw(String),
}

impl From<&str> for JoinCondition {
    fn from(condition: &str) -> Self {
        let condition = condition.trim();
        if condition.contains(['=', '<', '>']) {
            Self::Raw(condition.to_string())
        } else {
            Self::Using(condition.to_string())
        }
    }
}

impl From<String> for JoinCondition {
    fn from(condition: String) -> Self {
        Self::from(condition.as_str())
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for JoinCondition {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self::Pairs(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for JoinCondition {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from(Vec::from(pairs))
    }
}

#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableRef,
    pub condition: Option<JoinCondition>,
}

impl<'c> Builder<'c> {
    fn push_join(mut self, kind: JoinKind, table: &str, condition: Option<JoinCondition>) -> Self {
        let table = self.conn.add_table_alias(table);
        self.joins.push(Join {
            kind,
            table,
            condition,
        });
        self
    }

    /// Adds an `INNER JOIN`.
    ///
    /// The condition is a shared column name (`"user_id"`), column pairs
    /// (`[("u.id", "j.user_id")]`) or an expression (`"u.id = j.user_id"`).
    #[must_use]
    pub fn join(self, table: &str, condition: impl Into<JoinCondition>) -> Self {
        self.push_join(JoinKind::Inner, table, Some(condition.into()))
    }

    /// Adds a `LEFT JOIN`.
    #[must_use]
    pub fn left_join(self, table: &str, condition: impl Into<JoinCondition>) -> Self {
        self.push_join(JoinKind::Left, table, Some(condition.into()))
    }

    /// Adds a `RIGHT JOIN` where the dialect has one.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Unsupported`](crate::DatabaseError::Unsupported)
    /// in debug mode when the dialect lacks RIGHT JOIN. Outside debug mode
    /// the join is skipped.
    pub fn right_join(self, table: &str, condition: impl Into<JoinCondition>) -> Result<Self> {
        let supported = self.conn.dialect().supports_right_join();
        if !self.check_feature(supported, "RIGHT JOIN")? {
            return Ok(self);
        }
        Ok(self.push_join(JoinKind::Right, table, Some(condition.into())))
    }

    /// Adds a `NATURAL JOIN` where the dialect has one.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Unsupported`](crate::DatabaseError::Unsupported)
    /// in debug mode when the dialect lacks NATURAL JOIN. Outside debug
    /// mode the join is skipped.
    pub fn natural_join(self, table: &str) -> Result<Self> {
        let supported = self.conn.dialect().supports_natural_join();
        if !self.check_feature(supported, "NATURAL JOIN")? {
            return Ok(self);
        }
        Ok(self.push_join(JoinKind::Natural, table, None))
    }

    /// Renders every join, each with a leading space.
    pub(crate) fn render_joins(&self) -> String {
        let mut sql = String::new();
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&self.render_table(&join.table));
            if let Some(condition) = &join.condition {
                sql.push_str(&self.render_join_condition(&join.table, condition));
            }
        }
        sql
    }

    fn render_join_condition(&self, joined: &TableRef, condition: &JoinCondition) -> String {
        match condition {
            JoinCondition::Using(column) => match self.from.first() {
                Some(first) => format!(
                    " ON {} = {}",
                    self.resolve_column(&format!("{}.{column}", self.table_qualifier(first))),
                    self.resolve_column(&format!("{}.{column}", self.table_qualifier(joined)))
                ),
                None => format!(" USING ({})", self.resolve_column(column)),
            },
            JoinCondition::Pairs(pairs) => {
                let mut sql = String::from(" ON ");
                for (i, (left, right)) in pairs.iter().enumerate() {
                    let (connective, left) = match left.strip_prefix('|') {
                        Some(rest) => (" OR ", rest),
                        None => (" AND ", left.as_str()),
                    };
                    if i > 0 {
                        sql.push_str(connective);
                    }
                    let (left, operator) = split_operator(left);
                    sql.push_str(&format!(
                        "{} {operator} {}",
                        self.resolve_column(&left),
                        self.resolve_column(right)
                    ));
                }
                sql
            }
            JoinCondition::Raw(expression) => {
                format!(" ON {}", self.render_raw_join(expression))
            }
        }
    }

    /// Resolves the column operands of each comparison in an expression.
    fn render_raw_join(&self, expression: &str) -> String {
        let mut sql = String::new();
        let mut last = 0;
        for connective in LOGICAL_SPLIT.find_iter(expression) {
            if inside_literal(expression, connective.start()) {
                continue;
            }
            sql.push_str(&self.render_raw_comparison(&expression[last..connective.start()]));
            sql.push_str(&format!(" {} ", connective.as_str().trim().to_ascii_uppercase()));
            last = connective.end();
        }
        sql.push_str(&self.render_raw_comparison(&expression[last..]));
        sql
    }

    fn render_raw_comparison(&self, comparison: &str) -> String {
        let comparison = comparison.trim();
        let Some(caps) = COMPARISON.captures(comparison) else {
            return comparison.to_string();
        };
        format!(
            "{} {} {}",
            self.render_operand(&caps[1]),
            &caps[2],
            self.render_operand(&caps[3])
        )
    }

    fn render_operand(&self, operand: &str) -> String {
        let operand = operand.trim();
        if BARE_IDENTIFIER.is_match(operand) && operand.contains('.') {
            self.resolve_column(operand)
        } else {
            operand.to_string()
        }
    }
}

/// Returns whether byte offset `at` falls inside a `'...'` literal.
///
/// A doubled `''` toggles twice, so escaped quotes keep the literal open.
fn inside_literal(expression: &str, at: usize) -> bool {
    expression[..at].matches('\'').count() % 2 == 1
}
