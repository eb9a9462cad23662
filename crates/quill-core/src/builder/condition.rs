//! Condition trees shared by WHERE and HAVING.
//!
//! Conditions keep raw column references; aliases are resolved when the
//! tree is rendered, so a condition may name a table before its alias is
//! declared.

use std::fmt;

use chrono::NaiveDate;

use super::operator::Operator;
use super::Builder;
use crate::value::{SqlValue, ToSqlValue};

/// Boolean connective joining a condition to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl Connective {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// Input accepted by [`Builder::where_condition`].
pub enum Condition<'c> {
    /// `key => value`; the key may carry a trailing operator (`"age >"`).
    Simple {
        /// Column with optional operator.
        key: String,
        /// Compared value.
        value: SqlValue,
        /// Whether the value is escaped as a literal.
        escape: bool,
    },
    /// A boolean expression inserted verbatim.
    Raw(String),
    /// Independent `key => value` pairs folded with AND; a key starting
    /// with `|` joins with OR instead.
    ColumnArray(Vec<(String, SqlValue)>),
    /// A nested, parenthesised group built on a fresh builder.
    Callback(Box<dyn FnOnce(Builder<'c>) -> Builder<'c> + 'c>),
}

impl fmt::Debug for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { key, value, escape } => f
                .debug_struct("Simple")
                .field("key", key)
                .field("value", value)
                .field("escape", escape)
                .finish(),
            Self::Raw(sql) => f.debug_tuple("Raw").field(sql).finish(),
            Self::ColumnArray(pairs) => f.debug_tuple("ColumnArray").field(pairs).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for Condition<'_> {
    fn from(sql: &str) -> Self {
        Self::Raw(sql.to_string())
    }
}

impl From<String> for Condition<'_> {
    fn from(sql: String) -> Self {
        Self::Raw(sql)
    }
}

impl<V: ToSqlValue> From<(&str, V)> for Condition<'_> {
    fn from((key, value): (&str, V)) -> Self {
        Self::Simple {
            key: key.to_string(),
            value: value.to_sql_value(),
            escape: true,
        }
    }
}

impl<K: Into<String>, V: ToSqlValue> From<Vec<(K, V)>> for Condition<'_> {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self::ColumnArray(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_sql_value()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: ToSqlValue, const N: usize> From<[(K, V); N]> for Condition<'_> {
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from(Vec::from(pairs))
    }
}

/// A normalized condition node.
#[derive(Debug, Clone)]
pub enum Predicate<'c> {
    Compare {
        column: String,
        operator: Operator,
        value: SqlValue,
        escape: bool,
    },
    Raw(String),
    Columns {
        left: String,
        operator: Operator,
        right: String,
    },
    Null {
        column: String,
    },
    Like {
        column: String,
        pattern: String,
    },
    Date {
        column: String,
        operator: Operator,
        date: NaiveDate,
    },
    Exists(Box<Builder<'c>>),
    Group(ConditionTree<'c>),
}

#[derive(Debug, Clone)]
pub struct Clause<'c> {
    pub connective: Connective,
    pub negated: bool,
    pub predicate: Predicate<'c>,
}

/// Ordered, connective-tagged conditions.
#[derive(Debug, Clone, Default)]
pub struct ConditionTree<'c> {
    clauses: Vec<Clause<'c>>,
}

impl<'c> ConditionTree<'c> {
    pub fn push(&mut self, connective: Connective, negated: bool, predicate: Predicate<'c>) {
        self.clauses.push(Clause {
            connective,
            negated,
            predicate,
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clear(&mut self) {
        self.clauses.clear();
    }

    /// Renders the tree; the first connective is elided.
    #[must_use]
    pub fn render(&self, builder: &Builder<'c>) -> String {
        let mut sql = String::new();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                sql.push_str(clause.connective.as_sql());
            }
            sql.push_str(&render_clause(clause, builder));
        }
        sql
    }
}

fn render_clause<'c>(clause: &Clause<'c>, b: &Builder<'c>) -> String {
    let negated = clause.negated;
    let apply = |op: Operator| if negated { op.negate() } else { op };

    match &clause.predicate {
        Predicate::Compare {
            column,
            operator,
            value,
            escape,
        } => render_compare(b, &b.resolve_column(column), apply(*operator), value, *escape),
        Predicate::Raw(sql) if negated => format!("NOT ({sql})"),
        Predicate::Raw(sql) => sql.clone(),
        Predicate::Columns {
            left,
            operator,
            right,
        } => format!(
            "{} {} {}",
            b.resolve_column(left),
            apply(*operator),
            b.resolve_column(right)
        ),
        Predicate::Null { column } => {
            let keyword = if negated { "IS NOT NULL" } else { "IS NULL" };
            format!("{} {keyword}", b.resolve_column(column))
        }
        Predicate::Like { column, pattern } => {
            let escaper = b.connection().escaper();
            format!(
                "{} {} '{}'{}",
                b.resolve_column(column),
                apply(Operator::Like),
                escaper.dialect().escape_string(pattern),
                escaper.like_escape_clause()
            )
        }
        Predicate::Date {
            column,
            operator,
            date,
        } => b.connection().dialect().date_comparison(
            &b.resolve_column(column),
            apply(*operator).as_str(),
            *date,
        ),
        Predicate::Exists(query) => {
            let keyword = if negated { "NOT EXISTS" } else { "EXISTS" };
            let mut inner = (**query).clone();
            inner.outer = b.tables().chain(&b.outer).cloned().collect();
            format!("{keyword} ({})", inner.sql())
        }
        Predicate::Group(tree) if negated => format!("NOT ({})", tree.render(b)),
        Predicate::Group(tree) => format!("({})", tree.render(b)),
    }
}

fn render_compare(
    b: &Builder<'_>,
    column: &str,
    operator: Operator,
    value: &SqlValue,
    escape: bool,
) -> String {
    match value {
        SqlValue::Null if operator.is_positive() => format!("{column} IS NULL"),
        SqlValue::Null if operator.is_negative() => format!("{column} IS NOT NULL"),
        SqlValue::List(items) => {
            let operator = if operator.is_negative() {
                Operator::NotIn
            } else {
                Operator::In
            };
            if items.is_empty() {
                // Nothing is IN an empty set.
                let always = if operator == Operator::In { "1 = 0" } else { "1 = 1" };
                return always.to_string();
            }
            format!("{column} {operator} {}", b.render_value(value, escape))
        }
        _ => format!("{column} {operator} {}", b.render_value(value, escape)),
    }
}
