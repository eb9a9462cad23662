//! Comparison operators and the `"column operator"` key tokenizer.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static WORD_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)\s+(not\s+like|like|not\s+in|in|is\s+not|is)$")
        .expect("valid word operator regex")
});

static SYMBOL_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*(<=|>=|<>|!=|=|<|>)$").expect("valid symbol operator regex")
});

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<>`
    NotEqAnsi,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `IS`
    Is,
    /// `IS NOT`
    IsNot,
}

impl Operator {
    /// Returns the SQL token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::NotEqAnsi => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
        }
    }

    /// Returns the logical complement.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Eq => Self::NotEq,
            Self::NotEq | Self::NotEqAnsi => Self::Eq,
            Self::Lt => Self::Gte,
            Self::Lte => Self::Gt,
            Self::Gt => Self::Lte,
            Self::Gte => Self::Lt,
            Self::Like => Self::NotLike,
            Self::NotLike => Self::Like,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::Is => Self::IsNot,
            Self::IsNot => Self::Is,
        }
    }

    /// Returns whether the operator expresses equality (`=`, `IS`, `IN`).
    #[must_use]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Eq | Self::Is | Self::In)
    }

    /// Returns whether the operator expresses inequality (`!=`, `<>`, `IS NOT`, `NOT IN`).
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self, Self::NotEq | Self::NotEqAnsi | Self::IsNot | Self::NotIn)
    }

    /// Parses an operator token, ignoring case and inner whitespace.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let normalized = token
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();
        let op = match normalized.as_str() {
            "=" => Self::Eq,
            "!=" => Self::NotEq,
            "<>" => Self::NotEqAnsi,
            "<" => Self::Lt,
            "<=" => Self::Lte,
            ">" => Self::Gt,
            ">=" => Self::Gte,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "IS" => Self::Is,
            "IS NOT" => Self::IsNot,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Splits a trailing operator off a condition key.
///
/// `"name !="` gives `("name", NotEq)`, `"title like"` gives
/// `("title", Like)`, and a key without operator compares with `=`.
#[must_use]
pub fn split_operator(key: &str) -> (String, Operator) {
    let key = key.trim();
    for re in [&*WORD_OPERATOR, &*SYMBOL_OPERATOR] {
        if let Some(caps) = re.captures(key) {
            let column = caps[1].trim();
            if let Some(op) = Operator::parse(&caps[2]) {
                if !column.is_empty() {
                    return (column.to_string(), op);
                }
            }
        }
    }
    (key.to_string(), Operator::Eq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_symbols() {
        assert_eq!(split_operator("name !="), (String::from("name"), Operator::NotEq));
        assert_eq!(split_operator("id <"), (String::from("id"), Operator::Lt));
        assert_eq!(split_operator("id <="), (String::from("id"), Operator::Lte));
        assert_eq!(split_operator("id>="), (String::from("id"), Operator::Gte));
        assert_eq!(split_operator("id <>"), (String::from("id"), Operator::NotEqAnsi));
        assert_eq!(split_operator("u.id"), (String::from("u.id"), Operator::Eq));
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_operator("col1 LIKE"), (String::from("col1"), Operator::Like));
        assert_eq!(split_operator("col1 not like"), (String::from("col1"), Operator::NotLike));
        assert_eq!(split_operator("id not  in"), (String::from("id"), Operator::NotIn));
        assert_eq!(
            split_operator("deleted_at is not"),
            (String::from("deleted_at"), Operator::IsNot)
        );
        // A column that merely ends in an operator word is left alone.
        assert_eq!(split_operator("login"), (String::from("login"), Operator::Eq));
        assert_eq!(split_operator("users.is"), (String::from("users.is"), Operator::Eq));
    }

    #[test]
    fn test_negate() {
        assert_eq!(Operator::Eq.negate(), Operator::NotEq);
        assert_eq!(Operator::Lt.negate(), Operator::Gte);
        assert_eq!(Operator::Like.negate().as_str(), "NOT LIKE");
        assert_eq!(Operator::In.negate().negate(), Operator::In);
    }
}
