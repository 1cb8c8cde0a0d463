//! Catalog query builder.
//!
//! Tools describe their query as a base `SELECT` plus optional predicates.
//! Filter values are always bound parameters; they never appear in the SQL
//! text. An absent or empty filter adds no predicate at all.

use crate::models::{QueryParam, Statement};

/// Placeholder syntax understood by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` (Teradata, MySQL, SQLite)
    #[default]
    QuestionMark,
    /// `$1`, `$2`, ... (PostgreSQL)
    Dollar,
}

/// True when a filter value should restrict the query.
///
/// Only the empty string counts as "no filter"; whitespace is a real value.
pub fn has_filter(value: Option<&str>) -> bool {
    matches!(value, Some(v) if !v.is_empty())
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select: Vec<String>,
    from: String,
    predicates: Vec<String>,
    params: Vec<QueryParam>,
    group_by: Vec<String>,
    order_by: Vec<String>,
}

impl QueryBuilder {
    pub fn select<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            select: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from(mut self, source: impl Into<String>) -> Self {
        self.from = source.into();
        self
    }

    /// Add a predicate without parameters.
    pub fn filter(mut self, predicate: impl Into<String>) -> Self {
        self.predicates.push(predicate.into());
        self
    }

    /// Add a predicate containing exactly one `?` bound to `param`.
    pub fn filter_bound(mut self, predicate: impl Into<String>, param: impl Into<QueryParam>) -> Self {
        let predicate = predicate.into();
        debug_assert_eq!(
            predicate.matches('?').count(),
            1,
            "bound predicate needs exactly one placeholder"
        );
        self.predicates.push(predicate);
        self.params.push(param.into());
        self
    }

    /// `column = ?` when `value` is present and non-empty, nothing otherwise.
    pub fn filter_eq(self, column: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if has_filter(Some(v)) => self.filter_bound(format!("{} = ?", column), v),
            _ => self,
        }
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, term: impl Into<String>) -> Self {
        self.order_by.push(term.into());
        self
    }

    /// Render the statement for the given placeholder style.
    pub fn build(self, style: PlaceholderStyle) -> Statement {
        let mut sql = format!("SELECT {}\nFROM {}", self.select.join(", "), self.from);

        for (i, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { "\nWHERE " } else { "\nAND " });
            sql.push_str(predicate);
        }
        if !self.group_by.is_empty() {
            sql.push_str("\nGROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }
        if !self.order_by.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        Statement::with_params(rewrite_placeholders(&sql, style), self.params)
    }
}

/// Rewrite `?` placeholders for the target style.
///
/// Question marks inside quoted literals, quoted identifiers and `--`
/// comments are left alone.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> String {
    if style == PlaceholderStyle::QuestionMark {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut chars = sql.chars().peekable();
    let mut in_literal = false;
    let mut in_identifier = false;
    let mut in_comment = false;
    let mut index = 0;

    while let Some(c) = chars.next() {
        match c {
            '\n' if in_comment => in_comment = false,
            _ if in_comment => {}
            '\'' if !in_identifier => in_literal = !in_literal,
            '"' if !in_literal => in_identifier = !in_identifier,
            '-' if !in_literal && !in_identifier && chars.peek() == Some(&'-') => in_comment = true,
            '?' if !in_literal && !in_identifier => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
                continue;
            }
            _ => {}
        }
        out.push(c);
    }
    out
}
