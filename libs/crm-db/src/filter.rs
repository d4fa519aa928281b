//! Caller filter parsing and the `LIKE` helpers shared with search.

use chrono::{DateTime, NaiveDate};
use sea_orm::sea_query::{Alias, Expr, Func, SimpleExpr, Value as SqlValue};
use serde_json::Value;

use crate::error::QueryError;

/// Parsed form of a single caller filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Equals(SqlValue),
    IsNull,
    OneOf(Vec<SqlValue>),
    Range {
        gte: Option<SqlValue>,
        lte: Option<SqlValue>,
    },
    /// Value passed to `LIKE` as given; the caller supplied the wildcards.
    Pattern(String),
}

impl FilterValue {
    /// Classify a JSON filter value.
    ///
    /// # Errors
    /// Returns [`QueryError::BadFilter`] for empty sets, nested sets, objects that
    /// are not a `gte`/`lte` range, and range bounds that are neither numbers
    /// nor dates.
    pub fn parse(field: &str, raw: &Value) -> Result<Self, QueryError> {
        match raw {
            Value::Null => Ok(FilterValue::IsNull),
            Value::Bool(b) => Ok(FilterValue::Equals(SqlValue::from(*b))),
            Value::Number(_) => Ok(FilterValue::Equals(number(field, raw)?)),
            Value::String(s) if s.contains('%') => Ok(FilterValue::Pattern(s.clone())),
            Value::String(s) => Ok(FilterValue::Equals(SqlValue::from(s.clone()))),
            Value::Array(items) => parse_set(field, items),
            Value::Object(map) => {
                if map.is_empty() {
                    return Err(QueryError::bad_filter(field, "empty range"));
                }
                let mut gte = None;
                let mut lte = None;
                for (op, bound) in map {
                    match op.as_str() {
                        "gte" => gte = Some(range_bound(field, bound)?),
                        "lte" => lte = Some(range_bound(field, bound)?),
                        other => {
                            return Err(QueryError::bad_filter(
                                field,
                                format!("unsupported range operator '{other}'"),
                            ));
                        }
                    }
                }
                Ok(FilterValue::Range { gte, lte })
            }
        }
    }

    /// Predicate on `column`.
    #[must_use]
    pub fn to_expr(&self, column: &str) -> SimpleExpr {
        let col = || Expr::col(Alias::new(column));
        match self {
            FilterValue::Equals(v) => col().eq(v.clone()),
            FilterValue::IsNull => col().is_null(),
            FilterValue::OneOf(vs) => col().is_in(vs.iter().cloned()),
            FilterValue::Pattern(p) => col().like(p.as_str()),
            FilterValue::Range { gte, lte } => match (gte, lte) {
                (Some(lo), Some(hi)) => col().gte(lo.clone()).and(col().lte(hi.clone())),
                (Some(lo), None) => col().gte(lo.clone()),
                (None, Some(hi)) => col().lte(hi.clone()),
                // parse never yields an empty range
                (None, None) => Expr::value(true),
            },
        }
    }
}

fn parse_set(field: &str, items: &[Value]) -> Result<FilterValue, QueryError> {
    if items.is_empty() {
        return Err(QueryError::bad_filter(field, "empty value set"));
    }
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(SqlValue::from(s.clone())),
            Value::Bool(b) => Ok(SqlValue::from(*b)),
            Value::Number(_) => number(field, item),
            _ => Err(QueryError::bad_filter(
                field,
                "value set may only contain strings, numbers, or booleans",
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FilterValue::OneOf)
}

fn number(field: &str, v: &Value) -> Result<SqlValue, QueryError> {
    if let Some(i) = v.as_i64() {
        Ok(SqlValue::from(i))
    } else if let Some(f) = v.as_f64() {
        Ok(SqlValue::from(f))
    } else {
        Err(QueryError::bad_filter(field, "number out of range"))
    }
}

fn range_bound(field: &str, v: &Value) -> Result<SqlValue, QueryError> {
    match v {
        Value::Number(_) => number(field, v),
        Value::String(s) => {
            let s = s.trim();
            if is_date(s) {
                Ok(SqlValue::from(s.to_owned()))
            } else if let Ok(i) = s.parse::<i64>() {
                Ok(SqlValue::from(i))
            } else if let Some(f) = s.parse::<f64>().ok().filter(|f| f.is_finite()) {
                Ok(SqlValue::from(f))
            } else {
                Err(QueryError::bad_filter(
                    field,
                    format!("range bound '{s}' is not a number or date"),
                ))
            }
        }
        _ => Err(QueryError::bad_filter(
            field,
            "range bound must be a number or date",
        )),
    }
}

fn is_date(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Escape `LIKE` metacharacters (`%`, `_`, `\`) with a backslash.
#[must_use]
pub fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

#[must_use]
pub fn like_contains(s: &str) -> String {
    format!("%{}%", like_escape(s))
}

/// Case-insensitive substring match of `term` in `column`.
#[must_use]
pub fn search_expr(column: &str, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(Alias::new(column))))
        .like(like_contains(&term.to_lowercase()))
}
