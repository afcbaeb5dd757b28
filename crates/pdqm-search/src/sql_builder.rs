//! SQL builder for rendering patient predicates against a relational view.
//!
//! Every user-supplied literal becomes a `$n` bind parameter. Only validated
//! and quoted identifiers, fixed keywords and integer window bounds are
//! written into the SQL text.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::predicate::{Comparison, Condition, PredicateNode};
use crate::types::{escape_like_pattern, format_date};

/// Errors that can occur during SQL building.
#[derive(Debug, Error)]
pub enum SqlBuilderError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Query too complex: {0}")]
    QueryTooComplex(String),
}

/// Maximum number of atomic conditions in one predicate
const MAX_CONDITIONS: usize = 100;

/// Validate an identifier (schema, table or column name).
///
/// Only ASCII alphanumerics and underscores are allowed.
pub fn validate_identifier(name: &str) -> Result<(), SqlBuilderError> {
    if name.is_empty() {
        return Err(SqlBuilderError::InvalidIdentifier(
            "Empty identifier".to_string(),
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqlBuilderError::InvalidIdentifier(name.to_string()));
    }

    Ok(())
}

/// Escape a PostgreSQL identifier (table name, column name).
pub fn escape_identifier(name: &str) -> Result<String, SqlBuilderError> {
    validate_identifier(name)?;
    Ok(format!("\"{name}\""))
}

/// Bind parameter values. Dates travel as `YYYY-MM-DD` text and are cast in SQL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SqlValue {
    Text(String),
    Date(String),
}

impl SqlValue {
    /// Get the value as a string for binding.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Date(s) => s,
        }
    }
}

/// Row window applied to a page query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    pub limit: u64,
    pub offset: u64,
}

/// A built SQL query with parameters.
///
/// The predicate it was rendered from travels along so that executors which
/// do not speak SQL can evaluate it directly.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub predicate: PredicateNode,
    /// `None` for count queries
    pub window: Option<QueryWindow>,
    /// Column used for stable ordering
    pub order_column: String,
}

impl fmt::Display for BuiltQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Builder for the count and page queries of one patient search.
///
/// ```ignore
/// let page_query = PatientQueryBuilder::new("public", "patient")
///     .where_predicate(predicate)
///     .order_by("id")
///     .paginate(20, 0)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct PatientQueryBuilder {
    schema: String,
    table: String,
    alias: String,
    columns: Vec<String>,
    predicate: PredicateNode,
    order_column: String,
    window: Option<QueryWindow>,
}

impl PatientQueryBuilder {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            alias: "p".to_string(),
            columns: Vec::new(),
            predicate: PredicateNode::match_all(),
            order_column: "id".to_string(),
            window: None,
        }
    }

    /// Set a table alias for the patient view.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Project these columns instead of `*`.
    pub fn select_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    pub fn where_predicate(mut self, predicate: PredicateNode) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_column = column.into();
        self
    }

    /// Set pagination (limit and offset).
    pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
        self.window = Some(QueryWindow { limit, offset });
        self
    }

    fn validate(&self) -> Result<(), SqlBuilderError> {
        let atoms = self.predicate.atom_count();
        if atoms > MAX_CONDITIONS {
            return Err(SqlBuilderError::QueryTooComplex(format!(
                "Too many conditions: {atoms} (max {MAX_CONDITIONS})"
            )));
        }
        validate_identifier(&self.alias)?;
        Ok(())
    }

    fn from_clause(&self) -> Result<String, SqlBuilderError> {
        let schema = escape_identifier(&self.schema)?;
        let table = escape_identifier(&self.table)?;
        Ok(format!("{schema}.{table} AS {}", self.alias))
    }

    /// Build the page query: projection, predicate, stable order and window.
    pub fn build(&self) -> Result<BuiltQuery, SqlBuilderError> {
        self.validate()?;

        let select = if self.columns.is_empty() {
            format!("{}.*", self.alias)
        } else {
            self.columns
                .iter()
                .map(|c| Ok(format!("{}.{}", self.alias, escape_identifier(c)?)))
                .collect::<Result<Vec<_>, SqlBuilderError>>()?
                .join(", ")
        };

        let mut params = Vec::new();
        let mut sql = format!("SELECT {select} FROM {}", self.from_clause()?);
        if let Some(where_sql) = self.where_clause(&mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        let order = escape_identifier(&self.order_column)?;
        sql.push_str(&format!(" ORDER BY {}.{order} ASC", self.alias));

        if let Some(window) = self.window {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", window.limit, window.offset));
        }

        Ok(BuiltQuery {
            sql,
            params,
            predicate: self.predicate.clone(),
            window: self.window,
            order_column: self.order_column.clone(),
        })
    }

    /// Build the COUNT query: same predicate, no projection, order or window.
    pub fn build_count(&self) -> Result<BuiltQuery, SqlBuilderError> {
        self.validate()?;

        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) AS total FROM {}", self.from_clause()?);
        if let Some(where_sql) = self.where_clause(&mut params)? {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        Ok(BuiltQuery {
            sql,
            params,
            predicate: self.predicate.clone(),
            window: None,
            order_column: self.order_column.clone(),
        })
    }

    fn where_clause(&self, params: &mut Vec<SqlValue>) -> Result<Option<String>, SqlBuilderError> {
        if self.predicate.is_match_all() {
            return Ok(None);
        }
        self.node_to_sql(&self.predicate, params).map(Some)
    }

    fn node_to_sql(
        &self,
        node: &PredicateNode,
        params: &mut Vec<SqlValue>,
    ) -> Result<String, SqlBuilderError> {
        match node {
            PredicateNode::Atom(condition) => self.condition_to_sql(condition, params),
            PredicateNode::And(children) => {
                self.join_children(children, " AND ", "TRUE", params)
            }
            PredicateNode::Or(children) => self.join_children(children, " OR ", "FALSE", params),
        }
    }

    fn join_children(
        &self,
        children: &[PredicateNode],
        separator: &str,
        identity: &str,
        params: &mut Vec<SqlValue>,
    ) -> Result<String, SqlBuilderError> {
        let parts = children
            .iter()
            .map(|child| self.node_to_sql(child, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match parts.len() {
            0 => identity.to_string(),
            1 => parts.into_iter().next().unwrap_or_default(),
            _ => format!("({})", parts.join(separator)),
        })
    }

    fn condition_to_sql(
        &self,
        condition: &Condition,
        params: &mut Vec<SqlValue>,
    ) -> Result<String, SqlBuilderError> {
        let column = format!("{}.{}", self.alias, escape_identifier(&condition.column)?);

        let sql = match &condition.comparison {
            Comparison::Equals {
                value,
                ignore_case: true,
            } => {
                let p = add_param(params, SqlValue::Text(value.clone()));
                format!("LOWER({column}) = LOWER(${p})")
            }
            Comparison::Equals {
                value,
                ignore_case: false,
            } => {
                let p = add_param(params, SqlValue::Text(value.clone()));
                format!("{column} = ${p}")
            }
            Comparison::Contains(value) => {
                let pattern = format!("%{}%", escape_like_pattern(value));
                like(&column, add_param(params, SqlValue::Text(pattern)))
            }
            Comparison::StartsWith(value) => {
                let pattern = format!("{}%", escape_like_pattern(value));
                like(&column, add_param(params, SqlValue::Text(pattern)))
            }
            Comparison::EndsWith(value) => {
                let pattern = format!("%{}", escape_like_pattern(value));
                like(&column, add_param(params, SqlValue::Text(pattern)))
            }
            Comparison::Range(bound) => {
                let lower = bound.from.map(|from| {
                    let p = add_param(params, SqlValue::Date(format_date(from)));
                    format!("{column} >= ${p}::date")
                });
                let upper = bound.to.map(|to| {
                    let p = add_param(params, SqlValue::Date(format_date(to)));
                    format!("{column} < ${p}::date")
                });
                match (lower, upper) {
                    (Some(l), Some(u)) => format!("({l} AND {u})"),
                    (Some(one), None) | (None, Some(one)) => one,
                    (None, None) => "TRUE".to_string(),
                }
            }
        };

        Ok(sql)
    }
}

fn add_param(params: &mut Vec<SqlValue>, value: SqlValue) -> usize {
    params.push(value);
    params.len()
}

fn like(column: &str, placeholder: usize) -> String {
    format!("{column} ILIKE ${placeholder} ESCAPE '\\'")
}
