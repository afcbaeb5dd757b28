//! Predicate tree produced by compiling a patient search.
//!
//! The builder always yields `And(Or(Atom..), Or(Atom..), ..)`: one `Or` per
//! key occurrence, one atom per expanded value.

use serde::Serialize;

use crate::error::SearchError;
use crate::parameters::SearchParameterType;
use crate::parser::{NormalizedParameters, ValueGroup};
use crate::types::{
    DateBound, build_date_conditions, build_id_conditions, build_string_conditions,
    build_token_conditions,
};

/// Text or range test applied to one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", content = "value", rename_all = "kebab-case")]
pub enum Comparison {
    /// Full match; case-insensitive unless `ignore_case` is false.
    Equals { value: String, ignore_case: bool },
    /// Case-insensitive substring.
    Contains(String),
    /// Case-insensitive prefix.
    StartsWith(String),
    /// Case-insensitive suffix.
    EndsWith(String),
    /// Half-open day interval.
    Range(DateBound),
}

/// An atomic `(column, comparison)` pair ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Condition {
    pub column: String,
    pub comparison: Comparison,
}

impl Condition {
    pub fn new(column: impl Into<String>, comparison: Comparison) -> Self {
        Self {
            column: column.into(),
            comparison,
        }
    }

    pub fn equals_ci(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            column,
            Comparison::Equals {
                value: value.into(),
                ignore_case: true,
            },
        )
    }

    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(
            column,
            Comparison::Equals {
                value: value.into(),
                ignore_case: false,
            },
        )
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, Comparison::Contains(value.into()))
    }

    pub fn starts_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, Comparison::StartsWith(value.into()))
    }

    pub fn ends_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, Comparison::EndsWith(value.into()))
    }

    pub fn range(column: impl Into<String>, bound: DateBound) -> Self {
        Self::new(column, Comparison::Range(bound))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredicateNode {
    Atom(Condition),
    And(Vec<PredicateNode>),
    Or(Vec<PredicateNode>),
}

impl PredicateNode {
    /// Conjunction with no operands; matches every row.
    pub fn match_all() -> Self {
        Self::And(Vec::new())
    }

    /// Build an OR group, flattening nested ORs into a single level.
    pub fn or(children: Vec<PredicateNode>) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Self::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Self::Or(flat)
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::And(children) if children.is_empty())
    }

    /// OR groups of a compiled predicate.
    pub fn groups(&self) -> &[PredicateNode] {
        match self {
            Self::And(children) => children,
            other => std::slice::from_ref(other),
        }
    }

    /// Number of atoms anywhere in the tree.
    pub fn atom_count(&self) -> usize {
        match self {
            Self::Atom(_) => 1,
            Self::And(children) | Self::Or(children) => {
                children.iter().map(Self::atom_count).sum()
            }
        }
    }
}

impl From<Condition> for PredicateNode {
    fn from(condition: Condition) -> Self {
        Self::Atom(condition)
    }
}

/// Assemble normalized value groups into the two-level predicate tree.
///
/// Groups with no usable values are dropped rather than producing an
/// always-false branch.
pub fn build_predicate(normalized: &NormalizedParameters<'_>) -> Result<PredicateNode, SearchError> {
    let mut groups = Vec::with_capacity(normalized.groups.len());

    for group in &normalized.groups {
        if group.is_empty() {
            continue;
        }
        let atoms = expand_group(group)?;
        if atoms.is_empty() {
            continue;
        }
        groups.push(PredicateNode::or(atoms));
    }

    Ok(PredicateNode::And(groups))
}

fn expand_group(group: &ValueGroup<'_>) -> Result<Vec<PredicateNode>, SearchError> {
    let conditions = match group.param.param_type {
        SearchParameterType::String => build_string_conditions(group),
        SearchParameterType::Token => build_token_conditions(group)?,
        SearchParameterType::Date => build_date_conditions(group)?,
        SearchParameterType::IdList => build_id_conditions(group),
    };
    Ok(conditions.into_iter().map(PredicateNode::from).collect())
}
