//! String search parameter implementation.
//!
//! - (default): contains, case-insensitive
//! - :contains: same as default
//! - :exact: full match, case-insensitive
//!
//! A parameter with several target columns (`address`) ORs one condition per
//! column into the same group.

use crate::parameters::SearchModifier;
use crate::parser::ValueGroup;
use crate::predicate::Condition;

pub fn build_string_conditions(group: &ValueGroup<'_>) -> Vec<Condition> {
    let exact = group.modifier == Some(SearchModifier::Exact);
    let mut conditions = Vec::with_capacity(group.values.len() * group.param.columns.len());

    for value in &group.values {
        for column in &group.param.columns {
            let condition = if exact {
                Condition::equals_ci(column, value)
            } else {
                Condition::contains(column, value)
            };
            conditions.push(condition);
        }
    }

    conditions
}

/// Escape LIKE/ILIKE metacharacters so the value is matched literally.
pub fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
