//! Token search parameter implementation.
//!
//! Three token forms are supported:
//! - code: plain equality, e.g. `gender=male`
//! - identifier: one column holding either `value` or `system|value`
//! - contact point: the system picks which columns are searched
//!
//! An occurrence is split on commas first. When several comma segments carry
//! their own `|`, each one is a separate `system|value` token:
//! `sysA|v1,sysB|v2` is `sysA|v1` OR `sysB|v2`.
//!
//! With a single `|` the occurrence is a cross-product shorthand:
//! `sysA,sysB|v1,v2` expands to `sysA|v1`, `sysA|v2`, `sysB|v1`, `sysB|v2`.

use crate::error::SearchError;
use crate::escape::{rfind_unescaped, split_unescaped, unescape_search_value};
use crate::parameters::{SearchParameter, TokenForm};
use crate::parser::ValueGroup;
use crate::predicate::Condition;

/// A `systems|values` occurrence after splitting on the last unescaped `|`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSpec {
    /// `None` when the occurrence had no `|` at all
    pub systems: Option<Vec<String>>,
    pub values: Vec<String>,
}

/// Parse one raw occurrence into its system and value lists.
///
/// Both sides are comma-split, trimmed and unescaped; empty entries are dropped.
pub fn parse_token_spec(raw: &str) -> Result<TokenSpec, String> {
    match rfind_unescaped(raw, '|') {
        Some(pos) => Ok(TokenSpec {
            systems: Some(split_list(&raw[..pos])?),
            values: split_list(&raw[pos + 1..])?,
        }),
        None => Ok(TokenSpec {
            systems: None,
            values: split_list(raw)?,
        }),
    }
}

/// Parse one raw occurrence into the token specs it denotes.
///
/// Mixing several `system|value` segments with bare values is ambiguous and
/// rejected.
pub fn parse_token_specs(raw: &str) -> Result<Vec<TokenSpec>, String> {
    let segments: Vec<&str> = split_unescaped(raw, ',')
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect();
    let with_bar = segments
        .iter()
        .filter(|s| rfind_unescaped(s, '|').is_some())
        .count();

    if with_bar <= 1 {
        return Ok(vec![parse_token_spec(raw)?]);
    }
    if with_bar != segments.len() {
        return Err(format!(
            "cannot mix system|value tokens with bare values in '{raw}'"
        ));
    }
    segments.into_iter().map(parse_token_spec).collect()
}

fn split_list(input: &str) -> Result<Vec<String>, String> {
    split_unescaped(input, ',')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(unescape_search_value)
        .collect()
}

/// Build conditions for a token parameter occurrence.
pub fn build_token_conditions(group: &ValueGroup<'_>) -> Result<Vec<Condition>, SearchError> {
    let param = group.param;
    match param.token_form {
        TokenForm::Code => Ok(build_code_conditions(param, &group.values)),
        TokenForm::Identifier => {
            let specs = parse_token_specs(&group.raw)
                .map_err(|message| SearchError::invalid_value(&param.code, message))?;
            Ok(specs
                .iter()
                .flat_map(|spec| expand_identifier(param.primary_column(), spec))
                .collect())
        }
        TokenForm::ContactPoint => {
            let specs = parse_token_specs(&group.raw)
                .map_err(|message| SearchError::invalid_value(&param.code, message))?;
            let mut conditions = Vec::new();
            for spec in &specs {
                conditions.extend(build_contact_point_conditions(param, spec)?);
            }
            Ok(conditions)
        }
    }
}

fn build_code_conditions(param: &SearchParameter, values: &[String]) -> Vec<Condition> {
    values
        .iter()
        .flat_map(|value| {
            param
                .columns
                .iter()
                .map(move |column| Condition::equals_ci(column, value))
        })
        .collect()
}

/// Expand an identifier occurrence against a single combined column.
///
/// - `value`: equals `value`, or ends with `|value`
/// - `system|`: starts with `system|`
/// - `system|value`: equals `system|value`
/// - `|value`: same as a bare value
/// - `|`: no condition
pub fn expand_identifier(column: &str, spec: &TokenSpec) -> Vec<Condition> {
    let systems = spec.systems.as_deref().unwrap_or_default();

    if systems.is_empty() {
        return spec
            .values
            .iter()
            .flat_map(|value| {
                [
                    Condition::equals_ci(column, value),
                    Condition::ends_with(column, format!("|{value}")),
                ]
            })
            .collect();
    }

    if spec.values.is_empty() {
        return systems
            .iter()
            .map(|system| Condition::starts_with(column, format!("{system}|")))
            .collect();
    }

    let mut conditions = Vec::with_capacity(systems.len() * spec.values.len());
    for system in systems {
        for value in &spec.values {
            conditions.push(Condition::equals_ci(column, format!("{system}|{value}")));
        }
    }
    conditions
}

/// Contact points search every column of the named systems by substring.
///
/// An unknown system is rejected rather than widened to all columns. A system
/// without a value (`phone|`) requires one of its columns to be present.
fn build_contact_point_conditions(
    param: &SearchParameter,
    spec: &TokenSpec,
) -> Result<Vec<Condition>, SearchError> {
    let mut columns: Vec<&str> = Vec::new();
    match spec.systems.as_deref() {
        None | Some([]) => columns.extend(param.columns.iter().map(String::as_str)),
        Some(systems) => {
            for system in systems {
                let key = system.to_ascii_lowercase();
                let Some(system_columns) = param.systems.get(&key) else {
                    return Err(SearchError::invalid_value(
                        &param.code,
                        format!("unknown system '{system}'"),
                    ));
                };
                for column in system_columns {
                    if !columns.contains(&column.as_str()) {
                        columns.push(column);
                    }
                }
            }
        }
    }

    if spec.values.is_empty() {
        if spec.systems.as_deref().is_none_or(<[String]>::is_empty) {
            return Ok(Vec::new());
        }
        return Ok(columns
            .into_iter()
            .map(|column| Condition::contains(column, ""))
            .collect());
    }

    let mut conditions = Vec::with_capacity(columns.len() * spec.values.len());
    for value in &spec.values {
        for column in &columns {
            conditions.push(Condition::contains(*column, value));
        }
    }
    Ok(conditions)
}

/// `_id` matches logical ids exactly, case-sensitive.
pub fn build_id_conditions(group: &ValueGroup<'_>) -> Vec<Condition> {
    let column = group.param.primary_column();
    group
        .values
        .iter()
        .map(|value| Condition::equals(column, value))
        .collect()
}
