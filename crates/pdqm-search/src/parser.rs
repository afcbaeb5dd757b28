//! Query-parameter tokenizer.
//!
//! Repeating a key is AND, a comma inside one value is OR. Each key occurrence
//! becomes one [`ValueGroup`], in request order.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use url::form_urlencoded;

use crate::error::SearchError;
use crate::escape::{split_unescaped, unescape_search_value};
use crate::parameters::{SearchModifier, SearchParameter, SearchSchema};

/// Multi-valued query parameters, keyed by raw name (modifier included).
pub type QueryParameters = IndexMap<String, Vec<String>>;

/// Parse an `application/x-www-form-urlencoded` string into [`QueryParameters`].
///
/// Works for both GET query strings and POST `_search` bodies.
/// Example: `family=smi,smy&family:exact=SMITH&_count=2`
pub fn parse_query_string(query: &str) -> QueryParameters {
    let mut params = QueryParameters::new();
    for (k, v) in form_urlencoded::parse(query.as_bytes()) {
        params.entry(k.into_owned()).or_default().push(v.into_owned());
    }
    params
}

/// One occurrence of a recognized key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueGroup<'s> {
    pub param: &'s SearchParameter,
    /// Modifier actually honoured; disallowed ones are dropped
    pub modifier: Option<SearchModifier>,
    /// Trimmed occurrence text with escapes left intact
    pub raw: String,
    /// Comma-split, unescaped, non-empty values
    pub values: Vec<String>,
}

impl ValueGroup<'_> {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Non-fatal issue found while normalizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SearchWarning {
    /// The modifier is unknown or not allowed; the value is used unmodified.
    UnsupportedModifier { param: String, modifier: String },
}

impl fmt::Display for SearchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedModifier { param, modifier } => write!(
                f,
                "modifier ':{modifier}' is not supported for '{param}' and was ignored"
            ),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizedParameters<'s> {
    pub groups: Vec<ValueGroup<'s>>,
    pub warnings: Vec<SearchWarning>,
}

pub struct SearchParameterParser;

impl SearchParameterParser {
    /// Normalize raw parameters against the schema.
    ///
    /// Unknown keys and `_`-prefixed control parameters outside the schema
    /// are ignored.
    pub fn normalize<'s>(
        params: &QueryParameters,
        schema: &'s SearchSchema,
    ) -> Result<NormalizedParameters<'s>, SearchError> {
        let mut result = NormalizedParameters::default();

        for (key, occurrences) in params {
            let (name, modifier) = Self::split_name_and_modifier(key);
            let Some(param) = schema.get(name) else {
                if !name.starts_with('_') {
                    tracing::debug!(param = %key, "ignoring unrecognized search parameter");
                }
                continue;
            };

            let modifier = match modifier {
                None => None,
                Some(raw_modifier) => match SearchModifier::parse(raw_modifier) {
                    Some(m) if param.allows(m) => Some(m),
                    _ => {
                        tracing::warn!(
                            param = %name,
                            modifier = %raw_modifier,
                            "unsupported modifier ignored"
                        );
                        result.warnings.push(SearchWarning::UnsupportedModifier {
                            param: name.to_string(),
                            modifier: raw_modifier.to_string(),
                        });
                        None
                    }
                },
            };

            for occurrence in occurrences {
                let raw = occurrence.trim();
                let values = Self::split_values(name, raw)?;
                result.groups.push(ValueGroup {
                    param,
                    modifier,
                    raw: raw.to_string(),
                    values,
                });
            }
        }

        Ok(result)
    }

    fn split_name_and_modifier(key: &str) -> (&str, Option<&str>) {
        match key.split_once(':') {
            Some((name, modifier)) => (name, Some(modifier)),
            None => (key, None),
        }
    }

    fn split_values(name: &str, raw: &str) -> Result<Vec<String>, SearchError> {
        let mut values = Vec::new();
        for part in split_unescaped(raw, ',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let value = unescape_search_value(part)
                .map_err(|message| SearchError::invalid_value(name, message))?;
            values.push(value);
        }
        Ok(values)
    }
}
