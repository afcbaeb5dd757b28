use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::sql_builder::{SqlBuilderError, validate_identifier};

/// Search parameter kinds supported by the patient directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchParameterType {
    String,
    Token,
    Date,
    IdList,
}

impl SearchParameterType {
    /// Parse a search parameter type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(Self::String),
            "token" => Some(Self::Token),
            "date" => Some(Self::Date),
            "id-list" => Some(Self::IdList),
            _ => None,
        }
    }
}

/// How a token parameter's `system|value` text maps onto backend columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenForm {
    /// Plain code compared for equality (e.g. `gender=male`).
    #[default]
    Code,
    /// Single column storing either `value` or `system|value`.
    Identifier,
    /// Contact point; the system selects which columns are searched.
    ContactPoint,
}

/// Search modifiers recognized on a parameter name: `name:modifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchModifier {
    Exact,
    Contains,
    Missing,
    Not,
    Text,
}

impl SearchModifier {
    /// Parse a search modifier from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(Self::Exact),
            "contains" => Some(Self::Contains),
            "missing" => Some(Self::Missing),
            "not" => Some(Self::Not),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for SearchModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Contains => "contains",
            Self::Missing => "missing",
            Self::Not => "not",
            Self::Text => "text",
        };
        f.write_str(s)
    }
}

/// Prefixes for date search values, e.g. `ge1980-01-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Sa, // starts after
    Eb, // ends before
    Ap, // approximately
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchPrefix::Eq => "eq",
            SearchPrefix::Ne => "ne",
            SearchPrefix::Gt => "gt",
            SearchPrefix::Lt => "lt",
            SearchPrefix::Ge => "ge",
            SearchPrefix::Le => "le",
            SearchPrefix::Sa => "sa",
            SearchPrefix::Eb => "eb",
            SearchPrefix::Ap => "ap",
        };
        f.write_str(s)
    }
}

impl SearchPrefix {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "ge" => Some(Self::Ge),
            "le" => Some(Self::Le),
            "sa" => Some(Self::Sa),
            "eb" => Some(Self::Eb),
            "ap" => Some(Self::Ap),
            _ => None,
        }
    }

    /// Split a leading two-letter prefix off a value, defaulting to `eq`.
    pub fn split(value: &str) -> (Self, &str) {
        if let Some(head) = value.get(..2)
            && let Some(prefix) = Self::parse(head)
        {
            return (prefix, &value[2..]);
        }
        (Self::Eq, value)
    }
}

/// One recognized query key and the backend columns it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameter {
    /// The code used in search queries (e.g. "family", "birthdate")
    pub code: String,
    #[serde(rename = "type")]
    pub param_type: SearchParameterType,
    /// Modifiers honoured for this parameter; anything else is ignored
    #[serde(default)]
    pub modifiers: Vec<SearchModifier>,
    /// Backend columns, combined with OR when more than one
    pub columns: Vec<String>,
    #[serde(default)]
    pub token_form: TokenForm,
    /// Contact-point systems and the column subset each one searches
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub systems: BTreeMap<String, Vec<String>>,
}

impl SearchParameter {
    pub fn new<N: Into<String>>(code: N, param_type: SearchParameterType) -> Self {
        Self {
            code: code.into(),
            param_type,
            modifiers: Vec::new(),
            columns: Vec::new(),
            token_form: TokenForm::default(),
            systems: BTreeMap::new(),
        }
    }

    /// Create a string parameter honouring `:exact` and `:contains`.
    pub fn string(code: impl Into<String>, columns: &[&str]) -> Self {
        Self::new(code, SearchParameterType::String)
            .with_columns(columns)
            .with_modifiers(vec![SearchModifier::Exact, SearchModifier::Contains])
    }

    /// Create a token parameter of the given form.
    pub fn token(code: impl Into<String>, form: TokenForm, columns: &[&str]) -> Self {
        let mut param = Self::new(code, SearchParameterType::Token).with_columns(columns);
        param.token_form = form;
        param
    }

    #[must_use]
    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Vec<SearchModifier>) -> Self {
        self.modifiers = modifiers;
        self
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>, columns: &[&str]) -> Self {
        self.systems.insert(
            system.into(),
            columns.iter().map(|c| (*c).to_string()).collect(),
        );
        self
    }

    pub fn allows(&self, modifier: SearchModifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// The single column of a date or id-list parameter.
    pub fn primary_column(&self) -> &str {
        self.columns.first().map(String::as_str).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), SqlBuilderError> {
        if self.columns.is_empty() {
            return Err(SqlBuilderError::InvalidIdentifier(format!(
                "parameter '{}' has no target columns",
                self.code
            )));
        }
        for column in self.columns.iter().chain(self.systems.values().flatten()) {
            validate_identifier(column)?;
        }
        if matches!(
            self.param_type,
            SearchParameterType::Date | SearchParameterType::IdList
        ) && self.columns.len() != 1
        {
            return Err(SqlBuilderError::InvalidIdentifier(format!(
                "parameter '{}' must target exactly one column",
                self.code
            )));
        }
        Ok(())
    }
}

/// The fixed table of search parameters a directory accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSchema {
    pub params: Vec<SearchParameter>,
}

impl Default for SearchSchema {
    fn default() -> Self {
        Self::pdqm_patient()
    }
}

impl SearchSchema {
    pub fn new(params: Vec<SearchParameter>) -> Result<Self, SqlBuilderError> {
        let schema = Self { params };
        schema.validate()?;
        Ok(schema)
    }

    /// Patient search parameters over the PDQm patient view.
    pub fn pdqm_patient() -> Self {
        Self {
            params: vec![
                SearchParameter::new("_id", SearchParameterType::IdList).with_columns(&["id"]),
                SearchParameter::string("family", &["name_family"]),
                SearchParameter::string("given", &["name_given_0"]),
                SearchParameter::token("gender", TokenForm::Code, &["gender"]),
                SearchParameter::new("birthdate", SearchParameterType::Date)
                    .with_columns(&["birthdate"]),
                SearchParameter::token("identifier", TokenForm::Identifier, &["identifier"]),
                SearchParameter::token(
                    "telecom",
                    TokenForm::ContactPoint,
                    &["tel_home", "tel_work", "tel_mobile", "email"],
                )
                .with_system("phone", &["tel_home", "tel_work", "tel_mobile"])
                .with_system("email", &["email"]),
                SearchParameter::string(
                    "address",
                    &[
                        "address_line_0",
                        "address_city",
                        "address_postalCode",
                        "address_country",
                    ],
                ),
                SearchParameter::string("address-city", &["address_city"]),
                SearchParameter::string("address-postalcode", &["address_postalCode"]),
                SearchParameter::string("address-country", &["address_country"]),
            ],
        }
    }

    pub fn get(&self, code: &str) -> Option<&SearchParameter> {
        self.params.iter().find(|p| p.code == code)
    }

    /// Check every parameter targets well-formed column identifiers.
    pub fn validate(&self) -> Result<(), SqlBuilderError> {
        for param in &self.params {
            param.validate()?;
        }
        Ok(())
    }
}
