use serde::{Deserialize, Serialize};

use crate::parameters::{SearchParameter, SearchSchema};
use crate::sql_builder::{SqlBuilderError, validate_identifier};

/// Search settings shared by every directory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_default")]
    pub default_count: u64,
    #[serde(default = "default_search_max")]
    pub max_count: u64,
    #[serde(default = "default_db_schema")]
    pub db_schema: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Replaces the built-in PDQm parameter table when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<SearchParameter>>,
}
fn default_search_default() -> u64 {
    20
}
fn default_search_max() -> u64 {
    100
}
fn default_db_schema() -> String {
    "public".to_string()
}
fn default_table() -> String {
    "patient".to_string()
}
fn default_id_column() -> String {
    "id".to_string()
}
impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_count: default_search_default(),
            max_count: default_search_max(),
            db_schema: default_db_schema(),
            table: default_table(),
            id_column: default_id_column(),
            parameters: None,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_count == 0 {
            return Err("search.max_count must be at least 1".into());
        }
        if self.default_count == 0 || self.default_count > self.max_count {
            return Err(format!(
                "search.default_count must be between 1 and {}",
                self.max_count
            ));
        }
        for (key, ident) in [
            ("search.db_schema", &self.db_schema),
            ("search.table", &self.table),
            ("search.id_column", &self.id_column),
        ] {
            validate_identifier(ident).map_err(|e| format!("{key}: {e}"))?;
        }
        Ok(())
    }

    /// The parameter table in effect.
    pub fn schema(&self) -> Result<SearchSchema, SqlBuilderError> {
        match &self.parameters {
            Some(params) => SearchSchema::new(params.clone()),
            None => Ok(SearchSchema::pdqm_patient()),
        }
    }
}
