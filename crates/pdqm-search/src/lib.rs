//! Patient search compiler for the PDQm patient directory.
//!
//! Turns FHIR-style query parameters into an `And(Or(..))` predicate tree,
//! renders it into bound count and page queries, and runs both against a
//! [`SearchExecutor`].
//!
//! ```ignore
//! let engine = SearchEngine::new(SearchSettings::default())?;
//! let params = parse_query_string("family=smi,smy&gender=male&_count=2");
//! let result = engine.search_params(&directory, &params).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
mod escape;
pub mod pagination;
pub mod parameters;
pub mod parser;
pub mod predicate;
pub mod record;
pub mod sql_builder;
pub mod types;

pub use config::SearchSettings;
pub use engine::{CompiledSearch, RenderedSearch, SearchEngine, SearchExecutor};
pub use error::{BackendError, Result, SearchError};
pub use pagination::{Page, ResultSet};
pub use parameters::{
    SearchModifier, SearchParameter, SearchParameterType, SearchPrefix, SearchSchema, TokenForm,
};
pub use parser::{
    NormalizedParameters, QueryParameters, SearchParameterParser, SearchWarning, ValueGroup,
    parse_query_string,
};
pub use predicate::{Comparison, Condition, PredicateNode, build_predicate};
pub use record::{FieldValue, PatientRecord};
pub use sql_builder::{BuiltQuery, PatientQueryBuilder, QueryWindow, SqlBuilderError, SqlValue};
pub use types::DateBound;
