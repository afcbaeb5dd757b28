//! Search entry points: compile, render and execute.

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::config::SearchSettings;
use crate::error::{BackendError, Result, SearchError};
use crate::pagination::{Page, ResultSet};
use crate::parameters::SearchSchema;
use crate::parser::{QueryParameters, SearchParameterParser, SearchWarning};
use crate::predicate::{PredicateNode, build_predicate};
use crate::record::PatientRecord;
use crate::sql_builder::{BuiltQuery, PatientQueryBuilder};

/// Backend able to run the rendered count and page queries.
///
/// Implementations must order page rows by `BuiltQuery::order_column`
/// ascending and apply `BuiltQuery::window`.
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    type Row: Send;

    async fn count(&self, query: &BuiltQuery) -> std::result::Result<u64, BackendError>;

    async fn fetch(&self, query: &BuiltQuery)
    -> std::result::Result<Vec<Self::Row>, BackendError>;
}

/// A compiled predicate plus the warnings raised while compiling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSearch {
    pub predicate: PredicateNode,
    pub warnings: Vec<SearchWarning>,
}

/// The rendered pair of queries for one request.
#[derive(Debug, Clone)]
pub struct RenderedSearch {
    pub count: BuiltQuery,
    pub page: BuiltQuery,
}

/// Stateless search engine over one parameter schema.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    schema: SearchSchema,
    settings: SearchSettings,
}

impl SearchEngine {
    pub fn new(settings: SearchSettings) -> Result<Self> {
        let schema = settings.schema()?;
        Ok(Self { schema, settings })
    }

    pub fn with_schema(schema: SearchSchema, settings: SearchSettings) -> Self {
        Self { schema, settings }
    }

    pub fn schema(&self) -> &SearchSchema {
        &self.schema
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Compile raw query parameters into the predicate tree.
    pub fn compile(&self, params: &QueryParameters) -> Result<CompiledSearch> {
        let normalized = SearchParameterParser::normalize(params, &self.schema)?;
        let predicate = build_predicate(&normalized)?;
        Ok(CompiledSearch {
            predicate,
            warnings: normalized.warnings,
        })
    }

    /// Render a predicate into its count and page queries.
    ///
    /// The page is re-checked against `max_count`, so hand-built pages get
    /// the same limits as `_count`/`_page`.
    pub fn render(&self, predicate: &PredicateNode, page: Page) -> Result<RenderedSearch> {
        let page = Page::new(page.count, page.page, self.settings.max_count)?;
        let offset = page.offset()?;
        let builder = PatientQueryBuilder::new(&self.settings.db_schema, &self.settings.table)
            .select_columns(PatientRecord::COLUMNS)
            .where_predicate(predicate.clone())
            .order_by(&self.settings.id_column)
            .paginate(page.limit(), offset);

        let count = builder.build_count()?;
        let page = builder.build()?;
        debug!(
            sql = %page.sql,
            params = page.params.len(),
            "rendered patient search"
        );
        Ok(RenderedSearch { count, page })
    }

    /// Compile, render and run a search. The count and page queries are
    /// issued concurrently and the first backend failure is returned as is.
    #[instrument(skip_all, fields(count = page.count, page = page.page))]
    pub async fn search<E: SearchExecutor>(
        &self,
        executor: &E,
        params: &QueryParameters,
        page: Page,
    ) -> Result<ResultSet<E::Row>> {
        let compiled = self.compile(params)?;
        let rendered = self.render(&compiled.predicate, page)?;
        let offset = page.offset()?;

        let (total, rows) = tokio::try_join!(
            executor.count(&rendered.count),
            executor.fetch(&rendered.page)
        )
        .map_err(SearchError::from)?;

        debug!(total, returned = rows.len(), "patient search completed");
        Ok(ResultSet::new(total, rows, page, offset).with_warnings(compiled.warnings))
    }

    /// Read `_count`/`_page` from the same parameters and search.
    pub async fn search_params<E: SearchExecutor>(
        &self,
        executor: &E,
        params: &QueryParameters,
    ) -> Result<ResultSet<E::Row>> {
        let page = Page::from_params(params, &self.settings)?;
        self.search(executor, params, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_query_string;
    use crate::sql_builder::SqlBuilderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::block_on;

    /// Records how often it is called and returns canned results.
    struct CannedExecutor {
        total: u64,
        rows: Vec<&'static str>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CannedExecutor {
        fn new(total: u64, rows: Vec<&'static str>) -> Self {
            Self {
                total,
                rows,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl SearchExecutor for CannedExecutor {
        type Row = &'static str;

        async fn count(&self, _query: &BuiltQuery) -> std::result::Result<u64, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::connection("database is down"));
            }
            Ok(self.total)
        }

        async fn fetch(
            &self,
            query: &BuiltQuery,
        ) -> std::result::Result<Vec<Self::Row>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let limit = query.window.map(|w| w.limit as usize).unwrap_or(usize::MAX);
            Ok(self.rows.iter().copied().take(limit).collect())
        }
    }

    fn engine() -> SearchEngine {
        SearchEngine::new(SearchSettings::default()).unwrap()
    }

    #[test]
    fn test_compile_collects_warnings() {
        let compiled = engine()
            .compile(&parse_query_string("gender:exact=male"))
            .unwrap();
        assert_eq!(compiled.warnings.len(), 1);
        assert_eq!(compiled.predicate.groups().len(), 1);
    }

    #[test]
    fn test_render_uses_settings() {
        let settings = SearchSettings {
            db_schema: "dbo".into(),
            table: "viewPatientPDQm".into(),
            ..Default::default()
        };
        let engine = SearchEngine::new(settings).unwrap();
        let compiled = engine.compile(&parse_query_string("family=smi")).unwrap();
        let rendered = engine
            .render(&compiled.predicate, Page { count: 10, page: 3 })
            .unwrap();
        assert!(rendered.count.sql.contains("FROM \"dbo\".\"viewPatientPDQm\" AS p"));
        assert!(!rendered.count.sql.contains("LIMIT"));
        assert!(rendered.page.sql.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_search_runs_both_queries() {
        let executor = CannedExecutor::new(3, vec!["a", "b", "c"]);
        let params = parse_query_string("family=smi&_count=2");
        let result = block_on(engine().search_params(&executor, &params)).unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.rows, vec!["a", "b"]);
        assert!(result.has_next);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_invalid_value_scans_nothing() {
        let executor = CannedExecutor::new(3, vec!["a"]);
        let params = parse_query_string("birthdate=zz1980");
        let err = block_on(engine().search_params(&executor, &params)).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_oversized_page_is_rejected_before_scanning() {
        let executor = CannedExecutor::new(3, vec!["a"]);
        let page = Page {
            count: 10_000,
            page: 1,
        };
        let err = block_on(engine().search(&executor, &parse_query_string("family=smi"), page))
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidParameterValue { ref param, .. } if param == "_count"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_too_many_conditions_is_a_client_error() {
        let executor = CannedExecutor::new(0, vec![]);
        let values: Vec<String> = (0..26).map(|i| format!("v{i}")).collect();
        let params = parse_query_string(&format!("address={}", values.join(",")));
        let err = block_on(engine().search_params(&executor, &params)).unwrap_err();
        assert!(matches!(err, SearchError::Render(SqlBuilderError::QueryTooComplex(_))));
        assert!(err.is_client_error());
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_backend_failure_is_surfaced() {
        let executor = CannedExecutor {
            fail: true,
            ..CannedExecutor::new(0, vec![])
        };
        let err = block_on(engine().search_params(&executor, &parse_query_string(""))).unwrap_err();
        assert!(matches!(err, SearchError::BackendUnavailable(_)));
    }
}
