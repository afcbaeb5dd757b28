//! `_count`/`_page` handling and the paginated result set.

use serde::Serialize;

use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::parser::{QueryParameters, SearchWarning};

/// Requested page window; `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub count: u64,
    pub page: u64,
}

impl Page {
    /// Build a page, rejecting values outside `1..=max_count` and `page < 1`.
    pub fn new(count: u64, page: u64, max_count: u64) -> Result<Self, SearchError> {
        if count == 0 || count > max_count {
            return Err(SearchError::invalid_value(
                "_count",
                format!("must be between 1 and {max_count}, got {count}"),
            ));
        }
        if page == 0 {
            return Err(SearchError::invalid_value("_page", "must be at least 1"));
        }
        let page = Self { count, page };
        page.offset()?;
        Ok(page)
    }

    pub fn first(settings: &SearchSettings) -> Self {
        Self {
            count: settings.default_count,
            page: 1,
        }
    }

    /// Read `_count` and `_page` from the query. The first occurrence wins and
    /// an empty value means the default.
    pub fn from_params(
        params: &QueryParameters,
        settings: &SearchSettings,
    ) -> Result<Self, SearchError> {
        let count = read_integer(params, "_count")?.unwrap_or(settings.default_count);
        let page = read_integer(params, "_page")?.unwrap_or(1);
        Self::new(count, page, settings.max_count)
    }

    /// `count * (page - 1)`, bounded to what a backend OFFSET accepts.
    pub fn offset(&self) -> Result<u64, SearchError> {
        self.count
            .checked_mul(self.page.saturating_sub(1))
            .filter(|offset| i64::try_from(*offset).is_ok())
            .ok_or_else(|| SearchError::invalid_value("_page", "page offset is out of range"))
    }

    pub fn limit(&self) -> u64 {
        self.count
    }
}

fn read_integer(params: &QueryParameters, key: &str) -> Result<Option<u64>, SearchError> {
    let Some(raw) = params.get(key).and_then(|values| values.first()) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| SearchError::invalid_value(key, format!("'{raw}' is not a positive integer")))
}

/// One page of matches plus the size of the full match set.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSet<R> {
    /// Matches regardless of pagination
    pub total: u64,
    pub rows: Vec<R>,
    pub page: Page,
    pub has_next: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SearchWarning>,
}

impl<R> ResultSet<R> {
    pub fn new(total: u64, rows: Vec<R>, page: Page, offset: u64) -> Self {
        let has_next = offset + (rows.len() as u64) < total;
        Self {
            total,
            rows,
            page,
            has_next,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<SearchWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    /// The page after this one, if there are more matches.
    pub fn next_page(&self) -> Option<Page> {
        self.has_next.then(|| Page {
            count: self.page.count,
            page: self.page.page + 1,
        })
    }
}
