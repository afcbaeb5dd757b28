use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use pdqm_search::{BackendError, BuiltQuery, PatientRecord, SearchExecutor};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::matcher::matches;

/// In-memory patient directory using a papaya lock-free HashMap keyed by id.
///
/// Evaluates the structured predicate carried by each [`BuiltQuery`] instead
/// of its SQL text.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    data: Arc<PapayaHashMap<String, PatientRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = PatientRecord>) -> Self {
        let directory = Self::new();
        for record in records {
            directory.insert(record);
        }
        directory
    }

    /// Load records from a JSON array of patient rows.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let records: Vec<PatientRecord> = serde_json::from_str(json)?;
        Ok(Self::with_records(records))
    }

    /// Insert or replace a record, returning the previous one.
    pub fn insert(&self, record: PatientRecord) -> Option<PatientRecord> {
        let guard = self.data.pin();
        guard.insert(record.id.clone(), record).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<PatientRecord> {
        let guard = self.data.pin();
        guard.remove(id).cloned()
    }

    pub fn get(&self, id: &str) -> Option<PatientRecord> {
        let guard = self.data.pin();
        guard.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(&self, query: &BuiltQuery) -> Vec<PatientRecord> {
        let guard = self.data.pin();
        guard
            .iter()
            .filter(|(_, record)| matches(&query.predicate, record))
            .map(|(_, record)| record.clone())
            .collect()
    }
}

fn compare_by(column: &str, a: &PatientRecord, b: &PatientRecord) -> Ordering {
    a.column(column)
        .cmp(&b.column(column))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl SearchExecutor for InMemoryDirectory {
    type Row = PatientRecord;

    async fn count(&self, query: &BuiltQuery) -> Result<u64, BackendError> {
        let guard = self.data.pin();
        let total = guard
            .values()
            .filter(|record| matches(&query.predicate, record))
            .count();
        tracing::debug!(total, "in-memory count");
        Ok(total as u64)
    }

    async fn fetch(&self, query: &BuiltQuery) -> Result<Vec<PatientRecord>, BackendError> {
        let mut rows = self.matching(query);
        rows.sort_by(|a, b| compare_by(&query.order_column, a, b));

        let Some(window) = query.window else {
            return Ok(rows);
        };
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }
}
