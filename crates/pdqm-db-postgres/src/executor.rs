//! Runs rendered patient queries against PostgreSQL.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use pdqm_search::{BackendError, BuiltQuery, PatientRecord, SearchExecutor, SqlValue};
use sqlx_core::query::Query;
use sqlx_core::query_scalar::QueryScalar;
use sqlx_core::row::Row;
use sqlx_postgres::{PgArguments, PgPool, PgRow, Postgres};
use time::{Date, Month};
use tracing::{debug, instrument, warn};

use crate::error::{PostgresError, Result};

/// Patient directory backed by a PostgreSQL view.
#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Binds every rendered parameter in order.
///
/// Dates are sent as text; the rendered SQL casts them with `::date`.
trait BindAllParams<'q> {
    fn bind_all_params(self, params: &'q [SqlValue]) -> Self;
}

impl<'q> BindAllParams<'q> for Query<'q, Postgres, PgArguments> {
    fn bind_all_params(mut self, params: &'q [SqlValue]) -> Self {
        for param in params {
            self = self.bind(param.as_str());
        }
        self
    }
}

impl<'q> BindAllParams<'q> for QueryScalar<'q, Postgres, i64, PgArguments> {
    fn bind_all_params(mut self, params: &'q [SqlValue]) -> Self {
        for param in params {
            self = self.bind(param.as_str());
        }
        self
    }
}

#[async_trait]
impl SearchExecutor for PostgresDirectory {
    type Row = PatientRecord;

    #[instrument(skip_all)]
    async fn count(&self, query: &BuiltQuery) -> std::result::Result<u64, BackendError> {
        let total: i64 = sqlx_core::query_scalar::query_scalar::<Postgres, i64>(&query.sql)
            .bind_all_params(&query.params)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, sql = %query.sql, "Count query failed");
                BackendError::from(PostgresError::from(e))
            })?;

        u64::try_from(total)
            .map_err(|_| BackendError::query(format!("negative count returned: {total}")))
    }

    #[instrument(skip_all)]
    async fn fetch(
        &self,
        query: &BuiltQuery,
    ) -> std::result::Result<Vec<PatientRecord>, BackendError> {
        let rows = sqlx_core::query::query::<Postgres>(&query.sql)
            .bind_all_params(&query.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, sql = %query.sql, "Page query failed");
                BackendError::from(PostgresError::from(e))
            })?;

        debug!(rows = rows.len(), "Fetched patient rows");

        rows.iter()
            .map(row_to_record)
            .collect::<Result<Vec<_>>>()
            .map_err(BackendError::from)
    }
}

fn text(row: &PgRow, column: &str) -> Result<Option<String>> {
    row.try_get::<Option<String>, _>(column)
        .map_err(|e| PostgresError::decode(format!("{column}: {e}")))
}

fn date(row: &PgRow, column: &str) -> Result<Option<Date>> {
    row.try_get::<Option<NaiveDate>, _>(column)
        .map_err(|e| PostgresError::decode(format!("{column}: {e}")))?
        .map(naive_date_to_time)
        .transpose()
        .map_err(|e| PostgresError::decode(format!("{column}: {e}")))
}

/// Maps one projected row of the patient view.
fn row_to_record(row: &PgRow) -> Result<PatientRecord> {
    let id = text(row, "id")?.ok_or_else(|| PostgresError::decode("id: NULL"))?;

    Ok(PatientRecord {
        id,
        identifier: text(row, "identifier")?,
        name_use: text(row, "name_use")?,
        name_family: text(row, "name_family")?,
        name_given_0: text(row, "name_given_0")?,
        name_prefix_0: text(row, "name_prefix_0")?,
        name_text: text(row, "name_text")?,
        mothers_maiden_name: text(row, "mothersMaidenName")?,
        address_use: text(row, "address_use")?,
        address_line_0: text(row, "address_line_0")?,
        address_city: text(row, "address_city")?,
        address_postal_code: text(row, "address_postalCode")?,
        address_country: text(row, "address_country")?,
        tel_home: text(row, "tel_home")?,
        tel_work: text(row, "tel_work")?,
        tel_mobile: text(row, "tel_mobile")?,
        email: text(row, "email")?,
        birthdate: date(row, "birthdate")?,
        deathdate: date(row, "deathdate")?,
        gender: text(row, "gender")?,
        marital_code: text(row, "marital_code")?,
    })
}

fn naive_date_to_time(d: NaiveDate) -> std::result::Result<Date, time::error::ComponentRange> {
    let month = Month::try_from(d.month() as u8)?;
    Date::from_calendar_date(d.year(), month, d.day() as u8)
}
