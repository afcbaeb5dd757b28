//! PostgreSQL patient directory backend.
//!
//! Runs the count and page queries rendered by `pdqm-search` against a
//! patient view. The view must expose the columns listed in
//! [`pdqm_search::PatientRecord::COLUMNS`] with `id` projected as text.
//!
//! # Example
//!
//! ```ignore
//! use pdqm_db_postgres::{PostgresConfig, PostgresDirectory, create_pool};
//!
//! let pool = create_pool(&PostgresConfig::new("postgres://localhost/pdqm")).await?;
//! let directory = PostgresDirectory::new(pool);
//! let result = engine.search_params(&directory, &params).await?;
//! ```

mod config;
mod error;
mod executor;
mod pool;

pub use config::PostgresConfig;
pub use error::{
    PG_UNDEFINED_COLUMN, PG_UNDEFINED_TABLE, PostgresError, Result, has_pg_error_code,
};
pub use executor::PostgresDirectory;
pub use pool::{PgPoolOptions, create_pool, mask_password, pool_options, test_connection};
pub use sqlx_postgres::PgPool;
