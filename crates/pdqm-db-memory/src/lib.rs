//! In-memory patient directory backend.
//!
//! Implements [`pdqm_search::SearchExecutor`] over a papaya lock-free HashMap
//! by evaluating the compiled predicate directly.
//!
//! ```ignore
//! use pdqm_db_memory::demo_directory;
//! use pdqm_search::{SearchEngine, SearchSettings, parse_query_string};
//!
//! let engine = SearchEngine::new(SearchSettings::default())?;
//! let result = engine
//!     .search_params(&demo_directory(), &parse_query_string("family=smi"))
//!     .await?;
//! ```

mod directory;
pub mod matcher;
pub mod seed;

pub use directory::InMemoryDirectory;
pub use seed::{demo_directory, demo_patients};
