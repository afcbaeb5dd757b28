//! Per-kind expansion of value groups into atomic conditions.
//!
//! - String: case-insensitive contains, or equality with `:exact`
//! - Token: codes, combined identifiers and contact points
//! - Date: partial dates widened to day intervals, narrowed by prefix

pub mod date;
pub mod string;
pub mod token;

pub use date::{DateBound, build_date_conditions, format_date, parse_date_range, resolve};
pub use string::{build_string_conditions, escape_like_pattern};
pub use token::{
    TokenSpec, build_id_conditions, build_token_conditions, expand_identifier, parse_token_spec,
    parse_token_specs,
};
