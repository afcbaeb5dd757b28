//! Error types for patient search compilation and execution.

use crate::sql_builder::SqlBuilderError;

/// Errors raised by a backend query executor.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached or no connection was available.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The backend rejected or failed to run a query.
    #[error("Query failed: {message}")]
    Query {
        /// Description of the query failure.
        message: String,
    },
}

impl BackendError {
    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Query` error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Errors that can occur while compiling or executing a patient search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A parameter value could not be interpreted. Never recovered silently.
    #[error("Invalid value for {param}: {message}")]
    InvalidParameterValue { param: String, message: String },

    /// The backend failed; surfaced to the caller without retrying.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),

    /// The predicate could not be rendered against the configured schema.
    #[error("Render error: {0}")]
    Render(#[from] SqlBuilderError),
}

impl SearchError {
    /// Creates a new `InvalidParameterValue` error.
    #[must_use]
    pub fn invalid_value(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameterValue {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Returns true when the failure was caused by the request rather than the backend.
    ///
    /// Too many conditions counts as a request error; a bad configured
    /// identifier does not.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameterValue { .. } | Self::Render(SqlBuilderError::QueryTooComplex(_))
        )
    }
}

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display() {
        let err = SearchError::invalid_value("birthdate", "unrecognized date 'zz1980'");
        assert_eq!(
            err.to_string(),
            "Invalid value for birthdate: unrecognized date 'zz1980'"
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_render_error_classification() {
        let err: SearchError = SqlBuilderError::QueryTooComplex("Too many conditions".into()).into();
        assert!(err.is_client_error());

        let err: SearchError = SqlBuilderError::InvalidIdentifier("patient x".into()).into();
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_backend_error_conversion() {
        let err: SearchError = BackendError::connection("pool timed out").into();
        assert!(matches!(err, SearchError::BackendUnavailable(_)));
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("pool timed out"));
    }
}
