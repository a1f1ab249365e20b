//! Error types for target resolution and visibility planning

use thiserror::Error;

/// A single failed call to a remote astronomy service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure (DNS, TLS, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    /// The service answered but reported an error of its own
    #[error("{service}: {message}")]
    Rejected {
        service: &'static str,
        message: String,
    },

    /// The response body could not be understood
    #[error("Could not parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },

    /// The object is unknown to the service
    #[error("{service} has no match for '{query}'")]
    NotFound { service: &'static str, query: String },
}

impl ServiceError {
    pub fn parse(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Parse {
            service,
            message: message.into(),
        }
    }

    pub fn rejected(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Rejected {
            service,
            message: message.into(),
        }
    }
}

/// Errors surfaced by the planner core
#[derive(Debug, Error)]
pub enum PlannerError {
    /// A name or designation could not be turned into a coordinate after every
    /// fallback strategy was tried
    #[error("{service} lookup failed for {query}: {source}")]
    ResolutionFailure {
        service: &'static str,
        query: String,
        #[source]
        source: Box<PlannerError>,
    },

    #[error("Invalid coordinates format '{input}': {reason}")]
    InvalidCoordinateFormat { input: String, reason: String },

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    #[error("Invalid observation window: {0}")]
    InvalidWindow(String),

    /// Altitude band or direction filter that cannot be satisfied as given
    #[error("Invalid visibility constraint: {0}")]
    InvalidConstraint(String),

    /// The ephemeris service produced a table without any rows
    #[error("Ephemeris service returned no rows for {query}")]
    EmptyEphemerisResult { query: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl PlannerError {
    pub fn resolution(service: &'static str, query: &str, cause: PlannerError) -> Self {
        PlannerError::ResolutionFailure {
            service,
            query: query.to_string(),
            source: Box::new(cause),
        }
    }

    pub fn coordinate_format(input: &str, reason: impl Into<String>) -> Self {
        PlannerError::InvalidCoordinateFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_failure_message_carries_query_and_cause() {
        let cause = PlannerError::Service(ServiceError::NotFound {
            service: "Sesame",
            query: "NotAStar".to_string(),
        });
        let err = PlannerError::resolution("SIMBAD", "NotAStar", cause);
        let message = err.to_string();
        assert!(message.starts_with("SIMBAD lookup failed for NotAStar"));
        assert!(message.contains("Sesame has no match for 'NotAStar'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_coordinate_format_error() {
        let err = PlannerError::coordinate_format("25x", "unrecognised");
        assert_eq!(err.to_string(), "Invalid coordinates format '25x': unrecognised");
    }
}
