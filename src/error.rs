//! Error types returned by the session layer.
//!
//! Every failure is surfaced to the caller; nothing in this crate logs an
//! error and carries on.

use crate::api::ApiError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure talking to the platform (connect, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded into the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// The endpoint does not have the expected `scheme://host.domain` shape.
    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid credentials, rejected client grant, or a refresh that failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A resource manager's startup probe failed during session bootstrap.
    #[error("failed to initialize {manager} manager: {source}")]
    ManagerInit {
        manager: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// Non-2xx response from the Cloud Controller or UAA.
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("asynchronous job failed: {0}")]
    JobFailed(String),

    #[error("failed to persist configuration: {0}")]
    Persistence(String),

    #[error("random source failed: {0}")]
    Random(#[from] rand::Error),
}

impl Error {
    pub(crate) fn manager(manager: &'static str, source: Error) -> Self {
        Error::ManagerInit {
            manager,
            source: Box::new(source),
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// HTTP status of a platform error, if this is one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.http_status),
            Error::ManagerInit { source, .. } => source.http_status(),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_error_names_manager() {
        let err = Error::manager("route", Error::Configuration("API endpoint is not set".into()));
        let msg = err.to_string();
        assert!(msg.contains("route manager"));
        assert!(msg.contains("API endpoint is not set"));
    }

    #[test]
    fn test_http_status_passes_through_manager_error() {
        let api = ApiError::from_cc_response(503, r#"{"code":10015,"error_code":"CF-ServiceUnavailable","description":"down"}"#);
        let err = Error::manager("stack", Error::Api(api));
        assert_eq!(err.http_status(), Some(503));
        assert!(!err.is_authentication());
    }
}
