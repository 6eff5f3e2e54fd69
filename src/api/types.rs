//! Wire types for the Cloud Controller v2 and UAA APIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata block every CC v2 resource carries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub guid: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A CC v2 resource: `{"metadata": {...}, "entity": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<T> {
    pub metadata: Metadata,
    pub entity: T,
}

impl<T> Resource<T> {
    pub fn guid(&self) -> &str {
        &self.metadata.guid
    }
}

/// One page of a CC v2 collection
#[derive(Debug, Deserialize)]
pub(crate) struct PaginatedResources<T> {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub next_url: Option<String>,
    #[serde(default = "Vec::new")]
    pub resources: Vec<Resource<T>>,
}

/// Asynchronous CC job, returned by `DELETE ...?async=true`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobEntity {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_details: Option<CcErrorResponse>,
}

/// Feature flag record from `/v2/config/feature_flags`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeatureFlag {
    pub name: String,
    pub enabled: bool,
}

/// Body of `PUT /v2/config/feature_flags/<name>`
#[derive(Debug, Serialize)]
pub(crate) struct FeatureFlagUpdate {
    pub enabled: bool,
}

/// Token response from the UAA token endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// The value sent in the `Authorization` header, e.g. `bearer eyJ...`.
    pub fn authorization_value(&self) -> String {
        let token_type = if self.token_type.is_empty() {
            "bearer"
        } else {
            self.token_type.as_str()
        };
        format!("{} {}", token_type, self.access_token)
    }
}

/// Cloud Controller error body
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CcErrorResponse {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// UAA error body
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct UaaErrorResponse {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

// ============================================================================
// API Error
// ============================================================================

/// Which service produced an [`ApiError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    CloudController,
    Uaa,
}

/// Structured non-2xx response from the platform.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub origin: ErrorOrigin,
    pub http_status: u16,
    /// Platform error code: the numeric CC code or the UAA `error` string.
    pub error_code: String,
    /// Symbolic CC error name such as `CF-NotAuthenticated`, when present.
    pub error_name: Option<String>,
    pub description: String,
}

impl ApiError {
    /// Build from a Cloud Controller error response.
    ///
    /// Bodies that are not CC error JSON are kept verbatim as the description.
    pub fn from_cc_response(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<CcErrorResponse>(body) {
            Ok(err) if err.code != 0 || !err.description.is_empty() => Self {
                origin: ErrorOrigin::CloudController,
                http_status,
                error_code: err.code.to_string(),
                error_name: err.error_code,
                description: err.description,
            },
            _ => Self::raw(ErrorOrigin::CloudController, http_status, body),
        }
    }

    /// Build from a UAA error response.
    pub fn from_uaa_response(http_status: u16, body: &str) -> Self {
        match serde_json::from_str::<UaaErrorResponse>(body) {
            Ok(err) if !err.error.is_empty() => Self {
                origin: ErrorOrigin::Uaa,
                http_status,
                error_code: err.error,
                error_name: None,
                description: err.error_description,
            },
            _ => Self::raw(ErrorOrigin::Uaa, http_status, body),
        }
    }

    fn raw(origin: ErrorOrigin, http_status: u16, body: &str) -> Self {
        Self {
            origin,
            http_status,
            error_code: String::new(),
            error_name: None,
            description: body.trim().to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.http_status == 401
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status == 404
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match self.origin {
            ErrorOrigin::CloudController => "Server error",
            ErrorOrigin::Uaa => "UAA error",
        };
        write!(
            f,
            "{}, status code: {}, error code: {}, message: {}",
            origin, self.http_status, self.error_code, self.description
        )
    }
}

impl std::error::Error for ApiError {}
