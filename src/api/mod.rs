//! Gateway: the authenticated REST transport shared by every manager.
//!
//! One gateway talks to the Cloud Controller, one to UAA. Both share a
//! single `reqwest::Client`, retry transient failures, and hand 401s to a
//! bound [`TokenRefresher`] before retrying the call once.

mod client;
mod http;
mod token;
mod types;

pub use client::{build_http_client, Gateway, GatewayKind, TokenRefresher};
pub use http::RetryPolicy;
pub use types::{ApiError, ErrorOrigin, Metadata, Resource};

pub(crate) use client::{append_query, join_url};
pub(crate) use token::Grant;
pub(crate) use types::{FeatureFlag, FeatureFlagUpdate, TokenResponse};
