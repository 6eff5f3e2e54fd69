use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use tracing::debug;

use super::client::{decode, join_url, Gateway};
use super::types::TokenResponse;
use crate::error::{Error, Result};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// OAuth2 grant sent to the UAA token endpoint
#[derive(Debug, Clone, Copy)]
pub(crate) enum Grant<'a> {
    Password { username: &'a str, password: &'a str },
    RefreshToken { refresh_token: &'a str },
    ClientCredentials,
}

impl Grant<'_> {
    fn form_fields(&self) -> Vec<(&str, &str)> {
        match *self {
            Grant::Password { username, password } => vec![
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
                ("scope", ""),
            ],
            Grant::RefreshToken { refresh_token } => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", ""),
            ],
            Grant::ClientCredentials => vec![("grant_type", "client_credentials")],
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::RefreshToken { .. } => "refresh_token",
            Grant::ClientCredentials => "client_credentials",
        }
    }
}

fn basic_auth(client_id: &str, client_secret: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", client_id, client_secret))
    )
}

impl Gateway {
    /// Exchange `grant` for a token at `<auth_endpoint>/oauth/token`.
    ///
    /// Token requests authenticate with HTTP Basic client credentials and
    /// never go through the refresh path.
    pub(crate) async fn request_token(
        &self,
        auth_endpoint: &str,
        client_id: &str,
        client_secret: &str,
        grant: Grant<'_>,
    ) -> Result<TokenResponse> {
        let url = join_url(auth_endpoint, "/oauth/token");
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(grant.form_fields())
            .finish();

        debug!("=== Token Request ({}) ===", grant.name());

        let response = self
            .dispatch(
                &Method::POST,
                &url,
                Some((FORM_CONTENT_TYPE, body.as_bytes())),
                &basic_auth(client_id, client_secret),
            )
            .await?;
        let (_, text) = self.finish(&url, response).await?;

        let token: TokenResponse = decode(&url, &text)?;
        if token.access_token.is_empty() {
            return Err(Error::Authentication(
                "token response does not contain a valid 'access_token' field".to_string(),
            ));
        }

        debug!("Successfully obtained {} token", grant.name());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryPolicy;
    use crate::config::Configuration;
    use crate::logger::Logger;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    fn uaa_gateway() -> Gateway {
        Gateway::uaa(
            reqwest::Client::new(),
            Configuration::in_memory(),
            Arc::new(Logger::disabled()),
        )
        .with_retry_policy(RetryPolicy::none())
    }

    #[test]
    fn test_basic_auth_for_cf_client() {
        // "cf:" base64-encoded
        assert_eq!(basic_auth("cf", ""), "Basic Y2Y6");
    }

    #[tokio::test]
    async fn test_password_grant_request_shape() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .header("authorization", "Basic Y2Y6")
                .header("content-type", FORM_CONTENT_TYPE)
                .body_includes("grant_type=password")
                .body_includes("username=admin")
                .body_includes("password=p%40ss");
            then.status(200).json_body(json!({
                "access_token": "at",
                "token_type": "bearer",
                "refresh_token": "rt"
            }));
        });

        let token = uaa_gateway()
            .request_token(
                &server.base_url(),
                "cf",
                "",
                Grant::Password {
                    username: "admin",
                    password: "p@ss",
                },
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(token.authorization_value(), "bearer at");
    }

    #[tokio::test]
    async fn test_rejected_grant_is_uaa_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(401).json_body(json!({
                "error": "unauthorized",
                "error_description": "Bad credentials"
            }));
        });

        let err = uaa_gateway()
            .request_token(&server.base_url(), "cf", "", Grant::ClientCredentials)
            .await
            .unwrap_err();

        match err {
            Error::Api(api) => {
                assert_eq!(api.http_status, 401);
                assert_eq!(api.description, "Bad credentials");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_access_token_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(200).json_body(json!({"access_token": ""}));
        });

        let err = uaa_gateway()
            .request_token(&server.base_url(), "cf", "", Grant::ClientCredentials)
            .await
            .unwrap_err();
        assert!(err.is_authentication());
    }
}
