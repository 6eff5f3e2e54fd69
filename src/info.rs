//! Platform discovery: the `/v2/info` document and endpoint handling.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::api::Gateway;
use crate::config::Configuration;
use crate::error::{Error, Result};

/// Discovery snapshot for the targeted platform.
///
/// The first four fields come from the caller; the rest from `/v2/info`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct CcInfo {
    #[serde(skip)]
    pub api_endpoint: String,
    #[serde(skip)]
    pub user: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub skip_ssl_validation: bool,

    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub authorization_endpoint: String,
    #[serde(default)]
    pub token_endpoint: String,
    #[serde(rename = "logging_endpoint", default)]
    pub loggregator_endpoint: Option<String>,
    #[serde(rename = "doppler_logging_endpoint", default)]
    pub doppler_endpoint: Option<String>,
    #[serde(default)]
    pub min_cli_version: Option<String>,
    #[serde(default)]
    pub min_recommended_cli_version: Option<String>,
    #[serde(rename = "app_ssh_oauth_client", default)]
    pub ssh_oauth_client: Option<String>,
    #[serde(rename = "routing_endpoint", default)]
    pub routing_api_endpoint: Option<String>,
}

impl CcInfo {
    /// Copy the discovered endpoints into the session configuration.
    pub fn apply_to(&self, config: &Configuration) -> Result<()> {
        config.update(|data| {
            data.api_endpoint = self.api_endpoint.clone();
            data.api_version = self.api_version.clone();
            data.authorization_endpoint = self.authorization_endpoint.clone();
            data.uaa_endpoint = self.token_endpoint.clone();
            data.ssh_oauth_client = self.ssh_oauth_client.clone().unwrap_or_default();
            data.min_cli_version = self.min_cli_version.clone().unwrap_or_default();
            data.min_recommended_cli_version = self
                .min_recommended_cli_version
                .clone()
                .unwrap_or_default();
            data.doppler_endpoint = self.doppler_endpoint.clone().unwrap_or_default();
            data.routing_api_endpoint = self.routing_api_endpoint.clone().unwrap_or_default();
            data.ssl_disabled = self.skip_ssl_validation;
        })
    }

    /// Fill in the loggregator endpoint when discovery left it empty.
    pub fn ensure_loggregator_endpoint(&mut self) -> Result<()> {
        let missing = self
            .loggregator_endpoint
            .as_deref()
            .map_or(true, str::is_empty);
        if missing {
            self.loggregator_endpoint = Some(synthesize_logging_endpoint(&self.api_endpoint)?);
        }
        Ok(())
    }
}

impl std::fmt::Debug for CcInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CcInfo")
            .field("api_endpoint", &self.api_endpoint)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .field("api_version", &self.api_version)
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("loggregator_endpoint", &self.loggregator_endpoint)
            .field("doppler_endpoint", &self.doppler_endpoint)
            .field("routing_api_endpoint", &self.routing_api_endpoint)
            .finish()
    }
}

/// Strip one trailing slash and default the scheme to `https://`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.strip_suffix('/').unwrap_or(endpoint);
    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

fn endpoint_domain_regex() -> Result<&'static Regex> {
    static RE: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^http(s?)://[^\.]+\.([^:]+)"))
        .as_ref()
        .map_err(|e| Error::Configuration(format!("endpoint pattern: {}", e)))
}

/// Derive `ws[s]://loggregator.<domain>:<port>` from an API endpoint.
///
/// `https://api.sys.example.com` becomes `wss://loggregator.sys.example.com:443`.
pub fn synthesize_logging_endpoint(endpoint: &str) -> Result<String> {
    let caps = endpoint_domain_regex()?
        .captures(endpoint)
        .ok_or_else(|| {
            Error::InvalidEndpoint(format!(
                "cannot derive logging endpoint from '{}': expected scheme://host.domain",
                endpoint
            ))
        })?;

    let secure = !caps[1].is_empty();
    let (scheme, port) = if secure { ("wss", 443) } else { ("ws", 80) };
    Ok(format!("{}://loggregator.{}:{}", scheme, &caps[2], port))
}

/// GET `<endpoint>/v2/info`. Errors are returned as-is.
pub async fn fetch_info(gateway: &Gateway, endpoint: &str) -> Result<CcInfo> {
    gateway.get_resource(&format!("{}/v2/info", endpoint)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RetryPolicy;
    use crate::logger::Logger;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_normalize_adds_https() {
        assert_eq!(normalize_endpoint("api.example.com"), "https://api.example.com");
        assert_eq!(normalize_endpoint("http://api.example.com"), "http://api.example.com");
        assert_eq!(
            normalize_endpoint("httpapi.sys.example.com"),
            "https://httpapi.sys.example.com"
        );
    }

    #[test]
    fn test_normalize_strips_one_trailing_slash() {
        assert_eq!(normalize_endpoint("https://api.example.com/"), "https://api.example.com");
        assert_eq!(normalize_endpoint("api.example.com//"), "https://api.example.com/");
    }

    #[test]
    fn test_logging_endpoint_secure() {
        assert_eq!(
            synthesize_logging_endpoint("https://api.sys.example.com").unwrap(),
            "wss://loggregator.sys.example.com:443"
        );
    }

    #[test]
    fn test_logging_endpoint_insecure() {
        assert_eq!(
            synthesize_logging_endpoint("http://api.bosh-lite.com").unwrap(),
            "ws://loggregator.bosh-lite.com:80"
        );
    }

    #[test]
    fn test_logging_endpoint_drops_port() {
        assert_eq!(
            synthesize_logging_endpoint("https://api.example.com:8443").unwrap(),
            "wss://loggregator.example.com:443"
        );
    }

    #[test]
    fn test_logging_endpoint_without_domain_is_fatal() {
        let err = synthesize_logging_endpoint("https://localhost").unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_ensure_keeps_discovered_endpoint() {
        let mut info = CcInfo {
            api_endpoint: "https://localhost".into(),
            loggregator_endpoint: Some("wss://doppler.example.com:443".into()),
            ..Default::default()
        };
        info.ensure_loggregator_endpoint().unwrap();
        assert_eq!(info.loggregator_endpoint.as_deref(), Some("wss://doppler.example.com:443"));
    }

    #[test]
    fn test_ensure_synthesizes_empty_endpoint() {
        let mut info = CcInfo {
            api_endpoint: "https://api.example.com".into(),
            loggregator_endpoint: Some(String::new()),
            ..Default::default()
        };
        info.ensure_loggregator_endpoint().unwrap();
        assert_eq!(
            info.loggregator_endpoint.as_deref(),
            Some("wss://loggregator.example.com:443")
        );
    }

    #[test]
    fn test_apply_to_config() {
        let info: CcInfo = serde_json::from_value(json!({
            "api_version": "2.65.0",
            "authorization_endpoint": "https://login.example.com",
            "token_endpoint": "https://uaa.example.com",
            "min_cli_version": null,
            "app_ssh_oauth_client": "ssh-proxy",
            "routing_endpoint": "https://api.example.com/routing"
        }))
        .unwrap();
        let info = CcInfo {
            api_endpoint: "https://api.example.com".into(),
            skip_ssl_validation: true,
            ..info
        };

        let config = Configuration::in_memory();
        info.apply_to(&config).unwrap();

        let data = config.snapshot();
        assert_eq!(data.api_endpoint, "https://api.example.com");
        assert_eq!(data.api_version, "2.65.0");
        assert_eq!(data.authorization_endpoint, "https://login.example.com");
        assert_eq!(data.uaa_endpoint, "https://uaa.example.com");
        assert_eq!(data.ssh_oauth_client, "ssh-proxy");
        assert_eq!(data.min_cli_version, "");
        assert!(data.ssl_disabled);
    }

    #[test]
    fn test_debug_redacts_password() {
        let info = CcInfo {
            password: "hunter2".into(),
            ..Default::default()
        };
        assert!(!format!("{:?}", info).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_scheme_less_endpoint_is_fetched_over_tls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let first_byte = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1];
            socket.read_exact(&mut buf).await.unwrap();
            buf[0]
        });

        let gateway = Gateway::cloud_controller(
            reqwest::Client::new(),
            Configuration::in_memory(),
            Arc::new(Logger::disabled()),
        )
        .with_retry_policy(RetryPolicy::none());

        let endpoint = normalize_endpoint(&addr.to_string());
        assert_eq!(endpoint, format!("https://{}", addr));
        assert!(fetch_info(&gateway, &endpoint).await.is_err());

        // 0x16 opens a TLS handshake record; plain HTTP would start with 'G'.
        assert_eq!(first_byte.await.unwrap(), 0x16);
    }

    #[tokio::test]
    async fn test_fetch_info() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/v2/info");
            then.status(200).json_body(json!({
                "name": "",
                "api_version": "2.100.0",
                "authorization_endpoint": "https://login.example.com",
                "token_endpoint": "https://uaa.example.com",
                "logging_endpoint": "wss://loggregator.example.com:443"
            }));
        });

        let gateway = Gateway::cloud_controller(
            reqwest::Client::new(),
            Configuration::in_memory(),
            Arc::new(Logger::disabled()),
        )
        .with_retry_policy(RetryPolicy::none());

        let info = fetch_info(&gateway, &server.base_url()).await.unwrap();
        mock.assert();
        assert_eq!(info.api_version, "2.100.0");
        assert_eq!(info.token_endpoint, "https://uaa.example.com");
        assert_eq!(
            info.loggregator_endpoint.as_deref(),
            Some("wss://loggregator.example.com:443")
        );
    }
}
