//! In-memory session configuration.
//!
//! A [`Configuration`] is created once per session and handed to every
//! gateway and manager. It holds endpoint URLs discovered during bootstrap
//! and the current token pair, which the auth manager rewrites on refresh.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Dial timeout override, in seconds
pub const DIAL_TIMEOUT_ENV: &str = "CF_DIAL_TIMEOUT";

/// Enables verbose session logging
pub const DEBUG_ENV: &str = "CF_DEBUG";

/// `true` to trace requests to stderr, or a file path to append traces to
pub const TRACE_ENV: &str = "CF_TRACE";

/// OAuth client the CLI family authenticates as
pub const DEFAULT_UAA_OAUTH_CLIENT: &str = "cf";

/// Persisted configuration fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigData {
    #[serde(rename = "Target")]
    pub api_endpoint: String,
    pub api_version: String,
    pub authorization_endpoint: String,
    pub uaa_endpoint: String,
    pub doppler_endpoint: String,
    pub routing_api_endpoint: String,
    #[serde(rename = "SSHOAuthClient")]
    pub ssh_oauth_client: String,
    #[serde(rename = "MinCLIVersion")]
    pub min_cli_version: String,
    #[serde(rename = "MinRecommendedCLIVersion")]
    pub min_recommended_cli_version: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(rename = "UAAOAuthClient")]
    pub uaa_oauth_client: String,
    #[serde(rename = "UAAOAuthClientSecret")]
    pub uaa_oauth_client_secret: String,
    #[serde(rename = "SSLDisabled")]
    pub ssl_disabled: bool,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            api_version: String::new(),
            authorization_endpoint: String::new(),
            uaa_endpoint: String::new(),
            doppler_endpoint: String::new(),
            routing_api_endpoint: String::new(),
            ssh_oauth_client: String::new(),
            min_cli_version: String::new(),
            min_recommended_cli_version: String::new(),
            access_token: String::new(),
            refresh_token: String::new(),
            uaa_oauth_client: DEFAULT_UAA_OAUTH_CLIENT.to_string(),
            uaa_oauth_client_secret: String::new(),
            ssl_disabled: false,
        }
    }
}

/// Storage backend for [`ConfigData`].
pub trait Persistor: Send + Sync {
    fn delete(&self);
    fn exists(&self) -> bool;
    fn load(&self) -> Result<Option<ConfigData>>;
    fn save(&self, data: &ConfigData) -> Result<()>;
}

/// Persistor that never touches disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistor;

impl Persistor for NoopPersistor {
    fn delete(&self) {}

    fn exists(&self) -> bool {
        false
    }

    fn load(&self) -> Result<Option<ConfigData>> {
        Ok(None)
    }

    fn save(&self, _data: &ConfigData) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to the session configuration.
#[derive(Clone)]
pub struct Configuration {
    data: Arc<RwLock<ConfigData>>,
    persistor: Arc<dyn Persistor>,
}

impl Configuration {
    /// Create a configuration backed by `persistor`, loading any stored data.
    pub fn from_persistor(persistor: Arc<dyn Persistor>) -> Result<Self> {
        let data = if persistor.exists() {
            persistor.load()?.unwrap_or_default()
        } else {
            ConfigData::default()
        };

        Ok(Self {
            data: Arc::new(RwLock::new(data)),
            persistor,
        })
    }

    /// In-memory configuration that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            data: Arc::new(RwLock::new(ConfigData::default())),
            persistor: Arc::new(NoopPersistor),
        }
    }

    /// Apply a mutation and persist the result.
    pub fn update(&self, mutate: impl FnOnce(&mut ConfigData)) -> Result<()> {
        let snapshot = {
            let mut data = self.data.write();
            mutate(&mut data);
            data.clone()
        };
        self.persistor.save(&snapshot)
    }

    /// Copy of the current configuration.
    pub fn snapshot(&self) -> ConfigData {
        self.data.read().clone()
    }

    pub fn api_endpoint(&self) -> String {
        self.data.read().api_endpoint.clone()
    }

    pub fn api_version(&self) -> String {
        self.data.read().api_version.clone()
    }

    pub fn authorization_endpoint(&self) -> String {
        self.data.read().authorization_endpoint.clone()
    }

    pub fn uaa_endpoint(&self) -> String {
        self.data.read().uaa_endpoint.clone()
    }

    pub fn access_token(&self) -> String {
        self.data.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> String {
        self.data.read().refresh_token.clone()
    }

    /// OAuth client id and secret used for user grants.
    pub fn uaa_oauth_client(&self) -> (String, String) {
        let data = self.data.read();
        (
            data.uaa_oauth_client.clone(),
            data.uaa_oauth_client_secret.clone(),
        )
    }

    pub fn is_ssl_disabled(&self) -> bool {
        self.data.read().ssl_disabled
    }

    pub fn set_ssl_disabled(&self, disabled: bool) -> Result<()> {
        self.update(|data| data.ssl_disabled = disabled)
    }

    pub fn set_tokens(&self, access_token: String, refresh_token: String) -> Result<()> {
        self.update(|data| {
            data.access_token = access_token;
            data.refresh_token = refresh_token;
        })
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("Configuration")
            .field("api_endpoint", &data.api_endpoint)
            .field("api_version", &data.api_version)
            .field("uaa_endpoint", &data.uaa_endpoint)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Settings read from the environment once, at gateway construction.
#[derive(Debug, Clone, Default)]
pub struct EnvSettings {
    pub dial_timeout: Option<Duration>,
    pub debug: bool,
    pub trace: Option<String>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        let dial_timeout = std::env::var(DIAL_TIMEOUT_ENV)
            .ok()
            .and_then(|raw| parse_dial_timeout(&raw));
        let debug_enabled = std::env::var(DEBUG_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        let trace = std::env::var(TRACE_ENV).ok().filter(|v| !v.is_empty());

        debug!(
            "Environment settings: dial_timeout={:?}, debug={}, trace={:?}",
            dial_timeout, debug_enabled, trace
        );

        Self {
            dial_timeout,
            debug: debug_enabled,
            trace,
        }
    }
}

fn parse_dial_timeout(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!("Ignoring invalid {} value: {:?}", DIAL_TIMEOUT_ENV, raw);
            None
        }
    }
}

/// `1`, `t`, `true`, `yes`, `on` (any case)
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "t" | "true" | "yes" | "on"
    )
}
