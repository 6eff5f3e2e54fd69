//! Session bootstrap and the façade over every manager.
//!
//! [`Session::new`] discovers the platform, authenticates, binds token
//! refresh to both gateways, and builds the resource managers. Any failing
//! step aborts construction; a partially built session is never returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{build_http_client, FeatureFlag, FeatureFlagUpdate, Gateway, TokenRefresher};
use crate::auth::{AuthManager, Credentials, TokenState};
use crate::config::{Configuration, EnvSettings, NoopPersistor};
use crate::error::Result;
use crate::info::{fetch_info, normalize_endpoint, CcInfo};
use crate::logger::Logger;
use crate::managers::{
    AppManager, AsgManager, BuildpackManager, DomainManager, EvgManager, Managers, OrgManager,
    QuotaManager, RouteManager, ServiceManager, SpaceManager, StackManager, UserManager,
};

const FEATURE_FLAGS_PATH: &str = "/v2/config/feature_flags";

/// Connection parameters for [`Session::new`].
#[derive(Clone, Default)]
pub struct SessionOptions {
    pub endpoint: String,
    pub user: String,
    pub password: String,
    /// Client for the client-credentials grant; enables group loading
    pub uaa_client_id: Option<String>,
    pub uaa_client_secret: Option<String>,
    /// PEM-encoded CA certificate to trust in addition to the system roots
    pub ca_cert: Option<String>,
    pub skip_ssl_validation: bool,
}

impl SessionOptions {
    pub fn new(
        endpoint: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            user: user.into(),
            password: password.into(),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("uaa_client_id", &self.uaa_client_id)
            .field(
                "uaa_client_secret",
                &self.uaa_client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("has_ca_cert", &self.ca_cert.is_some())
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .finish()
    }
}

/// An authenticated connection to one platform endpoint.
pub struct Session {
    config: Configuration,
    info: CcInfo,
    log: Arc<Logger>,
    cc: Arc<Gateway>,
    uaa: Arc<Gateway>,
    auth: Arc<AuthManager>,
    managers: Managers,
}

impl Session {
    /// Bootstrap a session, reading `CF_DIAL_TIMEOUT`, `CF_DEBUG` and `CF_TRACE`.
    pub async fn new(options: &SessionOptions) -> Result<Self> {
        Self::with_settings(options, &EnvSettings::from_env()).await
    }

    /// Bootstrap a session with explicit environment settings.
    pub async fn with_settings(options: &SessionOptions, settings: &EnvSettings) -> Result<Self> {
        let endpoint = normalize_endpoint(&options.endpoint);

        let log = Arc::new(Logger::new(settings.debug, settings.trace.as_deref())?);
        let config = Configuration::from_persistor(Arc::new(NoopPersistor))?;
        config.set_ssl_disabled(options.skip_ssl_validation)?;

        let client = build_http_client(
            settings,
            options.skip_ssl_validation,
            options.ca_cert.as_deref(),
        )?;
        let cc = Arc::new(Gateway::cloud_controller(
            client.clone(),
            config.clone(),
            log.clone(),
        ));
        let uaa = Arc::new(Gateway::uaa(client, config.clone(), log.clone()));
        let auth = Arc::new(AuthManager::new(uaa.clone(), config.clone()));

        log.step(format!("Discovering platform at {}", endpoint));
        let info = fetch_info(&cc, &endpoint).await?;
        let mut info = CcInfo {
            api_endpoint: endpoint,
            user: options.user.clone(),
            password: options.password.clone(),
            skip_ssl_validation: options.skip_ssl_validation,
            ..info
        };
        info.apply_to(&config)?;
        info.ensure_loggregator_endpoint()?;
        debug!("Platform info: {:?}", info);

        log.step(format!("Authenticating as {}", options.user));
        auth.authenticate(&Credentials::new(
            options.user.clone(),
            options.password.clone(),
        ))
        .await?;

        let refresher: Arc<dyn TokenRefresher> = auth.clone();
        cc.set_token_refresher(&refresher);
        uaa.set_token_refresher(&refresher);
        cc.set_polling_enabled(false);

        let managers = Managers::build(&config, &cc, &uaa, &log)?;

        if let Some(client_id) = options.uaa_client_id.as_deref().filter(|id| !id.is_empty()) {
            let secret = options.uaa_client_secret.as_deref().unwrap_or_default();
            let token = auth.client_token(client_id, secret).await?;
            managers.user.set_client_token(token);
            managers.user.load_groups().await?;
        }

        info!(
            "Connected to {} (API version {})",
            info.api_endpoint, info.api_version
        );

        Ok(Self {
            config,
            info,
            log,
            cc,
            uaa,
            auth,
            managers,
        })
    }

    /// Discovery snapshot taken during bootstrap.
    pub fn info(&self) -> &CcInfo {
        &self.info
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.log
    }

    pub fn cc_gateway(&self) -> &Arc<Gateway> {
        &self.cc
    }

    pub fn uaa_gateway(&self) -> &Arc<Gateway> {
        &self.uaa
    }

    pub fn auth_manager(&self) -> &AuthManager {
        &self.auth
    }

    pub fn token_state(&self) -> TokenState {
        self.auth.state()
    }

    pub fn user_manager(&self) -> &UserManager {
        &self.managers.user
    }

    pub fn stack_manager(&self) -> &StackManager {
        &self.managers.stack
    }

    pub fn domain_manager(&self) -> &DomainManager {
        &self.managers.domain
    }

    pub fn asg_manager(&self) -> &AsgManager {
        &self.managers.asg
    }

    pub fn evg_manager(&self) -> &EvgManager {
        &self.managers.evg
    }

    pub fn quota_manager(&self) -> &QuotaManager {
        &self.managers.quota
    }

    pub fn org_manager(&self) -> &OrgManager {
        &self.managers.org
    }

    pub fn space_manager(&self) -> &SpaceManager {
        &self.managers.space
    }

    pub fn service_manager(&self) -> &ServiceManager {
        &self.managers.service
    }

    pub fn buildpack_manager(&self) -> &BuildpackManager {
        &self.managers.buildpack
    }

    pub fn route_manager(&self) -> &RouteManager {
        &self.managers.route
    }

    pub fn app_manager(&self) -> &AppManager {
        &self.managers.app
    }

    /// Read every feature flag. A name listed twice keeps its last value.
    pub async fn get_feature_flags(&self) -> Result<BTreeMap<String, bool>> {
        let url = format!("{}{}", self.config.api_endpoint(), FEATURE_FLAGS_PATH);
        let flags: Vec<FeatureFlag> = self.cc.get_resource(&url).await?;
        Ok(flags
            .into_iter()
            .map(|flag| (flag.name, flag.enabled))
            .collect())
    }

    /// Write flags in name order, stopping at the first failure.
    ///
    /// Flags written before the failure stay written.
    pub async fn set_feature_flags(&self, flags: &BTreeMap<String, bool>) -> Result<()> {
        let api_endpoint = self.config.api_endpoint();
        for (name, &enabled) in flags {
            self.log
                .step(format!("Setting feature flag {} to {}", name, enabled));
            self.cc
                .update_resource(
                    &api_endpoint,
                    &format!("{}/{}", FEATURE_FLAGS_PATH, name),
                    &FeatureFlagUpdate { enabled },
                )
                .await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("info", &self.info)
            .field("token_state", &self.token_state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use httpmock::prelude::*;
    use httpmock::Mock;
    use serde_json::json;

    fn mock_info<'a>(server: &'a MockServer) -> Mock<'a> {
        let base = server.base_url();
        server.mock(move |when, then| {
            when.method(GET).path("/v2/info");
            then.status(200).json_body(json!({
                "api_version": "2.150.0",
                "authorization_endpoint": base,
                "token_endpoint": base,
                "logging_endpoint": "wss://loggregator.example.com:443",
                "app_ssh_oauth_client": "ssh-proxy"
            }));
        })
    }

    fn mock_password_grant<'a>(server: &'a MockServer) -> Mock<'a> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .header("authorization", "Basic Y2Y6")
                .body_includes("grant_type=password");
            then.status(200).json_body(json!({
                "access_token": "user-1",
                "token_type": "bearer",
                "refresh_token": "refresh-1"
            }));
        })
    }

    fn options(server: &MockServer) -> SessionOptions {
        SessionOptions::new(server.base_url() + "/", "admin", "secret")
    }

    async fn connect(server: &MockServer) -> Session {
        mock_info(server);
        mock_password_grant(server);
        Session::with_settings(&options(server), &EnvSettings::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_populates_config() {
        let server = MockServer::start();
        let session = connect(&server).await;

        assert_eq!(session.info().api_endpoint, server.base_url());
        assert_eq!(session.info().api_version, "2.150.0");
        assert_eq!(session.info().user, "admin");
        assert_eq!(session.config().api_endpoint(), server.base_url());
        assert_eq!(session.config().uaa_endpoint(), server.base_url());
        assert_eq!(session.config().snapshot().ssh_oauth_client, "ssh-proxy");
        assert_eq!(session.config().access_token(), "bearer user-1");
        assert_eq!(session.token_state(), TokenState::Authenticated);
        assert!(!session.cc_gateway().polling_enabled());
    }

    #[tokio::test]
    async fn test_discovery_failure_is_returned_verbatim() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v2/info");
            then.status(200).body("<html>not an API</html>");
        });
        let token = mock_password_grant(&server);

        let err = Session::with_settings(&options(&server), &EnvSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode { .. }), "unexpected error: {err}");
        assert_eq!(token.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_logging_endpoint_without_domain_is_fatal() {
        let server = MockServer::start();
        let base = server.base_url();
        server.mock(move |when, then| {
            when.method(GET).path("/v2/info");
            then.status(200).json_body(json!({
                "api_version": "2.150.0",
                "authorization_endpoint": base,
                "token_endpoint": base
            }));
        });
        let token = mock_password_grant(&server);

        // `localhost` has no `host.domain` shape to derive a logging endpoint from.
        let options = SessionOptions::new(
            server.base_url().replace("127.0.0.1", "localhost"),
            "admin",
            "secret",
        );
        let err = Session::with_settings(&options, &EnvSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidEndpoint(_)), "unexpected error: {err}");
        assert_eq!(token.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_credentials_abort_before_managers() {
        let server = MockServer::start();
        mock_info(&server);
        server.mock(|when, then| {
            when.method(POST).path("/oauth/token");
            then.status(401).json_body(json!({
                "error": "unauthorized",
                "error_description": "Bad credentials"
            }));
        });
        let groups = server.mock(|when, then| {
            when.method(GET).path("/Groups");
            then.status(200).json_body(json!({"resources": [], "totalResults": 0}));
        });

        let mut options = options(&server);
        options.uaa_client_id = Some("admin".into());
        let err = Session::with_settings(&options, &EnvSettings::default())
            .await
            .unwrap_err();

        assert!(err.is_authentication(), "unexpected error: {err}");
        assert_eq!(groups.calls(), 0);
    }

    #[tokio::test]
    async fn test_client_id_loads_groups() {
        let server = MockServer::start();
        mock_info(&server);
        mock_password_grant(&server);
        server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_includes("grant_type=client_credentials");
            then.status(200)
                .json_body(json!({"access_token": "client-1", "token_type": "bearer"}));
        });
        let groups = server.mock(|when, then| {
            when.method(GET)
                .path("/Groups")
                .header("authorization", "bearer client-1");
            then.status(200).json_body(json!({
                "resources": [{"id": "g1", "displayName": "scim.write"}],
                "totalResults": 1
            }));
        });

        let mut options = options(&server);
        options.uaa_client_id = Some("admin".into());
        options.uaa_client_secret = Some("admin-secret".into());
        let session = Session::with_settings(&options, &EnvSettings::default())
            .await
            .unwrap();

        assert_eq!(groups.calls(), 1);
        assert!(session.user_manager().groups().contains_key("scim.write"));
        assert_eq!(session.config().access_token(), "bearer user-1");
    }

    #[tokio::test]
    async fn test_get_feature_flags() {
        let server = MockServer::start();
        let session = connect(&server).await;
        server.mock(|when, then| {
            when.method(GET).path("/v2/config/feature_flags");
            then.status(200).json_body(json!([
                {"name": "a", "enabled": true, "error_message": null, "url": "/v2/config/feature_flags/a"},
                {"name": "b", "enabled": false},
                {"name": "a", "enabled": false}
            ]));
        });

        let flags = session.get_feature_flags().await.unwrap();
        assert_eq!(flags.len(), 2);
        assert_eq!(flags.get("a"), Some(&false));
        assert_eq!(flags.get("b"), Some(&false));
    }

    #[tokio::test]
    async fn test_get_feature_flags_rejects_mistyped_record() {
        let server = MockServer::start();
        let session = connect(&server).await;
        server.mock(|when, then| {
            when.method(GET).path("/v2/config/feature_flags");
            then.status(200)
                .json_body(json!([{"name": "a", "enabled": "yes"}]));
        });

        let err = session.get_feature_flags().await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_set_feature_flag_sends_one_put() {
        let server = MockServer::start();
        let session = connect(&server).await;
        let put = server.mock(|when, then| {
            when.method(PUT)
                .path("/v2/config/feature_flags/x")
                .json_body(json!({"enabled": true}));
            then.status(200).json_body(json!({"name": "x", "enabled": true}));
        });

        let flags = BTreeMap::from([("x".to_string(), true)]);
        session.set_feature_flags(&flags).await.unwrap();
        assert_eq!(put.calls(), 1);
    }

    #[tokio::test]
    async fn test_set_feature_flags_stops_at_first_failure() {
        let server = MockServer::start();
        let session = connect(&server).await;
        let a = server.mock(|when, then| {
            when.method(PUT).path("/v2/config/feature_flags/a");
            then.status(200).json_body(json!({"name": "a", "enabled": true}));
        });
        let y = server.mock(|when, then| {
            when.method(PUT).path("/v2/config/feature_flags/y");
            then.status(404).json_body(json!({
                "code": 330000,
                "error_code": "CF-FeatureFlagNotFound",
                "description": "The feature flag could not be found: y"
            }));
        });
        let z = server.mock(|when, then| {
            when.method(PUT).path("/v2/config/feature_flags/z");
            then.status(200).json_body(json!({"name": "z", "enabled": false}));
        });

        let flags = BTreeMap::from([
            ("a".to_string(), true),
            ("y".to_string(), true),
            ("z".to_string(), false),
        ]);
        let err = session.set_feature_flags(&flags).await.unwrap_err();

        assert_eq!(err.http_status(), Some(404));
        assert_eq!(a.calls(), 1);
        assert_eq!(y.calls(), 1);
        assert_eq!(z.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_expiry_refreshes_once() {
        let server = MockServer::start();
        let session = connect(&server).await;

        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/oauth/token")
                .body_includes("grant_type=refresh_token")
                .body_includes("refresh_token=refresh-1");
            then.status(200).json_body(json!({
                "access_token": "user-2",
                "token_type": "bearer",
                "refresh_token": "refresh-2"
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/v2/config/feature_flags")
                .header("authorization", "bearer user-1");
            then.status(401).json_body(json!({
                "code": 1000,
                "error_code": "CF-InvalidAuthToken",
                "description": "Invalid Auth Token"
            }));
        });
        let fresh = server.mock(|when, then| {
            when.method(GET)
                .path("/v2/config/feature_flags")
                .header("authorization", "bearer user-2");
            then.status(200)
                .json_body(json!([{"name": "diego_docker", "enabled": true}]));
        });

        let (first, second) = tokio::join!(session.get_feature_flags(), session.get_feature_flags());

        assert_eq!(first.unwrap().get("diego_docker"), Some(&true));
        assert_eq!(second.unwrap().get("diego_docker"), Some(&true));
        assert_eq!(refresh.calls(), 1);
        assert_eq!(fresh.calls(), 2);
        assert_eq!(session.config().refresh_token(), "refresh-2");
        assert_eq!(session.token_state(), TokenState::Authenticated);
    }
}
