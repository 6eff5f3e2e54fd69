use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Certificate, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::debug;

use super::http::{send_with_retry, RetryPolicy};
use super::types::{ApiError, JobEntity, PaginatedResources, Resource};
use crate::config::{Configuration, EnvSettings};
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::random::new_uuid;

/// Default request timeout in seconds
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default client version (from Cargo.toml)
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

const REQUEST_ID_HEADER: &str = "X-Vcap-Request-Id";
pub(super) const JSON_CONTENT_TYPE: &str = "application/json";

const JOB_POLL_INTERVAL: Duration = Duration::from_secs(5);
const JOB_TIMEOUT: Duration = Duration::from_secs(300);

/// Capability to obtain a new access token after a 401.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Return a fresh `Authorization` value.
    ///
    /// `rejected` is the value the platform just refused. Implementations
    /// that have already replaced it may return the current one directly.
    async fn refresh_auth_token(&self, rejected: &str) -> Result<String>;
}

/// Which API a gateway talks to; decides how error bodies are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    CloudController,
    Uaa,
}

#[derive(Clone, Copy)]
enum Credential<'a> {
    /// Current session token, refreshed on 401
    Session,
    /// Caller-supplied token, never refreshed
    Token(&'a str),
}

/// Build the HTTP client shared by both gateways of a session.
pub fn build_http_client(
    settings: &EnvSettings,
    skip_ssl_validation: bool,
    ca_cert: Option<&str>,
) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .danger_accept_invalid_certs(skip_ssl_validation);

    if let Some(timeout) = settings.dial_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if let Some(pem) = ca_cert.filter(|pem| !pem.trim().is_empty()) {
        let cert = Certificate::from_pem(pem.as_bytes())
            .map_err(|e| Error::Configuration(format!("invalid CA certificate: {}", e)))?;
        builder = builder.add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Authenticated REST client for one platform API.
pub struct Gateway {
    kind: GatewayKind,
    pub(super) client: Client,
    config: Configuration,
    pub(super) log: Arc<Logger>,
    pub(super) retry: RetryPolicy,
    pub(super) user_agent: String,
    // Held weakly: the session owns the auth manager, which holds this gateway.
    refresher: RwLock<Option<Weak<dyn TokenRefresher>>>,
    polling_enabled: AtomicBool,
    job_poll_interval: Duration,
}

impl Gateway {
    pub fn new(kind: GatewayKind, client: Client, config: Configuration, log: Arc<Logger>) -> Self {
        Self {
            kind,
            client,
            config,
            log,
            retry: RetryPolicy::default(),
            user_agent: format!("cfsession/{}", DEFAULT_VERSION),
            refresher: RwLock::new(None),
            polling_enabled: AtomicBool::new(true),
            job_poll_interval: JOB_POLL_INTERVAL,
        }
    }

    pub fn cloud_controller(client: Client, config: Configuration, log: Arc<Logger>) -> Self {
        Self::new(GatewayKind::CloudController, client, config, log)
    }

    pub fn uaa(client: Client, config: Configuration, log: Arc<Logger>) -> Self {
        Self::new(GatewayKind::Uaa, client, config, log)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_job_poll_interval(mut self, interval: Duration) -> Self {
        self.job_poll_interval = interval;
        self
    }

    pub fn kind(&self) -> GatewayKind {
        self.kind
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Route every future 401 through `refresher`.
    pub fn set_token_refresher(&self, refresher: &Arc<dyn TokenRefresher>) {
        *self.refresher.write() = Some(Arc::downgrade(refresher));
    }

    fn token_refresher(&self) -> Option<Arc<dyn TokenRefresher>> {
        self.refresher.read().as_ref().and_then(Weak::upgrade)
    }

    /// Whether deletes run as asynchronous jobs that are polled to completion.
    pub fn set_polling_enabled(&self, enabled: bool) {
        self.polling_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn polling_enabled(&self) -> bool {
        self.polling_enabled.load(Ordering::Relaxed)
    }

    // ========== Resource operations ==========

    pub async fn get_resource<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let (_, body) = self.request(Method::GET, url, None, Credential::Session).await?;
        decode(url, &body)
    }

    /// GET with an explicit token (e.g. a client-credentials token).
    pub async fn get_resource_with_token<T: DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
    ) -> Result<T> {
        let (_, body) = self
            .request(Method::GET, url, None, Credential::Token(token))
            .await?;
        decode(url, &body)
    }

    /// Fetch every page of a CC v2 collection, following `next_url`.
    pub async fn list_paginated_resources<T: DeserializeOwned>(
        &self,
        base_url: &str,
        path: &str,
    ) -> Result<Vec<Resource<T>>> {
        let mut resources = Vec::new();
        let mut next = Some(path.to_string());

        while let Some(path) = next {
            let url = join_url(base_url, &path);
            let page: PaginatedResources<T> = self.get_resource(&url).await?;
            debug!(
                "Fetched {} of {} resources from {}",
                page.resources.len(),
                page.total_results,
                url
            );
            resources.extend(page.resources);
            next = page.next_url.filter(|next| !next.is_empty());
        }

        Ok(resources)
    }

    pub async fn create_resource<B, R>(&self, base_url: &str, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = join_url(base_url, path);
        let body = encode(body)?;
        let (_, response) = self
            .request(Method::POST, &url, Some(&body), Credential::Session)
            .await?;
        decode(&url, &response)
    }

    pub async fn create_resource_with_token<B, R>(&self, url: &str, body: &B, token: &str) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = encode(body)?;
        let (_, response) = self
            .request(Method::POST, url, Some(&body), Credential::Token(token))
            .await?;
        decode(url, &response)
    }

    /// PUT `body` to `base_url + path`, discarding the response body.
    pub async fn update_resource<B>(&self, base_url: &str, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let url = join_url(base_url, path);
        let body = encode(body)?;
        self.request(Method::PUT, &url, Some(&body), Credential::Session)
            .await?;
        Ok(())
    }

    pub async fn update_resource_with_response<B, R>(
        &self,
        base_url: &str,
        path: &str,
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = join_url(base_url, path);
        let body = encode(body)?;
        let (_, response) = self
            .request(Method::PUT, &url, Some(&body), Credential::Session)
            .await?;
        decode(&url, &response)
    }

    /// DELETE `base_url + path`. CC deletes run as polled jobs unless polling is off.
    pub async fn delete_resource(&self, base_url: &str, path: &str) -> Result<()> {
        let polling = self.kind == GatewayKind::CloudController && self.polling_enabled();
        let url = join_url(base_url, path);
        let url = if polling {
            append_query(&url, "async=true")
        } else {
            url
        };

        let (status, body) = self
            .request(Method::DELETE, &url, None, Credential::Session)
            .await?;

        if polling && status == StatusCode::ACCEPTED.as_u16() {
            let job: Resource<JobEntity> = decode(&url, &body)?;
            self.wait_for_job(base_url, job).await?;
        }
        Ok(())
    }

    async fn wait_for_job(&self, base_url: &str, mut job: Resource<JobEntity>) -> Result<()> {
        let deadline = Instant::now() + JOB_TIMEOUT;

        loop {
            match job.entity.status.as_str() {
                "finished" => return Ok(()),
                "failed" => {
                    let reason = job
                        .entity
                        .error_details
                        .as_ref()
                        .map(|d| d.description.clone())
                        .or_else(|| job.entity.error.clone())
                        .unwrap_or_else(|| format!("job {} failed", job.guid()));
                    return Err(Error::JobFailed(reason));
                }
                status => debug!("Job {} is {}", job.guid(), status),
            }

            if Instant::now() >= deadline {
                return Err(Error::JobFailed(format!(
                    "job {} did not finish within {:?}",
                    job.guid(),
                    JOB_TIMEOUT
                )));
            }

            sleep(self.job_poll_interval).await;
            let url = join_url(base_url, &job.metadata.url);
            job = self.get_resource(&url).await?;
        }
    }

    // ========== Request pipeline ==========

    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        credential: Credential<'_>,
    ) -> Result<(u16, String)> {
        let token = match credential {
            Credential::Session => self.config.access_token(),
            Credential::Token(token) => token.to_string(),
        };
        let body = body.map(|body| (JSON_CONTENT_TYPE, body));

        let response = self.dispatch(&method, url, body, &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED && matches!(credential, Credential::Session) {
            if let Some(refresher) = self.token_refresher() {
                let _ = response.bytes().await;
                debug!("{} {} was rejected with 401; refreshing token", method, url);

                let token = refresher.refresh_auth_token(&token).await?;
                let response = self.dispatch(&method, url, body, &token).await?;
                return self.finish(url, response).await;
            }
        }

        self.finish(url, response).await
    }

    pub(super) async fn dispatch(
        &self,
        method: &Method,
        url: &str,
        body: Option<(&'static str, &[u8])>,
        authorization: &str,
    ) -> Result<reqwest::Response> {
        let request_id = new_uuid()?;
        self.log
            .trace_request(method.as_str(), url, body.map(|(_, bytes)| bytes));

        let response = send_with_retry(self.retry, method, || {
            let mut request = self
                .client
                .request(method.clone(), url)
                .header(ACCEPT, JSON_CONTENT_TYPE)
                .header(USER_AGENT, &self.user_agent)
                .header(REQUEST_ID_HEADER, &request_id);

            if !authorization.is_empty() {
                request = request.header(AUTHORIZATION, authorization);
            }

            if let Some((content_type, bytes)) = body {
                request = request.header(CONTENT_TYPE, content_type).body(bytes.to_vec());
            }

            request
        })
        .await?;

        Ok(response)
    }

    /// Read the body; map non-2xx statuses to [`ApiError`].
    pub(super) async fn finish(&self, url: &str, response: reqwest::Response) -> Result<(u16, String)> {
        let status = response.status();
        let body = response.text().await?;
        self.log.trace_response(url, status.as_u16(), &body);

        if !status.is_success() {
            return Err(Error::Api(self.api_error(status.as_u16(), &body)));
        }
        Ok((status.as_u16(), body))
    }

    fn api_error(&self, status: u16, body: &str) -> ApiError {
        match self.kind {
            GatewayKind::CloudController => ApiError::from_cc_response(status, body),
            GatewayKind::Uaa => ApiError::from_uaa_response(status, body),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("kind", &self.kind)
            .field("polling_enabled", &self.polling_enabled())
            .finish()
    }
}

pub(super) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| Error::Decode {
        url: url.to_string(),
        source,
    })
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(Error::Encode)
}

/// Join a base URL and an absolute or relative path with exactly one slash.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn append_query(url: &str, query: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}
