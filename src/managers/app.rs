use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::DomainRepository;
use super::repository::filtered_path;
use super::route::RouteRepository;
use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::logger::Logger;

pub const STATE_STARTED: &str = "STARTED";
pub const STATE_STOPPED: &str = "STOPPED";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppEntity {
    pub name: String,
    pub space_guid: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub instances: u32,
    /// MB
    #[serde(default)]
    pub memory: u64,
    /// MB
    #[serde(default)]
    pub disk_quota: u64,
    #[serde(default)]
    pub buildpack: Option<String>,
    #[serde(default)]
    pub docker_image: Option<String>,
    #[serde(default)]
    pub stack_guid: Option<String>,
}

/// Attributes for creating an app; unset fields take platform defaults.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppRequest {
    pub name: String,
    pub space_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_guid: Option<String>,
}

#[derive(Serialize)]
struct AppState<'a> {
    state: &'a str,
}

#[derive(Serialize)]
struct AppScale {
    #[serde(skip_serializing_if = "Option::is_none")]
    instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppManager {
    repo: Repository<AppEntity>,
    domains: DomainRepository,
    routes: RouteRepository,
    log: Arc<Logger>,
}

impl AppManager {
    pub fn new(
        config: &Configuration,
        gateway: &Arc<Gateway>,
        domains: &DomainRepository,
        routes: &RouteRepository,
        log: &Arc<Logger>,
    ) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(gateway.clone(), config.clone(), "/v2/apps", "app"),
            domains: domains.clone(),
            routes: routes.clone(),
            log: log.clone(),
        })
    }

    fn space_apps_path(space_guid: &str) -> String {
        format!("/v2/spaces/{}/apps", space_guid)
    }

    pub async fn list(&self, space_guid: &str) -> Result<Vec<Resource<AppEntity>>> {
        self.repo.list_at(&Self::space_apps_path(space_guid)).await
    }

    pub async fn find(&self, space_guid: &str, name: &str) -> Result<Resource<AppEntity>> {
        let filter = format!("name:{}", name);
        let path = filtered_path(&Self::space_apps_path(space_guid), &[filter.as_str()]);
        self.repo
            .list_at(&path)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("app", name))
    }

    pub async fn create(&self, request: &AppRequest) -> Result<Resource<AppEntity>> {
        self.log.step(format!("Creating app {}", request.name));
        self.repo.create(request).await
    }

    pub async fn start(&self, app_guid: &str) -> Result<Resource<AppEntity>> {
        self.set_state(app_guid, STATE_STARTED).await
    }

    pub async fn stop(&self, app_guid: &str) -> Result<Resource<AppEntity>> {
        self.set_state(app_guid, STATE_STOPPED).await
    }

    async fn set_state(&self, app_guid: &str, state: &str) -> Result<Resource<AppEntity>> {
        self.log.step(format!("Setting app {} to {}", app_guid, state));
        self.repo.update(app_guid, &AppState { state }).await
    }

    pub async fn scale(
        &self,
        app_guid: &str,
        instances: Option<u32>,
        memory: Option<u64>,
    ) -> Result<Resource<AppEntity>> {
        self.log.step(format!(
            "Scaling app {} (instances={:?}, memory={:?})",
            app_guid, instances, memory
        ));
        self.repo
            .update(app_guid, &AppScale { instances, memory })
            .await
    }

    pub async fn delete(&self, app_guid: &str) -> Result<()> {
        self.log.step(format!("Deleting app {}", app_guid));
        self.repo.delete_recursive(app_guid).await
    }

    /// Bind `host.domain` to the app, creating the route in the app's space
    /// if it does not exist yet.
    pub async fn map_route(&self, app_guid: &str, host: &str, domain: &str) -> Result<()> {
        let app = self.repo.get(app_guid).await?;
        let domain = self.domains.find_by_name(domain).await?;

        let route = match self.routes.find(host, domain.guid()).await? {
            Some(route) => route,
            None => {
                self.log
                    .step(format!("Creating route {}.{}", host, domain.entity.name));
                self.routes
                    .create(host, domain.guid(), &app.entity.space_guid)
                    .await?
            }
        };

        self.log.step(format!(
            "Mapping route {}.{} to app {}",
            host, domain.entity.name, app.entity.name
        ));
        self.routes.bind_app(route.guid(), app_guid).await
    }

    /// Unbind `host.domain` from the app; the route itself is kept.
    pub async fn unmap_route(&self, app_guid: &str, host: &str, domain: &str) -> Result<()> {
        let domain_resource = self.domains.find_by_name(domain).await?;
        let route = self
            .routes
            .find(host, domain_resource.guid())
            .await?
            .ok_or_else(|| Error::not_found("route", format!("{}.{}", host, domain)))?;

        self.log
            .step(format!("Unmapping route {}.{} from app {}", host, domain, app_guid));
        self.routes.unbind_app(route.guid(), app_guid).await
    }
}
