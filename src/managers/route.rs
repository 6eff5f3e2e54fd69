use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteEntity {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub path: String,
    pub domain_guid: String,
    pub space_guid: String,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Serialize)]
struct CreateRoute<'a> {
    host: &'a str,
    domain_guid: &'a str,
    space_guid: &'a str,
}

/// Route lookups and app bindings, shared with the app manager.
#[derive(Debug, Clone)]
pub struct RouteRepository {
    routes: Repository<RouteEntity>,
}

impl RouteRepository {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>) -> Self {
        Self {
            routes: Repository::new(gateway.clone(), config.clone(), "/v2/routes", "route"),
        }
    }

    pub async fn find(&self, host: &str, domain_guid: &str) -> Result<Option<Resource<RouteEntity>>> {
        let host = format!("host:{}", host);
        let domain = format!("domain_guid:{}", domain_guid);
        Ok(self
            .routes
            .list_where(&[host.as_str(), domain.as_str()])
            .await?
            .into_iter()
            .next())
    }

    pub async fn create(
        &self,
        host: &str,
        domain_guid: &str,
        space_guid: &str,
    ) -> Result<Resource<RouteEntity>> {
        self.routes
            .create(&CreateRoute {
                host,
                domain_guid,
                space_guid,
            })
            .await
    }

    pub async fn delete(&self, route_guid: &str) -> Result<()> {
        self.routes.delete(route_guid).await
    }

    fn app_path(&self, route_guid: &str, app_guid: &str) -> String {
        format!("{}/{}/apps/{}", self.routes.path(), route_guid, app_guid)
    }

    pub async fn bind_app(&self, route_guid: &str, app_guid: &str) -> Result<()> {
        self.routes
            .associate(&self.app_path(route_guid, app_guid))
            .await
    }

    pub async fn unbind_app(&self, route_guid: &str, app_guid: &str) -> Result<()> {
        self.routes
            .dissociate(&self.app_path(route_guid, app_guid))
            .await
    }

    pub(crate) async fn list_in_space(&self, space_guid: &str) -> Result<Vec<Resource<RouteEntity>>> {
        self.routes
            .list_at(&format!("/v2/spaces/{}/routes", space_guid))
            .await
    }
}

#[derive(Debug, Clone)]
pub struct RouteManager {
    repo: RouteRepository,
    log: Arc<Logger>,
}

impl RouteManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: RouteRepository::new(config, gateway),
            log: log.clone(),
        })
    }

    pub fn repo(&self) -> &RouteRepository {
        &self.repo
    }

    pub async fn list(&self, space_guid: &str) -> Result<Vec<Resource<RouteEntity>>> {
        self.repo.list_in_space(space_guid).await
    }

    pub async fn create(
        &self,
        host: &str,
        domain_guid: &str,
        space_guid: &str,
    ) -> Result<Resource<RouteEntity>> {
        self.log.step(format!("Creating route {}", host));
        self.repo.create(host, domain_guid, space_guid).await
    }

    pub async fn delete(&self, host: &str, domain_guid: &str) -> Result<()> {
        let route = self
            .repo
            .find(host, domain_guid)
            .await?
            .ok_or_else(|| Error::not_found("route", host))?;
        self.log.step(format!("Deleting route {}", host));
        self.repo.delete(route.guid()).await
    }
}
