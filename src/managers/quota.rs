use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

/// Organization quota definition. Limits of `-1` mean unlimited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaEntity {
    pub name: String,
    pub non_basic_services_allowed: bool,
    pub total_services: i64,
    pub total_service_keys: i64,
    pub total_routes: i64,
    pub total_private_domains: i64,
    pub total_reserved_route_ports: i64,
    /// MB
    pub memory_limit: i64,
    /// MB, per instance
    pub instance_memory_limit: i64,
    pub app_instance_limit: i64,
    pub app_task_limit: i64,
}

impl Default for QuotaEntity {
    fn default() -> Self {
        Self {
            name: String::new(),
            non_basic_services_allowed: true,
            total_services: -1,
            total_service_keys: -1,
            total_routes: -1,
            total_private_domains: -1,
            total_reserved_route_ports: 0,
            memory_limit: 0,
            instance_memory_limit: -1,
            app_instance_limit: -1,
            app_task_limit: -1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuotaManager {
    repo: Repository<QuotaEntity>,
    log: Arc<Logger>,
}

impl QuotaManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(
                gateway.clone(),
                config.clone(),
                "/v2/quota_definitions",
                "quota",
            ),
            log: log.clone(),
        })
    }

    pub async fn list(&self) -> Result<Vec<Resource<QuotaEntity>>> {
        self.repo.list().await
    }

    pub async fn find(&self, name: &str) -> Result<Resource<QuotaEntity>> {
        self.repo.find_by_name(name).await
    }

    pub async fn create(&self, quota: &QuotaEntity) -> Result<Resource<QuotaEntity>> {
        self.log.step(format!("Creating quota {}", quota.name));
        self.repo.create(quota).await
    }

    /// Overwrite the quota named `name` with `quota` (which may rename it).
    pub async fn update(&self, name: &str, quota: &QuotaEntity) -> Result<Resource<QuotaEntity>> {
        let existing = self.find(name).await?;
        self.log.step(format!("Updating quota {}", name));
        self.repo.update(existing.guid(), quota).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let quota = self.find(name).await?;
        self.log.step(format!("Deleting quota {}", name));
        self.repo.delete(quota.guid()).await
    }
}
