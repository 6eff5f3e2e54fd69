use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainEntity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_organization_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_group_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal: Option<bool>,
}

impl DomainEntity {
    pub fn is_shared(&self) -> bool {
        self.owning_organization_guid.is_none()
    }
}

/// Shared and private domain collections, looked up together.
#[derive(Debug, Clone)]
pub struct DomainRepository {
    shared: Repository<DomainEntity>,
    private: Repository<DomainEntity>,
}

impl DomainRepository {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>) -> Self {
        Self {
            shared: Repository::new(
                gateway.clone(),
                config.clone(),
                "/v2/shared_domains",
                "shared domain",
            ),
            private: Repository::new(
                gateway.clone(),
                config.clone(),
                "/v2/private_domains",
                "private domain",
            ),
        }
    }

    pub fn shared(&self) -> &Repository<DomainEntity> {
        &self.shared
    }

    pub fn private(&self) -> &Repository<DomainEntity> {
        &self.private
    }

    /// Find a domain by name, shared domains first.
    pub async fn find_by_name(&self, name: &str) -> Result<Resource<DomainEntity>> {
        if let Some(domain) = self.shared.find_by("name", name).await? {
            return Ok(domain);
        }
        self.private
            .find_by("name", name)
            .await?
            .ok_or_else(|| Error::not_found("domain", name))
    }
}

#[derive(Debug, Clone)]
pub struct DomainManager {
    repo: DomainRepository,
    log: Arc<Logger>,
}

impl DomainManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: DomainRepository::new(config, gateway),
            log: log.clone(),
        })
    }

    pub fn repo(&self) -> &DomainRepository {
        &self.repo
    }

    pub async fn list_shared(&self) -> Result<Vec<Resource<DomainEntity>>> {
        self.repo.shared.list().await
    }

    pub async fn list_private(&self) -> Result<Vec<Resource<DomainEntity>>> {
        self.repo.private.list().await
    }

    pub async fn find(&self, name: &str) -> Result<Resource<DomainEntity>> {
        self.repo.find_by_name(name).await
    }

    pub async fn create_shared(
        &self,
        name: &str,
        router_group_guid: Option<&str>,
    ) -> Result<Resource<DomainEntity>> {
        self.log.step(format!("Creating shared domain {}", name));
        let body = DomainEntity {
            name: name.to_string(),
            router_group_guid: router_group_guid.map(str::to_string),
            ..Default::default()
        };
        self.repo.shared.create(&body).await
    }

    pub async fn create_private(&self, name: &str, org_guid: &str) -> Result<Resource<DomainEntity>> {
        self.log.step(format!("Creating private domain {}", name));
        let body = DomainEntity {
            name: name.to_string(),
            owning_organization_guid: Some(org_guid.to_string()),
            ..Default::default()
        };
        self.repo.private.create(&body).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let domain = self.repo.find_by_name(name).await?;
        self.log.step(format!("Deleting domain {}", name));
        if domain.entity.is_shared() {
            self.repo.shared.delete(domain.guid()).await
        } else {
            self.repo.private.delete(domain.guid()).await
        }
    }
}
