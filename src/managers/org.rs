use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrgEntity {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub quota_definition_guid: Option<String>,
}

#[derive(Serialize)]
struct OrgRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quota_definition_guid: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct OrgManager {
    repo: Repository<OrgEntity>,
    log: Arc<Logger>,
}

impl OrgManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(
                gateway.clone(),
                config.clone(),
                "/v2/organizations",
                "organization",
            ),
            log: log.clone(),
        })
    }

    pub fn repo(&self) -> &Repository<OrgEntity> {
        &self.repo
    }

    pub async fn list(&self) -> Result<Vec<Resource<OrgEntity>>> {
        self.repo.list().await
    }

    pub async fn find(&self, name: &str) -> Result<Resource<OrgEntity>> {
        self.repo.find_by_name(name).await
    }

    pub async fn create(&self, name: &str, quota_guid: Option<&str>) -> Result<Resource<OrgEntity>> {
        self.log.step(format!("Creating org {}", name));
        self.repo
            .create(&OrgRequest {
                name: Some(name),
                quota_definition_guid: quota_guid,
            })
            .await
    }

    pub async fn set_quota(&self, name: &str, quota_guid: &str) -> Result<Resource<OrgEntity>> {
        let org = self.find(name).await?;
        self.log.step(format!("Setting quota of org {}", name));
        self.repo
            .update(
                org.guid(),
                &OrgRequest {
                    name: None,
                    quota_definition_guid: Some(quota_guid),
                },
            )
            .await
    }

    pub async fn rename(&self, name: &str, new_name: &str) -> Result<Resource<OrgEntity>> {
        let org = self.find(name).await?;
        self.log.step(format!("Renaming org {} to {}", name, new_name));
        self.repo
            .update(
                org.guid(),
                &OrgRequest {
                    name: Some(new_name),
                    quota_definition_guid: None,
                },
            )
            .await
    }

    /// Delete an org with all its spaces, apps, and routes.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let org = self.find(name).await?;
        self.log.step(format!("Deleting org {}", name));
        self.repo.delete_recursive(org.guid()).await
    }
}
