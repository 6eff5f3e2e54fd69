use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::repository::filtered_path;
use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceEntity {
    pub name: String,
    pub organization_guid: String,
    #[serde(default)]
    pub allow_ssh: bool,
    #[serde(default)]
    pub space_quota_definition_guid: Option<String>,
}

#[derive(Serialize)]
struct CreateSpace<'a> {
    name: &'a str,
    organization_guid: &'a str,
}

#[derive(Serialize)]
struct AllowSsh {
    allow_ssh: bool,
}

#[derive(Debug, Clone)]
pub struct SpaceManager {
    repo: Repository<SpaceEntity>,
    log: Arc<Logger>,
}

impl SpaceManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(gateway.clone(), config.clone(), "/v2/spaces", "space"),
            log: log.clone(),
        })
    }

    fn org_spaces_path(org_guid: &str) -> String {
        format!("/v2/organizations/{}/spaces", org_guid)
    }

    /// Spaces belonging to one organization.
    pub async fn list(&self, org_guid: &str) -> Result<Vec<Resource<SpaceEntity>>> {
        self.repo.list_at(&Self::org_spaces_path(org_guid)).await
    }

    /// Space names are only unique within their organization.
    pub async fn find(&self, org_guid: &str, name: &str) -> Result<Resource<SpaceEntity>> {
        let filter = format!("name:{}", name);
        let path = filtered_path(&Self::org_spaces_path(org_guid), &[filter.as_str()]);
        self.repo
            .list_at(&path)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("space", name))
    }

    pub async fn create(&self, org_guid: &str, name: &str) -> Result<Resource<SpaceEntity>> {
        self.log.step(format!("Creating space {}", name));
        self.repo
            .create(&CreateSpace {
                name,
                organization_guid: org_guid,
            })
            .await
    }

    pub async fn set_allow_ssh(
        &self,
        org_guid: &str,
        name: &str,
        allow: bool,
    ) -> Result<Resource<SpaceEntity>> {
        let space = self.find(org_guid, name).await?;
        self.log.step(format!(
            "{} SSH for space {}",
            if allow { "Enabling" } else { "Disabling" },
            name
        ));
        self.repo
            .update(space.guid(), &AllowSsh { allow_ssh: allow })
            .await
    }

    pub async fn delete(&self, org_guid: &str, name: &str) -> Result<()> {
        let space = self.find(org_guid, name).await?;
        self.log.step(format!("Deleting space {}", name));
        self.repo.delete_recursive(space.guid()).await
    }
}
