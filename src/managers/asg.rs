use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

const RUNNING_DEFAULTS: &str = "/v2/config/running_security_groups";
const STAGING_DEFAULTS: &str = "/v2/config/staging_security_groups";

/// One egress rule of an application security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    pub protocol: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityGroupEntity {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<SecurityGroupRule>,
    #[serde(default)]
    pub running_default: bool,
    #[serde(default)]
    pub staging_default: bool,
}

#[derive(Serialize)]
struct SecurityGroupRequest<'a> {
    name: &'a str,
    rules: &'a [SecurityGroupRule],
}

/// Which lifecycle phase a default security group applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPhase {
    Running,
    Staging,
}

impl DefaultPhase {
    fn path(self) -> &'static str {
        match self {
            DefaultPhase::Running => RUNNING_DEFAULTS,
            DefaultPhase::Staging => STAGING_DEFAULTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AsgManager {
    repo: Repository<SecurityGroupEntity>,
    log: Arc<Logger>,
}

impl AsgManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(
                gateway.clone(),
                config.clone(),
                "/v2/security_groups",
                "security group",
            ),
            log: log.clone(),
        })
    }

    pub async fn list(&self) -> Result<Vec<Resource<SecurityGroupEntity>>> {
        self.repo.list().await
    }

    pub async fn find(&self, name: &str) -> Result<Resource<SecurityGroupEntity>> {
        self.repo.find_by_name(name).await
    }

    pub async fn create(
        &self,
        name: &str,
        rules: &[SecurityGroupRule],
    ) -> Result<Resource<SecurityGroupEntity>> {
        self.log.step(format!("Creating security group {}", name));
        self.repo.create(&SecurityGroupRequest { name, rules }).await
    }

    /// Replace the rules of an existing group.
    pub async fn update_rules(
        &self,
        name: &str,
        rules: &[SecurityGroupRule],
    ) -> Result<Resource<SecurityGroupEntity>> {
        let group = self.find(name).await?;
        self.log.step(format!("Updating security group {}", name));
        self.repo
            .update(group.guid(), &SecurityGroupRequest { name, rules })
            .await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let group = self.find(name).await?;
        self.log.step(format!("Deleting security group {}", name));
        self.repo.delete(group.guid()).await
    }

    pub async fn list_defaults(&self, phase: DefaultPhase) -> Result<Vec<Resource<SecurityGroupEntity>>> {
        self.repo.list_at(phase.path()).await
    }

    pub async fn bind_default(&self, name: &str, phase: DefaultPhase) -> Result<()> {
        let group = self.find(name).await?;
        self.log
            .step(format!("Binding security group {} as {:?} default", name, phase));
        self.repo
            .associate(&format!("{}/{}", phase.path(), group.guid()))
            .await
    }

    pub async fn unbind_default(&self, name: &str, phase: DefaultPhase) -> Result<()> {
        let group = self.find(name).await?;
        self.log
            .step(format!("Unbinding security group {} as {:?} default", name, phase));
        self.repo
            .dissociate(&format!("{}/{}", phase.path(), group.guid()))
            .await
    }

    pub async fn bind_to_space(&self, name: &str, space_guid: &str) -> Result<()> {
        let group = self.find(name).await?;
        self.repo
            .associate(&format!(
                "{}/{}/spaces/{}",
                self.repo.path(),
                group.guid(),
                space_guid
            ))
            .await
    }

    pub async fn unbind_from_space(&self, name: &str, space_guid: &str) -> Result<()> {
        let group = self.find(name).await?;
        self.repo
            .dissociate(&format!(
                "{}/{}/spaces/{}",
                self.repo.path(),
                group.guid(),
                space_guid
            ))
            .await
    }
}
