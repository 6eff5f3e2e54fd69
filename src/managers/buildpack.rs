use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildpackEntity {
    pub name: String,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub stack: Option<String>,
}

/// Mutable buildpack attributes; unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildpackSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

#[derive(Serialize)]
struct CreateBuildpack<'a> {
    name: &'a str,
    #[serde(flatten)]
    settings: &'a BuildpackSettings,
}

#[derive(Debug, Clone)]
pub struct BuildpackManager {
    repo: Repository<BuildpackEntity>,
    log: Arc<Logger>,
}

impl BuildpackManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(gateway.clone(), config.clone(), "/v2/buildpacks", "buildpack"),
            log: log.clone(),
        })
    }

    pub async fn list(&self) -> Result<Vec<Resource<BuildpackEntity>>> {
        self.repo.list().await
    }

    pub async fn find(&self, name: &str) -> Result<Resource<BuildpackEntity>> {
        self.repo.find_by_name(name).await
    }

    /// Register a buildpack record. The bits are uploaded separately.
    pub async fn create(
        &self,
        name: &str,
        settings: &BuildpackSettings,
    ) -> Result<Resource<BuildpackEntity>> {
        self.log.step(format!("Creating buildpack {}", name));
        self.repo.create(&CreateBuildpack { name, settings }).await
    }

    pub async fn update(
        &self,
        name: &str,
        settings: &BuildpackSettings,
    ) -> Result<Resource<BuildpackEntity>> {
        let buildpack = self.find(name).await?;
        self.log.step(format!("Updating buildpack {}", name));
        self.repo.update(buildpack.guid(), settings).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let buildpack = self.find(name).await?;
        self.log.step(format!("Deleting buildpack {}", name));
        self.repo.delete(buildpack.guid()).await
    }
}
