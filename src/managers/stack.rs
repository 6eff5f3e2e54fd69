use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackEntity {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct StackManager {
    repo: Repository<StackEntity>,
    log: Arc<Logger>,
}

impl StackManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            repo: Repository::new(gateway.clone(), config.clone(), "/v2/stacks", "stack"),
            log: log.clone(),
        })
    }

    pub async fn list(&self) -> Result<Vec<Resource<StackEntity>>> {
        self.repo.list().await
    }

    pub async fn find(&self, name: &str) -> Result<Resource<StackEntity>> {
        self.repo.find_by_name(name).await
    }

    pub async fn create(&self, name: &str, description: &str) -> Result<Resource<StackEntity>> {
        self.log.step(format!("Creating stack {}", name));
        let body = StackEntity {
            name: name.to_string(),
            description: description.to_string(),
        };
        self.repo.create(&body).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let stack = self.find(name).await?;
        self.log.step(format!("Deleting stack {}", name));
        self.repo.delete(stack.guid()).await
    }
}
