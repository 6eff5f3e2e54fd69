use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{require_api_endpoint, Repository};
use crate::api::{Gateway, Resource};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceBrokerEntity {
    pub name: String,
    pub broker_url: String,
    #[serde(default)]
    pub auth_username: String,
    #[serde(default)]
    pub space_guid: Option<String>,
}

/// Registration details for a service broker
#[derive(Clone, Serialize)]
pub struct ServiceBrokerRequest {
    pub name: String,
    pub broker_url: String,
    pub auth_username: String,
    pub auth_password: String,
    /// Registers a space-scoped broker when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_guid: Option<String>,
}

impl std::fmt::Debug for ServiceBrokerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBrokerRequest")
            .field("name", &self.name)
            .field("broker_url", &self.broker_url)
            .field("auth_username", &self.auth_username)
            .field("auth_password", &"[REDACTED]")
            .field("space_guid", &self.space_guid)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ServiceManager {
    brokers: Repository<ServiceBrokerEntity>,
    log: Arc<Logger>,
}

impl ServiceManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            brokers: Repository::new(
                gateway.clone(),
                config.clone(),
                "/v2/service_brokers",
                "service broker",
            ),
            log: log.clone(),
        })
    }

    pub async fn list_brokers(&self) -> Result<Vec<Resource<ServiceBrokerEntity>>> {
        self.brokers.list().await
    }

    pub async fn find_broker(&self, name: &str) -> Result<Resource<ServiceBrokerEntity>> {
        self.brokers.find_by_name(name).await
    }

    pub async fn create_broker(
        &self,
        request: &ServiceBrokerRequest,
    ) -> Result<Resource<ServiceBrokerEntity>> {
        self.log
            .step(format!("Creating service broker {}", request.name));
        self.brokers.create(request).await
    }

    /// Update URL and credentials of the broker named `name`.
    pub async fn update_broker(
        &self,
        name: &str,
        request: &ServiceBrokerRequest,
    ) -> Result<Resource<ServiceBrokerEntity>> {
        let broker = self.find_broker(name).await?;
        self.log.step(format!("Updating service broker {}", name));
        self.brokers.update(broker.guid(), request).await
    }

    pub async fn delete_broker(&self, name: &str) -> Result<()> {
        let broker = self.find_broker(name).await?;
        self.log.step(format!("Deleting service broker {}", name));
        self.brokers.delete(broker.guid()).await
    }
}
