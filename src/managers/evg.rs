use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use super::require_api_endpoint;
use crate::api::{join_url, Gateway};
use crate::config::Configuration;
use crate::error::Result;
use crate::logger::Logger;

const EVG_PATH: &str = "/v2/config/environment_variable_groups";

/// Environment variables injected into every app of the platform
pub type EnvironmentVariables = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvgPhase {
    Running,
    Staging,
}

impl EvgPhase {
    fn name(self) -> &'static str {
        match self {
            EvgPhase::Running => "running",
            EvgPhase::Staging => "staging",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EvgManager {
    config: Configuration,
    gateway: Arc<Gateway>,
    log: Arc<Logger>,
}

impl EvgManager {
    pub fn new(config: &Configuration, gateway: &Arc<Gateway>, log: &Arc<Logger>) -> Result<Self> {
        require_api_endpoint(config)?;
        Ok(Self {
            config: config.clone(),
            gateway: gateway.clone(),
            log: log.clone(),
        })
    }

    fn path(phase: EvgPhase) -> String {
        format!("{}/{}", EVG_PATH, phase.name())
    }

    pub async fn get(&self, phase: EvgPhase) -> Result<EnvironmentVariables> {
        let url = join_url(&self.config.api_endpoint(), &Self::path(phase));
        self.gateway.get_resource(&url).await
    }

    /// Replace the whole group; variables missing from `vars` are removed.
    pub async fn set(&self, phase: EvgPhase, vars: &EnvironmentVariables) -> Result<EnvironmentVariables> {
        self.log.step(format!(
            "Setting {} environment variable group ({} variables)",
            phase.name(),
            vars.len()
        ));
        self.gateway
            .update_resource_with_response(&self.config.api_endpoint(), &Self::path(phase), vars)
            .await
    }
}
