//! Resource managers: thin, uncached CRUD façades over the gateways.
//!
//! [`Managers::build`] is the construction plan. Each constructor probes the
//! configuration it needs, and the route and domain repositories are handed
//! to the app manager explicitly.

mod app;
mod asg;
mod buildpack;
mod domain;
mod evg;
mod org;
mod quota;
mod repository;
mod route;
mod service;
mod space;
mod stack;
mod user;


use std::sync::Arc;

pub use app::{AppEntity, AppManager, AppRequest, STATE_STARTED, STATE_STOPPED};
pub use asg::{AsgManager, DefaultPhase, SecurityGroupEntity, SecurityGroupRule};
pub use buildpack::{BuildpackEntity, BuildpackManager, BuildpackSettings};
pub use domain::{DomainEntity, DomainManager, DomainRepository};
pub use evg::{EnvironmentVariables, EvgManager, EvgPhase};
pub use org::{OrgEntity, OrgManager};
pub use quota::{QuotaEntity, QuotaManager};
pub use repository::Repository;
pub use route::{RouteEntity, RouteManager, RouteRepository};
pub use service::{ServiceBrokerEntity, ServiceBrokerRequest, ServiceManager};
pub use space::{SpaceEntity, SpaceManager};
pub use stack::{StackEntity, StackManager};
pub use user::{OrgRole, SpaceRole, UaaUser, UserEntity, UserManager};

use crate::api::Gateway;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::logger::Logger;

fn require_api_endpoint(config: &Configuration) -> Result<()> {
    if config.api_endpoint().is_empty() {
        return Err(Error::Configuration("API endpoint is not set".to_string()));
    }
    Ok(())
}

fn require_uaa_endpoint(config: &Configuration) -> Result<()> {
    if config.uaa_endpoint().is_empty() {
        return Err(Error::Configuration("UAA endpoint is not set".to_string()));
    }
    Ok(())
}

/// One of every resource manager.
#[derive(Debug)]
pub struct Managers {
    pub user: UserManager,
    pub stack: StackManager,
    pub domain: DomainManager,
    pub asg: AsgManager,
    pub evg: EvgManager,
    pub quota: QuotaManager,
    pub org: OrgManager,
    pub space: SpaceManager,
    pub service: ServiceManager,
    pub buildpack: BuildpackManager,
    pub route: RouteManager,
    pub app: AppManager,
}

impl Managers {
    /// Build every manager in dependency order, stopping at the first failure.
    pub fn build(
        config: &Configuration,
        cc: &Arc<Gateway>,
        uaa: &Arc<Gateway>,
        log: &Arc<Logger>,
    ) -> Result<Self> {
        let user = UserManager::new(config, uaa, cc, log).map_err(|e| Error::manager("user", e))?;
        let stack = StackManager::new(config, cc, log).map_err(|e| Error::manager("stack", e))?;
        let domain = DomainManager::new(config, cc, log).map_err(|e| Error::manager("domain", e))?;
        let asg = AsgManager::new(config, cc, log).map_err(|e| Error::manager("asg", e))?;
        let evg = EvgManager::new(config, cc, log).map_err(|e| Error::manager("evg", e))?;
        let quota = QuotaManager::new(config, cc, log).map_err(|e| Error::manager("quota", e))?;
        let org = OrgManager::new(config, cc, log).map_err(|e| Error::manager("org", e))?;
        let space = SpaceManager::new(config, cc, log).map_err(|e| Error::manager("space", e))?;
        let service =
            ServiceManager::new(config, cc, log).map_err(|e| Error::manager("service", e))?;
        let buildpack =
            BuildpackManager::new(config, cc, log).map_err(|e| Error::manager("buildpack", e))?;
        let route = RouteManager::new(config, cc, log).map_err(|e| Error::manager("route", e))?;
        let app = AppManager::new(config, cc, domain.repo(), route.repo(), log)
            .map_err(|e| Error::manager("app", e))?;

        log.step("Resource managers initialized");

        Ok(Self {
            user,
            stack,
            domain,
            asg,
            evg,
            quota,
            org,
            space,
            service,
            buildpack,
            route,
            app,
        })
    }
}
