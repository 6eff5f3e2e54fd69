use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{require_api_endpoint, require_uaa_endpoint};
use crate::api::{join_url, Gateway, Resource};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::random::new_random_string;

/// Length of passwords generated for users created without one
const GENERATED_PASSWORD_LEN: usize = 16;

const SCIM_PAGE_SIZE: usize = 100;

/// CC view of a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEntity {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub default_space_guid: Option<String>,
}

/// UAA (SCIM) view of a user
#[derive(Debug, Clone, Deserialize)]
pub struct UaaUser {
    pub id: String,
    #[serde(rename = "userName")]
    pub username: String,
    #[serde(default)]
    pub origin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScimList<T> {
    #[serde(default = "Vec::new")]
    resources: Vec<T>,
    #[serde(default)]
    total_results: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UaaGroup {
    id: String,
    display_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScimUserRequest<'a> {
    user_name: &'a str,
    password: &'a str,
    origin: &'a str,
    emails: [ScimEmail<'a>; 1],
    name: ScimName<'a>,
}

#[derive(Serialize)]
struct ScimEmail<'a> {
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScimName<'a> {
    given_name: &'a str,
    family_name: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgRole {
    User,
    Manager,
    BillingManager,
    Auditor,
}

impl OrgRole {
    fn path_segment(self) -> &'static str {
        match self {
            OrgRole::User => "users",
            OrgRole::Manager => "managers",
            OrgRole::BillingManager => "billing_managers",
            OrgRole::Auditor => "auditors",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceRole {
    Developer,
    Manager,
    Auditor,
}

impl SpaceRole {
    fn path_segment(self) -> &'static str {
        match self {
            SpaceRole::Developer => "developers",
            SpaceRole::Manager => "managers",
            SpaceRole::Auditor => "auditors",
        }
    }
}

/// Users across UAA and the Cloud Controller, plus UAA group membership.
pub struct UserManager {
    config: Configuration,
    uaa: Arc<Gateway>,
    cc: Arc<Gateway>,
    log: Arc<Logger>,
    client_token: RwLock<Option<String>>,
    // display name -> group id
    groups: RwLock<BTreeMap<String, String>>,
}

impl UserManager {
    pub fn new(
        config: &Configuration,
        uaa: &Arc<Gateway>,
        cc: &Arc<Gateway>,
        log: &Arc<Logger>,
    ) -> Result<Self> {
        require_api_endpoint(config)?;
        require_uaa_endpoint(config)?;
        Ok(Self {
            config: config.clone(),
            uaa: uaa.clone(),
            cc: cc.clone(),
            log: log.clone(),
            client_token: RwLock::new(None),
            groups: RwLock::new(BTreeMap::new()),
        })
    }

    /// Token used for group calls, which must not carry a user identity.
    pub fn set_client_token(&self, token: String) {
        *self.client_token.write() = Some(token);
    }

    fn require_client_token(&self) -> Result<String> {
        self.client_token.read().clone().ok_or_else(|| {
            Error::Authentication("no client token; a UAA client id is required".to_string())
        })
    }

    pub async fn find_user(&self, username: &str) -> Result<Option<UaaUser>> {
        let filter = format!("userName eq \"{}\"", username);
        let encoded: String = url::form_urlencoded::byte_serialize(filter.as_bytes()).collect();
        let url = join_url(
            &self.config.uaa_endpoint(),
            &format!("/Users?filter={}", encoded),
        );

        let users: ScimList<UaaUser> = self.uaa.get_resource(&url).await?;
        Ok(users.resources.into_iter().next())
    }

    /// Create the UAA user and its CC counterpart with the same guid.
    ///
    /// Without a password a random one is generated.
    pub async fn create_user(
        &self,
        username: &str,
        password: Option<&str>,
    ) -> Result<Resource<UserEntity>> {
        let generated;
        let password = match password {
            Some(password) => password,
            None => {
                generated = new_random_string(GENERATED_PASSWORD_LEN)?;
                generated.as_str()
            }
        };

        self.log.step(format!("Creating user {}", username));
        let request = ScimUserRequest {
            user_name: username,
            password,
            origin: "uaa",
            emails: [ScimEmail { value: username }],
            name: ScimName {
                given_name: username,
                family_name: username,
            },
        };
        let uaa_user: UaaUser = self
            .uaa
            .create_resource(&self.config.uaa_endpoint(), "/Users", &request)
            .await?;

        self.cc
            .create_resource(
                &self.config.api_endpoint(),
                "/v2/users",
                &json!({ "guid": uaa_user.id }),
            )
            .await
    }

    pub async fn delete_user(&self, username: &str) -> Result<()> {
        let user = self
            .find_user(username)
            .await?
            .ok_or_else(|| Error::not_found("user", username))?;

        self.log.step(format!("Deleting user {}", username));
        self.cc
            .delete_resource(&self.config.api_endpoint(), &format!("/v2/users/{}", user.id))
            .await?;
        self.uaa
            .delete_resource(&self.config.uaa_endpoint(), &format!("/Users/{}", user.id))
            .await
    }

    pub async fn set_org_role(&self, user_guid: &str, org_guid: &str, role: OrgRole) -> Result<()> {
        let path = format!(
            "/v2/organizations/{}/{}/{}",
            org_guid,
            role.path_segment(),
            user_guid
        );
        self.cc
            .update_resource(&self.config.api_endpoint(), &path, &json!({}))
            .await
    }

    pub async fn set_space_role(&self, user_guid: &str, space_guid: &str, role: SpaceRole) -> Result<()> {
        let path = format!(
            "/v2/spaces/{}/{}/{}",
            space_guid,
            role.path_segment(),
            user_guid
        );
        self.cc
            .update_resource(&self.config.api_endpoint(), &path, &json!({}))
            .await
    }

    /// Fetch every UAA group with the client token, replacing the loaded set.
    pub async fn load_groups(&self) -> Result<()> {
        let token = self.require_client_token()?;
        let uaa_endpoint = self.config.uaa_endpoint();

        let mut groups = BTreeMap::new();
        let mut start_index = 1;
        loop {
            let url = join_url(
                &uaa_endpoint,
                &format!("/Groups?startIndex={}&count={}", start_index, SCIM_PAGE_SIZE),
            );
            let page: ScimList<UaaGroup> = self.uaa.get_resource_with_token(&url, &token).await?;
            let fetched = page.resources.len();
            groups.extend(
                page.resources
                    .into_iter()
                    .map(|group| (group.display_name, group.id)),
            );

            if fetched == 0 || start_index - 1 + fetched >= page.total_results {
                break;
            }
            start_index += fetched;
        }

        debug!("Loaded {} UAA groups", groups.len());
        *self.groups.write() = groups;
        Ok(())
    }

    /// Group display names mapped to group ids, as of the last `load_groups`.
    pub fn groups(&self) -> BTreeMap<String, String> {
        self.groups.read().clone()
    }

    pub async fn add_user_to_group(&self, user_id: &str, group_name: &str) -> Result<()> {
        let token = self.require_client_token()?;
        let group_id = self
            .groups
            .read()
            .get(group_name)
            .cloned()
            .ok_or_else(|| Error::not_found("group", group_name))?;

        self.log
            .step(format!("Adding user {} to group {}", user_id, group_name));
        let url = join_url(
            &self.config.uaa_endpoint(),
            &format!("/Groups/{}/members", group_id),
        );
        let body = json!({ "origin": "uaa", "type": "USER", "value": user_id });
        let _: Value = self
            .uaa
            .create_resource_with_token(&url, &body, &token)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for UserManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserManager")
            .field("has_client_token", &self.client_token.read().is_some())
            .field("groups", &self.groups.read().len())
            .finish()
    }
}
