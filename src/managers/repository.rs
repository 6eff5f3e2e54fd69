use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::api::{append_query, join_url, Gateway, Resource};
use crate::config::Configuration;
use crate::error::{Error, Result};

/// Typed access to one CC v2 collection, e.g. `/v2/stacks`.
pub struct Repository<T> {
    gateway: Arc<Gateway>,
    config: Configuration,
    path: &'static str,
    kind: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            config: self.config.clone(),
            path: self.path,
            kind: self.kind,
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T: DeserializeOwned> Repository<T> {
    pub fn new(
        gateway: Arc<Gateway>,
        config: Configuration,
        path: &'static str,
        kind: &'static str,
    ) -> Self {
        Self {
            gateway,
            config,
            path,
            kind,
            _entity: PhantomData,
        }
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub(crate) fn base_url(&self) -> String {
        self.config.api_endpoint()
    }

    fn item_path(&self, guid: &str) -> String {
        format!("{}/{}", self.path, guid)
    }

    pub async fn list(&self) -> Result<Vec<Resource<T>>> {
        self.list_at(self.path).await
    }

    /// List every resource under an arbitrary collection path, e.g.
    /// `/v2/organizations/<guid>/spaces`.
    pub async fn list_at(&self, path: &str) -> Result<Vec<Resource<T>>> {
        self.gateway
            .list_paginated_resources(&self.base_url(), path)
            .await
    }

    /// List with CC `q=` filters such as `name:dev`, all of which must match.
    pub async fn list_where(&self, filters: &[&str]) -> Result<Vec<Resource<T>>> {
        self.list_at(&filtered_path(self.path, filters)).await
    }

    pub async fn find_by(&self, field: &str, value: &str) -> Result<Option<Resource<T>>> {
        let filter = format!("{}:{}", field, value);
        Ok(self.list_where(&[filter.as_str()]).await?.into_iter().next())
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Resource<T>> {
        self.find_by("name", name)
            .await?
            .ok_or_else(|| Error::not_found(self.kind, name))
    }

    pub async fn get(&self, guid: &str) -> Result<Resource<T>> {
        let url = join_url(&self.base_url(), &self.item_path(guid));
        self.gateway.get_resource(&url).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> Result<Resource<T>> {
        self.gateway
            .create_resource(&self.base_url(), self.path, body)
            .await
    }

    pub async fn update<B: Serialize + ?Sized>(&self, guid: &str, body: &B) -> Result<Resource<T>> {
        self.gateway
            .update_resource_with_response(&self.base_url(), &self.item_path(guid), body)
            .await
    }

    pub async fn delete(&self, guid: &str) -> Result<()> {
        self.gateway
            .delete_resource(&self.base_url(), &self.item_path(guid))
            .await
    }

    /// Delete a resource together with everything it contains.
    pub async fn delete_recursive(&self, guid: &str) -> Result<()> {
        let path = append_query(&self.item_path(guid), "recursive=true");
        self.gateway.delete_resource(&self.base_url(), &path).await
    }

    /// PUT an association such as `/v2/routes/<route>/apps/<app>`.
    pub(crate) async fn associate(&self, path: &str) -> Result<()> {
        self.gateway
            .update_resource(&self.base_url(), path, &json!({}))
            .await
    }

    pub(crate) async fn dissociate(&self, path: &str) -> Result<()> {
        self.gateway.delete_resource(&self.base_url(), path).await
    }
}

/// Append one url-encoded `q=` parameter per filter.
pub(crate) fn filtered_path(path: &str, filters: &[&str]) -> String {
    filters.iter().fold(path.to_string(), |path, filter| {
        let encoded: String = url::form_urlencoded::byte_serialize(filter.as_bytes()).collect();
        append_query(&path, &format!("q={}", encoded))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_path_encodes_each_filter() {
        assert_eq!(
            filtered_path("/v2/routes", &["host:www", "domain_guid:d-1"]),
            "/v2/routes?q=host%3Awww&q=domain_guid%3Ad-1"
        );
        assert_eq!(filtered_path("/v2/stacks", &[]), "/v2/stacks");
    }

    #[test]
    fn test_filtered_path_keeps_existing_query() {
        assert_eq!(
            filtered_path("/v2/spaces?inline-relations-depth=0", &["name:dev"]),
            "/v2/spaces?inline-relations-depth=0&q=name%3Adev"
        );
    }
}
