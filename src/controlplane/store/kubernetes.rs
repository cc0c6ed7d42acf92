//! Kubernetes-backed ResourceStore
//!
//! Every kind goes through `Api<DynamicObject>` so one code path serves both
//! namespaced and cluster-scoped kinds.

use crate::crd::StorageCluster;
use crate::domain::ports::{ManagedResource, ResourceStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject};
use kube::{Client, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Store adapter talking to the API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: ManagedResource>(&self, namespace: &str) -> Api<DynamicObject> {
        let resource = ApiResource::erase::<K>(&());
        if K::NAMESPACED {
            Api::namespaced_with(self.client.clone(), namespace, &resource)
        } else {
            Api::all_with(self.client.clone(), &resource)
        }
    }
}

fn to_dynamic<K: Serialize>(object: &K) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

fn from_dynamic<K: DeserializeOwned>(object: DynamicObject) -> Result<K> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

/// Translate API status codes into store errors
fn map_api_error<K: ManagedResource>(err: kube::Error, name: &str, on_conflict: Conflict) -> Error {
    let code = match &err {
        kube::Error::Api(response) => response.code,
        _ => return Error::Kube(err),
    };
    let kind = K::kind_name();
    let name = name.to_string();
    match (code, on_conflict) {
        (404, _) => Error::ResourceNotFound { kind, name },
        (409, Conflict::Exists) => Error::ResourceExists { kind, name },
        (409, Conflict::Stale) => Error::Conflict { kind, name },
        _ => Error::Kube(err),
    }
}

/// How a 409 is interpreted for the write being performed
#[derive(Clone, Copy)]
enum Conflict {
    Exists,
    Stale,
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let found = self.api::<K>(namespace).get_opt(name).await?;
        found.map(from_dynamic).transpose()
    }

    async fn list<K: ManagedResource>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>> {
        let params = ListParams::default().labels(label_selector);
        let list = self.api::<K>(namespace).list(&params).await?;
        list.items.into_iter().map(from_dynamic).collect()
    }

    async fn create<K: ManagedResource>(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.name_any();
        debug!(kind = %K::kind_name(), %namespace, %name, "Creating object");
        let created = self
            .api::<K>(namespace)
            .create(&PostParams::default(), &to_dynamic(object)?)
            .await
            .map_err(|e| map_api_error::<K>(e, &name, Conflict::Exists))?;
        from_dynamic(created)
    }

    async fn replace<K: ManagedResource>(&self, namespace: &str, object: &K) -> Result<K> {
        let name = object.name_any();
        debug!(kind = %K::kind_name(), %namespace, %name, "Replacing object");
        let replaced = self
            .api::<K>(namespace)
            .replace(&name, &PostParams::default(), &to_dynamic(object)?)
            .await
            .map_err(|e| map_api_error::<K>(e, &name, Conflict::Stale))?;
        from_dynamic(replaced)
    }

    async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<()> {
        debug!(kind = %K::kind_name(), %namespace, %name, "Deleting object");
        self.api::<K>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| map_api_error::<K>(e, name, Conflict::Stale))?;
        Ok(())
    }

    async fn update_status(&self, cluster: &StorageCluster) -> Result<StorageCluster> {
        let namespace = cluster.namespace_or_default();
        let name = cluster.name_any();
        let api: Api<StorageCluster> = Api::namespaced(self.client.clone(), &namespace);
        let patch = serde_json::json!({ "status": cluster.status });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| map_api_error::<StorageCluster>(e, &name, Conflict::Stale))
    }
}
