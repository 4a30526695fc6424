//! Kubernetes-backed object store

use std::fmt::Debug;

use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::core::NamespaceResourceScope;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{ObjectStore, RuntimeRegistry, Selector};
use crate::crd::ModelRuntime;
use crate::{Error, Result};

/// Object store backed by the Kubernetes API server.
///
/// One blanket implementation covers every namespaced kind the engine
/// touches; the API server's optimistic-concurrency check is surfaced as
/// [`Error::Conflict`] and lost create races as [`Error::AlreadyExists`].
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a store wrapping the given kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn is_status_reason(err: &kube::Error, code: u16, reason: &str) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == code && ae.reason == reason)
}

fn selector_string(selector: &Selector) -> String {
    selector
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl<K> ObjectStore<K> for KubeStore
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let api: Api<K> = self.api(namespace);
        match api.get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let api: Api<K> = self.api(&obj.namespace().unwrap_or_default());
        match api.create(&PostParams::default(), obj).await {
            Ok(created) => Ok(created),
            Err(e) if is_status_reason(&e, 409, "AlreadyExists") => Err(Error::AlreadyExists {
                kind: K::kind(&()).into_owned(),
                name: obj.name_any(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let api: Api<K> = self.api(&obj.namespace().unwrap_or_default());
        match api.replace(&obj.name_any(), &PostParams::default(), obj).await {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::Conflict {
                kind: K::kind(&()).into_owned(),
                name: obj.name_any(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let api: Api<K> = self.api(&obj.namespace().unwrap_or_default());
        let value = serde_json::to_value(obj).map_err(|e| Error::serialization(e.to_string()))?;
        let status = value.get("status").cloned().unwrap_or(serde_json::Value::Null);
        let patch = serde_json::json!({ "status": status });
        Ok(api
            .patch_status(
                &obj.name_any(),
                &PatchParams::apply(crate::FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?)
    }

    async fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<K>> {
        let api: Api<K> = self.api(namespace);
        let mut params = ListParams::default();
        if !selector.is_empty() {
            params = params.labels(&selector_string(selector));
        }
        Ok(api.list(&params).await?.items)
    }
}

#[async_trait]
impl RuntimeRegistry for KubeStore {
    async fn runtimes(&self) -> Result<Vec<ModelRuntime>> {
        let api: Api<ModelRuntime> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }
}
