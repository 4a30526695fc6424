//! Object store abstraction
//!
//! The engine never talks to an API server directly; every read and write
//! goes through [`ObjectStore`], and the runtime registry is read through
//! [`RuntimeRegistry`]. Production uses [`KubeStore`]; tests and local
//! tooling use [`MemStore`], which reproduces the store semantics the engine
//! depends on (optimistic concurrency, create races, generation bumps).

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::crd::{
    App, Config, HTTPRoute, InferenceService, ModelRuntime, Pipeline, Router, Step, Version,
};
use crate::Result;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Secret, Service, ServiceAccount};

mod kube_store;
mod mem;

pub use kube_store::KubeStore;
pub use mem::MemStore;

/// Identity of a namespaced object
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Namespace the object lives in
    pub namespace: String,
    /// Name of the object
    pub name: String,
}

impl ObjectRef {
    /// Create an identity from namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Label selector: every listed key must match exactly
pub type Selector = BTreeMap<String, String>;

/// Typed access to one kind in the backing object store.
///
/// Absence is not an error: `get` returns `None` on the first reconcile of a
/// parent, which triggers a create. Writes carry the store's opaque version
/// token; a lost create race surfaces as `AlreadyExists` and a lost update
/// race as `Conflict`.
#[async_trait]
pub trait ObjectStore<K>: Send + Sync {
    /// Fetch an object by identity, `None` when absent
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>>;

    /// Create an object, failing with `AlreadyExists` if a concurrent
    /// creator won the race
    async fn create(&self, obj: &K) -> Result<K>;

    /// Update an object, failing with `Conflict` on a version-token mismatch
    async fn update(&self, obj: &K) -> Result<K>;

    /// Update only the status of an object
    async fn update_status(&self, obj: &K) -> Result<K>;

    /// List objects in a namespace whose labels match the selector
    async fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<K>>;
}

/// Read-only access to the cluster-scoped model runtime registry
#[async_trait]
pub trait RuntimeRegistry: Send + Sync {
    /// List every registered model runtime
    async fn runtimes(&self) -> Result<Vec<ModelRuntime>>;
}

/// The full store surface the tier cascade needs.
///
/// Blanket-implemented for any store covering every kind the engine reads or
/// writes, so `KubeStore` and `MemStore` both qualify without further code.
pub trait CoreStore:
    ObjectStore<App>
    + ObjectStore<Config>
    + ObjectStore<Version>
    + ObjectStore<Router>
    + ObjectStore<Pipeline>
    + ObjectStore<Step>
    + ObjectStore<InferenceService>
    + ObjectStore<Deployment>
    + ObjectStore<Service>
    + ObjectStore<HorizontalPodAutoscaler>
    + ObjectStore<HTTPRoute>
    + ObjectStore<ServiceAccount>
    + ObjectStore<Secret>
    + RuntimeRegistry
{
}

impl<T> CoreStore for T where
    T: ObjectStore<App>
        + ObjectStore<Config>
        + ObjectStore<Version>
        + ObjectStore<Router>
        + ObjectStore<Pipeline>
        + ObjectStore<Step>
        + ObjectStore<InferenceService>
        + ObjectStore<Deployment>
        + ObjectStore<Service>
        + ObjectStore<HorizontalPodAutoscaler>
        + ObjectStore<HTTPRoute>
        + ObjectStore<ServiceAccount>
        + ObjectStore<Secret>
        + RuntimeRegistry
{
}
