//! The generic diff-and-apply engine
//!
//! Every tier pushes its desired children through the same protocol: fetch
//! the actual object, create it when absent, otherwise carry over
//! runtime-owned fields, compare the remaining spec semantically, and only
//! write when something differs. The update is built from the live object so
//! the store's version token rides along and a concurrent writer surfaces as
//! a retryable conflict.

use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::store::ObjectStore;
use crate::Result;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec};
use k8s_openapi::api::core::v1::{Service, ServiceSpec};

use crate::crd::{
    App, AppSpec, Config, ConfigSpec, HTTPRoute, HTTPRouteSpec, Router, RouterSpec, Step, StepSpec,
    Version, VersionSpec,
};

/// What the apply pass did to the object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The object did not exist and was created
    Created,
    /// The object existed and its spec differed
    Updated,
    /// The object already matched its desired state; no write was issued
    Unchanged,
}

/// Result of an apply pass: the live object and what happened to it
#[derive(Clone, Debug)]
pub struct Applied<K> {
    /// The object as the store now holds it
    pub object: K,
    /// What the pass did
    pub outcome: Outcome,
}

/// A derived object the engine can diff and converge.
///
/// `carry_over` copies runtime-owned fields from the live object into the
/// desired one before comparison, so the engine never fights an autoscaler
/// over replicas or a rename over a selector.
pub trait Derived: Resource<DynamicType = ()> + Clone {
    /// The desired-state portion of the object
    type Spec: PartialEq + Clone;

    /// Desired-state view, when present
    fn spec(&self) -> Option<&Self::Spec>;

    /// Replace the desired-state portion
    fn set_spec(&mut self, spec: Self::Spec);

    /// Copy runtime-owned fields from the live object
    fn carry_over(&mut self, _live: &Self) {}
}

/// Converge one derived object with its desired state.
///
/// Idempotent: recomputing the same desired state against an already-applied
/// object issues zero writes. Unrelated labels on the live object survive an
/// update; keys asserted by the desired object (the lineage set) win.
pub async fn apply<K, S>(store: &S, mut desired: K) -> Result<Applied<K>>
where
    K: Derived + Serialize + DeserializeOwned + Send + Sync + 'static,
    S: ObjectStore<K> + ?Sized,
{
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();

    let Some(live) = store.get(&namespace, &name).await? else {
        let created = store.create(&desired).await?;
        debug!(kind = %K::kind(&()), %namespace, %name, "created");
        return Ok(Applied {
            object: created,
            outcome: Outcome::Created,
        });
    };

    desired.carry_over(&live);
    if desired.spec() == live.spec() {
        return Ok(Applied {
            object: live,
            outcome: Outcome::Unchanged,
        });
    }

    let mut out = live.clone();
    if let Some(spec) = desired.spec() {
        out.set_spec(spec.clone());
    }
    let labels = out.meta_mut().labels.get_or_insert_with(Default::default);
    if let Some(want) = &desired.meta().labels {
        for (k, v) in want {
            labels.insert(k.clone(), v.clone());
        }
    }

    let updated = store.update(&out).await?;
    debug!(kind = %K::kind(&()), %namespace, %name, "updated");
    Ok(Applied {
        object: updated,
        outcome: Outcome::Updated,
    })
}

/// Create the object only when absent; an existing object is left untouched.
///
/// Used for the immutable Config-to-Version edge: a Version, once stamped for
/// a generation, is never rewritten.
pub async fn create_if_absent<K, S>(store: &S, desired: K) -> Result<Applied<K>>
where
    K: Derived + Serialize + DeserializeOwned + Send + Sync + 'static,
    S: ObjectStore<K> + ?Sized,
{
    let namespace = desired.namespace().unwrap_or_default();
    let name = desired.name_any();

    if let Some(live) = store.get(&namespace, &name).await? {
        return Ok(Applied {
            object: live,
            outcome: Outcome::Unchanged,
        });
    }

    let created = store.create(&desired).await?;
    debug!(kind = %K::kind(&()), %namespace, %name, "created");
    Ok(Applied {
        object: created,
        outcome: Outcome::Created,
    })
}

// =============================================================================
// Derived implementations
// =============================================================================

macro_rules! derived_crd {
    ($kind:ty, $spec:ty) => {
        impl Derived for $kind {
            type Spec = $spec;

            fn spec(&self) -> Option<&Self::Spec> {
                Some(&self.spec)
            }

            fn set_spec(&mut self, spec: Self::Spec) {
                self.spec = spec;
            }
        }
    };
}

derived_crd!(App, AppSpec);
derived_crd!(Config, ConfigSpec);
derived_crd!(Version, VersionSpec);
derived_crd!(Router, RouterSpec);
derived_crd!(Step, StepSpec);
derived_crd!(HTTPRoute, HTTPRouteSpec);

impl Derived for Deployment {
    type Spec = DeploymentSpec;

    fn spec(&self) -> Option<&Self::Spec> {
        self.spec.as_ref()
    }

    fn set_spec(&mut self, spec: Self::Spec) {
        self.spec = Some(spec);
    }

    /// Replica count belongs to the autoscaler and the selector is immutable;
    /// both are taken from the live object.
    fn carry_over(&mut self, live: &Self) {
        if let (Some(desired), Some(live)) = (self.spec.as_mut(), live.spec.as_ref()) {
            desired.replicas = live.replicas;
            desired.selector = live.selector.clone();
        }
    }
}

impl Derived for Service {
    type Spec = ServiceSpec;

    fn spec(&self) -> Option<&Self::Spec> {
        self.spec.as_ref()
    }

    fn set_spec(&mut self, spec: Self::Spec) {
        self.spec = Some(spec);
    }

    /// The API server allocates addresses and IP families on create; carrying
    /// them over keeps repeated passes convergent and avoids rejected writes
    /// against immutable fields.
    fn carry_over(&mut self, live: &Self) {
        if let (Some(desired), Some(live)) = (self.spec.as_mut(), live.spec.as_ref()) {
            desired.cluster_ip = live.cluster_ip.clone();
            desired.cluster_ips = live.cluster_ips.clone();
            desired.ip_families = live.ip_families.clone();
            desired.ip_family_policy = live.ip_family_policy.clone();
            if desired.session_affinity.is_none() {
                desired.session_affinity = live.session_affinity.clone();
            }
            if desired.internal_traffic_policy.is_none() {
                desired.internal_traffic_policy = live.internal_traffic_policy.clone();
            }
        }
    }
}

impl Derived for HorizontalPodAutoscaler {
    type Spec = HorizontalPodAutoscalerSpec;

    fn spec(&self) -> Option<&Self::Spec> {
        self.spec.as_ref()
    }

    fn set_spec(&mut self, spec: Self::Spec) {
        self.spec = Some(spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use kube::api::ObjectMeta;

    fn make_router(name: &str) -> Router {
        Router {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                labels: Some(
                    [("core.strata.dev/app".to_string(), name.to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            spec: Default::default(),
            status: None,
        }
    }

    #[tokio::test]
    async fn absent_object_is_created() {
        let store = MemStore::new();
        let applied = apply(&store, make_router("captioner")).await.unwrap();
        assert_eq!(applied.outcome, Outcome::Created);
        assert!(applied.object.metadata.uid.is_some());
    }

    #[tokio::test]
    async fn identical_desired_state_issues_no_write() {
        let store = MemStore::new();
        apply(&store, make_router("captioner")).await.unwrap();
        let writes_after_create = store.writes();

        let applied = apply(&store, make_router("captioner")).await.unwrap();
        assert_eq!(applied.outcome, Outcome::Unchanged);
        assert_eq!(store.writes(), writes_after_create);
    }

    #[tokio::test]
    async fn changed_spec_is_updated_in_place() {
        let store = MemStore::new();
        apply(&store, make_router("captioner")).await.unwrap();

        let mut changed = make_router("captioner");
        changed.spec.route.hostnames = Some(vec!["captioner.example.com".to_string()]);
        let applied = apply(&store, changed).await.unwrap();
        assert_eq!(applied.outcome, Outcome::Updated);
        assert_eq!(
            applied.object.spec.route.hostnames.as_deref(),
            Some(&["captioner.example.com".to_string()][..])
        );
    }

    #[tokio::test]
    async fn unrelated_live_labels_survive_updates() {
        let store = MemStore::new();
        let applied = apply(&store, make_router("captioner")).await.unwrap();

        // someone annotates the live object out-of-band
        let mut live = applied.object;
        live.metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert("audit/owner".to_string(), "platform".to_string());
        store.update(&live).await.unwrap();

        let mut changed = make_router("captioner");
        changed.spec.route.hostnames = Some(vec!["captioner.example.com".to_string()]);
        let applied = apply(&store, changed).await.unwrap();

        let labels = applied.object.metadata.labels.unwrap();
        assert_eq!(labels.get("audit/owner").map(String::as_str), Some("platform"));
        // the lineage key is still asserted by the desired set
        assert_eq!(
            labels.get("core.strata.dev/app").map(String::as_str),
            Some("captioner")
        );
    }

    #[tokio::test]
    async fn deployment_replicas_and_selector_are_runtime_owned() {
        use k8s_openapi::api::apps::v1::DeploymentSpec;
        use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

        let store = MemStore::new();
        let make = |replicas: i32, image: &str| Deployment {
            metadata: ObjectMeta {
                name: Some("v1-deployment".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                selector: LabelSelector {
                    match_labels: Some(
                        [("app".to_string(), "v1".to_string())].into_iter().collect(),
                    ),
                    ..Default::default()
                },
                template: k8s_openapi::api::core::v1::PodTemplateSpec {
                    metadata: None,
                    spec: Some(k8s_openapi::api::core::v1::PodSpec {
                        containers: vec![k8s_openapi::api::core::v1::Container {
                            name: "main".to_string(),
                            image: Some(image.to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            status: None,
        };

        apply(&store, make(1, "serve:v1")).await.unwrap();

        // an autoscaler scaled the live object up
        let mut live: Deployment = store.get("default", "v1-deployment").await.unwrap().unwrap();
        live.spec.as_mut().unwrap().replicas = Some(7);
        store.update(&live).await.unwrap();
        let writes_before = store.writes();

        // re-deriving the same desired state must not fight the autoscaler
        let applied = apply(&store, make(1, "serve:v1")).await.unwrap();
        assert_eq!(applied.outcome, Outcome::Unchanged);
        assert_eq!(store.writes(), writes_before);

        // a real spec change updates but keeps the scaled replica count
        let applied = apply(&store, make(1, "serve:v2")).await.unwrap();
        assert_eq!(applied.outcome, Outcome::Updated);
        assert_eq!(applied.object.spec.as_ref().unwrap().replicas, Some(7));
    }

    #[tokio::test]
    async fn create_if_absent_never_rewrites() {
        let store = MemStore::new();
        let first = create_if_absent(&store, make_router("captioner")).await.unwrap();
        assert_eq!(first.outcome, Outcome::Created);

        let mut changed = make_router("captioner");
        changed.spec.route.hostnames = Some(vec!["changed.example.com".to_string()]);
        let second = create_if_absent(&store, changed).await.unwrap();
        assert_eq!(second.outcome, Outcome::Unchanged);
        assert!(second.object.spec.route.hostnames.is_none());
    }
}
