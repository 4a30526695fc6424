//! Deployment, Service, and HorizontalPodAutoscaler synthesis

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
};
use k8s_openapi::api::core::v1::{PodTemplateSpec, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use super::WorkloadOwner;
use crate::config::EngineConfig;
use crate::merge::replica_bounds;
use crate::names;

/// Progress deadline applied to every derived Deployment
const PROGRESS_DEADLINE_SECONDS: i32 = 60;

/// Port synthesized when a workload declares none, so the Service is never
/// empty
const FALLBACK_SERVICE_PORT: i32 = 80;

fn child_meta<O: WorkloadOwner>(owner: &O, name: String, cfg: &EngineConfig) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: owner.namespace(),
        labels: Some(owner.lineage_labels(cfg)),
        annotations: Some(owner.propagated_annotations(cfg)),
        owner_references: WorkloadOwner::owner_ref(owner).map(|r| vec![r]),
        ..Default::default()
    }
}

/// Compile the rolling-update Deployment for a workload owner.
///
/// The initial replica count is the effective autoscaling minimum; the
/// autoscaler owns it from then on. Zero replicas may become unavailable
/// during a rollout.
pub fn compile_deployment<O: WorkloadOwner>(owner: &O, cfg: &EngineConfig) -> Deployment {
    let workload = owner.workload();
    let (min_replicas, _) = replica_bounds(workload.min_replicas, workload.max_replicas);

    Deployment {
        metadata: child_meta(owner, names::deployment_name(&owner.name_any()), cfg),
        spec: Some(DeploymentSpec {
            replicas: Some(min_replicas),
            selector: LabelSelector {
                match_labels: Some(owner.selector_labels()),
                ..Default::default()
            },
            progress_deadline_seconds: Some(PROGRESS_DEADLINE_SECONDS),
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_unavailable: Some(IntOrString::Int(0)),
                    ..Default::default()
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(owner.lineage_labels(cfg)),
                    annotations: Some(owner.propagated_annotations(cfg)),
                    ..Default::default()
                }),
                spec: Some(workload.pod.clone()),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Compile the cluster-internal Service for a workload owner.
///
/// Ports are the union of all declared container ports in declaration
/// order; a workload declaring none still gets one fallback port so the
/// Service is never empty.
pub fn compile_service<O: WorkloadOwner>(owner: &O, cfg: &EngineConfig) -> Service {
    let mut ports: Vec<ServicePort> = owner
        .workload()
        .pod
        .containers
        .iter()
        .flat_map(|c| c.ports.iter().flatten())
        .map(|p| ServicePort {
            port: p.container_port,
            target_port: Some(IntOrString::Int(p.container_port)),
            ..Default::default()
        })
        .collect();
    if ports.is_empty() {
        ports.push(ServicePort {
            port: FALLBACK_SERVICE_PORT,
            ..Default::default()
        });
    }

    Service {
        metadata: child_meta(owner, names::service_name(&owner.name_any()), cfg),
        spec: Some(ServiceSpec {
            selector: Some(owner.selector_labels()),
            ports: Some(ports),
            type_: Some("ClusterIP".to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

/// Compile the HorizontalPodAutoscaler for a workload owner.
///
/// Bounds are normalized, metrics are copied through (an empty list when
/// none were supplied anywhere in the chain), and the scale target links to
/// the Deployment by name.
pub fn compile_hpa<O: WorkloadOwner>(owner: &O, cfg: &EngineConfig) -> HorizontalPodAutoscaler {
    let workload = owner.workload();
    let (min_replicas, max_replicas) = replica_bounds(workload.min_replicas, workload.max_replicas);

    HorizontalPodAutoscaler {
        metadata: child_meta(owner, names::hpa_name(&owner.name_any()), cfg),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: names::deployment_name(&owner.name_any()),
            },
            min_replicas: Some(min_replicas),
            max_replicas,
            metrics: Some(workload.metrics.clone().unwrap_or_default()),
            behavior: Some(workload.behavior.clone().unwrap_or_default()),
        }),
        status: None,
    }
}
