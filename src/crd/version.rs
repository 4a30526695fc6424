//! Version Custom Resource Definition
//!
//! A Version is a concrete, immutable-once-created snapshot of a workload:
//! pod template, replica bounds, metrics, and scaling behavior. Exactly one
//! Version exists per Config generation, and each Version drives a
//! Deployment/Service/HorizontalPodAutoscaler triad named by suffixing the
//! Version name.

use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscalerBehavior, MetricSpec};
use k8s_openapi::api::core::v1::PodSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Condition;

/// The workload shape shared by Version and Step: an inline pod spec plus
/// replica bounds and autoscaling parameters.
///
/// The inline-pod-spec strategy is borrowed from core PodTemplate and
/// knative's Revision.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpec {
    /// Pod template for the workload's replicas
    #[serde(flatten)]
    pub pod: PodSpec,

    /// Lower autoscaling bound. Values below 1 (or absence) normalize to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    /// Upper autoscaling bound. A bound below the effective minimum is
    /// corrected to equal it, never rejected.
    #[serde(default)]
    pub max_replicas: i32,

    /// Metric sources driving the autoscaler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricSpec>>,

    /// Scaling behavior in both directions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,
}

/// Specification for a Version
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.strata.dev",
    version = "v1alpha1",
    kind = "Version",
    plural = "versions",
    namespaced,
    status = "VersionStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VersionSpec {
    /// Snapshotted workload definition
    #[serde(flatten)]
    pub workload: WorkloadSpec,
}

/// Status for a Version
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionStatus {
    /// Conditions representing the state of the derived triad
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
