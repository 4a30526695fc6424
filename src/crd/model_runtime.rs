//! ModelRuntime Custom Resource Definition
//!
//! A cluster-scoped registry entry declaring which model formats a serving
//! stack supports, the containers that run it, and its default scaling
//! parameters. Read-only from the engine's perspective.

use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscalerBehavior, MetricSpec};
use k8s_openapi::api::core::v1::Container;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::model::ModelFormat;

/// Specification for a ModelRuntime
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ai.strata.dev",
    version = "v1alpha1",
    kind = "ModelRuntime",
    plural = "modelruntimes",
    status = "ModelRuntimeStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ModelRuntimeSpec {
    /// Model formats this runtime can serve
    pub supported_model_formats: Vec<ModelFormat>,

    /// Containers that replace a workload's own when this runtime is merged
    pub containers: Vec<Container>,

    /// Default lower autoscaling bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    /// Default upper autoscaling bound
    #[serde(default)]
    pub max_replicas: i32,

    /// Default metric sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Vec<MetricSpec>>,

    /// Default scaling behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,
}

/// Status for a ModelRuntime
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelRuntimeStatus {}
