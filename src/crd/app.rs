//! App Custom Resource Definition
//!
//! An App is the top-level desired-state envelope: a Config template (what
//! to run) and a Router template (how to reach it), combined inline. Created
//! by a user or materialized by an InferenceService; owns one Config and one
//! Router, both sharing the App's name.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::config::ConfigSpec;
use super::router::RouterSpec;
use super::Condition;

/// Specification for an App: the Config and Router specs flattened together
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.strata.dev",
    version = "v1alpha1",
    kind = "App",
    plural = "apps",
    namespaced,
    status = "AppStatus",
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    /// Workload side of the envelope
    #[serde(flatten)]
    pub config: ConfigSpec,

    /// Routing side of the envelope
    #[serde(flatten)]
    pub router: RouterSpec,
}

/// Status for an App
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    /// Conditions representing the App's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Template for the App an InferenceService materializes
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppTemplateSpec {
    /// Metadata carried onto the materialized App
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    /// Desired App spec
    #[serde(default)]
    pub spec: AppSpec,
}
