//! Config Custom Resource Definition
//!
//! A Config wraps a Version template. Every time its spec changes (every
//! generation) it snapshots the template into a new, immutable Version whose
//! name is derived from the Config name and generation unless the template
//! names one explicitly.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::version::VersionSpec;
use super::Condition;

/// Template for the Version a Config stamps out per generation.
///
/// Wrapper strategy borrowed from core PodTemplate and knative.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionTemplateSpec {
    /// Metadata carried onto the stamped Version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ObjectMeta>,

    /// Desired Version spec
    #[serde(default)]
    pub spec: VersionSpec,
}

/// Specification for a Config
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.strata.dev",
    version = "v1alpha1",
    kind = "Config",
    plural = "configs",
    namespaced,
    status = "ConfigStatus",
    printcolumn = r#"{"name":"Latest","type":"string","jsonPath":".status.latestCreatedVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSpec {
    /// Version template snapshotted once per Config generation
    #[serde(default)]
    pub template: VersionTemplateSpec,
}

/// Status for a Config
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    /// Name of the most recently created Version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_created_version: Option<String>,

    /// Conditions representing the Config's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
