//! Router Custom Resource Definition
//!
//! A Router wraps route rules (hostnames, matches, filters, backends) and
//! drives exactly one HTTPRoute, resolved against the current Version of the
//! same App via lineage labels.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::httproute::HTTPRouteSpec;
use super::Condition;

/// Specification for a Router
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "core.strata.dev",
    version = "v1alpha1",
    kind = "Router",
    plural = "routers",
    namespaced,
    status = "RouterStatus",
    printcolumn = r#"{"name":"Current","type":"string","jsonPath":".status.currentVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RouterSpec {
    /// Route template; empty rules are filled in against the current Version
    #[serde(default)]
    pub route: HTTPRouteSpec,
}

/// Status for a Router
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouterStatus {
    /// Name of the Version the route currently targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,

    /// Conditions representing the Router's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
