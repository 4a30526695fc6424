//! Custom Resource Definitions for the Strata tiers
//!
//! The core group (`core.strata.dev`) holds the derivation tiers: App,
//! Config, Version, Router, Pipeline, and Step. The AI group
//! (`ai.strata.dev`) holds InferenceService and the cluster-scoped
//! ModelRuntime registry. HTTPRoute types for the gateway API are vendored
//! in [`httproute`] so route synthesis does not drag in a full gateway
//! dependency.
//!
//! Lineage labels declared here are the sole durable index for cross-tier
//! lookups: every derived object carries the identity and UID of its
//! ancestors, and omitting one breaks lookup, not just display.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub mod app;
pub mod config;
pub mod httproute;
pub mod inference_service;
pub mod model;
pub mod model_runtime;
pub mod pipeline;
pub mod router;
pub mod step;
pub mod version;

pub use app::{App, AppSpec, AppStatus, AppTemplateSpec};
pub use config::{Config, ConfigSpec, ConfigStatus, VersionTemplateSpec};
pub use httproute::{
    HTTPBackendRef, HTTPPathMatch, HTTPPathModifier, HTTPRoute, HTTPRouteFilter, HTTPRouteMatch,
    HTTPRouteRule, HTTPRouteSpec, HTTPRouteStatus, HTTPUrlRewriteFilter, ParentReference,
};
pub use inference_service::{InferenceService, InferenceServiceSpec, InferenceServiceStatus};
pub use model::{ModelFormat, ModelSpec};
pub use model_runtime::{ModelRuntime, ModelRuntimeSpec, ModelRuntimeStatus};
pub use pipeline::{Pipeline, PipelineSpec, PipelineStatus, StepTemplateSpec};
pub use router::{Router, RouterSpec, RouterStatus};
pub use step::{Step, StepSpec, StepStatus};
pub use version::{Version, VersionSpec, VersionStatus, WorkloadSpec};

// =============================================================================
// Lineage label catalog
// =============================================================================

/// Label recording which App a derived object descends from
pub const APP_LABEL_KEY: &str = "core.strata.dev/app";
/// Label recording the UID of the ancestor App
pub const APP_UID_LABEL_KEY: &str = "core.strata.dev/appUID";
/// Label recording which Config a derived object descends from
pub const CONFIG_LABEL_KEY: &str = "core.strata.dev/config";
/// Label recording the UID of the ancestor Config
pub const CONFIG_UID_LABEL_KEY: &str = "core.strata.dev/configUID";
/// Label recording the Config generation a Version snapshots
pub const CONFIG_GENERATION_LABEL_KEY: &str = "core.strata.dev/configGeneration";
/// Label recording which Version a derived object descends from
pub const VERSION_LABEL_KEY: &str = "core.strata.dev/version";
/// Label recording the UID of the ancestor Version
pub const VERSION_UID_LABEL_KEY: &str = "core.strata.dev/versionUID";
/// Label recording which Router a derived object descends from
pub const ROUTER_LABEL_KEY: &str = "core.strata.dev/router";
/// Label recording the UID of the ancestor Router
pub const ROUTER_UID_LABEL_KEY: &str = "core.strata.dev/routerUID";
/// Label recording the Router generation a route was synthesized from
pub const ROUTER_GENERATION_LABEL_KEY: &str = "core.strata.dev/routerGeneration";
/// Label recording which Step a derived object descends from
pub const STEP_LABEL_KEY: &str = "core.strata.dev/step";
/// Label recording the UID of the ancestor Step
pub const STEP_UID_LABEL_KEY: &str = "core.strata.dev/stepUID";
/// Label recording which Pipeline a Step descends from
pub const PIPELINE_LABEL_KEY: &str = "core.strata.dev/pipeline";
/// Label recording the UID of the ancestor Pipeline
pub const PIPELINE_UID_LABEL_KEY: &str = "core.strata.dev/pipelineUID";
/// Label recording which InferenceService an App descends from
pub const INFERENCE_SERVICE_LABEL_KEY: &str = "ai.strata.dev/inferenceService";
/// Label recording the UID of the ancestor InferenceService
pub const INFERENCE_SERVICE_UID_LABEL_KEY: &str = "ai.strata.dev/inferenceServiceUID";
/// Annotation marking a Version as referenced by a Router
pub const ROUTER_ANNOTATION_KEY: &str = "core.strata.dev/router";
/// Plain `app` label asserted on workload pods for selector ergonomics
pub const K8S_APP_LABEL_KEY: &str = "app";

// =============================================================================
// Conditions
// =============================================================================

/// Status of a condition: True, False, or Unknown
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// The condition holds
    True,
    /// The condition does not hold
    False,
    /// The condition cannot be determined
    Unknown,
}

/// A condition surfaced on a tier's status
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g., Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition stamped with the current time
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// The well-known Ready condition type
    pub const READY: &'static str = "Ready";
}

/// Merge a condition into a condition list.
///
/// An existing condition of the same type keeps its transition timestamp when
/// status, reason, and message are unchanged, so repeated reconciliation of an
/// unchanged parent produces a bit-identical status and converges to zero
/// writes.
pub fn set_condition(conditions: &mut Vec<Condition>, cond: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == cond.type_) {
        Some(existing) => {
            if existing.status == cond.status
                && existing.reason == cond.reason
                && existing.message == cond.message
            {
                return;
            }
            *existing = cond;
        }
        None => conditions.push(cond),
    }
}
