//! Deterministic child naming and lineage label propagation
//!
//! Every function here is pure: names and labels depend only on the parent's
//! identity and spec, never on wall-clock time or call order. Lineage labels
//! are the sole mechanism for cross-tier lookups (a Router finds its current
//! Version through them), so every maker asserts the full set for its tier.

use std::collections::{BTreeMap, BTreeSet};

use kube::ResourceExt;

use crate::config::EngineConfig;
use crate::crd::{
    self, App, Config, InferenceService, Pipeline, Router, Step, Version,
};
use crate::store::ObjectRef;

// =============================================================================
// Child names
// =============================================================================

/// Name of the Config derived from an App: the App's own name
pub fn config_name(app: &App) -> ObjectRef {
    ObjectRef::new(app.namespace().unwrap_or_default(), app.name_any())
}

/// Name of the Router derived from an App: the App's own name
pub fn router_name(app: &App) -> ObjectRef {
    ObjectRef::new(app.namespace().unwrap_or_default(), app.name_any())
}

/// Name of the App derived from an InferenceService: the service's own name
pub fn app_name(is: &InferenceService) -> ObjectRef {
    ObjectRef::new(is.namespace().unwrap_or_default(), is.name_any())
}

/// Name of the Version a Config stamps for its current generation.
///
/// An explicit template name wins; otherwise the name is derived from the
/// Config name and generation, which guarantees at most one Version per
/// generation value.
pub fn version_name(config: &Config) -> ObjectRef {
    let namespace = config.namespace().unwrap_or_default();
    if let Some(name) = config
        .spec
        .template
        .metadata
        .as_ref()
        .and_then(|m| m.name.clone())
        .filter(|n| !n.is_empty())
    {
        return ObjectRef::new(namespace, name);
    }

    let generation = config.metadata.generation.unwrap_or_default();
    ObjectRef::new(namespace, format!("{}-{:05}", config.name_any(), generation))
}

/// Name of the Deployment derived from a Version or Step
pub fn deployment_name(parent: &str) -> String {
    format!("{parent}-deployment")
}

/// Name of the Service derived from a Version or Step
pub fn service_name(parent: &str) -> String {
    format!("{parent}-service")
}

/// Name of the HorizontalPodAutoscaler derived from a Version or Step
pub fn hpa_name(parent: &str) -> String {
    format!("{parent}-hpa")
}

/// Name of the HTTPRoute derived from a Router
pub fn route_name(router: &Router) -> ObjectRef {
    ObjectRef::new(
        router.namespace().unwrap_or_default(),
        format!("{}-route", router.name_any()),
    )
}

/// Name of the Step at a given index of a Pipeline.
///
/// Step identity is positional: reordering the template list changes which
/// existing Step a template maps to.
pub fn step_name(pipeline: &Pipeline, index: usize) -> ObjectRef {
    ObjectRef::new(
        pipeline.namespace().unwrap_or_default(),
        format!("{}-step-{}", pipeline.name_any(), index),
    )
}

// =============================================================================
// Labels and annotations
// =============================================================================

fn filtered(
    map: &BTreeMap<String, String>,
    exclude: &BTreeSet<String>,
) -> BTreeMap<String, String> {
    map.iter()
        .filter(|(k, _)| !exclude.contains(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn union(
    mut base: BTreeMap<String, String>,
    asserted: impl IntoIterator<Item = (String, String)>,
) -> BTreeMap<String, String> {
    for (k, v) in asserted {
        base.insert(k, v);
    }
    base
}

/// Labels for the Config and Router derived from an App
pub fn app_labels(app: &App, cfg: &EngineConfig) -> BTreeMap<String, String> {
    union(
        filtered(app.labels(), &cfg.exclude_labels),
        [
            (crd::APP_LABEL_KEY.to_string(), app.name_any()),
            (
                crd::APP_UID_LABEL_KEY.to_string(),
                app.uid().unwrap_or_default(),
            ),
        ],
    )
}

/// Annotations for the Config and Router derived from an App
pub fn app_annotations(app: &App, cfg: &EngineConfig) -> BTreeMap<String, String> {
    filtered(app.annotations(), &cfg.exclude_annotations)
}

/// Lineage labels a Config asserts on the Version it stamps.
///
/// App lineage is copied from the Config's own labels; Config lineage
/// (name, UID, generation) is asserted fresh. Empty values are skipped so a
/// hand-made Config without App lineage still stamps valid Versions.
pub fn version_lineage_labels(config: &Config) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for key in [crd::APP_LABEL_KEY, crd::APP_UID_LABEL_KEY] {
        if let Some(value) = config.labels().get(key) {
            labels.insert(key.to_string(), value.clone());
        }
    }
    labels.insert(crd::CONFIG_LABEL_KEY.to_string(), config.name_any());
    if let Some(uid) = config.uid() {
        labels.insert(crd::CONFIG_UID_LABEL_KEY.to_string(), uid);
    }
    labels.insert(
        crd::CONFIG_GENERATION_LABEL_KEY.to_string(),
        config.metadata.generation.unwrap_or_default().to_string(),
    );
    labels
}

/// Labels for the Deployment/Service/Autoscaler triad derived from a Version.
///
/// The plain `app` label carries the Version name so pods remain selectable
/// with ordinary tooling.
pub fn version_labels(version: &Version, cfg: &EngineConfig) -> BTreeMap<String, String> {
    union(
        filtered(version.labels(), &cfg.exclude_labels),
        [
            (crd::VERSION_LABEL_KEY.to_string(), version.name_any()),
            (
                crd::VERSION_UID_LABEL_KEY.to_string(),
                version.uid().unwrap_or_default(),
            ),
            (crd::K8S_APP_LABEL_KEY.to_string(), version.name_any()),
        ],
    )
}

/// Annotations for the triad derived from a Version
pub fn version_annotations(version: &Version, cfg: &EngineConfig) -> BTreeMap<String, String> {
    filtered(version.annotations(), &cfg.exclude_annotations)
}

/// Labels for the triad derived from a Step
pub fn step_labels(step: &Step, cfg: &EngineConfig) -> BTreeMap<String, String> {
    union(
        filtered(step.labels(), &cfg.exclude_labels),
        [
            (crd::STEP_LABEL_KEY.to_string(), step.name_any()),
            (
                crd::STEP_UID_LABEL_KEY.to_string(),
                step.uid().unwrap_or_default(),
            ),
            (crd::K8S_APP_LABEL_KEY.to_string(), step.name_any()),
        ],
    )
}

/// Annotations for the triad derived from a Step
pub fn step_annotations(step: &Step, cfg: &EngineConfig) -> BTreeMap<String, String> {
    filtered(step.annotations(), &cfg.exclude_annotations)
}

/// Labels a Pipeline asserts on the Steps it stamps
pub fn pipeline_labels(pipeline: &Pipeline, cfg: &EngineConfig) -> BTreeMap<String, String> {
    union(
        filtered(pipeline.labels(), &cfg.exclude_labels),
        [
            (crd::PIPELINE_LABEL_KEY.to_string(), pipeline.name_any()),
            (
                crd::PIPELINE_UID_LABEL_KEY.to_string(),
                pipeline.uid().unwrap_or_default(),
            ),
        ],
    )
}

/// Labels an InferenceService asserts on the App it materializes
pub fn inference_service_labels(
    is: &InferenceService,
    cfg: &EngineConfig,
) -> BTreeMap<String, String> {
    union(
        filtered(is.labels(), &cfg.exclude_labels),
        [
            (
                crd::INFERENCE_SERVICE_LABEL_KEY.to_string(),
                is.name_any(),
            ),
            (
                crd::INFERENCE_SERVICE_UID_LABEL_KEY.to_string(),
                is.uid().unwrap_or_default(),
            ),
        ],
    )
}

/// Annotations an InferenceService asserts on the App it materializes
pub fn inference_service_annotations(
    is: &InferenceService,
    cfg: &EngineConfig,
) -> BTreeMap<String, String> {
    filtered(is.annotations(), &cfg.exclude_annotations)
}

/// Lineage labels a Router asserts on the HTTPRoute it drives.
///
/// App lineage is copied from the Router's own labels; Router lineage
/// (name, UID, generation) is asserted fresh.
pub fn route_labels(router: &Router) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for key in [crd::APP_LABEL_KEY, crd::APP_UID_LABEL_KEY] {
        if let Some(value) = router.labels().get(key) {
            labels.insert(key.to_string(), value.clone());
        }
    }
    labels.insert(crd::ROUTER_LABEL_KEY.to_string(), router.name_any());
    if let Some(uid) = router.uid() {
        labels.insert(crd::ROUTER_UID_LABEL_KEY.to_string(), uid);
    }
    labels.insert(
        crd::ROUTER_GENERATION_LABEL_KEY.to_string(),
        router.metadata.generation.unwrap_or_default().to_string(),
    );
    labels
}

/// Annotations propagated from a parent onto a stamped child, keeping the
/// router marker when present
pub fn propagated_annotations(
    parent_annotations: &BTreeMap<String, String>,
    child_annotations: &mut BTreeMap<String, String>,
) {
    if let Some(value) = parent_annotations.get(crd::ROUTER_ANNOTATION_KEY) {
        child_annotations.insert(crd::ROUTER_ANNOTATION_KEY.to_string(), value.clone());
    }
}
