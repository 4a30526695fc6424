//! Workload spec merging and replica-bound normalization
//!
//! When a workload references a model, the matched runtime's containers
//! replace the workload's own wholesale; container-level overrides are not
//! supported, only the scalar scaling parameters overlay. The primary
//! serving container gets the model volume mounted, and an init container
//! fetches the artifact into the same mount before the pod starts.

use k8s_openapi::api::core::v1::{Container, EmptyDirVolumeSource, Volume, VolumeMount};

use crate::config::EngineConfig;
use crate::crd::{ModelRuntime, ModelSpec, WorkloadSpec};

/// Name of the init container that fetches the model artifact
pub const STORAGE_INITIALIZER_NAME: &str = "storage-initializer";

/// Normalize replica bounds.
///
/// The effective minimum is at least 1; an inverted maximum is corrected to
/// equal the minimum, never rejected.
pub fn replica_bounds(min: Option<i32>, max: i32) -> (i32, i32) {
    let effective_min = min.filter(|m| *m >= 1).unwrap_or(1);
    (effective_min, max.max(effective_min))
}

/// Build the init container that fetches the model artifact into the mount
/// path. Credential injection for the fetch happens separately, against the
/// returned container.
pub fn model_fetch_container(model: &ModelSpec, cfg: &EngineConfig) -> Container {
    Container {
        name: STORAGE_INITIALIZER_NAME.to_string(),
        image: Some(cfg.storage_initializer_image.clone()),
        args: Some(vec![model.uri.clone(), cfg.model_mount_path.clone()]),
        volume_mounts: Some(vec![VolumeMount {
            name: cfg.model_volume_name.clone(),
            mount_path: cfg.model_mount_path.clone(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// Merge a matched runtime into a workload spec.
///
/// Replaces the container list with the runtime's containers, mounts the
/// model volume into the primary container, adds the backing empty-dir
/// volume, and overlays runtime defaults onto scaling parameters the caller
/// left absent or zero. Explicit caller values always win.
pub fn merge_runtime(spec: &mut WorkloadSpec, runtime: &ModelRuntime, cfg: &EngineConfig) {
    spec.pod.containers = runtime.spec.containers.clone();
    for container in &mut spec.pod.containers {
        if container.name == cfg.primary_container_name {
            container
                .volume_mounts
                .get_or_insert_with(Vec::new)
                .push(VolumeMount {
                    name: cfg.model_volume_name.clone(),
                    mount_path: cfg.model_mount_path.clone(),
                    ..Default::default()
                });
        }
    }

    spec.pod.volumes.get_or_insert_with(Vec::new).push(Volume {
        name: cfg.model_volume_name.clone(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    });

    if spec.min_replicas.filter(|m| *m >= 1).is_none() {
        spec.min_replicas = runtime.spec.min_replicas;
    }
    if spec.max_replicas == 0 {
        spec.max_replicas = runtime.spec.max_replicas;
    }
    if spec.metrics.as_ref().map_or(true, |m| m.is_empty()) {
        spec.metrics = runtime.spec.metrics.clone();
    }
    if spec.behavior.is_none() {
        spec.behavior = runtime.spec.behavior.clone();
    }
}
