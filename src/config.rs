//! Injectable engine configuration
//!
//! Every knob the derivation pipelines consult lives here so deployments can
//! override them per installation instead of patching module constants.

use std::collections::BTreeSet;

/// Configuration consulted by the derivation and apply pipelines
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Image of the init container that fetches model artifacts
    pub storage_initializer_image: String,
    /// Mount path the model artifact is fetched into
    pub model_mount_path: String,
    /// Name of the shared empty-dir volume backing the model mount
    pub model_volume_name: String,
    /// Reserved container name that receives the model volume mount
    pub primary_container_name: String,
    /// Gateway name used when a Router declares no parent reference
    pub default_gateway_name: String,
    /// Parent label keys withheld from derived objects
    ///
    /// Empty by default; reserved for hiding installation-internal labels.
    pub exclude_labels: BTreeSet<String>,
    /// Parent annotation keys withheld from derived objects
    pub exclude_annotations: BTreeSet<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_initializer_image: "kserve/storage-initializer:v0.10.1".to_string(),
            model_mount_path: crate::MODEL_MOUNT_PATH.to_string(),
            model_volume_name: "strata-model-mount".to_string(),
            primary_container_name: "strata-container".to_string(),
            default_gateway_name: crate::DEFAULT_GATEWAY_NAME.to_string(),
            exclude_labels: BTreeSet::new(),
            exclude_annotations: BTreeSet::new(),
        }
    }
}
