//! Model runtime-template resolution
//!
//! A model reference is matched against the cluster's runtime registry:
//! an explicit runtime name matches exactly or not at all, otherwise the
//! first registry entry supporting the requested format wins. Callers sort
//! the registry listing by name first so the format scan is deterministic
//! even when the store's listing order is not.

use kube::ResourceExt;

use crate::crd::{ModelRuntime, ModelSpec};
use crate::{Error, Result};

/// Sort a registry listing into resolution order (by name)
pub fn sorted(mut runtimes: Vec<ModelRuntime>) -> Vec<ModelRuntime> {
    runtimes.sort_by_key(|rt| rt.name_any());
    runtimes
}

/// Find the runtime serving the given model reference.
///
/// An explicit runtime name always overrides format-based matching, even
/// when a format-compatible entry sorts earlier.
pub fn resolve<'a>(runtimes: &'a [ModelRuntime], model: &ModelSpec) -> Result<&'a ModelRuntime> {
    if let Some(name) = model.model_runtime.as_deref().filter(|n| !n.is_empty()) {
        return runtimes
            .iter()
            .find(|rt| rt.name_any() == name)
            .ok_or_else(|| Error::runtime_not_found(format!("runtime {name:?}")));
    }

    runtimes
        .iter()
        .find(|rt| {
            rt.spec
                .supported_model_formats
                .iter()
                .any(|format| *format == model.model_format)
        })
        .ok_or_else(|| Error::runtime_not_found(format!("format {:?}", model.model_format.0)))
}
