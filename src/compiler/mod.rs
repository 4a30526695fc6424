//! Pure synthesizers for derived objects
//!
//! Given a parent and its merged workload spec, these functions produce the
//! full desired specification of each derived kind. They perform no I/O:
//! the same parent state always compiles to bit-identical output, which is
//! what lets the apply engine short-circuit to zero writes.
//!
//! Version and Step both own a Deployment/Service/Autoscaler triad; the
//! [`WorkloadOwner`] view lets one compiler serve both tiers.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::config::EngineConfig;
use crate::crd::{self, Step, Version, WorkloadSpec};
use crate::names;

pub mod route;
pub mod workload;

pub use route::compile_route;
pub use workload::{compile_deployment, compile_hpa, compile_service};

/// A tier that owns a Deployment/Service/Autoscaler triad
pub trait WorkloadOwner: Resource<DynamicType = ()> + Sized {
    /// The workload definition the triad is compiled from
    fn workload(&self) -> &WorkloadSpec;

    /// Labels asserted on every member of the triad
    fn lineage_labels(&self, cfg: &EngineConfig) -> BTreeMap<String, String>;

    /// Annotations propagated onto every member of the triad
    fn propagated_annotations(&self, cfg: &EngineConfig) -> BTreeMap<String, String>;

    /// Selector labels keyed on this owner's UID.
    ///
    /// Selectors never key on names so a recreated parent with the same name
    /// cannot capture another owner's pods.
    fn selector_labels(&self) -> BTreeMap<String, String>;

    /// Controller owner reference for the triad
    fn owner_ref(&self) -> Option<OwnerReference> {
        self.controller_owner_ref(&())
    }
}

impl WorkloadOwner for Version {
    fn workload(&self) -> &WorkloadSpec {
        &self.spec.workload
    }

    fn lineage_labels(&self, cfg: &EngineConfig) -> BTreeMap<String, String> {
        names::version_labels(self, cfg)
    }

    fn propagated_annotations(&self, cfg: &EngineConfig) -> BTreeMap<String, String> {
        names::version_annotations(self, cfg)
    }

    fn selector_labels(&self) -> BTreeMap<String, String> {
        [(
            crd::VERSION_UID_LABEL_KEY.to_string(),
            self.uid().unwrap_or_default(),
        )]
        .into_iter()
        .collect()
    }
}

impl WorkloadOwner for Step {
    fn workload(&self) -> &WorkloadSpec {
        &self.spec.workload
    }

    fn lineage_labels(&self, cfg: &EngineConfig) -> BTreeMap<String, String> {
        names::step_labels(self, cfg)
    }

    fn propagated_annotations(&self, cfg: &EngineConfig) -> BTreeMap<String, String> {
        names::step_annotations(self, cfg)
    }

    fn selector_labels(&self) -> BTreeMap<String, String> {
        [(
            crd::STEP_UID_LABEL_KEY.to_string(),
            self.uid().unwrap_or_default(),
        )]
        .into_iter()
        .collect()
    }
}
