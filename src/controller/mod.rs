//! Per-tier reconciliation pipelines
//!
//! Each tier exposes a `reconcile` entry point taking a parent identity.
//! The external trigger mechanism decides when to invoke them; everything
//! from identity-in to writes-out is synchronous, level-triggered, and
//! convergent: redundant invocations for an unchanged parent end in zero
//! writes. A parent that no longer exists is a clean no-op (it was garbage
//! collected along with its children).
//!
//! Failures propagate to the trigger, which owns backoff and redelivery;
//! the only local recovery is the create/update race handling inside the
//! apply engine.

use crate::config::EngineConfig;
use crate::store::{ObjectRef, ObjectStore};
use crate::Result;

pub mod app;
pub mod config;
pub mod inference_service;
pub mod pipeline;
pub mod router;
pub mod step;
pub mod version;

/// Shared state handed to every tier's reconcile entry point
pub struct Context<S> {
    /// Object store every read and write goes through
    pub store: S,
    /// Engine configuration
    pub config: EngineConfig,
}

impl<S> Context<S> {
    /// Create a context with default engine configuration
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// Create a context with explicit engine configuration
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }
}

/// Fetch a parent object by identity, pinned to one store kind so callers
/// with a wide store bound can name the kind through the binding type
pub(crate) async fn fetch<K, S>(store: &S, id: &ObjectRef) -> Result<Option<K>>
where
    S: ObjectStore<K> + ?Sized,
{
    store.get(&id.namespace, &id.name).await
}
