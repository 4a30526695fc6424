//! Strata - multi-tier declarative resource compiler for model-serving workloads
//!
//! Strata derives a tree of workload objects from a small set of user-authored
//! parents and keeps every derived object converged with its computed desired
//! state. An App expands into a Config and a Router; a Config snapshots itself
//! into an immutable Version per generation; a Version drives a Deployment, a
//! Service, and a HorizontalPodAutoscaler; a Router drives an HTTPRoute bound
//! to the App's current Version; a Pipeline fans out into ordered Steps; an
//! InferenceService resolves a model reference against the runtime registry
//! and materializes an App.
//!
//! Event dispatch (watches, queues, requeue backoff), the object store itself,
//! leader election, and process bootstrap are external collaborators. This
//! crate exposes per-tier reconcile entry points that take a parent identity
//! and a store, and everything between identity-in and writes-out is
//! deterministic.
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (App, Config, Version, Router,
//!   Pipeline, Step, InferenceService, ModelRuntime) and the vendored
//!   HTTPRoute types
//! - [`store`] - Object store abstraction (kube-backed and in-memory)
//! - [`names`] - Deterministic child naming and lineage label propagation
//! - [`runtime`] - Model runtime-template resolution
//! - [`merge`] - Workload spec merging and replica-bound normalization
//! - [`credentials`] - Storage credential injection from service accounts
//! - [`compiler`] - Pure synthesizers for derived objects
//! - [`apply`] - The generic diff-and-apply engine
//! - [`controller`] - Per-tier reconciliation pipelines
//! - [`config`] - Injectable engine configuration
//! - [`error`] - Error types for the engine

#![deny(missing_docs)]

pub mod apply;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod crd;
pub mod credentials;
pub mod error;
pub mod merge;
pub mod names;
pub mod runtime;
pub mod store;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================
// Defaults used throughout Strata. Centralizing them here keeps CRD defaults,
// the engine configuration, and test fixtures consistent.

/// API group for the core derivation tiers (App, Config, Version, ...)
pub const GROUP: &str = "core.strata.dev";

/// API group for the AI-facing tiers (InferenceService, ModelRuntime)
pub const AI_GROUP: &str = "ai.strata.dev";

/// API version shared by every Strata kind
pub const VERSION: &str = "v1alpha1";

/// Field manager recorded on status patches issued by the engine
pub const FIELD_MANAGER: &str = "strata-controller";

/// Path where the model artifact is mounted into serving containers
pub const MODEL_MOUNT_PATH: &str = "/mnt/models";

/// Gateway the synthesized HTTPRoute attaches to when the Router names none
pub const DEFAULT_GATEWAY_NAME: &str = "strata-gateway";
