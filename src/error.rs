//! Error types for the Strata engine

use thiserror::Error;

/// Main error type for Strata operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A concurrent creator won the race for this object. Hard failure for
    /// the current pass; resolves on the next trigger once the winning write
    /// is visible.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists {
        /// Kind of the object that already exists
        kind: String,
        /// Namespaced name of the object
        name: String,
    },

    /// A concurrent writer updated the object between our read and write.
    /// Retryable; never data loss.
    #[error("conflicting write on {kind} {name:?}")]
    Conflict {
        /// Kind of the object that was concurrently updated
        kind: String,
        /// Namespaced name of the object
        name: String,
    },

    /// No registered model runtime satisfies the model reference. Blocks all
    /// derived children until the registry or the reference is corrected.
    #[error("no model runtime found for {0}")]
    RuntimeNotFound(String),

    /// The router has no current Version to bind its route to yet
    #[error("no current version for router {0}")]
    CurrentVersionNotFound(String),

    /// A required external resource kind (e.g. the gateway's route kind) is
    /// not installed. Degraded state; the trigger retries.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    /// Validation error for resource specs
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a missing-capability error with the given message
    pub fn missing_capability(msg: impl Into<String>) -> Self {
        Self::MissingCapability(msg.into())
    }

    /// Create a runtime-not-found error describing the unmatched reference
    pub fn runtime_not_found(msg: impl Into<String>) -> Self {
        Self::RuntimeNotFound(msg.into())
    }

    /// Whether the external trigger should redeliver after backoff.
    ///
    /// Create races, write conflicts, transient API failures, and missing
    /// cluster capabilities all self-heal on a later pass. Validation and
    /// serialization failures need the input corrected first, and an
    /// unmatched runtime reference needs the registry corrected.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(_)
            | Error::AlreadyExists { .. }
            | Error::Conflict { .. }
            | Error::CurrentVersionNotFound(_)
            | Error::MissingCapability(_) => true,
            Error::RuntimeNotFound(_) | Error::Validation(_) | Error::Serialization(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: a lost create race fails the pass but heals on redelivery
    ///
    /// Two reconcile passes for the same parent can race on first creation.
    /// The loser surfaces a hard failure and the trigger redelivers; by then
    /// the winner's write is visible and the pass converges to a no-op.
    #[test]
    fn story_create_race_is_retryable() {
        let err = Error::AlreadyExists {
            kind: "Config".to_string(),
            name: "default/captioner".to_string(),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("already exists"));
    }

    /// Story: an optimistic-concurrency conflict is never treated as success
    #[test]
    fn story_conflict_is_surfaced_and_retryable() {
        let err = Error::Conflict {
            kind: "Deployment".to_string(),
            name: "default/captioner-00001-deployment".to_string(),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("conflicting write"));
    }

    /// Story: an unmatched model runtime blocks the pass until corrected
    ///
    /// Retrying cannot help: either the registry is missing an entry or the
    /// model reference names a runtime that does not exist.
    #[test]
    fn story_runtime_not_found_is_fatal_for_the_pass() {
        let err = Error::runtime_not_found("format \"pytorch\"");
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("pytorch"));
    }

    /// Story: a cluster without the gateway CRDs degrades instead of dying
    ///
    /// The route kind not being installed used to escalate to a terminating
    /// error; it is now an ordinary retryable failure so the rest of the
    /// cascade keeps converging while the capability is absent.
    #[test]
    fn story_missing_capability_degrades_not_terminates() {
        let err = Error::missing_capability("gateway.networking.k8s.io/HTTPRoute not installed");
        assert!(err.is_retryable());
        match err {
            Error::MissingCapability(msg) => assert!(msg.contains("HTTPRoute")),
            _ => panic!("expected MissingCapability variant"),
        }
    }

    /// Story: error constructors accept both String and &str
    #[test]
    fn story_error_construction_ergonomics() {
        let name = "captioner";
        let err = Error::validation(format!("app {name} has no template"));
        assert!(err.to_string().contains("captioner"));

        let err = Error::serialization("unexpected key at line 3");
        assert!(!err.is_retryable());
    }
}
