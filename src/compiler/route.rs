//! HTTPRoute synthesis
//!
//! A Router's route template is completed against the App's current
//! Version: a template with no rules gets a prefix-match rule on the
//! Version's name, a rewrite stripping that prefix, and a backend reference
//! to the Version's Service; rules authored with matches but no backends get
//! the same backend synthesis patched in. A Router naming no gateway
//! attaches to the well-known default.

use kube::{Resource, ResourceExt};

use crate::config::EngineConfig;
use crate::crd::{
    HTTPBackendRef, HTTPPathMatch, HTTPPathModifier, HTTPRoute, HTTPRouteFilter, HTTPRouteMatch,
    HTTPRouteRule, HTTPUrlRewriteFilter, Router, Version,
};
use crate::names;

const GATEWAY_GROUP: &str = "gateway.networking.k8s.io";

/// Compile the HTTPRoute for a Router bound to its current Version
pub fn compile_route(router: &Router, version: &Version, cfg: &EngineConfig) -> HTTPRoute {
    let name = names::route_name(router);
    let mut annotations = std::collections::BTreeMap::new();
    names::propagated_annotations(router.annotations(), &mut annotations);

    let mut spec = router.spec.route.clone();

    if spec.parent_refs.as_ref().map_or(true, |refs| refs.is_empty()) {
        spec.parent_refs = Some(vec![crate::crd::ParentReference {
            group: Some(GATEWAY_GROUP.to_string()),
            kind: Some("Gateway".to_string()),
            name: cfg.default_gateway_name.clone(),
            namespace: None,
        }]);
    }

    let service = names::service_name(&version.name_any());
    let port = first_container_port(version);

    if spec.rules.as_ref().map_or(true, |rules| rules.is_empty()) {
        spec.rules = Some(vec![default_rule(&version.name_any(), &service, port)]);
    } else if let Some(rules) = spec.rules.as_mut() {
        for rule in rules.iter_mut() {
            if rule.matches.is_some() && rule.backend_refs.is_none() {
                rule.backend_refs = backend_refs(&service, port);
            }
        }
    }

    HTTPRoute {
        metadata: kube::api::ObjectMeta {
            name: Some(name.name),
            namespace: Some(name.namespace),
            labels: Some(names::route_labels(router)),
            annotations: Some(annotations),
            owner_references: router.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec,
        status: None,
    }
}

/// First declared container port of the Version, `None` when it declares
/// none. A backend reference without a port is dropped rather than emitted
/// half-formed.
fn first_container_port(version: &Version) -> Option<i32> {
    version
        .spec
        .workload
        .pod
        .containers
        .first()
        .and_then(|c| c.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|p| p.container_port)
}

fn default_rule(version_name: &str, service: &str, port: Option<i32>) -> HTTPRouteRule {
    HTTPRouteRule {
        matches: Some(vec![HTTPRouteMatch {
            path: Some(HTTPPathMatch {
                type_: Some("PathPrefix".to_string()),
                value: Some(format!("/{version_name}")),
            }),
        }]),
        filters: Some(vec![HTTPRouteFilter {
            type_: "URLRewrite".to_string(),
            url_rewrite: Some(HTTPUrlRewriteFilter {
                path: Some(HTTPPathModifier {
                    type_: "ReplacePrefixMatch".to_string(),
                    replace_prefix_match: Some("/".to_string()),
                }),
            }),
        }]),
        backend_refs: backend_refs(service, port),
    }
}

fn backend_refs(service: &str, port: Option<i32>) -> Option<Vec<HTTPBackendRef>> {
    port.map(|port| {
        vec![HTTPBackendRef {
            name: service.to_string(),
            port: Some(port),
            weight: None,
        }]
    })
}
