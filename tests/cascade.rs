//! End-to-end cascade tests over the in-memory store
//!
//! These walk the full derivation chain the way the external trigger would:
//! reconcile the InferenceService, then each object it produced, down to the
//! Deployment/Service/Autoscaler triad and the HTTPRoute, and assert that a
//! second sweep over the unchanged tree issues zero writes.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{Container, ContainerPort, Service};
use kube::ResourceExt;

use strata::controller::{self, Context};
use strata::crd::{
    App, Config, HTTPRoute, InferenceService, InferenceServiceSpec, ModelFormat, ModelRuntime,
    ModelRuntimeSpec, ModelSpec, Router, Version,
};
use strata::store::{MemStore, ObjectRef, ObjectStore};

fn pytorch_runtime() -> ModelRuntime {
    ModelRuntime {
        metadata: kube::api::ObjectMeta {
            name: Some("torchserve".to_string()),
            ..Default::default()
        },
        spec: ModelRuntimeSpec {
            supported_model_formats: vec![ModelFormat::pytorch()],
            containers: vec![Container {
                name: "strata-container".to_string(),
                image: Some("pytorch/torchserve:0.7.1".to_string()),
                ports: Some(vec![ContainerPort {
                    container_port: 8080,
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            min_replicas: Some(2),
            max_replicas: 4,
            metrics: None,
            behavior: None,
        },
        status: None,
    }
}

fn captioner_service() -> InferenceService {
    InferenceService {
        metadata: kube::api::ObjectMeta {
            name: Some("captioner".to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: InferenceServiceSpec {
            model: ModelSpec {
                model_format: ModelFormat::pytorch(),
                uri: "s3://models/captioner".to_string(),
                model_runtime: None,
                service_account_ref: None,
            },
            template: Default::default(),
        },
        status: None,
    }
}

/// Run every tier once, in the order the trigger would deliver them
async fn sweep(ctx: &Context<MemStore>) {
    let id = ObjectRef::new("default", "captioner");
    controller::inference_service::reconcile(ctx, &id).await.unwrap();
    controller::app::reconcile(ctx, &id).await.unwrap();
    controller::config::reconcile(ctx, &id).await.unwrap();

    let config: Config = ctx.store.get("default", "captioner").await.unwrap().unwrap();
    let version_name = config
        .status
        .as_ref()
        .and_then(|s| s.latest_created_version.clone())
        .unwrap();
    controller::version::reconcile(ctx, &ObjectRef::new("default", version_name.as_str()))
        .await
        .unwrap();
    controller::router::reconcile(ctx, &id).await.unwrap();
}

#[tokio::test]
async fn cascade_derives_the_full_tree_from_one_inference_service() {
    let ctx = Context::new(MemStore::new());
    ctx.store.create(&pytorch_runtime()).await.unwrap();
    ctx.store.create(&captioner_service()).await.unwrap();

    sweep(&ctx).await;

    // InferenceService -> App -> Config -> Version
    let app: Option<App> = ctx.store.get("default", "captioner").await.unwrap();
    assert!(app.is_some());
    let version: Version = ctx
        .store
        .get("default", "captioner-00001")
        .await
        .unwrap()
        .unwrap();

    // the workload's container list is the runtime's containers plus the
    // injected model-volume mount
    let containers = &version.spec.workload.pod.containers;
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].name, "strata-container");
    assert_eq!(containers[0].image.as_deref(), Some("pytorch/torchserve:0.7.1"));
    assert!(containers[0]
        .volume_mounts
        .as_ref()
        .unwrap()
        .iter()
        .any(|m| m.mount_path == "/mnt/models"));
    assert!(version
        .spec
        .workload
        .pod
        .volumes
        .as_ref()
        .unwrap()
        .iter()
        .any(|v| v.empty_dir.is_some()));

    // the triad is named after the version
    let deployment: Option<Deployment> = ctx
        .store
        .get("default", "captioner-00001-deployment")
        .await
        .unwrap();
    let service: Option<Service> = ctx
        .store
        .get("default", "captioner-00001-service")
        .await
        .unwrap();
    let hpa: Option<HorizontalPodAutoscaler> =
        ctx.store.get("default", "captioner-00001-hpa").await.unwrap();
    assert!(deployment.is_some());
    assert!(service.is_some());
    assert!(hpa.is_some());

    // runtime scaling defaults flowed all the way down
    let hpa_spec = hpa.unwrap().spec.unwrap();
    assert_eq!(hpa_spec.min_replicas, Some(2));
    assert_eq!(hpa_spec.max_replicas, 4);
    assert_eq!(deployment.unwrap().spec.unwrap().replicas, Some(2));

    // the route binds the version's service on its declared port
    let route: HTTPRoute = ctx
        .store
        .get("default", "captioner-route")
        .await
        .unwrap()
        .unwrap();
    let rules = route.spec.rules.unwrap();
    let backends = rules[0].backend_refs.as_ref().unwrap();
    assert_eq!(backends[0].name, "captioner-00001-service");
    assert_eq!(backends[0].port, Some(8080));
    assert_eq!(
        rules[0].matches.as_ref().unwrap()[0]
            .path
            .as_ref()
            .unwrap()
            .value
            .as_deref(),
        Some("/captioner-00001")
    );
}

#[tokio::test]
async fn cascade_converges_to_zero_writes() {
    let ctx = Context::new(MemStore::new());
    ctx.store.create(&pytorch_runtime()).await.unwrap();
    ctx.store.create(&captioner_service()).await.unwrap();

    sweep(&ctx).await;
    let writes = ctx.store.writes();

    // redundant redelivery of every trigger converges without a write
    sweep(&ctx).await;
    sweep(&ctx).await;
    assert_eq!(ctx.store.writes(), writes);
}

#[tokio::test]
async fn every_derived_object_carries_the_lineage_index() {
    let ctx = Context::new(MemStore::new());
    ctx.store.create(&pytorch_runtime()).await.unwrap();
    ctx.store.create(&captioner_service()).await.unwrap();

    sweep(&ctx).await;

    let app: App = ctx.store.get("default", "captioner").await.unwrap().unwrap();
    let app_uid = app.uid().unwrap();

    let config: Config = ctx.store.get("default", "captioner").await.unwrap().unwrap();
    let router: Router = ctx.store.get("default", "captioner").await.unwrap().unwrap();
    assert_eq!(config.labels().get("core.strata.dev/appUID"), Some(&app_uid));
    assert_eq!(router.labels().get("core.strata.dev/appUID"), Some(&app_uid));

    let version: Version = ctx
        .store
        .get("default", "captioner-00001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(version.labels().get("core.strata.dev/appUID"), Some(&app_uid));
    assert_eq!(
        version.labels().get("core.strata.dev/config").map(String::as_str),
        Some("captioner")
    );

    let deployment: Deployment = ctx
        .store
        .get("default", "captioner-00001-deployment")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        deployment
            .metadata
            .labels
            .as_ref()
            .unwrap()
            .get("core.strata.dev/versionUID"),
        version.metadata.uid.as_ref()
    );

    let route: HTTPRoute = ctx
        .store
        .get("default", "captioner-route")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(route.labels().get("core.strata.dev/appUID"), Some(&app_uid));
}

#[tokio::test]
async fn new_generation_rolls_the_route_forward() {
    let ctx = Context::new(MemStore::new());
    ctx.store.create(&pytorch_runtime()).await.unwrap();
    ctx.store.create(&captioner_service()).await.unwrap();

    sweep(&ctx).await;

    // the model moves; the InferenceService spec changes
    let mut is: InferenceService = ctx.store.get("default", "captioner").await.unwrap().unwrap();
    is.spec.model.uri = "s3://models/captioner-v2".to_string();
    ctx.store.update(&is).await.unwrap();

    sweep(&ctx).await;

    // a second version was stamped and the route follows it
    let second: Option<Version> = ctx.store.get("default", "captioner-00002").await.unwrap();
    assert!(second.is_some());

    let router: Router = ctx.store.get("default", "captioner").await.unwrap().unwrap();
    assert_eq!(
        router.status.unwrap().current_version.as_deref(),
        Some("captioner-00002")
    );

    let route: HTTPRoute = ctx
        .store
        .get("default", "captioner-route")
        .await
        .unwrap()
        .unwrap();
    let rules = route.spec.rules.unwrap();
    assert_eq!(
        rules[0].backend_refs.as_ref().unwrap()[0].name,
        "captioner-00002-service"
    );
}
