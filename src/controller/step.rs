//! Step tier: Step -> Deployment + Service + Autoscaler
//!
//! A Step carrying a model reference is resolved and merged in memory
//! before compilation: the matched runtime's containers replace the Step's
//! own, the artifact-fetch init container is prepended (with storage
//! credentials when a service account is referenced), and runtime scaling
//! defaults fill absent values. The stored Step is never rewritten with the
//! merged result; it re-merges identically on every pass.

use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::apply;
use crate::compiler::{compile_deployment, compile_hpa, compile_service};
use crate::crd::{set_condition, Condition, ConditionStatus, Step};
use crate::merge::{merge_runtime, model_fetch_container};
use crate::store::{CoreStore, ObjectRef, ObjectStore};
use crate::{credentials, runtime, Result};

/// Reconcile one Step end-to-end
#[instrument(skip(ctx), fields(step = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let step: Option<Step> = fetch(&ctx.store, id).await?;
    let Some(stored) = step else {
        debug!("step is gone; nothing to reconcile");
        return Ok(());
    };

    let mut step = stored.clone();
    if let Some(model) = step.spec.model.clone() {
        let mut fetch_container = model_fetch_container(&model, &ctx.config);
        if let Some(sa) = model.service_account_ref.as_deref().filter(|s| !s.is_empty()) {
            credentials::inject(
                &ctx.store,
                &ObjectRef::new(id.namespace.clone(), sa),
                &mut fetch_container,
                step.spec.workload.pod.volumes.get_or_insert_with(Vec::new),
            )
            .await?;
        }
        let mut init_containers = vec![fetch_container];
        init_containers.extend(step.spec.workload.pod.init_containers.take().unwrap_or_default());
        step.spec.workload.pod.init_containers = Some(init_containers);

        let runtimes = runtime::sorted(ctx.store.runtimes().await?);
        let matched = runtime::resolve(&runtimes, &model)?;
        merge_runtime(&mut step.spec.workload, matched, &ctx.config);
    }

    apply(&ctx.store, compile_deployment(&step, &ctx.config)).await?;
    apply(&ctx.store, compile_service(&step, &ctx.config)).await?;
    apply(&ctx.store, compile_hpa(&step, &ctx.config)).await?;

    surface_status(ctx, &stored).await
}

async fn surface_status<S: CoreStore>(ctx: &Context<S>, step: &Step) -> Result<()> {
    let mut status = step.status.clone().unwrap_or_default();
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "Reconciled",
            "deployment, service, and autoscaler applied",
        ),
    );
    if step.status.as_ref() != Some(&status) {
        let mut updated = step.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ModelFormat, ModelRuntime, ModelRuntimeSpec, ModelSpec, StepSpec};
    use crate::store::MemStore;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{Container, ContainerPort};

    fn make_runtime(name: &str) -> ModelRuntime {
        ModelRuntime {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_string()),
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
                min_replicas: Some(1),
                max_replicas: 3,
                ..Default::default()
            },
            status: None,
        }
    }

    fn make_step(name: &str, model: Option<ModelSpec>) -> Step {
        Step {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            spec: StepSpec {
                workload: Default::default(),
                model,
            },
            status: None,
        }
    }

    fn pytorch_model() -> ModelSpec {
        ModelSpec {
            model_format: ModelFormat::pytorch(),
            uri: "s3://models/captioner".to_string(),
            model_runtime: None,
            service_account_ref: None,
        }
    }

    #[tokio::test]
    async fn story_model_step_serves_the_runtime_containers() {
        let ctx = Context::new(MemStore::new());
        ctx.store.create(&make_runtime("torchserve")).await.unwrap();
        ctx.store
            .create(&make_step("infer", Some(pytorch_model())))
            .await
            .unwrap();

        reconcile(&ctx, &ObjectRef::new("default", "infer"))
            .await
            .unwrap();

        let deployment: Deployment = ctx
            .store
            .get("default", "infer-deployment")
            .await
            .unwrap()
            .unwrap();
        let pod = deployment.spec.unwrap().template.spec.unwrap();

        // runtime containers replaced the step's own, with the model mount
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].name, "strata-container");
        assert!(pod.containers[0]
            .volume_mounts
            .as_ref()
            .unwrap()
            .iter()
            .any(|m| m.mount_path == "/mnt/models"));

        // the artifact fetch runs first
        let init = pod.init_containers.as_ref().unwrap();
        assert_eq!(init[0].name, "storage-initializer");
        assert_eq!(
            init[0].args.as_deref(),
            Some(&["s3://models/captioner".to_string(), "/mnt/models".to_string()][..])
        );

        // the stored step kept its unmerged spec
        let stored: Step = ctx.store.get("default", "infer").await.unwrap().unwrap();
        assert!(stored.spec.workload.pod.containers.is_empty());
    }

    #[tokio::test]
    async fn story_model_free_step_compiles_as_authored() {
        let ctx = Context::new(MemStore::new());
        let mut step = make_step("plain", None);
        step.spec.workload.pod.containers = vec![Container {
            name: "worker".to_string(),
            image: Some("batch:1".to_string()),
            ..Default::default()
        }];
        ctx.store.create(&step).await.unwrap();

        reconcile(&ctx, &ObjectRef::new("default", "plain"))
            .await
            .unwrap();

        let deployment: Deployment = ctx
            .store
            .get("default", "plain-deployment")
            .await
            .unwrap()
            .unwrap();
        let pod = deployment.spec.unwrap().template.spec.unwrap();
        assert_eq!(pod.containers[0].name, "worker");
        assert!(pod.init_containers.is_none());
    }

    #[tokio::test]
    async fn story_unmatched_model_blocks_the_triad() {
        let ctx = Context::new(MemStore::new());
        ctx.store
            .create(&make_step("infer", Some(pytorch_model())))
            .await
            .unwrap();

        let err = reconcile(&ctx, &ObjectRef::new("default", "infer"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::RuntimeNotFound(_)));

        let deployment: Option<Deployment> =
            ctx.store.get("default", "infer-deployment").await.unwrap();
        assert!(deployment.is_none());
    }

    #[tokio::test]
    async fn story_model_step_converges() {
        let ctx = Context::new(MemStore::new());
        ctx.store.create(&make_runtime("torchserve")).await.unwrap();
        ctx.store
            .create(&make_step("infer", Some(pytorch_model())))
            .await
            .unwrap();
        let id = ObjectRef::new("default", "infer");

        reconcile(&ctx, &id).await.unwrap();
        let writes = ctx.store.writes();
        reconcile(&ctx, &id).await.unwrap();
        assert_eq!(ctx.store.writes(), writes);
    }
}
