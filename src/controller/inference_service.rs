//! InferenceService tier: InferenceService -> App
//!
//! The model reference is resolved against the runtime registry and merged
//! into the App template's version spec, together with the artifact-fetch
//! init container and any storage credentials the referenced service
//! account provides. The resulting App flows down the ordinary
//! App -> Config -> Version cascade.

use kube::{Resource, ResourceExt};
use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::apply;
use crate::crd::{
    set_condition, App, AppSpec, Condition, ConditionStatus, ConfigSpec, InferenceService,
    VersionTemplateSpec,
};
use crate::merge::{merge_runtime, model_fetch_container};
use crate::names;
use crate::store::{CoreStore, ObjectRef, ObjectStore};
use crate::{credentials, runtime, Result};

/// Reconcile one InferenceService end-to-end
#[instrument(skip(ctx), fields(inference_service = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let is: Option<InferenceService> = fetch(&ctx.store, id).await?;
    let Some(is) = is else {
        debug!("inferenceservice is gone; nothing to reconcile");
        return Ok(());
    };

    let app = make_app(ctx, &is).await?;
    apply(&ctx.store, app).await?;

    surface_status(ctx, &is).await
}

async fn make_app<S: CoreStore>(ctx: &Context<S>, is: &InferenceService) -> Result<App> {
    let model = &is.spec.model;
    let template = is.spec.template.clone();
    let mut version_spec = template.spec.config.template.spec;
    let router_spec = template.spec.router;

    let mut fetch_container = model_fetch_container(model, &ctx.config);
    if let Some(sa) = model.service_account_ref.as_deref().filter(|s| !s.is_empty()) {
        credentials::inject(
            &ctx.store,
            &ObjectRef::new(is.namespace().unwrap_or_default(), sa),
            &mut fetch_container,
            version_spec.workload.pod.volumes.get_or_insert_with(Vec::new),
        )
        .await?;
    }
    let mut init_containers = vec![fetch_container];
    init_containers.extend(version_spec.workload.pod.init_containers.take().unwrap_or_default());
    version_spec.workload.pod.init_containers = Some(init_containers);

    let runtimes = runtime::sorted(ctx.store.runtimes().await?);
    let matched = runtime::resolve(&runtimes, model)?;
    merge_runtime(&mut version_spec.workload, matched, &ctx.config);

    let name = names::app_name(is);
    Ok(App {
        metadata: kube::api::ObjectMeta {
            name: Some(name.name),
            namespace: Some(name.namespace),
            labels: Some(names::inference_service_labels(is, &ctx.config)),
            annotations: Some(names::inference_service_annotations(is, &ctx.config)),
            owner_references: is.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec: AppSpec {
            config: ConfigSpec {
                template: VersionTemplateSpec {
                    metadata: template.spec.config.template.metadata,
                    spec: version_spec,
                },
            },
            router: router_spec,
        },
        status: None,
    })
}

async fn surface_status<S: CoreStore>(ctx: &Context<S>, is: &InferenceService) -> Result<()> {
    let mut status = is.status.clone().unwrap_or_default();
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "AppMaterialized",
            "app derived from model runtime",
        ),
    );
    if is.status.as_ref() != Some(&status) {
        let mut updated = is.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}
