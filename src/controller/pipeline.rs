//! Pipeline tier: Pipeline -> Step per template index
//!
//! Steps are applied strictly in template order with per-index
//! short-circuit: a failure leaves earlier steps applied and later ones
//! pending until the next trigger. At-least-once convergent, never
//! transactional.

use kube::Resource;
use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::apply;
use crate::config::EngineConfig;
use crate::crd::{
    set_condition, Condition, ConditionStatus, Pipeline, Step, StepTemplateSpec,
};
use crate::names;
use crate::store::{CoreStore, ObjectRef, ObjectStore};
use crate::Result;

/// Reconcile one Pipeline end-to-end
#[instrument(skip(ctx), fields(pipeline = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let pipeline: Option<Pipeline> = fetch(&ctx.store, id).await?;
    let Some(pipeline) = pipeline else {
        debug!("pipeline is gone; nothing to reconcile");
        return Ok(());
    };

    for (index, template) in pipeline.spec.steps.iter().enumerate() {
        let step = make_step(&pipeline, index, template, &ctx.config);
        apply(&ctx.store, step).await?;
    }

    surface_status(ctx, &pipeline).await
}

/// Build the Step stamped at one index of the Pipeline.
///
/// Identity is positional; the template's metadata rides along but its name
/// is always overridden by the derived one.
fn make_step(
    pipeline: &Pipeline,
    index: usize,
    template: &StepTemplateSpec,
    cfg: &EngineConfig,
) -> Step {
    let name = names::step_name(pipeline, index);
    let template_meta = template.metadata.clone().unwrap_or_default();

    let mut labels = template_meta.labels.unwrap_or_default();
    for (key, value) in names::pipeline_labels(pipeline, cfg) {
        labels.insert(key, value);
    }

    Step {
        metadata: kube::api::ObjectMeta {
            name: Some(name.name),
            namespace: Some(name.namespace),
            labels: Some(labels),
            annotations: template_meta.annotations,
            owner_references: pipeline.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec: template.spec.clone(),
        status: None,
    }
}

async fn surface_status<S: CoreStore>(ctx: &Context<S>, pipeline: &Pipeline) -> Result<()> {
    let mut status = pipeline.status.clone().unwrap_or_default();
    status.reconciled_steps = Some(pipeline.spec.steps.len() as i32);
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "StepsApplied",
            format!("{} steps applied", pipeline.spec.steps.len()),
        ),
    );
    if pipeline.status.as_ref() != Some(&status) {
        let mut updated = pipeline.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}
