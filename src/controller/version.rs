//! Version tier: Version -> Deployment + Service + Autoscaler
//!
//! A Version drives its triad sequentially; a failure partway leaves later
//! children unreconciled until the next trigger.

use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::apply;
use crate::compiler::{compile_deployment, compile_hpa, compile_service};
use crate::crd::{set_condition, Condition, ConditionStatus, Version};
use crate::store::{CoreStore, ObjectRef, ObjectStore};
use crate::Result;

/// Reconcile one Version end-to-end
#[instrument(skip(ctx), fields(version = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let version: Option<Version> = fetch(&ctx.store, id).await?;
    let Some(version) = version else {
        debug!("version is gone; nothing to reconcile");
        return Ok(());
    };

    apply(&ctx.store, compile_deployment(&version, &ctx.config)).await?;
    apply(&ctx.store, compile_service(&version, &ctx.config)).await?;
    apply(&ctx.store, compile_hpa(&version, &ctx.config)).await?;

    surface_status(ctx, &version).await
}

async fn surface_status<S: CoreStore>(ctx: &Context<S>, version: &Version) -> Result<()> {
    let mut status = version.status.clone().unwrap_or_default();
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "Reconciled",
            "deployment, service, and autoscaler applied",
        ),
    );
    if version.status.as_ref() != Some(&status) {
        let mut updated = version.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}
