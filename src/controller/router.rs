//! Router tier: Router -> HTTPRoute
//!
//! The Router's route template is completed against the App's current
//! Version, found by the app-UID lineage label. Among multiple matches the
//! highest stamped Config generation wins (lexically greatest name on a
//! tie), so the route always follows the newest rollout deterministically.

use kube::ResourceExt;
use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::apply;
use crate::compiler::compile_route;
use crate::crd::{
    self, set_condition, Condition, ConditionStatus, Router, Version,
};
use crate::store::{CoreStore, ObjectRef, ObjectStore, Selector};
use crate::{Error, Result};

/// Reconcile one Router end-to-end
#[instrument(skip(ctx), fields(router = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let router: Option<Router> = fetch(&ctx.store, id).await?;
    let Some(router) = router else {
        debug!("router is gone; nothing to reconcile");
        return Ok(());
    };

    let version = current_version(&ctx.store, &router).await?;
    let route = compile_route(&router, &version, &ctx.config);
    apply(&ctx.store, route).await.map_err(|err| match err {
        // the gateway CRDs not being installed is a degraded state, not a
        // reason to take the whole cascade down
        Error::Kube(kube::Error::Api(ae)) if ae.code == 404 => Error::missing_capability(
            "HTTPRoute kind (gateway.networking.k8s.io) is not installed",
        ),
        other => other,
    })?;

    surface_status(ctx, &router, &version).await
}

/// Resolve the Version this Router currently targets.
///
/// The read is a snapshot: a Version stamped between this read and the
/// route write is picked up on the next trigger.
async fn current_version<S>(store: &S, router: &Router) -> Result<Version>
where
    S: ObjectStore<Version> + ?Sized,
{
    let Some(app_uid) = router.labels().get(crd::APP_UID_LABEL_KEY).cloned() else {
        return Err(Error::validation(format!(
            "router {} carries no app lineage label",
            router.name_any()
        )));
    };

    let selector: Selector = [(crd::APP_UID_LABEL_KEY.to_string(), app_uid)]
        .into_iter()
        .collect();
    let versions = store
        .list(&router.namespace().unwrap_or_default(), &selector)
        .await?;

    versions
        .into_iter()
        .max_by_key(|version| (stamped_generation(version), version.name_any()))
        .ok_or_else(|| Error::CurrentVersionNotFound(router.name_any()))
}

fn stamped_generation(version: &Version) -> i64 {
    version
        .labels()
        .get(crd::CONFIG_GENERATION_LABEL_KEY)
        .and_then(|generation| generation.parse().ok())
        .unwrap_or_default()
}

async fn surface_status<S: CoreStore>(
    ctx: &Context<S>,
    router: &Router,
    version: &Version,
) -> Result<()> {
    let mut status = router.status.clone().unwrap_or_default();
    status.current_version = Some(version.name_any());
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "RouteBound",
            format!("route bound to version {}", version.name_any()),
        ),
    );
    if router.status.as_ref() != Some(&status) {
        let mut updated = router.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}
