//! App tier: App -> Config + Router
//!
//! An App expands into exactly one Config (its workload side) and one
//! Router (its routing side), both sharing the App's name and carrying its
//! lineage labels.

use kube::Resource;
use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::apply;
use crate::config::EngineConfig;
use crate::crd::{
    set_condition, App, Condition, ConditionStatus, Config, Router,
};
use crate::names;
use crate::store::{CoreStore, ObjectRef, ObjectStore};
use crate::Result;

/// Reconcile one App end-to-end
#[instrument(skip(ctx), fields(app = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let app: Option<App> = fetch(&ctx.store, id).await?;
    let Some(app) = app else {
        debug!("app is gone; nothing to reconcile");
        return Ok(());
    };

    apply(&ctx.store, make_config(&app, &ctx.config)).await?;
    apply(&ctx.store, make_router(&app, &ctx.config)).await?;

    surface_status(ctx, &app).await
}

fn make_config(app: &App, cfg: &EngineConfig) -> Config {
    let name = names::config_name(app);
    Config {
        metadata: kube::api::ObjectMeta {
            name: Some(name.name),
            namespace: Some(name.namespace),
            labels: Some(names::app_labels(app, cfg)),
            annotations: Some(names::app_annotations(app, cfg)),
            owner_references: app.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec: app.spec.config.clone(),
        status: None,
    }
}

fn make_router(app: &App, cfg: &EngineConfig) -> Router {
    let name = names::router_name(app);
    Router {
        metadata: kube::api::ObjectMeta {
            name: Some(name.name),
            namespace: Some(name.namespace),
            labels: Some(names::app_labels(app, cfg)),
            annotations: Some(names::app_annotations(app, cfg)),
            owner_references: app.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec: app.spec.router.clone(),
        status: None,
    }
}

async fn surface_status<S: CoreStore>(ctx: &Context<S>, app: &App) -> Result<()> {
    let mut status = app.status.clone().unwrap_or_default();
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "Reconciled",
            "config and router applied",
        ),
    );
    if app.status.as_ref() != Some(&status) {
        let mut updated = app.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use kube::ResourceExt;

    fn make_app(name: &str) -> App {
        App {
            metadata: kube::api::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                labels: Some([("team".to_string(), "ml".to_string())].into_iter().collect()),
                ..Default::default()
            },
            spec: Default::default(),
            status: None,
        }
    }

    #[tokio::test]
    async fn story_app_expands_into_config_and_router() {
        let ctx = Context::new(MemStore::new());
        let app = ctx.store.create(&make_app("captioner")).await.unwrap();
        let id = ObjectRef::new("default", "captioner");

        reconcile(&ctx, &id).await.unwrap();

        let config: Config = ctx.store.get("default", "captioner").await.unwrap().unwrap();
        let router: Router = ctx.store.get("default", "captioner").await.unwrap().unwrap();

        for labels in [config.labels(), router.labels()] {
            assert_eq!(
                labels.get("core.strata.dev/app").map(String::as_str),
                Some("captioner")
            );
            assert_eq!(
                labels.get("core.strata.dev/appUID"),
                app.metadata.uid.as_ref()
            );
            // parent labels propagate
            assert_eq!(labels.get("team").map(String::as_str), Some("ml"));
        }

        let owner = &config.owner_references()[0];
        assert_eq!(owner.kind, "App");
        assert_eq!(owner.name, "captioner");
    }

    #[tokio::test]
    async fn story_missing_app_is_a_clean_no_op() {
        let ctx = Context::new(MemStore::new());
        reconcile(&ctx, &ObjectRef::new("default", "gone"))
            .await
            .unwrap();
        assert_eq!(ctx.store.writes(), 0);
    }

    #[tokio::test]
    async fn story_second_pass_converges_to_zero_writes() {
        let ctx = Context::new(MemStore::new());
        ctx.store.create(&make_app("captioner")).await.unwrap();
        let id = ObjectRef::new("default", "captioner");

        reconcile(&ctx, &id).await.unwrap();
        let writes = ctx.store.writes();

        reconcile(&ctx, &id).await.unwrap();
        assert_eq!(ctx.store.writes(), writes);
    }

    #[tokio::test]
    async fn story_ready_condition_is_surfaced_once() {
        let ctx = Context::new(MemStore::new());
        ctx.store.create(&make_app("captioner")).await.unwrap();
        let id = ObjectRef::new("default", "captioner");

        reconcile(&ctx, &id).await.unwrap();

        let app: App = ctx.store.get("default", "captioner").await.unwrap().unwrap();
        let conditions = &app.status.as_ref().unwrap().conditions;
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].type_, "Ready");
        assert_eq!(conditions[0].status, ConditionStatus::True);
    }
}
