//! Config tier: Config -> Version
//!
//! A Config stamps exactly one immutable Version per generation. The
//! Version's name is derived from the Config name and generation (or taken
//! from the template when set explicitly), so a redundant pass finds the
//! Version already present and writes nothing.

use kube::{Resource, ResourceExt};
use tracing::{debug, instrument};

use super::{fetch, Context};
use crate::apply::{create_if_absent, Outcome};
use crate::crd::{set_condition, Condition, ConditionStatus, Config, Version};
use crate::names;
use crate::store::{CoreStore, ObjectRef, ObjectStore};
use crate::Result;

/// Reconcile one Config end-to-end
#[instrument(skip(ctx), fields(config = %id))]
pub async fn reconcile<S: CoreStore>(ctx: &Context<S>, id: &ObjectRef) -> Result<()> {
    let config: Option<Config> = fetch(&ctx.store, id).await?;
    let Some(config) = config else {
        debug!("config is gone; nothing to reconcile");
        return Ok(());
    };

    let applied = create_if_absent(&ctx.store, make_version(&config)).await?;
    if applied.outcome == Outcome::Unchanged {
        debug!(version = %applied.object.name_any(), "version already stamped for this generation");
    }

    surface_status(ctx, &config, &applied.object).await
}

/// Build the Version this Config's current generation should stamp.
///
/// The template's own metadata (labels, annotations) is carried onto the
/// Version, then lineage labels and the router marker are asserted on top.
fn make_version(config: &Config) -> Version {
    let name = names::version_name(config);
    let template = config.spec.template.clone();
    let template_meta = template.metadata.unwrap_or_default();

    let mut labels = template_meta.labels.unwrap_or_default();
    for (key, value) in names::version_lineage_labels(config) {
        labels.insert(key, value);
    }

    let mut annotations = template_meta.annotations.unwrap_or_default();
    names::propagated_annotations(config.annotations(), &mut annotations);

    Version {
        metadata: kube::api::ObjectMeta {
            name: Some(name.name),
            namespace: Some(name.namespace),
            labels: Some(labels),
            annotations: Some(annotations),
            owner_references: config.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        spec: template.spec,
        status: None,
    }
}

async fn surface_status<S: CoreStore>(
    ctx: &Context<S>,
    config: &Config,
    version: &Version,
) -> Result<()> {
    let mut status = config.status.clone().unwrap_or_default();
    status.latest_created_version = Some(version.name_any());
    set_condition(
        &mut status.conditions,
        Condition::new(
            Condition::READY,
            ConditionStatus::True,
            "VersionStamped",
            format!("version {} stamped", version.name_any()),
        ),
    );
    if config.status.as_ref() != Some(&status) {
        let mut updated = config.clone();
        updated.status = Some(status);
        ObjectStore::update_status(&ctx.store, &updated).await?;
    }
    Ok(())
}
