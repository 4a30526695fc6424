//! Storage credential injection
//!
//! When a model reference names a service account, every secret attached to
//! it is examined and matched against a known shape: an S3 access-key pair
//! becomes environment variables, a GCS credential file becomes a mounted
//! volume plus an env pointer, and an Azure access key becomes a single
//! environment variable. Secrets matching no shape leave the container and
//! volume list untouched; credentials are never fabricated.

use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, Secret, SecretKeySelector, SecretVolumeSource, ServiceAccount,
    Volume, VolumeMount,
};
use kube::ResourceExt;
use tracing::debug;

use crate::store::{ObjectRef, ObjectStore};
use crate::{Error, Result};

// S3
const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const AWS_ACCESS_KEY_ID_NAME: &str = "awsAccessKeyID";
const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const AWS_SECRET_ACCESS_KEY_NAME: &str = "awsSecretAccessKey";

// GCS
const GCS_CREDENTIAL_FILE_NAME: &str = "gcloud-application-credentials.json";
const GCS_CREDENTIAL_VOLUME_NAME: &str = "user-gcp-sa";
const GCS_CREDENTIAL_VOLUME_MOUNT_PATH: &str = "/var/secrets/";
const GCS_CREDENTIAL_ENV_KEY: &str = "GOOGLE_APPLICATION_CREDENTIALS";

// Azure
const AZURE_STORAGE_ACCESS_KEY: &str = "AZURE_STORAGE_ACCESS_KEY";

/// Attach storage credentials from a service account's secrets to a
/// container, adding mounted volumes to the pod's volume list as needed.
pub async fn inject<S>(
    store: &S,
    service_account: &ObjectRef,
    container: &mut Container,
    volumes: &mut Vec<Volume>,
) -> Result<()>
where
    S: ObjectStore<ServiceAccount> + ObjectStore<Secret> + ?Sized,
{
    let sa: Option<ServiceAccount> =
        ObjectStore::get(store, &service_account.namespace, &service_account.name).await?;
    let Some(sa) = sa else {
        return Err(Error::validation(format!(
            "service account {service_account} not found"
        )));
    };

    for reference in sa.secrets.unwrap_or_default() {
        let Some(name) = reference.name else { continue };
        let secret: Option<Secret> =
            ObjectStore::get(store, &service_account.namespace, &name).await?;
        let Some(secret) = secret else {
            debug!(secret = %name, "service account references a missing secret");
            continue;
        };

        let data = secret.data.as_ref();
        if data.is_some_and(|d| d.contains_key(AWS_SECRET_ACCESS_KEY_NAME)) {
            attach_s3(container, &secret.name_any());
        } else if data.is_some_and(|d| d.contains_key(GCS_CREDENTIAL_FILE_NAME)) {
            attach_gcs(container, volumes, &secret.name_any());
        } else if data.is_some_and(|d| d.contains_key(AZURE_STORAGE_ACCESS_KEY)) {
            attach_azure(container, &secret.name_any());
        }
    }

    Ok(())
}

fn secret_env(var: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: var.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn attach_s3(container: &mut Container, secret: &str) {
    container.env.get_or_insert_with(Vec::new).extend([
        secret_env(AWS_ACCESS_KEY_ID, secret, AWS_ACCESS_KEY_ID_NAME),
        secret_env(AWS_SECRET_ACCESS_KEY, secret, AWS_SECRET_ACCESS_KEY_NAME),
    ]);
}

fn attach_gcs(container: &mut Container, volumes: &mut Vec<Volume>, secret: &str) {
    volumes.push(Volume {
        name: GCS_CREDENTIAL_VOLUME_NAME.to_string(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    });
    container
        .volume_mounts
        .get_or_insert_with(Vec::new)
        .push(VolumeMount {
            name: GCS_CREDENTIAL_VOLUME_NAME.to_string(),
            mount_path: GCS_CREDENTIAL_VOLUME_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    container.env.get_or_insert_with(Vec::new).push(EnvVar {
        name: GCS_CREDENTIAL_ENV_KEY.to_string(),
        value: Some(format!(
            "{GCS_CREDENTIAL_VOLUME_MOUNT_PATH}{GCS_CREDENTIAL_FILE_NAME}"
        )),
        ..Default::default()
    });
}

fn attach_azure(container: &mut Container, secret: &str) {
    container
        .env
        .get_or_insert_with(Vec::new)
        .push(secret_env(AZURE_STORAGE_ACCESS_KEY, secret, AZURE_STORAGE_ACCESS_KEY));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use k8s_openapi::api::core::v1::ObjectReference;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;
    use std::collections::BTreeMap;

    async fn seed(store: &MemStore, secret_name: &str, keys: &[&str]) {
        let sa = ServiceAccount {
            metadata: ObjectMeta {
                name: Some("model-fetcher".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            secrets: Some(vec![ObjectReference {
                name: Some(secret_name.to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };
        store.create(&sa).await.unwrap();

        let mut data = BTreeMap::new();
        for key in keys {
            data.insert(key.to_string(), ByteString(b"credential".to_vec()));
        }
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(secret_name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        };
        store.create(&secret).await.unwrap();
    }

    fn fetcher() -> Container {
        Container {
            name: "storage-initializer".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn s3_key_pair_becomes_env_vars() {
        let store = MemStore::new();
        seed(&store, "s3-creds", &["awsAccessKeyID", "awsSecretAccessKey"]).await;

        let mut container = fetcher();
        let mut volumes = Vec::new();
        inject(
            &store,
            &ObjectRef::new("default", "model-fetcher"),
            &mut container,
            &mut volumes,
        )
        .await
        .unwrap();

        let env = container.env.unwrap();
        assert!(env.iter().any(|e| e.name == "AWS_ACCESS_KEY_ID"));
        assert!(env.iter().any(|e| e.name == "AWS_SECRET_ACCESS_KEY"));
        assert!(volumes.is_empty());
    }

    #[tokio::test]
    async fn gcs_credential_file_becomes_a_mounted_volume() {
        let store = MemStore::new();
        seed(&store, "gcs-creds", &["gcloud-application-credentials.json"]).await;

        let mut container = fetcher();
        let mut volumes = Vec::new();
        inject(
            &store,
            &ObjectRef::new("default", "model-fetcher"),
            &mut container,
            &mut volumes,
        )
        .await
        .unwrap();

        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "user-gcp-sa");
        let mounts = container.volume_mounts.unwrap();
        assert_eq!(mounts[0].mount_path, "/var/secrets/");
        let env = container.env.unwrap();
        assert!(env.iter().any(|e| {
            e.name == "GOOGLE_APPLICATION_CREDENTIALS"
                && e.value.as_deref()
                    == Some("/var/secrets/gcloud-application-credentials.json")
        }));
    }

    #[tokio::test]
    async fn azure_access_key_becomes_a_single_env_var() {
        let store = MemStore::new();
        seed(&store, "azure-creds", &["AZURE_STORAGE_ACCESS_KEY"]).await;

        let mut container = fetcher();
        let mut volumes = Vec::new();
        inject(
            &store,
            &ObjectRef::new("default", "model-fetcher"),
            &mut container,
            &mut volumes,
        )
        .await
        .unwrap();

        let env = container.env.unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].name, "AZURE_STORAGE_ACCESS_KEY");
    }

    #[tokio::test]
    async fn unrecognized_secret_shape_changes_nothing() {
        let store = MemStore::new();
        seed(&store, "ssh-creds", &["id_rsa"]).await;

        let mut container = fetcher();
        let mut volumes = Vec::new();
        inject(
            &store,
            &ObjectRef::new("default", "model-fetcher"),
            &mut container,
            &mut volumes,
        )
        .await
        .unwrap();

        assert!(container.env.is_none());
        assert!(container.volume_mounts.is_none());
        assert!(volumes.is_empty());
    }
}
