//! In-memory object store
//!
//! Reproduces the store semantics the engine depends on: UID assignment on
//! create, version-token bumping on every write, `Conflict` on stale update
//! tokens, `AlreadyExists` on create races, and generation bumps on spec
//! changes only. A write counter makes convergence assertions direct: a
//! second reconcile pass over unchanged inputs must leave it untouched.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{ObjectStore, RuntimeRegistry, Selector};
use crate::crd::ModelRuntime;
use crate::{Error, Result};

/// In-memory object store with optimistic concurrency
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// (kind, namespace, name) -> object; cluster-scoped kinds use an empty
    /// namespace key
    objects: BTreeMap<(String, String, String), Value>,
    writes: usize,
    uid_counter: u64,
    version_counter: u64,
}

impl MemStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes (creates, updates, status updates) issued so far
    pub fn writes(&self) -> usize {
        self.inner.lock().expect("store lock poisoned").writes
    }

    fn key<K>(obj: &K) -> (String, String, String)
    where
        K: Resource<DynamicType = ()>,
    {
        (
            K::kind(&()).into_owned(),
            obj.namespace().unwrap_or_default(),
            obj.name_any(),
        )
    }
}

fn to_value<K: Serialize>(obj: &K) -> Result<Value> {
    serde_json::to_value(obj).map_err(|e| Error::serialization(e.to_string()))
}

fn from_value<K: DeserializeOwned>(value: Value) -> Result<K> {
    serde_json::from_value(value).map_err(|e| Error::serialization(e.to_string()))
}

fn metadata_mut(value: &mut Value) -> &mut serde_json::Map<String, Value> {
    value
        .as_object_mut()
        .expect("stored objects are json objects")
        .entry("metadata")
        .or_insert_with(|| Value::Object(Default::default()))
        .as_object_mut()
        .expect("metadata is a json object")
}

fn labels_match(value: &Value, selector: &Selector) -> bool {
    let labels = value
        .get("metadata")
        .and_then(|m| m.get("labels"))
        .and_then(|l| l.as_object());
    selector.iter().all(|(k, v)| {
        labels
            .and_then(|l| l.get(k))
            .and_then(|stored| stored.as_str())
            .is_some_and(|stored| stored == v)
    })
}

#[async_trait]
impl<K> ObjectStore<K> for MemStore
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let key = (
            K::kind(&()).into_owned(),
            namespace.to_string(),
            name.to_string(),
        );
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.objects.get(&key).cloned().map(from_value).transpose()
    }

    async fn create(&self, obj: &K) -> Result<K> {
        let key = Self::key(obj);
        let mut inner = self.inner.lock().expect("store lock poisoned");
        if inner.objects.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: key.0,
                name: format!("{}/{}", key.1, key.2),
            });
        }

        let mut value = to_value(obj)?;
        inner.uid_counter += 1;
        inner.version_counter += 1;
        let uid = format!("uid-{:04}", inner.uid_counter);
        let rv = inner.version_counter.to_string();
        {
            let metadata = metadata_mut(&mut value);
            metadata
                .entry("uid")
                .or_insert_with(|| Value::String(uid));
            metadata.insert("resourceVersion".to_string(), Value::String(rv));
            metadata.insert("generation".to_string(), Value::from(1_i64));
        }
        inner.objects.insert(key, value.clone());
        inner.writes += 1;
        from_value(value)
    }

    async fn update(&self, obj: &K) -> Result<K> {
        let key = Self::key(obj);
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let Some(stored) = inner.objects.get(&key).cloned() else {
            return Err(Error::validation(format!(
                "update of missing {} {:?}/{:?}",
                key.0, key.1, key.2
            )));
        };

        let stored_rv = stored
            .get("metadata")
            .and_then(|m| m.get("resourceVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if let Some(rv) = obj.resource_version() {
            if rv != stored_rv {
                return Err(Error::Conflict {
                    kind: key.0,
                    name: format!("{}/{}", key.1, key.2),
                });
            }
        }

        let mut value = to_value(obj)?;
        let spec_changed = value.get("spec") != stored.get("spec");
        let stored_generation = stored
            .get("metadata")
            .and_then(|m| m.get("generation"))
            .and_then(|g| g.as_i64())
            .unwrap_or(1);
        let stored_uid = stored
            .get("metadata")
            .and_then(|m| m.get("uid"))
            .cloned()
            .unwrap_or(Value::Null);

        inner.version_counter += 1;
        let rv = inner.version_counter.to_string();
        {
            let metadata = metadata_mut(&mut value);
            metadata.insert("uid".to_string(), stored_uid);
            metadata.insert("resourceVersion".to_string(), Value::String(rv));
            let generation = if spec_changed {
                stored_generation + 1
            } else {
                stored_generation
            };
            metadata.insert("generation".to_string(), Value::from(generation));
        }
        inner.objects.insert(key, value.clone());
        inner.writes += 1;
        from_value(value)
    }

    async fn update_status(&self, obj: &K) -> Result<K> {
        let key = Self::key(obj);
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let Some(mut stored) = inner.objects.get(&key).cloned() else {
            return Err(Error::validation(format!(
                "status update of missing {} {:?}/{:?}",
                key.0, key.1, key.2
            )));
        };

        let status = to_value(obj)?.get("status").cloned().unwrap_or(Value::Null);
        stored
            .as_object_mut()
            .expect("stored objects are json objects")
            .insert("status".to_string(), status);
        inner.version_counter += 1;
        let rv = inner.version_counter.to_string();
        metadata_mut(&mut stored).insert("resourceVersion".to_string(), Value::String(rv));
        inner.objects.insert(key, stored.clone());
        inner.writes += 1;
        from_value(stored)
    }

    async fn list(&self, namespace: &str, selector: &Selector) -> Result<Vec<K>> {
        let kind = K::kind(&()).into_owned();
        let inner = self.inner.lock().expect("store lock poisoned");
        inner
            .objects
            .iter()
            .filter(|((k, ns, _), value)| {
                *k == kind && *ns == namespace && labels_match(value, selector)
            })
            .map(|(_, value)| from_value(value.clone()))
            .collect()
    }
}

#[async_trait]
impl RuntimeRegistry for MemStore {
    async fn runtimes(&self) -> Result<Vec<ModelRuntime>> {
        ObjectStore::<ModelRuntime>::list(self, "", &Selector::new()).await
    }
}
