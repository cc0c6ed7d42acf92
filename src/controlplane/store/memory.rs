//! In-memory ResourceStore
//!
//! Objects are kept as JSON keyed by kind, namespace and name. Every call is
//! appended to an operation log so callers can assert how many reads and
//! writes a pass performed. `replace` enforces resourceVersion preconditions
//! and keeps the stored status, like the API server does for kinds with a
//! status subresource.

use super::selector_matches;
use crate::crd::StorageCluster;
use crate::domain::ports::{ManagedResource, ResourceStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use kube::ResourceExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;

/// (kind, namespace, name); cluster-scoped kinds use an empty namespace
type ObjectKey = (String, String, String);

/// Kind of store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Get,
    List,
    Create,
    Replace,
    Delete,
    UpdateStatus,
}

impl OpKind {
    pub fn is_write(&self) -> bool {
        !matches!(self, OpKind::Get | OpKind::List)
    }
}

/// One logged store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOp {
    pub op: OpKind,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<ObjectKey, Value>,
    ops: Vec<StoreOp>,
    next_version: u64,
}

impl Inner {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    fn log(&mut self, op: OpKind, key: &ObjectKey) {
        self.ops.push(StoreOp {
            op,
            kind: key.0.clone(),
            namespace: key.1.clone(),
            name: key.2.clone(),
        });
    }
}

/// Thread-safe in-process object store
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

fn key_for<K: ManagedResource>(namespace: &str, name: &str) -> ObjectKey {
    let namespace = if K::NAMESPACED { namespace } else { "" };
    (K::kind_name(), namespace.to_string(), name.to_string())
}

fn decode<K: ManagedResource>(value: &Value) -> Result<K> {
    Ok(serde_json::from_value(value.clone())?)
}

fn resource_version(value: &Value) -> Option<&str> {
    value["metadata"]["resourceVersion"].as_str()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without logging the write
    pub fn insert<K: ManagedResource>(&self, object: &K) -> Result<()> {
        let key = key_for::<K>(&object.namespace().unwrap_or_default(), &object.name_any());
        let mut value = serde_json::to_value(object)?;
        let mut inner = self.inner.lock();
        let version = inner.bump();
        value["metadata"]["resourceVersion"] = Value::String(version);
        if value["metadata"]["uid"].is_null() {
            value["metadata"]["uid"] = Value::String(format!("uid-{}", key.2));
        }
        inner.objects.insert(key, value);
        Ok(())
    }

    /// Read an object without logging the read
    pub fn peek<K: ManagedResource>(&self, namespace: &str, name: &str) -> Option<K> {
        let inner = self.inner.lock();
        inner
            .objects
            .get(&key_for::<K>(namespace, name))
            .and_then(|v| decode(v).ok())
    }

    /// Overwrite the status of an object, as the owning engine would
    pub fn set_status<K: ManagedResource>(&self, namespace: &str, name: &str, status: Value) {
        let mut inner = self.inner.lock();
        let version = inner.bump();
        if let Some(value) = inner.objects.get_mut(&key_for::<K>(namespace, name)) {
            value["status"] = status;
            value["metadata"]["resourceVersion"] = Value::String(version);
        }
    }

    /// Stamp a deletion timestamp, as the API server does for objects with finalizers
    pub fn mark_for_deletion<K: ManagedResource>(&self, namespace: &str, name: &str) {
        let mut inner = self.inner.lock();
        let version = inner.bump();
        if let Some(value) = inner.objects.get_mut(&key_for::<K>(namespace, name)) {
            value["metadata"]["deletionTimestamp"] = Value::String(Utc::now().to_rfc3339());
            value["metadata"]["resourceVersion"] = Value::String(version);
        }
    }

    pub fn ops(&self) -> Vec<StoreOp> {
        self.inner.lock().ops.clone()
    }

    pub fn writes(&self) -> Vec<StoreOp> {
        self.ops().into_iter().filter(|o| o.op.is_write()).collect()
    }

    /// Calls of the given kind touching resources of `kind`
    pub fn count(&self, op: OpKind, kind: &str) -> usize {
        self.inner
            .lock()
            .ops
            .iter()
            .filter(|o| o.op == op && o.kind == kind)
            .count()
    }

    pub fn clear_ops(&self) {
        self.inner.lock().ops.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<Option<K>> {
        let key = key_for::<K>(namespace, name);
        let mut inner = self.inner.lock();
        inner.log(OpKind::Get, &key);
        inner.objects.get(&key).map(decode).transpose()
    }

    async fn list<K: ManagedResource>(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<K>> {
        let kind = K::kind_name();
        let namespace = if K::NAMESPACED { namespace } else { "" };
        let mut inner = self.inner.lock();
        inner.log(OpKind::List, &(kind.clone(), namespace.to_string(), String::new()));
        inner
            .objects
            .iter()
            .filter(|((k, ns, _), _)| *k == kind && ns == namespace)
            .map(|(_, v)| decode::<K>(v))
            .filter(|object| match object {
                Ok(o) => selector_matches(o.labels(), label_selector),
                Err(_) => true,
            })
            .collect()
    }

    async fn create<K: ManagedResource>(&self, namespace: &str, object: &K) -> Result<K> {
        let key = key_for::<K>(namespace, &object.name_any());
        let mut value = serde_json::to_value(object)?;
        let mut inner = self.inner.lock();
        inner.log(OpKind::Create, &key);
        if inner.objects.contains_key(&key) {
            return Err(Error::ResourceExists {
                kind: key.0,
                name: key.2,
            });
        }
        let version = inner.bump();
        if K::NAMESPACED {
            value["metadata"]["namespace"] = Value::String(key.1.clone());
        }
        value["metadata"]["resourceVersion"] = Value::String(version);
        value["metadata"]["uid"] = Value::String(format!("uid-{}", key.2));
        let created = decode(&value)?;
        inner.objects.insert(key, value);
        Ok(created)
    }

    async fn replace<K: ManagedResource>(&self, namespace: &str, object: &K) -> Result<K> {
        let key = key_for::<K>(namespace, &object.name_any());
        let mut value = serde_json::to_value(object)?;
        let mut inner = self.inner.lock();
        inner.log(OpKind::Replace, &key);
        let stored = match inner.objects.get(&key) {
            Some(stored) => stored,
            None => {
                return Err(Error::ResourceNotFound {
                    kind: key.0,
                    name: key.2,
                })
            }
        };
        if let Some(expected) = resource_version(&value) {
            if Some(expected) != resource_version(stored) {
                return Err(Error::Conflict {
                    kind: key.0,
                    name: key.2,
                });
            }
        }
        let status = stored.get("status").cloned();
        let uid = stored["metadata"]["uid"].clone();
        let version = inner.bump();
        match status {
            Some(status) => value["status"] = status,
            None => {
                if let Some(map) = value.as_object_mut() {
                    map.remove("status");
                }
            }
        }
        value["metadata"]["resourceVersion"] = Value::String(version);
        value["metadata"]["uid"] = uid;
        let replaced = decode(&value)?;
        inner.objects.insert(key, value);
        Ok(replaced)
    }

    async fn delete<K: ManagedResource>(&self, namespace: &str, name: &str) -> Result<()> {
        let key = key_for::<K>(namespace, name);
        let mut inner = self.inner.lock();
        inner.log(OpKind::Delete, &key);
        match inner.objects.remove(&key) {
            Some(_) => Ok(()),
            None => Err(Error::ResourceNotFound {
                kind: key.0,
                name: key.2,
            }),
        }
    }

    async fn update_status(&self, cluster: &StorageCluster) -> Result<StorageCluster> {
        let key = key_for::<StorageCluster>(&cluster.namespace_or_default(), &cluster.name_any());
        let status = serde_json::to_value(&cluster.status)?;
        let mut inner = self.inner.lock();
        inner.log(OpKind::UpdateStatus, &key);
        let version = inner.bump();
        let stored = match inner.objects.get_mut(&key) {
            Some(stored) => stored,
            None => {
                return Err(Error::ResourceNotFound {
                    kind: key.0,
                    name: key.2,
                })
            }
        };
        stored["status"] = status;
        stored["metadata"]["resourceVersion"] = Value::String(version);
        decode(stored)
    }
}
