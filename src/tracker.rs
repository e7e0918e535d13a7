use crate::utils::{ensure_metadata, increment_resource_version, object_name, SEEDED_RESOURCE_VERSION};
use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, trace};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GVR {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GVR {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GVK {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GVK {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

type ObjectsByName = HashMap<String, Value>;
type ObjectsByNamespace = HashMap<String, ObjectsByName>;
type ObjectStorage = HashMap<GVR, ObjectsByNamespace>;

/// In-memory object store behind the fake API server
///
/// Objects are kept as JSON, keyed by resource, namespace and name. Cluster-wide
/// requests use the empty namespace.
pub struct ObjectTracker {
    objects: RwLock<ObjectStorage>,
    with_status_subresource: RwLock<HashSet<GVK>>,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            with_status_subresource: RwLock::new(HashSet::new()),
        }
    }

    pub fn add_status_subresource(&self, gvk: GVK) {
        self.with_status_subresource.write().unwrap().insert(gvk);
    }

    pub fn has_status_subresource(&self, gvk: &GVK) -> bool {
        self.with_status_subresource.read().unwrap().contains(gvk)
    }

    /// Seed an object, keeping a resource version it already has.
    pub fn add(&self, gvr: &GVR, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("Adding object: {:?} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = object_name(&meta)?;

        if meta.resource_version.as_ref().is_none_or(|rv| rv.is_empty()) {
            meta.resource_version = Some(SEEDED_RESOURCE_VERSION.to_string());
        }
        ensure_metadata(&mut meta, namespace)?;
        object["metadata"] = serde_json::to_value(&meta)?;

        self.store(gvr, namespace, &name, object.clone());

        debug!("Added object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn create(&self, gvr: &GVR, gvk: &GVK, mut object: Value, namespace: &str) -> Result<Value> {
        trace!("Creating object: {:?} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = object_name(&meta)?;

        if meta.resource_version.as_ref().is_some_and(|rv| !rv.is_empty()) {
            return Err(Error::InvalidRequest(
                "resourceVersion can not be set for Create requests".to_string(),
            ));
        }

        meta.resource_version = Some("1".to_string());
        meta.deletion_timestamp = None;
        ensure_metadata(&mut meta, namespace)?;
        object["metadata"] = serde_json::to_value(&meta)?;

        // Existence check and insert share one guard
        let mut objects = self.objects.write().unwrap();
        if lookup(&objects, gvr, namespace, &name).is_some() {
            return Err(Error::AlreadyExists {
                kind: gvk.kind.clone(),
                name,
                namespace: namespace.to_string(),
            });
        }
        insert(&mut objects, gvr, namespace, &name, object.clone());
        drop(objects);

        debug!("Created object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn get(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("Getting object: {:?} {}/{}", gvr, namespace, name);

        let objects = self.objects.read().unwrap();
        lookup(&objects, gvr, namespace, name)
            .cloned()
            .ok_or_else(|| not_found(gvr, namespace, name))
    }

    /// Replace an object, enforcing optimistic concurrency on resourceVersion.
    ///
    /// With a status subresource registered for `gvk`, a main update keeps the
    /// stored status and a status update keeps the stored spec.
    pub fn update(
        &self,
        gvr: &GVR,
        gvk: &GVK,
        mut object: Value,
        namespace: &str,
        is_status: bool,
    ) -> Result<Value> {
        trace!("Updating object: {:?} in namespace: {}", gvr, namespace);

        let mut meta = extract_metadata(&object)?;
        let name = object_name(&meta)?;
        let split_status = self.has_status_subresource(gvk);

        // Conflict check and write share one guard
        let mut objects = self.objects.write().unwrap();
        let existing = lookup(&objects, gvr, namespace, &name)
            .ok_or_else(|| not_found(gvr, namespace, &name))?;
        let existing_meta = extract_metadata(existing)?;

        if let (Some(provided), Some(current)) =
            (&meta.resource_version, &existing_meta.resource_version)
        {
            if !provided.is_empty() && provided != current {
                return Err(Error::Conflict(format!(
                    "Operation cannot be fulfilled on {} \"{}\": the object has been modified; \
                     please apply your changes to the latest version and try again \
                     (expected {}, got {})",
                    gvr.resource, name, current, provided
                )));
            }
        }

        if split_status {
            let keep = if is_status { "spec" } else { "status" };
            match existing.get(keep) {
                Some(value) => object[keep] = value.clone(),
                None => {
                    if let Some(obj) = object.as_object_mut() {
                        obj.remove(keep);
                    }
                }
            }
        }

        meta.resource_version = Some(increment_resource_version(
            existing_meta.resource_version.as_deref().unwrap_or(""),
        )?);
        meta.uid = existing_meta.uid;
        meta.creation_timestamp = existing_meta.creation_timestamp;
        meta.namespace = existing_meta.namespace;
        object["metadata"] = serde_json::to_value(&meta)?;

        insert(&mut objects, gvr, namespace, &name, object.clone());
        drop(objects);

        debug!("Updated object: {}/{}", namespace, name);
        Ok(object)
    }

    pub fn delete(&self, gvr: &GVR, namespace: &str, name: &str) -> Result<Value> {
        trace!("Deleting object: {:?} {}/{}", gvr, namespace, name);

        let mut objects = self.objects.write().unwrap();
        let removed = objects
            .get_mut(gvr)
            .and_then(|by_ns| by_ns.get_mut(namespace))
            .and_then(|by_name| by_name.remove(name))
            .ok_or_else(|| not_found(gvr, namespace, name))?;

        debug!("Deleted object: {}/{}", namespace, name);
        Ok(removed)
    }

    /// List objects of a resource, in one namespace or across all of them.
    ///
    /// Results are sorted by namespace and name.
    pub fn list(&self, gvr: &GVR, namespace: Option<&str>) -> Vec<Value> {
        self.list_entries(gvr, namespace)
            .into_iter()
            .map(|(_, _, obj)| obj)
            .collect()
    }

    /// Like [`list`](Self::list), keeping the storage namespace and name of each object.
    pub fn list_entries(&self, gvr: &GVR, namespace: Option<&str>) -> Vec<(String, String, Value)> {
        trace!("Listing objects: {:?} in namespace: {:?}", gvr, namespace);

        let objects = self.objects.read().unwrap();
        let Some(by_ns) = objects.get(gvr) else {
            return Vec::new();
        };

        let mut entries: Vec<(String, String, Value)> = by_ns
            .iter()
            .filter(|(ns, _)| namespace.is_none_or(|wanted| wanted == ns.as_str()))
            .flat_map(|(ns, by_name)| {
                by_name
                    .iter()
                    .map(move |(name, obj)| (ns.clone(), name.clone(), obj.clone()))
            })
            .collect();
        entries.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        entries
    }

    fn store(&self, gvr: &GVR, namespace: &str, name: &str, object: Value) {
        let mut objects = self.objects.write().unwrap();
        insert(&mut objects, gvr, namespace, name, object);
    }
}

impl Default for ObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(objects: &'a ObjectStorage, gvr: &GVR, namespace: &str, name: &str) -> Option<&'a Value> {
    objects
        .get(gvr)
        .and_then(|by_ns| by_ns.get(namespace))
        .and_then(|by_name| by_name.get(name))
}

fn insert(objects: &mut ObjectStorage, gvr: &GVR, namespace: &str, name: &str, object: Value) {
    objects
        .entry(gvr.clone())
        .or_default()
        .entry(namespace.to_string())
        .or_default()
        .insert(name.to_string(), object);
}

fn not_found(gvr: &GVR, namespace: &str, name: &str) -> Error {
    Error::NotFound {
        kind: gvr.resource.clone(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    }
}

fn extract_metadata(object: &Value) -> Result<ObjectMeta> {
    let meta_value = object
        .get("metadata")
        .ok_or_else(|| Error::MetadataError("Object missing metadata field".to_string()))?;

    serde_json::from_value(meta_value.clone())
        .map_err(|e| Error::MetadataError(format!("Failed to parse metadata: {}", e)))
}
