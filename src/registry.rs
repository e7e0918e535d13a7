//! Kinds known to the fake API server
//!
//! Request paths only carry the resource plural. The registry maps it back to
//! the kind so the server can default `kind`/`apiVersion` on request bodies and
//! name list responses the way a real server does (`ShootList`).

use crate::client_utils::pluralize;
use crate::tracker::{GVK, GVR};
use kube::Resource;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    kinds: RwLock<HashMap<GVR, String>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource type from its `Resource` implementation.
    pub fn register<K: Resource<DynamicType = ()>>(&self) {
        let gvr = GVR::new(K::group(&()), K::version(&()), K::plural(&()));
        self.insert(gvr, K::kind(&()).into_owned());
    }

    /// Register a kind whose plural follows the usual pluralization rules.
    pub fn register_gvk(&self, gvk: &GVK) {
        let gvr = GVR::new(gvk.group.clone(), gvk.version.clone(), pluralize(&gvk.kind));
        self.insert(gvr, gvk.kind.clone());
    }

    fn insert(&self, gvr: GVR, kind: String) {
        self.kinds
            .write()
            .expect("ResourceRegistry lock poisoned")
            .insert(gvr, kind);
    }

    pub fn kind_for(&self, gvr: &GVR) -> Option<String> {
        self.kinds
            .read()
            .expect("ResourceRegistry lock poisoned")
            .get(gvr)
            .cloned()
    }

    /// Kind for a resource, guessing from the plural for unregistered resources.
    pub fn kind_or_guess(&self, gvr: &GVR) -> String {
        self.kind_for(gvr)
            .unwrap_or_else(|| guess_kind(&gvr.resource))
    }
}

/// Best-effort singular, capitalised kind for an unregistered plural
fn guess_kind(resource: &str) -> String {
    let singular = if let Some(base) = resource.strip_suffix("ies") {
        format!("{}y", base)
    } else if ["ses", "xes", "zes", "ches", "shes"]
        .iter()
        .any(|suffix| resource.ends_with(suffix))
    {
        resource[..resource.len() - 2].to_string()
    } else if let Some(base) = resource.strip_suffix('s') {
        base.to_string()
    } else {
        resource.to_string()
    };

    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => singular,
    }
}
