use crate::tracker::{GVK, GVR};
use crate::{Error, Result};
use kube::api::{ApiResource, GroupVersionKind};
use serde_json::Value;

/// `apiVersion` string for a group/version pair (core group has no prefix)
pub fn api_version(group: &str, version: &str) -> String {
    if group.is_empty() {
        version.to_string()
    } else {
        format!("{}/{}", group, version)
    }
}

/// Resource plural for a kind, using kube's pluralization rules
pub fn pluralize(kind: &str) -> String {
    ApiResource::from_gvk(&GroupVersionKind::gvk("", "", kind)).plural
}

pub fn gvk_to_gvr(gvk: &GVK) -> GVR {
    GVR::new(gvk.group.clone(), gvk.version.clone(), pluralize(&gvk.kind))
}

pub fn extract_gvk(value: &Value) -> Result<GVK> {
    let api_version = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::InvalidRequest("Missing apiVersion".to_string()))?;

    let kind = value
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::InvalidRequest("Missing kind".to_string()))?;

    let (group, version) = match api_version.split_once('/') {
        Some((g, v)) => (g, v),
        None => ("", api_version),
    };

    Ok(GVK::new(group, version, kind))
}

/// Namespace recorded in an object's metadata, if any
pub fn extract_namespace(value: &Value) -> Option<&str> {
    value
        .get("metadata")
        .and_then(|m| m.get("namespace"))
        .and_then(|n| n.as_str())
}
