use crate::{Error, Result};
use chrono::SecondsFormat;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Resource version given to objects seeded through the builder
pub const SEEDED_RESOURCE_VERSION: &str = "999";

pub fn increment_resource_version(current: &str) -> Result<String> {
    match current {
        "" => Ok("1".to_string()),
        SEEDED_RESOURCE_VERSION => Ok("1000".to_string()),
        v => {
            let num: u64 = v
                .parse()
                .map_err(|_| Error::Internal(format!("Invalid resource version: {}", v)))?;
            num.checked_add(1)
                .map(|next| next.to_string())
                .ok_or_else(|| Error::Internal(format!("Resource version overflow: {}", v)))
        }
    }
}

/// Fill in the metadata an API server owns: namespace, uid and creation timestamp.
pub fn ensure_metadata(meta: &mut ObjectMeta, namespace: &str) -> Result<()> {
    // Cluster-wide requests keep whatever namespace the object carries
    if !namespace.is_empty() {
        meta.namespace = Some(namespace.to_string());
    }
    if meta.creation_timestamp.is_none() {
        let now = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        meta.creation_timestamp = Some(serde_json::from_value(serde_json::Value::String(now))?);
    }
    if meta.uid.is_none() {
        meta.uid = Some(uuid::Uuid::new_v4().to_string());
    }
    Ok(())
}

pub fn object_name(meta: &ObjectMeta) -> Result<String> {
    meta.name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::Invalid("metadata.name: Required value: name is required".to_string()))
}
