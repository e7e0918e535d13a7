//! Conversion between typed resources and the dynamic form the backing client speaks

use crate::types::{Shoot, ShootList};
use crate::Result;
use kube::core::{DynamicObject, ObjectList, TypeMeta};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Convert a typed object into a `DynamicObject`.
///
/// Every field the typed schema knows about ends up either in the typed
/// metadata or in the JSON payload of the dynamic object.
pub fn to_dynamic<K: Serialize>(obj: &K) -> Result<DynamicObject> {
    let value = serde_json::to_value(obj)?;
    Ok(serde_json::from_value(value)?)
}

/// Convert a `DynamicObject` returned by the backing client into a typed object.
pub fn from_dynamic<K: DeserializeOwned>(obj: DynamicObject) -> Result<K> {
    let value = serde_json::to_value(obj)?;
    Ok(serde_json::from_value(value)?)
}

/// Convert a dynamic list into a `ShootList`.
///
/// Fails on the first item that doesn't convert; no partial list is returned.
pub fn list_from_dynamic(list: ObjectList<DynamicObject>) -> Result<ShootList> {
    let items = list
        .items
        .into_iter()
        .map(from_dynamic::<Shoot>)
        .collect::<Result<Vec<_>>>()?;

    let item_types = Shoot::type_meta();
    Ok(ShootList {
        types: Some(TypeMeta {
            api_version: item_types.api_version,
            kind: format!("{}List", item_types.kind),
        }),
        metadata: list.metadata,
        items,
    })
}
