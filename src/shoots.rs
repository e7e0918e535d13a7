//! Typed Shoot client backed by a dynamic kube client
//!
//! [`FakeShoots`] gives provisioning code the typed [`ShootInterface`] without a
//! generated Gardener client. Storage goes through `Api<DynamicObject>` scoped to
//! `core.gardener.cloud/v1beta1, Resource=shoots`, so it works against any
//! API-server-compatible backend, including the in-memory one built by
//! [`ClientBuilder`](crate::ClientBuilder).
//!
//! Only the verbs provisioning tests need are forwarded. `update_status`,
//! `delete_collection`, `watch`, `patch` and `create_admin_kubeconfig_request`
//! succeed without doing anything and return no object.

use crate::conversion::{from_dynamic, list_from_dynamic, to_dynamic};
use crate::types::{AdminKubeconfigRequest, Shoot, ShootList};
use crate::{Error, Result};
use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::api::{
    Api, ApiResource, DeleteParams, DynamicObject, GetParams, ListParams, Patch, PatchParams,
    PostParams, WatchEvent, WatchParams,
};
use kube::Client;
use serde_json::Value;
use tracing::{debug, trace, warn};

/// Finalizer set on every Shoot created through [`FakeShoots`]
pub const SHOOT_FINALIZER: &str = "finalizer";

/// Stream of watch events for Shoots
pub type ShootWatchStream = BoxStream<'static, kube::Result<WatchEvent<Shoot>>>;

/// Typed operations on Gardener Shoots
#[async_trait]
pub trait ShootInterface: Send + Sync {
    async fn create(&self, shoot: &Shoot, pp: &PostParams) -> Result<Shoot>;

    async fn update(&self, shoot: &Shoot, pp: &PostParams) -> Result<Shoot>;

    async fn update_status(&self, shoot: &Shoot, pp: &PostParams) -> Result<Option<Shoot>>;

    async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<()>;

    async fn delete_collection(&self, dp: &DeleteParams, lp: &ListParams) -> Result<()>;

    async fn get(&self, name: &str, gp: &GetParams) -> Result<Shoot>;

    async fn list(&self, lp: &ListParams) -> Result<ShootList>;

    async fn watch(&self, wp: &WatchParams) -> Result<Option<ShootWatchStream>>;

    async fn patch(
        &self,
        name: &str,
        pp: &PatchParams,
        patch: &Patch<Value>,
        subresources: &[&str],
    ) -> Result<Option<Shoot>>;

    async fn create_admin_kubeconfig_request(
        &self,
        name: &str,
        request: &AdminKubeconfigRequest,
        pp: &PostParams,
    ) -> Result<Option<AdminKubeconfigRequest>>;
}

/// [`ShootInterface`] implementation forwarding to `Api<DynamicObject>`
#[derive(Clone)]
pub struct FakeShoots {
    api: Api<DynamicObject>,
}

impl FakeShoots {
    /// Shoots in a single namespace (a Gardener project namespace)
    pub fn namespaced(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced_with(client, namespace, &Self::api_resource()),
        }
    }

    /// Shoots addressed through the cluster-wide `shoots` endpoint
    pub fn all(client: Client) -> Self {
        Self {
            api: Api::all_with(client, &Self::api_resource()),
        }
    }

    /// Wrap an existing dynamic api
    pub fn from_api(api: Api<DynamicObject>) -> Self {
        Self { api }
    }

    pub fn api_resource() -> ApiResource {
        ApiResource::erase::<Shoot>(&())
    }
}

#[async_trait]
impl ShootInterface for FakeShoots {
    async fn create(&self, shoot: &Shoot, pp: &PostParams) -> Result<Shoot> {
        let mut shoot = shoot.clone();
        shoot.types = Some(Shoot::type_meta());
        shoot.metadata.finalizers = Some(vec![SHOOT_FINALIZER.to_string()]);
        trace!("Creating shoot: {:?}", shoot.metadata.name);

        let obj = to_dynamic(&shoot)?;
        let created = self.api.create(pp, &obj).await?;

        debug!("Created shoot: {:?}", created.metadata.name);
        from_dynamic(created)
    }

    async fn update(&self, shoot: &Shoot, pp: &PostParams) -> Result<Shoot> {
        let name = shoot.metadata.name.clone().ok_or_else(|| {
            Error::InvalidRequest("resource name is required for update".to_string())
        })?;
        trace!("Updating shoot: {}", name);

        let obj = to_dynamic(shoot)?;
        let updated = self.api.replace(&name, pp, &obj).await?;

        debug!("Updated shoot: {}", name);
        from_dynamic(updated)
    }

    async fn update_status(&self, shoot: &Shoot, _pp: &PostParams) -> Result<Option<Shoot>> {
        warn!(
            "Ignoring status update of shoot {:?}: not supported by the fake client",
            shoot.metadata.name
        );
        Ok(None)
    }

    async fn delete(&self, name: &str, dp: &DeleteParams) -> Result<()> {
        trace!("Deleting shoot: {}", name);
        self.api.delete(name, dp).await?;
        debug!("Deleted shoot: {}", name);
        Ok(())
    }

    async fn delete_collection(&self, _dp: &DeleteParams, lp: &ListParams) -> Result<()> {
        warn!(
            "Ignoring delete of shoot collection (labels: {:?}): not supported by the fake client",
            lp.label_selector
        );
        Ok(())
    }

    async fn get(&self, name: &str, gp: &GetParams) -> Result<Shoot> {
        trace!("Getting shoot: {}", name);
        let obj = self.api.get_with(name, gp).await?;
        from_dynamic(obj)
    }

    async fn list(&self, lp: &ListParams) -> Result<ShootList> {
        trace!("Listing shoots");
        let list = self.api.list(lp).await?;
        let shoots = list_from_dynamic(list)?;
        debug!("Listed {} shoots", shoots.items.len());
        Ok(shoots)
    }

    async fn watch(&self, _wp: &WatchParams) -> Result<Option<ShootWatchStream>> {
        warn!("Ignoring watch of shoots: not supported by the fake client");
        Ok(None)
    }

    async fn patch(
        &self,
        name: &str,
        _pp: &PatchParams,
        _patch: &Patch<Value>,
        subresources: &[&str],
    ) -> Result<Option<Shoot>> {
        warn!(
            "Ignoring patch of shoot {} (subresources: {:?}): not supported by the fake client",
            name, subresources
        );
        Ok(None)
    }

    async fn create_admin_kubeconfig_request(
        &self,
        name: &str,
        _request: &AdminKubeconfigRequest,
        _pp: &PostParams,
    ) -> Result<Option<AdminKubeconfigRequest>> {
        warn!(
            "Ignoring admin kubeconfig request for shoot {}: not supported by the fake client",
            name
        );
        Ok(None)
    }
}
