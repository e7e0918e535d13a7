//! Hooks for overriding or failing fake API server requests
//!
//! Each hook sees the request and the object store. Returning `Ok(Some(value))`
//! answers the request with `value`, `Ok(None)` lets the server handle it
//! normally, and `Err(e)` fails it with the HTTP status matching `e`.
//!
//! ```
//! use fake_shoots::{interceptor, Error};
//!
//! let funcs = interceptor::Funcs::new().create(|ctx| {
//!     if ctx.object["spec"]["region"] == "nowhere" {
//!         return Err(Error::Invalid("spec.region: unsupported".into()));
//!     }
//!     Ok(None)
//! });
//! ```

use crate::tracker::{ObjectTracker, GVR};
use crate::Result;
use kube::api::ListParams;
use serde_json::Value;
use std::sync::Arc;

#[derive(Default)]
pub struct Funcs {
    pub(crate) create: Option<CreateInterceptor>,
    pub(crate) get: Option<GetInterceptor>,
    pub(crate) replace: Option<ReplaceInterceptor>,
    pub(crate) delete: Option<DeleteInterceptor>,
    pub(crate) list: Option<ListInterceptor>,
}

/// Context passed to Create interceptors
pub struct CreateContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub resource: &'a GVR,
    /// The object being created
    pub object: &'a Value,
    pub namespace: &'a str,
}

/// Context passed to Get and Delete interceptors
pub struct NamedContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub resource: &'a GVR,
    pub namespace: &'a str,
    pub name: &'a str,
}

/// Context passed to Replace interceptors (PUT, including `/status`)
pub struct ReplaceContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub resource: &'a GVR,
    /// The replacement object
    pub object: &'a Value,
    pub namespace: &'a str,
    pub name: &'a str,
    pub is_status: bool,
}

pub struct ListContext<'a> {
    pub tracker: &'a ObjectTracker,
    pub resource: &'a GVR,
    pub namespace: Option<&'a str>,
    pub params: &'a ListParams,
}

pub type CreateInterceptor = Arc<dyn Fn(CreateContext) -> Result<Option<Value>> + Send + Sync>;
pub type GetInterceptor = Arc<dyn Fn(NamedContext) -> Result<Option<Value>> + Send + Sync>;
pub type ReplaceInterceptor = Arc<dyn Fn(ReplaceContext) -> Result<Option<Value>> + Send + Sync>;
pub type DeleteInterceptor = Arc<dyn Fn(NamedContext) -> Result<Option<Value>> + Send + Sync>;
pub type ListInterceptor = Arc<dyn Fn(ListContext) -> Result<Option<Vec<Value>>> + Send + Sync>;

impl Funcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create<F>(mut self, f: F) -> Self
    where
        F: Fn(CreateContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.create = Some(Arc::new(f));
        self
    }

    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(NamedContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(f));
        self
    }

    pub fn replace<F>(mut self, f: F) -> Self
    where
        F: Fn(ReplaceContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.replace = Some(Arc::new(f));
        self
    }

    pub fn delete<F>(mut self, f: F) -> Self
    where
        F: Fn(NamedContext) -> Result<Option<Value>> + Send + Sync + 'static,
    {
        self.delete = Some(Arc::new(f));
        self
    }

    /// Returned items still go through selector filtering.
    pub fn list<F>(mut self, f: F) -> Self
    where
        F: Fn(ListContext) -> Result<Option<Vec<Value>>> + Send + Sync + 'static,
    {
        self.list = Some(Arc::new(f));
        self
    }
}
