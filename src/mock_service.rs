//! Tower service that answers Kubernetes REST requests from an in-memory store
//!
//! `kube::Client` sends its requests here instead of over the network. Errors
//! are returned as `Status` bodies with the HTTP code a real API server would
//! use, so callers see ordinary `kube::Error::Api` values.

use crate::client_utils::{api_version, extract_gvk};
use crate::error::Error;
use crate::interceptor;
use crate::registry::ResourceRegistry;
use crate::selectors::{matches_fields, matches_labels};
use crate::tracker::{ObjectTracker, GVR};
use crate::Result;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http::{Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use kube::api::ListParams;
use kube::client::Body as KubeBody;
use serde_json::{json, Value};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;
use tracing::{debug, trace};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Parsed Kubernetes API path
#[derive(Debug, PartialEq)]
pub(crate) struct ParsedPath {
    pub(crate) group: String,
    pub(crate) version: String,
    pub(crate) namespace: Option<String>,
    pub(crate) resource: String,
    pub(crate) name: Option<String>,
    pub(crate) subresource: Option<String>,
}

impl ParsedPath {
    pub(crate) fn gvr(&self) -> GVR {
        GVR::new(self.group.clone(), self.version.clone(), self.resource.clone())
    }

    /// Storage namespace; cluster-wide requests use the empty namespace
    fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    pub(crate) fn is_status(&self) -> bool {
        self.subresource.as_deref() == Some("status")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::enum_variant_names)]
enum PatchType {
    /// RFC 6902, `application/json-patch+json`
    JsonPatch,
    /// RFC 7386, `application/merge-patch+json`
    MergePatch,
    /// `application/strategic-merge-patch+json`, applied as a merge patch
    StrategicMergePatch,
    /// `application/apply-patch+yaml`, applied as a merge patch
    ApplyPatch,
}

/// HTTP service routing requests to the object tracker
#[derive(Clone)]
pub struct MockService {
    tracker: Arc<ObjectTracker>,
    registry: Arc<ResourceRegistry>,
    interceptors: Option<Arc<interceptor::Funcs>>,
}

impl MockService {
    pub fn new(
        tracker: Arc<ObjectTracker>,
        registry: Arc<ResourceRegistry>,
        interceptors: Option<Arc<interceptor::Funcs>>,
    ) -> Self {
        Self {
            tracker,
            registry,
            interceptors,
        }
    }

    /// Parse a request path.
    ///
    /// - `/api/v1/namespaces/default/configmaps[/name]`
    /// - `/apis/core.gardener.cloud/v1beta1/namespaces/garden-dev/shoots[/name[/status]]`
    /// - `/apis/core.gardener.cloud/v1beta1/shoots[/name[/status]]`
    pub(crate) fn parse_path(path: &str) -> Option<ParsedPath> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let (group, rest) = match parts.as_slice() {
            ["api", rest @ ..] => ("", rest),
            ["apis", group, rest @ ..] => (*group, rest),
            _ => return None,
        };

        let (version, namespace, tail) = match rest {
            [version, "namespaces", namespace, tail @ ..] if !tail.is_empty() => {
                (*version, Some(namespace.to_string()), tail)
            }
            [version, tail @ ..] => (*version, None, tail),
            [] => return None,
        };

        let (resource, name, subresource) = match tail {
            [resource] => (*resource, None, None),
            [resource, name] => (*resource, Some(name.to_string()), None),
            [resource, name, subresource] => (
                *resource,
                Some(name.to_string()),
                Some(subresource.to_string()),
            ),
            _ => return None,
        };

        Some(ParsedPath {
            group: group.to_string(),
            version: version.to_string(),
            namespace,
            resource: resource.to_string(),
            name,
            subresource,
        })
    }

    pub(crate) fn parse_list_params(query: Option<&str>) -> ListParams {
        let mut params = ListParams::default();

        for pair in query.unwrap_or_default().split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            // Form encoding: `+` is a space, a literal plus arrives as %2B
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.clone());

            match key {
                "labelSelector" => params.label_selector = Some(value),
                "fieldSelector" => params.field_selector = Some(value),
                "limit" => params.limit = value.parse().ok(),
                "continue" => params.continue_token = Some(value),
                "resourceVersion" => params.resource_version = Some(value),
                "timeoutSeconds" => params.timeout = value.parse().ok(),
                _ => {}
            }
        }

        params
    }

    pub(crate) fn is_watch(query: Option<&str>) -> bool {
        query
            .unwrap_or_default()
            .split('&')
            .any(|pair| pair == "watch=true" || pair == "watch=1")
    }

    fn determine_patch_type(content_type: Option<&str>) -> PatchType {
        match content_type {
            Some(ct) if ct.contains("application/json-patch+json") => PatchType::JsonPatch,
            Some(ct) if ct.contains("application/merge-patch+json") => PatchType::MergePatch,
            Some(ct) if ct.contains("application/apply-patch+yaml") => PatchType::ApplyPatch,
            _ => PatchType::StrategicMergePatch,
        }
    }

    fn apply_patch(existing: &mut Value, patch: &Value, patch_type: PatchType) -> Result<()> {
        match patch_type {
            PatchType::JsonPatch => {
                let ops: json_patch::Patch = serde_json::from_value(patch.clone())?;
                json_patch::patch(existing, &ops)?;
            }
            PatchType::MergePatch | PatchType::StrategicMergePatch | PatchType::ApplyPatch => {
                json_patch::merge(existing, patch);
            }
        }
        Ok(())
    }

    /// Fill in `apiVersion` and `kind` from the request path when the body omits them.
    fn default_type_meta(&self, parsed: &ParsedPath, obj: &mut Value) -> Result<()> {
        if !obj.is_object() {
            return Err(Error::InvalidRequest(
                "request body must be a JSON object".to_string(),
            ));
        }
        if obj.get("apiVersion").is_none() {
            obj["apiVersion"] = json!(api_version(&parsed.group, &parsed.version));
        }
        if obj.get("kind").is_none() {
            obj["kind"] = json!(self.registry.kind_or_guess(&parsed.gvr()));
        }
        Ok(())
    }

    async fn handle_request(&self, req: Request<KubeBody>) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(|s| s.to_string());
        let content_type = req
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        trace!("{} {}", method, path);

        let result = match req.into_body().collect().await {
            Ok(collected) => {
                self.route(
                    &method,
                    &path,
                    query.as_deref(),
                    content_type.as_deref(),
                    collected.to_bytes(),
                )
            }
            Err(e) => Err(Error::InvalidRequest(format!("failed to read body: {}", e))),
        };

        match result {
            Ok(value) => Self::success_response(value),
            Err(e) => {
                debug!("{} {} failed: {}", method, path, e);
                Self::error_response(e)
            }
        }
    }

    fn route(
        &self,
        method: &Method,
        path: &str,
        query: Option<&str>,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<Value> {
        let parsed = Self::parse_path(path)
            .ok_or_else(|| Error::InvalidRequest(format!("unsupported path: {}", path)))?;

        match (method, parsed.name.is_some()) {
            (&Method::GET, true) => self.handle_get(&parsed),
            (&Method::GET, false) if Self::is_watch(query) => Err(Error::InvalidRequest(
                "watch is not supported by the fake API server".to_string(),
            )),
            (&Method::GET, false) => self.handle_list(&parsed, &Self::parse_list_params(query)),
            (&Method::POST, false) => self.handle_post(&parsed, &body),
            (&Method::PUT, true) => self.handle_put(&parsed, &body),
            (&Method::PATCH, true) => self.handle_patch(&parsed, &body, content_type),
            (&Method::DELETE, true) => self.handle_delete(&parsed),
            (&Method::DELETE, false) => {
                self.handle_delete_collection(&parsed, &Self::parse_list_params(query))
            }
            _ => Err(Error::InvalidRequest(format!(
                "{} is not supported on {}",
                method, path
            ))),
        }
    }

    fn handle_get(&self, parsed: &ParsedPath) -> Result<Value> {
        let gvr = parsed.gvr();
        let namespace = parsed.namespace();
        let name = parsed.name.as_deref().unwrap_or_default();

        if let Some(hook) = self.interceptors.as_ref().and_then(|f| f.get.as_ref()) {
            let ctx = interceptor::NamedContext {
                tracker: &self.tracker,
                resource: &gvr,
                namespace,
                name,
            };
            if let Some(obj) = hook(ctx)? {
                return Ok(obj);
            }
        }

        self.tracker.get(&gvr, namespace, name)
    }

    fn handle_list(&self, parsed: &ParsedPath, params: &ListParams) -> Result<Value> {
        let gvr = parsed.gvr();

        let intercepted = match self.interceptors.as_ref().and_then(|f| f.list.as_ref()) {
            Some(hook) => hook(interceptor::ListContext {
                tracker: &self.tracker,
                resource: &gvr,
                namespace: parsed.namespace.as_deref(),
                params,
            })?,
            None => None,
        };
        let objects = match intercepted {
            Some(objects) => objects,
            None => self.tracker.list(&gvr, parsed.namespace.as_deref()),
        };

        let mut items = Vec::with_capacity(objects.len());
        for obj in objects {
            if Self::selected(&obj, params)? {
                items.push(obj);
            }
        }

        let (items, remaining) = Self::paginate(items, params)?;
        let mut response = self.list_response(parsed, items);
        if let Some((token, count)) = remaining {
            response["metadata"]["continue"] = json!(token);
            response["metadata"]["remainingItemCount"] = json!(count);
        }
        Ok(response)
    }

    /// Apply `limit` and `continue` to a sorted item list.
    ///
    /// The continue token is the offset of the next page. A limit of 0 means no
    /// limit. Returns the page and, when more items follow, the token for the
    /// next page with the number of items left after this one.
    pub(crate) fn paginate(
        items: Vec<Value>,
        params: &ListParams,
    ) -> Result<(Vec<Value>, Option<(String, usize)>)> {
        let offset = match params.continue_token.as_deref() {
            None | Some("") => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                Error::InvalidRequest(format!("invalid continue token: {}", token))
            })?,
        };
        let mut page: Vec<Value> = items.into_iter().skip(offset).collect();

        match params.limit {
            Some(limit) if limit > 0 && page.len() > limit as usize => {
                let limit = limit as usize;
                let remaining = page.len() - limit;
                page.truncate(limit);
                Ok((page, Some(((offset + limit).to_string(), remaining))))
            }
            _ => Ok((page, None)),
        }
    }

    fn selected(obj: &Value, params: &ListParams) -> Result<bool> {
        if let Some(selector) = &params.label_selector {
            if !matches_labels(obj, selector)? {
                return Ok(false);
            }
        }
        if let Some(selector) = &params.field_selector {
            if !matches_fields(obj, selector)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn list_response(&self, parsed: &ParsedPath, items: Vec<Value>) -> Value {
        let resource_version = items
            .iter()
            .filter_map(|obj| obj["metadata"]["resourceVersion"].as_str())
            .filter_map(|rv| rv.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        json!({
            "apiVersion": api_version(&parsed.group, &parsed.version),
            "kind": format!("{}List", self.registry.kind_or_guess(&parsed.gvr())),
            "metadata": { "resourceVersion": resource_version.to_string() },
            "items": items,
        })
    }

    fn handle_post(&self, parsed: &ParsedPath, body: &[u8]) -> Result<Value> {
        let gvr = parsed.gvr();
        let namespace = parsed.namespace();

        let mut obj: Value = serde_json::from_slice(body)?;
        self.default_type_meta(parsed, &mut obj)?;
        let gvk = extract_gvk(&obj)?;

        if let Some(hook) = self.interceptors.as_ref().and_then(|f| f.create.as_ref()) {
            let ctx = interceptor::CreateContext {
                tracker: &self.tracker,
                resource: &gvr,
                object: &obj,
                namespace,
            };
            if let Some(created) = hook(ctx)? {
                return Ok(created);
            }
        }

        self.tracker.create(&gvr, &gvk, obj, namespace)
    }

    fn handle_put(&self, parsed: &ParsedPath, body: &[u8]) -> Result<Value> {
        let gvr = parsed.gvr();
        let namespace = parsed.namespace();
        let name = parsed.name.as_deref().unwrap_or_default();

        let mut obj: Value = serde_json::from_slice(body)?;
        self.default_type_meta(parsed, &mut obj)?;
        let gvk = extract_gvk(&obj)?;

        match obj.get("metadata") {
            None | Some(Value::Null) => obj["metadata"] = json!({}),
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(Error::InvalidRequest(
                    "metadata must be a JSON object".to_string(),
                ))
            }
        }

        match obj["metadata"]["name"].as_str() {
            Some(body_name) if body_name != name => {
                return Err(Error::InvalidRequest(format!(
                    "the name of the object ({}) does not match the name on the URL ({})",
                    body_name, name
                )));
            }
            Some(_) => {}
            None => obj["metadata"]["name"] = json!(name),
        }

        if let Some(hook) = self.interceptors.as_ref().and_then(|f| f.replace.as_ref()) {
            let ctx = interceptor::ReplaceContext {
                tracker: &self.tracker,
                resource: &gvr,
                object: &obj,
                namespace,
                name,
                is_status: parsed.is_status(),
            };
            if let Some(updated) = hook(ctx)? {
                return Ok(updated);
            }
        }

        self.tracker
            .update(&gvr, &gvk, obj, namespace, parsed.is_status())
    }

    fn handle_patch(
        &self,
        parsed: &ParsedPath,
        body: &[u8],
        content_type: Option<&str>,
    ) -> Result<Value> {
        let gvr = parsed.gvr();
        let namespace = parsed.namespace();
        let name = parsed.name.as_deref().unwrap_or_default();

        let patch: Value = serde_json::from_slice(body)?;
        let mut patched = self.tracker.get(&gvr, namespace, name)?;
        Self::apply_patch(&mut patched, &patch, Self::determine_patch_type(content_type))?;

        let gvk = extract_gvk(&patched)?;
        self.tracker
            .update(&gvr, &gvk, patched, namespace, parsed.is_status())
    }

    fn handle_delete(&self, parsed: &ParsedPath) -> Result<Value> {
        let gvr = parsed.gvr();
        let namespace = parsed.namespace();
        let name = parsed.name.as_deref().unwrap_or_default();

        if let Some(hook) = self.interceptors.as_ref().and_then(|f| f.delete.as_ref()) {
            let ctx = interceptor::NamedContext {
                tracker: &self.tracker,
                resource: &gvr,
                namespace,
                name,
            };
            if let Some(deleted) = hook(ctx)? {
                return Ok(deleted);
            }
        }

        self.tracker.delete(&gvr, namespace, name)
    }

    fn handle_delete_collection(&self, parsed: &ParsedPath, params: &ListParams) -> Result<Value> {
        let gvr = parsed.gvr();

        let mut deleted = Vec::new();
        for (namespace, name, obj) in self.tracker.list_entries(&gvr, parsed.namespace.as_deref()) {
            if Self::selected(&obj, params)? {
                deleted.push(self.tracker.delete(&gvr, &namespace, &name)?);
            }
        }

        Ok(self.list_response(parsed, deleted))
    }

    fn error_response(err: Error) -> Response<Full<Bytes>> {
        let (message, reason, code) = match err.into_kube_err() {
            kube::Error::Api(resp) => (resp.message, resp.reason, resp.code),
            other => (other.to_string(), "InternalError".to_string(), 500),
        };
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": message,
            "reason": reason,
            "code": status.as_u16(),
        });
        Self::json_response(status, &body)
    }

    fn success_response(data: Value) -> Response<Full<Bytes>> {
        Self::json_response(StatusCode::OK, &data)
    }

    fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl Service<Request<KubeBody>> for MockService {
    type Response = Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<KubeBody>) -> Self::Future {
        let this = self.clone();
        async move { Ok(this.handle_request(req).await) }.boxed()
    }
}
