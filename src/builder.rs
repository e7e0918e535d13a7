//! Builder for `kube::Client`s backed by the in-memory API server

use crate::client_utils::{extract_gvk, extract_namespace, gvk_to_gvr};
use crate::interceptor;
use crate::mock_service::MockService;
use crate::registry::ResourceRegistry;
use crate::tracker::{ObjectTracker, GVK};
use crate::{Error, Result};
use kube::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Builder for fake clients
///
/// # Example
///
/// ```rust,no_run
/// use fake_shoots::{ClientBuilder, FakeShoots, Shoot};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ClientBuilder::new()
///     .with_resource::<Shoot>()
///     .with_fixture_dir("fixtures")
///     .load_fixture("shoots.yaml")?
///     .build()
///     .await?;
///
/// let shoots = FakeShoots::namespaced(client, "garden-dev");
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    initial_objects: Vec<Value>,
    with_status_subresource: Vec<GVK>,
    registry: ResourceRegistry,
    fixture_dir: Option<PathBuf>,
    interceptors: Option<interceptor::Funcs>,
    seed_errors: Vec<Error>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            initial_objects: Vec::new(),
            with_status_subresource: Vec::new(),
            registry: ResourceRegistry::new(),
            fixture_dir: None,
            interceptors: None,
            seed_errors: Vec::new(),
        }
    }

    /// Register a resource type with the server, like installing its CRD.
    ///
    /// Registration lets the server name list responses and fill in `kind` on
    /// bodies that omit it. Unregistered resources are still stored.
    pub fn with_resource<K: Resource<DynamicType = ()>>(self) -> Self {
        self.registry.register::<K>();
        self
    }

    /// Seed an object into the store when the client is built.
    ///
    /// Seeded objects keep their resource version, or get `999` if they have none.
    /// `apiVersion` and `kind` are filled in from `K` when the object omits them.
    pub fn with_object<K>(self, obj: K) -> Self
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        self.with_objects(vec![obj])
    }

    pub fn with_objects<K>(mut self, objects: Vec<K>) -> Self
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        for obj in objects {
            match seed_value(&obj) {
                Ok(value) => self.initial_objects.push(value),
                Err(e) => {
                    debug!("Initial object does not serialize: {}", e);
                    self.seed_errors.push(e);
                }
            }
        }
        self
    }

    pub fn with_runtime_objects(mut self, objects: Vec<Value>) -> Self {
        self.initial_objects.extend(objects);
        self
    }

    /// Split updates of `K` into main resource and `/status` subresource.
    ///
    /// With this enabled, a regular update keeps the stored status and a status
    /// update keeps everything else.
    pub fn with_status_subresource<K: Resource<DynamicType = ()>>(mut self) -> Self {
        self.with_status_subresource.push(GVK::new(
            K::group(&()),
            K::version(&()),
            K::kind(&()),
        ));
        self
    }

    pub fn with_interceptor_funcs(mut self, interceptors: interceptor::Funcs) -> Self {
        self.interceptors = Some(interceptors);
        self
    }

    /// Base directory for [`load_fixture`](Self::load_fixture) paths.
    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = Some(dir.into());
        self
    }

    /// Seed objects from a YAML file, one object per document.
    pub fn load_fixture(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let fixture_path = match &self.fixture_dir {
            Some(dir) => dir.join(path),
            None => path.as_ref().to_path_buf(),
        };

        let content = std::fs::read_to_string(&fixture_path).map_err(|e| {
            Error::Internal(format!(
                "Failed to read fixture file {:?}: {}",
                fixture_path, e
            ))
        })?;

        for document in serde_yaml::Deserializer::from_str(&content) {
            let value = Value::deserialize(document).map_err(|e| {
                Error::Internal(format!("Failed to parse YAML in {:?}: {}", fixture_path, e))
            })?;
            // Empty documents, e.g. a trailing `---`
            if value.is_null() {
                continue;
            }
            self.initial_objects.push(value);
        }

        Ok(self)
    }

    /// Like [`load_fixture`](Self::load_fixture), panicking on failure.
    pub fn load_fixture_or_panic(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        match self.load_fixture(&path) {
            Ok(builder) => builder,
            Err(e) => panic!("Failed to load fixture {:?}: {}", path, e),
        }
    }

    pub fn load_fixtures<P>(mut self, paths: impl IntoIterator<Item = P>) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.load_fixture(path)?;
        }
        Ok(self)
    }

    pub fn load_fixtures_or_panic<P>(mut self, paths: impl IntoIterator<Item = P>) -> Self
    where
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.load_fixture_or_panic(path);
        }
        self
    }

    /// Build a `kube::Client` whose requests are served from memory.
    ///
    /// # Errors
    ///
    /// Fails if an initial object did not serialize, or has no `apiVersion`,
    /// `kind` or name.
    pub async fn build(mut self) -> Result<kube::Client> {
        if !self.seed_errors.is_empty() {
            return Err(self.seed_errors.remove(0));
        }

        let tracker = ObjectTracker::new();
        for gvk in self.with_status_subresource {
            tracker.add_status_subresource(gvk);
        }

        for obj in self.initial_objects {
            let gvk = extract_gvk(&obj)?;
            let gvr = gvk_to_gvr(&gvk);
            if self.registry.kind_for(&gvr).is_none() {
                self.registry.register_gvk(&gvk);
            }
            let namespace = extract_namespace(&obj).unwrap_or("default").to_string();

            tracker
                .add(&gvr, obj, &namespace)
                .map_err(|e| Error::Internal(format!("Failed to add initial object: {}", e)))?;
        }

        let service = MockService::new(
            Arc::new(tracker),
            Arc::new(self.registry),
            self.interceptors.map(Arc::new),
        );

        Ok(kube::Client::new(service, "default"))
    }
}

/// Serialize a typed object, defaulting its type meta from `K`.
fn seed_value<K>(obj: &K) -> Result<Value>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut value = serde_json::to_value(obj)?;
    let Some(map) = value.as_object_mut() else {
        return Err(Error::InvalidRequest(format!(
            "initial {} must serialize to a JSON object",
            K::kind(&())
        )));
    };
    map.entry("apiVersion")
        .or_insert_with(|| Value::String(K::api_version(&()).into_owned()));
    map.entry("kind")
        .or_insert_with(|| Value::String(K::kind(&()).into_owned()));
    Ok(value)
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
