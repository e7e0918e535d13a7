//! Typed Gardener Shoot client for tests, backed by a dynamic kube client.
//!
//! [`FakeShoots`] implements [`ShootInterface`] by converting [`Shoot`]s to
//! `DynamicObject`s and forwarding them to `kube::Api<DynamicObject>`. Point it at
//! any API-server-compatible `kube::Client`; [`ClientBuilder`] provides an
//! in-memory one.
//!
//! # Example
//!
//! ```rust
//! use fake_shoots::{ClientBuilder, FakeShoots, Shoot, ShootInterface, ShootSpec};
//! use kube::api::{GetParams, PostParams};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::new().with_resource::<Shoot>().build().await?;
//! let shoots = FakeShoots::namespaced(client, "garden-dev");
//!
//! let shoot = Shoot::new(
//!     "dev",
//!     ShootSpec {
//!         region: "eu-west-1".to_string(),
//!         ..Default::default()
//!     },
//! );
//! shoots.create(&shoot, &PostParams::default()).await?;
//!
//! let stored = shoots.get("dev", &GetParams::default()).await?;
//! assert_eq!(stored.metadata.finalizers, Some(vec!["finalizer".to_string()]));
//! # Ok(())
//! # }
//! ```

mod builder;
mod client_utils;
pub mod conversion;
mod error;
pub mod interceptor;
mod mock_service;
mod registry;
pub mod selectors;
mod shoots;
mod tracker;
pub mod types;
mod utils;

#[cfg(test)]
mod selectors_test;
#[cfg(test)]
mod shoots_test;
#[cfg(test)]
mod test_support;

pub use builder::ClientBuilder;
pub use error::{Error, Result};
pub use kube::Client;
pub use shoots::{FakeShoots, ShootInterface, ShootWatchStream, SHOOT_FINALIZER};
pub use tracker::{ObjectTracker, GVK, GVR};
pub use types::{AdminKubeconfigRequest, Shoot, ShootList, ShootSpec, ShootStatus};
