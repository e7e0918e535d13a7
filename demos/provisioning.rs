//! Shoot provisioning against the fake client
//!
//! Provisioning code depends only on `ShootInterface`, so the same logic runs
//! against a real Gardener client in production and `FakeShoots` in tests.

use fake_shoots::types::{Kubernetes, Provider};
use fake_shoots::{ClientBuilder, FakeShoots, Shoot, ShootInterface, ShootSpec};
use kube::api::{DeleteParams, GetParams, ListParams, PostParams};
use tracing_subscriber::EnvFilter;

/// Desired state of a shoot, as a user would request it
pub struct ShootRequest {
    pub name: String,
    pub region: String,
    pub kubernetes_version: String,
}

pub struct Provisioner<S: ShootInterface> {
    shoots: S,
}

impl<S: ShootInterface> Provisioner<S> {
    pub fn new(shoots: S) -> Self {
        Self { shoots }
    }

    /// Create the shoot, or bring an existing one to the requested version.
    pub async fn ensure(&self, request: &ShootRequest) -> fake_shoots::Result<Shoot> {
        match self.shoots.get(&request.name, &GetParams::default()).await {
            Ok(mut existing) => {
                if existing.spec.kubernetes.version == request.kubernetes_version {
                    return Ok(existing);
                }
                existing.spec.kubernetes.version = request.kubernetes_version.clone();
                self.shoots.update(&existing, &PostParams::default()).await
            }
            Err(e) if e.is_not_found() => {
                let shoot = Shoot::new(
                    &request.name,
                    ShootSpec {
                        cloud_profile_name: Some("aws".to_string()),
                        region: request.region.clone(),
                        secret_binding_name: Some("aws-credentials".to_string()),
                        kubernetes: Kubernetes {
                            version: request.kubernetes_version.clone(),
                            ..Default::default()
                        },
                        provider: Provider {
                            type_: "aws".to_string(),
                            ..Default::default()
                        },
                        ..Default::default()
                    },
                );
                self.shoots.create(&shoot, &PostParams::default()).await
            }
            Err(e) => Err(e),
        }
    }

    /// Delete every shoot in the project, returning how many were removed.
    pub async fn teardown(&self) -> fake_shoots::Result<usize> {
        let shoots = self.shoots.list(&ListParams::default()).await?;
        for shoot in &shoots.items {
            if let Some(name) = &shoot.metadata.name {
                self.shoots.delete(name, &DeleteParams::default()).await?;
            }
        }
        Ok(shoots.items.len())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = ClientBuilder::new()
        .with_resource::<Shoot>()
        .with_fixture_dir("fixtures")
        .load_fixture("shoots.yaml")?
        .build()
        .await?;
    let provisioner = Provisioner::new(FakeShoots::namespaced(client, "garden-dev"));

    // Existing shoot, upgraded in place
    let dev = provisioner
        .ensure(&ShootRequest {
            name: "dev".to_string(),
            region: "eu-central-1".to_string(),
            kubernetes_version: "1.31.1".to_string(),
        })
        .await?;
    println!(
        "Upgraded {:?} to Kubernetes {} (resourceVersion {:?})",
        dev.metadata.name, dev.spec.kubernetes.version, dev.metadata.resource_version
    );

    // New shoot
    let staging = provisioner
        .ensure(&ShootRequest {
            name: "staging".to_string(),
            region: "eu-west-1".to_string(),
            kubernetes_version: "1.31.1".to_string(),
        })
        .await?;
    println!(
        "Created {:?} with finalizers {:?}",
        staging.metadata.name, staging.metadata.finalizers
    );

    let removed = provisioner.teardown().await?;
    println!("Removed {} shoots", removed);

    Ok(())
}
