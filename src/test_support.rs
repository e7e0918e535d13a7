//! Helpers shared by the unit tests

use crate::types::{
    Kubernetes, Machine, Networking, Provider, Shoot, ShootMachineImage, ShootSpec, Worker,
};
use crate::{ClientBuilder, FakeShoots};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

pub const NAMESPACE: &str = "garden-dev";

/// Route `tracing` output through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn shoot(name: &str) -> Shoot {
    let mut shoot = Shoot::new(
        name,
        ShootSpec {
            cloud_profile_name: Some("aws".to_string()),
            region: "eu-central-1".to_string(),
            secret_binding_name: Some("aws-credentials".to_string()),
            purpose: Some("evaluation".to_string()),
            kubernetes: Kubernetes {
                version: "1.30.4".to_string(),
                ..Default::default()
            },
            networking: Some(Networking {
                type_: Some("calico".to_string()),
                nodes: Some("10.250.0.0/16".to_string()),
                ..Default::default()
            }),
            provider: Provider {
                type_: "aws".to_string(),
                workers: vec![Worker {
                    name: "cpu-worker".to_string(),
                    machine: Machine {
                        type_: "m5.large".to_string(),
                        image: Some(ShootMachineImage {
                            name: "gardenlinux".to_string(),
                            version: Some("1443.3.0".to_string()),
                        }),
                    },
                    minimum: 1,
                    maximum: 3,
                    zones: vec!["eu-central-1a".to_string()],
                    ..Default::default()
                }],
            },
            ..Default::default()
        },
    );
    shoot.metadata.namespace = Some(NAMESPACE.to_string());
    shoot.metadata.labels = Some(BTreeMap::from([(
        "provisioner".to_string(),
        "test".to_string(),
    )]));
    shoot
}

pub async fn fake_shoots() -> FakeShoots {
    fake_shoots_with(ClientBuilder::new()).await
}

pub async fn fake_shoots_with(builder: ClientBuilder) -> FakeShoots {
    init_tracing();
    let client = builder.with_resource::<Shoot>().build().await.unwrap();
    FakeShoots::namespaced(client, NAMESPACE)
}
