#[cfg(test)]
mod tests {
    use crate::interceptor;
    use crate::shoots::{FakeShoots, ShootInterface, SHOOT_FINALIZER};
    use crate::test_support::{fake_shoots, fake_shoots_with, init_tracing, shoot, NAMESPACE};
    use crate::types::{AdminKubeconfigRequest, Shoot};
    use crate::{ClientBuilder, Error};
    use kube::api::{DeleteParams, GetParams, ListParams, Patch, PatchParams, PostParams, WatchParams};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn names(list: &crate::ShootList) -> BTreeSet<String> {
        list.items
            .iter()
            .filter_map(|s| s.metadata.name.clone())
            .collect()
    }

    fn api_error_code(err: &Error) -> Option<u16> {
        match err {
            Error::Kube(kube::Error::Api(resp)) => Some(resp.code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_adds_finalizer_and_type_meta() {
        let shoots = fake_shoots().await;
        let input = shoot("dev");

        let created = shoots.create(&input, &PostParams::default()).await.unwrap();
        let fetched = shoots.get("dev", &GetParams::default()).await.unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.types, Some(Shoot::type_meta()));
        assert_eq!(
            fetched.metadata.finalizers,
            Some(vec![SHOOT_FINALIZER.to_string()])
        );

        // Everything else the caller sent comes back unchanged
        assert_eq!(fetched.spec, input.spec);
        assert_eq!(fetched.status, input.status);
        assert_eq!(fetched.metadata.name, input.metadata.name);
        assert_eq!(fetched.metadata.namespace, input.metadata.namespace);
        assert_eq!(fetched.metadata.labels, input.metadata.labels);

        // Server-owned metadata
        assert_eq!(fetched.metadata.resource_version.as_deref(), Some("1"));
        assert!(fetched.metadata.uid.is_some());
        assert!(fetched.metadata.creation_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_create_replaces_existing_finalizers() {
        let shoots = fake_shoots().await;
        let mut input = shoot("dev");
        input.metadata.finalizers = Some(vec!["gardener".to_string()]);

        let created = shoots.create(&input, &PostParams::default()).await.unwrap();

        assert_eq!(
            created.metadata.finalizers,
            Some(vec![SHOOT_FINALIZER.to_string()])
        );
        // The caller's object is left alone
        assert_eq!(input.metadata.finalizers, Some(vec!["gardener".to_string()]));
        assert!(input.types.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_propagates_already_exists() {
        let shoots = fake_shoots().await;
        shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        let err = shoots
            .create(&shoot("dev"), &PostParams::default())
            .await
            .unwrap_err();

        assert_eq!(api_error_code(&err), Some(409));
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_update_then_get_reflects_update() {
        let shoots = fake_shoots().await;
        let mut created = shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        created.spec.kubernetes.version = "1.31.1".to_string();
        created.spec.provider.workers[0].maximum = 5;
        let updated = shoots.update(&created, &PostParams::default()).await.unwrap();
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));

        let fetched = shoots.get("dev", &GetParams::default()).await.unwrap();
        assert_eq!(fetched.spec.kubernetes.version, "1.31.1");
        assert_eq!(fetched.spec.provider.workers[0].maximum, 5);
        assert_eq!(fetched.metadata.uid, created.metadata.uid);
    }

    #[tokio::test]
    async fn test_update_with_stale_resource_version_conflicts() {
        let shoots = fake_shoots().await;
        let created = shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        let mut first = created.clone();
        first.spec.purpose = Some("production".to_string());
        shoots.update(&first, &PostParams::default()).await.unwrap();

        let mut stale = created;
        stale.spec.purpose = Some("development".to_string());
        let err = shoots.update(&stale, &PostParams::default()).await.unwrap_err();

        assert_eq!(api_error_code(&err), Some(409));
    }

    #[tokio::test]
    async fn test_update_missing_shoot_propagates_not_found() {
        let shoots = fake_shoots().await;

        let err = shoots
            .update(&shoot("missing"), &PostParams::default())
            .await
            .unwrap_err();

        assert_eq!(api_error_code(&err), Some(404));
    }

    #[tokio::test]
    async fn test_update_without_name_is_rejected() {
        let shoots = fake_shoots().await;
        let mut nameless = shoot("dev");
        nameless.metadata.name = None;

        let err = shoots
            .update(&nameless, &PostParams::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let shoots = fake_shoots().await;
        shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        shoots.delete("dev", &DeleteParams::default()).await.unwrap();

        let err = shoots.get("dev", &GetParams::default()).await.unwrap_err();
        assert_eq!(api_error_code(&err), Some(404));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_missing_propagates_not_found() {
        let shoots = fake_shoots().await;

        let err = shoots
            .delete("missing", &DeleteParams::default())
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_returns_created_shoots_in_any_creation_order() {
        let orders = [["alpha", "bravo", "charlie"], ["charlie", "alpha", "bravo"]];
        let expected: BTreeSet<String> = orders[0].iter().map(|s| s.to_string()).collect();

        for order in orders {
            let shoots = fake_shoots().await;
            for name in order {
                shoots.create(&shoot(name), &PostParams::default()).await.unwrap();
            }

            let list = shoots.list(&ListParams::default()).await.unwrap();

            assert_eq!(list.items.len(), 3);
            assert_eq!(names(&list), expected);
            assert_eq!(
                list.types.as_ref().map(|t| t.kind.as_str()),
                Some("ShootList")
            );
        }
    }

    #[tokio::test]
    async fn test_list_excludes_other_namespaces() {
        init_tracing();
        let client = ClientBuilder::new()
            .with_resource::<Shoot>()
            .build()
            .await
            .unwrap();
        let dev = FakeShoots::namespaced(client.clone(), NAMESPACE);
        let other = FakeShoots::namespaced(client.clone(), "garden-other");

        dev.create(&shoot("dev"), &PostParams::default()).await.unwrap();
        let mut foreign = shoot("foreign");
        foreign.metadata.namespace = Some("garden-other".to_string());
        other.create(&foreign, &PostParams::default()).await.unwrap();

        let list = dev.list(&ListParams::default()).await.unwrap();
        assert_eq!(names(&list), BTreeSet::from(["dev".to_string()]));

        let everything = FakeShoots::all(client).list(&ListParams::default()).await.unwrap();
        assert_eq!(everything.items.len(), 2);
    }

    #[tokio::test]
    async fn test_list_empty() {
        let shoots = fake_shoots().await;

        let list = shoots.list(&ListParams::default()).await.unwrap();

        assert!(list.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_with_selectors() {
        let shoots = fake_shoots().await;

        let mut labelled = shoot("labelled");
        labelled.spec.seed_name = Some("aws-eu1".to_string());
        shoots.create(&labelled, &PostParams::default()).await.unwrap();

        let mut unlabelled = shoot("unlabelled");
        unlabelled.metadata.labels = None;
        shoots.create(&unlabelled, &PostParams::default()).await.unwrap();

        let by_label = shoots
            .list(&ListParams::default().labels("provisioner=test"))
            .await
            .unwrap();
        assert_eq!(names(&by_label), BTreeSet::from(["labelled".to_string()]));

        let by_seed = shoots
            .list(&ListParams::default().fields("spec.seedName=aws-eu1"))
            .await
            .unwrap();
        assert_eq!(names(&by_seed), BTreeSet::from(["labelled".to_string()]));
    }

    #[tokio::test]
    async fn test_list_conversion_failure_returns_error() {
        let broken = json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": { "name": "broken", "namespace": NAMESPACE },
            "spec": "not-a-shoot-spec"
        });
        let funcs = interceptor::Funcs::new().list(move |_| Ok(Some(vec![broken.clone()])));
        let shoots = fake_shoots_with(ClientBuilder::new().with_interceptor_funcs(funcs)).await;

        let err = shoots.list(&ListParams::default()).await.unwrap_err();

        assert!(matches!(err, Error::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_backing_errors_are_propagated_unchanged() {
        let funcs = interceptor::Funcs::new()
            .create(|_| Err(Error::Internal("etcd unavailable".to_string())))
            .get(|_| Err(Error::Invalid("quota exceeded".to_string())));
        let shoots = fake_shoots_with(ClientBuilder::new().with_interceptor_funcs(funcs)).await;

        let err = shoots
            .create(&shoot("dev"), &PostParams::default())
            .await
            .unwrap_err();
        match err {
            Error::Kube(kube::Error::Api(resp)) => {
                assert_eq!(resp.code, 500);
                assert_eq!(resp.reason, "InternalError");
                assert_eq!(resp.message, "Internal error: etcd unavailable");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = shoots.get("dev", &GetParams::default()).await.unwrap_err();
        assert_eq!(api_error_code(&err), Some(422));
    }

    #[tokio::test]
    async fn test_cluster_wide_client_round_trip() {
        init_tracing();
        let client = ClientBuilder::new()
            .with_resource::<Shoot>()
            .build()
            .await
            .unwrap();
        let shoots = FakeShoots::all(client);

        shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();
        let fetched = shoots.get("dev", &GetParams::default()).await.unwrap();
        assert_eq!(fetched.metadata.namespace.as_deref(), Some(NAMESPACE));

        shoots.delete("dev", &DeleteParams::default()).await.unwrap();
        assert!(shoots
            .get("dev", &GetParams::default())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_update_status_is_a_no_op() {
        let shoots = fake_shoots().await;
        let mut created = shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();
        created.status = Some(crate::ShootStatus {
            hibernated: true,
            ..Default::default()
        });

        let result = shoots
            .update_status(&created, &PostParams::default())
            .await
            .unwrap();

        assert!(result.is_none());
        let fetched = shoots.get("dev", &GetParams::default()).await.unwrap();
        assert!(fetched.status.is_none());
        assert_eq!(fetched.metadata.resource_version.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_delete_collection_is_a_no_op() {
        let shoots = fake_shoots().await;
        shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        shoots
            .delete_collection(&DeleteParams::default(), &ListParams::default())
            .await
            .unwrap();

        let list = shoots.list(&ListParams::default()).await.unwrap();
        assert_eq!(list.items.len(), 1);
    }

    #[tokio::test]
    async fn test_watch_returns_no_stream() {
        let shoots = fake_shoots().await;

        let stream = shoots.watch(&WatchParams::default()).await.unwrap();

        assert!(stream.is_none());
    }

    #[tokio::test]
    async fn test_patch_is_a_no_op() {
        let shoots = fake_shoots().await;
        shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        let patch = Patch::Merge(json!({ "spec": { "purpose": "production" } }));
        let result = shoots
            .patch("dev", &PatchParams::default(), &patch, &["status"])
            .await
            .unwrap();
        assert!(result.is_none());

        // Missing objects don't fail either
        let result = shoots
            .patch("missing", &PatchParams::default(), &patch, &[])
            .await
            .unwrap();
        assert!(result.is_none());

        let fetched = shoots.get("dev", &GetParams::default()).await.unwrap();
        assert_eq!(fetched.spec.purpose.as_deref(), Some("evaluation"));
    }

    #[tokio::test]
    async fn test_admin_kubeconfig_request_returns_nothing() {
        let shoots = fake_shoots().await;
        let mut request = AdminKubeconfigRequest::default();
        request.spec.expiration_seconds = Some(600);

        let result = shoots
            .create_admin_kubeconfig_request("dev", &request, &PostParams::default())
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_usable_as_trait_object() {
        let shoots: Box<dyn ShootInterface> = Box::new(fake_shoots().await);

        shoots.create(&shoot("dev"), &PostParams::default()).await.unwrap();

        let list = shoots.list(&ListParams::default()).await.unwrap();
        assert_eq!(list.items.len(), 1);
    }
}
