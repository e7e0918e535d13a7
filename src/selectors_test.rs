#[cfg(test)]
mod tests {
    use crate::selectors::*;
    use crate::Error;
    use serde_json::json;

    fn shoot_with_labels(labels: serde_json::Value) -> serde_json::Value {
        json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": {
                "name": "dev",
                "namespace": "garden-dev",
                "labels": labels,
            },
            "spec": {
                "cloudProfileName": "aws",
                "seedName": "aws-eu1",
            },
            "status": {
                "seedName": "aws-eu1",
            }
        })
    }

    #[test]
    fn test_equality_selectors() {
        let obj = shoot_with_labels(json!({ "purpose": "evaluation", "team": "infra" }));

        assert!(matches_labels(&obj, "purpose=evaluation").unwrap());
        assert!(matches_labels(&obj, "purpose==evaluation").unwrap());
        assert!(matches_labels(&obj, "purpose=evaluation,team=infra").unwrap());
        assert!(!matches_labels(&obj, "purpose=production").unwrap());
        assert!(!matches_labels(&obj, "purpose=evaluation,team=apps").unwrap());
    }

    #[test]
    fn test_inequality_selector() {
        let obj = shoot_with_labels(json!({ "purpose": "evaluation" }));

        assert!(matches_labels(&obj, "purpose!=production").unwrap());
        assert!(!matches_labels(&obj, "purpose!=evaluation").unwrap());
        // A missing label is never equal to the value
        assert!(matches_labels(&obj, "team!=infra").unwrap());
    }

    #[test]
    fn test_set_selectors() {
        let obj = shoot_with_labels(json!({ "purpose": "evaluation" }));

        assert!(matches_labels(&obj, "purpose in (evaluation, development)").unwrap());
        assert!(!matches_labels(&obj, "purpose in (production)").unwrap());
        assert!(matches_labels(&obj, "purpose notin (production,infrastructure)").unwrap());
        assert!(!matches_labels(&obj, "purpose notin (evaluation)").unwrap());
        assert!(matches_labels(&obj, "purpose in (evaluation),purpose!=testing").unwrap());
    }

    #[test]
    fn test_existence_selectors() {
        let obj = shoot_with_labels(json!({ "purpose": "evaluation" }));

        assert!(matches_labels(&obj, "purpose").unwrap());
        assert!(!matches_labels(&obj, "team").unwrap());
        assert!(matches_labels(&obj, "!team").unwrap());
        assert!(!matches_labels(&obj, "!purpose").unwrap());
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let obj = shoot_with_labels(json!({}));

        assert!(matches_labels(&obj, "").unwrap());
        assert!(matches_labels(&json!({ "metadata": {} }), "").unwrap());
    }

    #[test]
    fn test_object_without_labels() {
        let obj = json!({ "metadata": { "name": "dev" } });

        assert!(!matches_labels(&obj, "purpose=evaluation").unwrap());
        assert!(matches_labels(&obj, "!purpose").unwrap());
    }

    #[test]
    fn test_invalid_label_selectors() {
        assert!(matches!(
            parse_label_selector("purpose in evaluation"),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            parse_label_selector("purpose evaluation"),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_field_selectors() {
        let obj = shoot_with_labels(json!({}));

        assert!(matches_fields(&obj, "metadata.name=dev").unwrap());
        assert!(matches_fields(&obj, "metadata.namespace==garden-dev").unwrap());
        assert!(matches_fields(&obj, "spec.seedName=aws-eu1,spec.cloudProfileName=aws").unwrap());
        assert!(matches_fields(&obj, "status.seedName!=gcp-eu1").unwrap());
        assert!(!matches_fields(&obj, "metadata.name!=dev").unwrap());
        assert!(!matches_fields(&obj, "spec.seedName=gcp-eu1").unwrap());
    }

    #[test]
    fn test_field_selector_on_missing_field() {
        let mut obj = shoot_with_labels(json!({}));
        obj["spec"].as_object_mut().unwrap().remove("seedName");

        assert!(!matches_fields(&obj, "spec.seedName=aws-eu1").unwrap());
        assert!(matches_fields(&obj, "spec.seedName!=aws-eu1").unwrap());
    }

    #[test]
    fn test_unsupported_field_selectors() {
        let obj = shoot_with_labels(json!({}));

        assert!(matches!(
            matches_fields(&obj, "spec.region=eu-west-1"),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            matches_fields(&obj, "metadata.name"),
            Err(Error::InvalidRequest(_))
        ));

        // Shoot-only fields aren't available on other kinds
        let config_map = json!({ "kind": "ConfigMap", "metadata": { "name": "cfg" } });
        assert!(matches_fields(&config_map, "metadata.name=cfg").unwrap());
        assert!(matches_fields(&config_map, "spec.seedName=aws-eu1").is_err());
    }
}
