// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `quota.rs`

use super::*;
use crate::canary::CanaryStage;
use crate::config::ChartConfig;
use crate::web_service::{AutoscalerProps, IngressProps, WebService, WebServiceProps};
use k8s_openapi::api::core::v1::ResourceRequirements;
use serde_json::{json, Value};

fn resources(cpu: &str, memory: &str) -> Value {
    json!({ "requests": { "cpu": cpu, "memory": memory } })
}

fn deployment(name: &str, replicas: Option<i32>, resources: Value) -> ManifestObject {
    let mut spec = json!({
        "selector": { "matchLabels": { "app": name } },
        "template": {
            "metadata": { "labels": { "app": name } },
            "spec": { "containers": [{ "name": name, "image": "app", "resources": resources }] }
        }
    });
    if let Some(replicas) = replicas {
        spec["replicas"] = json!(replicas);
    }
    ManifestObject::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name },
        "spec": spec
    }))
    .unwrap()
}

fn job(name: &str, resources: Value) -> ManifestObject {
    ManifestObject::from_value(json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": { "name": name },
        "spec": {
            "backoffLimit": 4,
            "template": {
                "spec": {
                    "containers": [{ "name": name, "image": "job", "resources": resources }],
                    "restartPolicy": "Never"
                }
            }
        }
    }))
    .unwrap()
}

fn hpa(target: &str, max: i32) -> ManifestObject {
    ManifestObject::from_value(json!({
        "apiVersion": "autoscaling/v2",
        "kind": "HorizontalPodAutoscaler",
        "metadata": { "name": target },
        "spec": {
            "scaleTargetRef": { "apiVersion": "apps/v1", "kind": "Deployment", "name": target },
            "minReplicas": 1,
            "maxReplicas": max
        }
    }))
    .unwrap()
}

#[test]
fn test_deployment_and_job_example() {
    let objects = vec![
        deployment("api", Some(2), resources("100m", "128Mi")),
        job("migrate", resources("50m", "64Mi")),
    ];

    let spec = aggregate(&objects).unwrap();
    assert_eq!(spec.cpu, Quantity("350m".into()));
    assert_eq!(spec.memory, Quantity("448Mi".into()));
    assert_eq!(spec.pods, 4);
}

#[test]
fn test_usage_breakdown() {
    let objects = vec![
        job("migrate", resources("50m", "64Mi")),
        deployment("api", Some(2), resources("100m", "128Mi")),
    ];

    let usages = collect_usage(&objects).unwrap();
    let ids: Vec<&str> = usages.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["Deployment/api", "Job/migrate"]);

    let api = &usages[0];
    assert_eq!(api.replicas, 2);
    assert_eq!(api.surge, 1);
    assert_eq!(api.pods(), 3);
    assert_eq!(api.cpu_millicores().unwrap(), 300);
    assert_eq!(api.memory_bytes().unwrap(), 3 * 128 * 1024 * 1024);
}

#[test]
fn test_autoscaler_ceiling_overrides_replicas() {
    let objects = vec![
        deployment("api", Some(2), resources("100m", "128Mi")),
        hpa("api", 8),
    ];

    let spec = aggregate(&objects).unwrap();
    // 8 replicas plus 25% surge (2).
    assert_eq!(spec.pods, 10);
    assert_eq!(spec.cpu, Quantity("1000m".into()));
}

#[test]
fn test_scaled_object_defaults() {
    let scaled = ManifestObject::from_value(json!({
        "apiVersion": "keda.sh/v1alpha1",
        "kind": "ScaledObject",
        "metadata": { "name": "worker" },
        "spec": { "scaleTargetRef": { "name": "worker" } }
    }))
    .unwrap();
    let objects = vec![deployment("worker", None, resources("10m", "16Mi")), scaled];

    let usages = collect_usage(&objects).unwrap();
    assert_eq!(usages[0].replicas, 100);
    assert_eq!(usages[0].surge, 25);
}

#[test]
fn test_missing_replicas_defaults_to_one() {
    let objects = vec![deployment("api", None, resources("100m", "128Mi"))];
    let usages = collect_usage(&objects).unwrap();
    assert_eq!(usages[0].replicas, 1);
    assert_eq!(usages[0].surge, 1);
}

#[test]
fn test_limits_stand_in_for_requests() {
    let objects = vec![job(
        "migrate",
        json!({ "limits": { "cpu": "1", "memory": "1Gi" } }),
    )];
    let spec = aggregate(&objects).unwrap();
    assert_eq!(spec.cpu, Quantity("1000m".into()));
    assert_eq!(spec.memory, Quantity("1024Mi".into()));
}

#[test]
fn test_missing_request_and_limit_fails() {
    let objects = vec![job("migrate", json!({ "requests": { "cpu": "50m" } }))];
    let err = aggregate(&objects).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Container 'migrate' of Job/migrate declares no memory request or limit"
    );
}

#[test]
fn test_malformed_quantity_fails() {
    let objects = vec![job("migrate", resources("fast", "64Mi"))];
    let err = aggregate(&objects).unwrap_err();
    assert!(matches!(err, QuotaError::Quantity { ref workload, .. } if workload == "Job/migrate"));
}

#[test]
fn test_peak_usage_overflow_fails() {
    // 1e19 bytes per pod is a valid quantity; three pods of it are not.
    let objects = vec![deployment("api", Some(2), resources("100m", "10000000000G"))];
    let err = aggregate(&objects).unwrap_err();
    assert!(matches!(
        err,
        QuotaError::Overflow { ref scope, ref resource }
            if scope == "Deployment/api" && resource == "memory"
    ));
}

#[test]
fn test_summed_overflow_fails() {
    let usage = |id: &str| WorkloadUsage {
        id: id.to_string(),
        replicas: 1,
        surge: 0,
        pod_cpu_millicores: u64::MAX / 2 + 1,
        pod_memory_bytes: 0,
    };

    let err = summarize(&[usage("Deployment/a"), usage("Deployment/b")]).unwrap_err();
    assert_eq!(err.to_string(), "cpu total of all workloads overflows");
}

#[test]
fn test_other_objects_are_ignored() {
    let config_map = ManifestObject::from_value(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": "settings" },
        "data": { "a": "b" }
    }))
    .unwrap();
    let spec = aggregate(&[config_map]).unwrap();
    assert_eq!(spec.pods, 0);
    assert_eq!(spec.cpu, Quantity("0m".into()));
    assert_eq!(spec.memory, Quantity("0Mi".into()));
}

#[test]
fn test_web_service_contributes_deployments_and_autoscaler() {
    let mut chart = ChartConfig::new("shop");
    chart.environment = "prod".into();
    let props = WebServiceProps {
        name: "api".into(),
        image: "shop/api".into(),
        port: 8080,
        resources: Some(
            serde_json::from_value::<ResourceRequirements>(resources("100m", "128Mi")).unwrap(),
        ),
        horizontal_pod_autoscaler: Some(AutoscalerProps {
            max_replicas: 4,
            ..Default::default()
        }),
        canary: true,
        stage: Some(CanaryStage::Base),
        ingress: IngressProps {
            hosts: vec!["api.example.com".into()],
            ..Default::default()
        },
        ..Default::default()
    };
    let web_service = WebService::new(&chart, props).unwrap();

    let usages = collect_usage(&[web_service.into()]).unwrap();
    let ids: Vec<&str> = usages.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["Deployment/api", "Deployment/api-canary"]);
    // Live: autoscaler max 4 plus surge 1. Canary: 1 replica plus surge 1.
    assert_eq!(usages[0].pods(), 5);
    assert_eq!(usages[1].pods(), 2);
}

#[test]
fn test_build_resource_quota() {
    let spec = ResourceQuotaSpec {
        cpu: Quantity("350m".into()),
        memory: Quantity("448Mi".into()),
        pods: 4,
    };
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "shop".to_string());

    let quota = build_resource_quota("shop-quota", Some("shop"), labels, &spec);
    assert_eq!(quota.metadata.name.as_deref(), Some("shop-quota"));
    assert_eq!(quota.metadata.namespace.as_deref(), Some("shop"));

    let hard = quota.spec.unwrap().hard.unwrap();
    assert_eq!(hard.get("requests.cpu"), Some(&Quantity("350m".into())));
    assert_eq!(hard.get("requests.memory"), Some(&Quantity("448Mi".into())));
    assert_eq!(hard.get("pods"), Some(&Quantity("4".into())));
}
