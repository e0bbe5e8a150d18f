// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource quota aggregation.
//!
//! Walks the finished objects of a chart and computes the CPU, memory and pod count the
//! namespace needs at peak: every workload at its autoscaler ceiling, plus its rolling-update
//! surge. The result is rendered as a `ResourceQuota`.
//!
//! For each workload, keyed by `{kind}/{name}`:
//!
//! 1. replicas = autoscaler max (HPA `maxReplicas`, ScaledObject `maxReplicaCount`), else
//!    `spec.replicas`, else 1
//! 2. surge = `maxSurge` resolved against replicas, rounded up (see [`Workload::surge`])
//! 3. per pod = sum over containers of `requests`, falling back to `limits`
//! 4. totals += per pod × (replicas + surge), pods += replicas + surge

use std::collections::BTreeMap;

use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscaler;
use k8s_openapi::api::core::v1::{
    Container, ResourceQuota, ResourceQuotaSpec as QuotaHardSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_REPLICAS, KEDA_DEFAULT_MAX_REPLICA_COUNT, KIND_DEPLOYMENT, RESOURCE_CPU,
    RESOURCE_MEMORY,
};
use crate::errors::QuotaError;
use crate::units::{bytes_to_memory, cpu_to_millicores, memory_to_bytes, millicores_to_cpu};
use crate::workload::{workload_id, ManifestObject, ScaledObject, Workload};

/// Overflow scope of the summed quota.
const ALL_WORKLOADS: &str = "all workloads";

/// Aggregate quota of a set of workloads.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceQuotaSpec {
    /// Total CPU, in millicores (`"<N>m"`)
    pub cpu: Quantity,
    /// Total memory, in mebibytes (`"<N>Mi"`)
    pub memory: Quantity,
    /// Total pod count
    pub pods: u64,
}

/// Peak usage of a single workload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadUsage {
    /// `{kind}/{name}` identifier
    pub id: String,
    /// Effective replica ceiling
    pub replicas: u64,
    /// Rolling-update surge on top of `replicas`
    pub surge: u64,
    /// CPU of one pod, in millicores
    pub pod_cpu_millicores: u64,
    /// Memory of one pod, in bytes
    pub pod_memory_bytes: u64,
}

impl WorkloadUsage {
    /// Pods running at peak.
    #[must_use]
    pub fn pods(&self) -> u64 {
        self.replicas + self.surge
    }

    /// CPU at peak, in millicores.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Overflow`] if the total does not fit in a `u64`.
    pub fn cpu_millicores(&self) -> Result<u64, QuotaError> {
        self.pod_cpu_millicores
            .checked_mul(self.pods())
            .ok_or_else(|| overflow(&self.id, RESOURCE_CPU))
    }

    /// Memory at peak, in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Overflow`] if the total does not fit in a `u64`.
    pub fn memory_bytes(&self) -> Result<u64, QuotaError> {
        self.pod_memory_bytes
            .checked_mul(self.pods())
            .ok_or_else(|| overflow(&self.id, RESOURCE_MEMORY))
    }
}

fn overflow(scope: &str, resource: &str) -> QuotaError {
    QuotaError::Overflow {
        scope: scope.to_string(),
        resource: resource.to_string(),
    }
}

/// Workloads and autoscaler ceilings indexed by workload identifier.
#[derive(Default)]
struct Index<'a> {
    workloads: BTreeMap<String, Workload<'a>>,
    autoscaler_max: BTreeMap<String, i32>,
}

impl<'a> Index<'a> {
    fn add(&mut self, object: &'a ManifestObject) {
        if let Some(workload) = object.as_workload() {
            self.add_workload(workload);
            return;
        }
        match object {
            ManifestObject::HorizontalPodAutoscaler(hpa) => self.add_autoscaler(hpa),
            ManifestObject::ScaledObject(scaled) => self.add_scaled_object(scaled),
            ManifestObject::WebService(web_service) => {
                for deployment in web_service.deployments() {
                    self.add_workload(Workload::Deployment(deployment));
                }
                if let Some(hpa) = web_service.horizontal_pod_autoscaler() {
                    self.add_autoscaler(hpa);
                }
            }
            _ => {}
        }
    }

    fn add_workload(&mut self, workload: Workload<'a>) {
        let id = workload.id();
        if self.workloads.insert(id.clone(), workload).is_some() {
            warn!(workload = %id, "Duplicate workload, keeping the last one");
        }
    }

    fn add_target(&mut self, target: String, max: i32) {
        if let Some(previous) = self.autoscaler_max.insert(target.clone(), max) {
            warn!(
                workload = %target,
                previous,
                max,
                "Workload targeted by more than one autoscaler, keeping the last one"
            );
        }
    }

    fn add_autoscaler(&mut self, hpa: &HorizontalPodAutoscaler) {
        let Some(spec) = hpa.spec.as_ref() else {
            warn!(
                autoscaler = %hpa.metadata.name.as_deref().unwrap_or_default(),
                "HorizontalPodAutoscaler has no spec, ignoring"
            );
            return;
        };
        let target = &spec.scale_target_ref;
        self.add_target(workload_id(&target.kind, &target.name), spec.max_replicas);
    }

    fn add_scaled_object(&mut self, scaled: &ScaledObject) {
        let target = &scaled.spec.scale_target_ref;
        let kind = target.kind.as_deref().unwrap_or(KIND_DEPLOYMENT);
        let max = scaled
            .spec
            .max_replica_count
            .unwrap_or(KEDA_DEFAULT_MAX_REPLICA_COUNT);
        self.add_target(workload_id(kind, &target.name), max);
    }
}

/// Computes the peak usage of every workload in `objects`, ordered by identifier.
///
/// # Errors
///
/// Returns [`QuotaError::MissingResourceRequest`] if a container declares neither a request
/// nor a limit for CPU or memory, [`QuotaError::UnrecognizedWorkload`] if a workload has no
/// pod spec, [`QuotaError::Quantity`] for malformed quantities or surge values, and
/// [`QuotaError::Overflow`] if a workload's peak usage does not fit in a `u64`.
pub fn collect_usage(objects: &[ManifestObject]) -> Result<Vec<WorkloadUsage>, QuotaError> {
    let mut index = Index::default();
    for object in objects {
        index.add(object);
    }

    for target in index.autoscaler_max.keys() {
        if !index.workloads.contains_key(target) {
            debug!(workload = %target, "Autoscaler target not found among workloads");
        }
    }

    index
        .workloads
        .values()
        .map(|workload| workload_usage(workload, &index.autoscaler_max))
        .collect()
}

fn workload_usage(
    workload: &Workload<'_>,
    autoscaler_max: &BTreeMap<String, i32>,
) -> Result<WorkloadUsage, QuotaError> {
    let id = workload.id();
    let replicas = autoscaler_max
        .get(&id)
        .copied()
        .or_else(|| workload.replicas())
        .unwrap_or(DEFAULT_REPLICAS)
        .max(0);
    let surge = workload
        .surge(replicas)
        .map_err(|source| QuotaError::Quantity {
            workload: id.clone(),
            source,
        })?
        .max(0);

    let mut pod_cpu_millicores = 0;
    let mut pod_memory_bytes = 0;
    for container in workload.containers()? {
        let cpu = container_request(&id, container, RESOURCE_CPU)?;
        let memory = container_request(&id, container, RESOURCE_MEMORY)?;
        let quantity_error = |source| QuotaError::Quantity {
            workload: id.clone(),
            source,
        };
        pod_cpu_millicores = cpu_to_millicores(cpu)
            .map_err(quantity_error)?
            .checked_add(pod_cpu_millicores)
            .ok_or_else(|| overflow(&id, RESOURCE_CPU))?;
        pod_memory_bytes = memory_to_bytes(memory)
            .map_err(quantity_error)?
            .checked_add(pod_memory_bytes)
            .ok_or_else(|| overflow(&id, RESOURCE_MEMORY))?;
    }

    let usage = WorkloadUsage {
        id,
        replicas: u64::from(replicas.unsigned_abs()),
        surge: u64::from(surge.unsigned_abs()),
        pod_cpu_millicores,
        pod_memory_bytes,
    };
    let cpu_millicores = usage.cpu_millicores()?;
    let memory_bytes = usage.memory_bytes()?;
    debug!(
        workload = %usage.id,
        replicas = usage.replicas,
        surge = usage.surge,
        cpu_millicores,
        memory_bytes,
        "Computed workload usage"
    );
    Ok(usage)
}

/// Request of `resource`, falling back to its limit.
fn container_request<'a>(
    workload: &str,
    container: &'a Container,
    resource: &str,
) -> Result<&'a Quantity, QuotaError> {
    let resources = container.resources.as_ref();
    resources
        .and_then(|r| r.requests.as_ref())
        .and_then(|requests| requests.get(resource))
        .or_else(|| {
            resources
                .and_then(|r| r.limits.as_ref())
                .and_then(|limits| limits.get(resource))
        })
        .ok_or_else(|| QuotaError::MissingResourceRequest {
            workload: workload.to_string(),
            container: container.name.clone(),
            resource: resource.to_string(),
        })
}

/// Sums per-workload usage into a quota.
///
/// # Errors
///
/// Returns [`QuotaError::Overflow`] if a total does not fit in a `u64`.
pub fn summarize(usages: &[WorkloadUsage]) -> Result<ResourceQuotaSpec, QuotaError> {
    let mut cpu: u64 = 0;
    let mut memory: u64 = 0;
    let mut pods: u64 = 0;
    for usage in usages {
        cpu = cpu
            .checked_add(usage.cpu_millicores()?)
            .ok_or_else(|| overflow(ALL_WORKLOADS, RESOURCE_CPU))?;
        memory = memory
            .checked_add(usage.memory_bytes()?)
            .ok_or_else(|| overflow(ALL_WORKLOADS, RESOURCE_MEMORY))?;
        pods = pods
            .checked_add(usage.pods())
            .ok_or_else(|| overflow(ALL_WORKLOADS, "pods"))?;
    }

    Ok(ResourceQuotaSpec {
        cpu: millicores_to_cpu(cpu),
        memory: bytes_to_memory(memory),
        pods,
    })
}

/// Computes the aggregate quota of `objects`.
///
/// # Errors
///
/// See [`collect_usage`].
pub fn aggregate(objects: &[ManifestObject]) -> Result<ResourceQuotaSpec, QuotaError> {
    let usages = collect_usage(objects)?;
    let spec = summarize(&usages)?;
    info!(
        workloads = usages.len(),
        cpu = %spec.cpu.0,
        memory = %spec.memory.0,
        pods = spec.pods,
        "Aggregated resource quota"
    );
    Ok(spec)
}

/// Builds a `ResourceQuota` with hard `requests.cpu`, `requests.memory` and `pods` limits.
#[must_use]
pub fn build_resource_quota(
    name: &str,
    namespace: Option<&str>,
    labels: BTreeMap<String, String>,
    spec: &ResourceQuotaSpec,
) -> ResourceQuota {
    let mut hard = BTreeMap::new();
    hard.insert(format!("requests.{RESOURCE_CPU}"), spec.cpu.clone());
    hard.insert(format!("requests.{RESOURCE_MEMORY}"), spec.memory.clone());
    hard.insert("pods".to_string(), Quantity(spec.pods.to_string()));

    ResourceQuota {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: namespace.map(str::to_string),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(QuotaHardSpec {
            hard: Some(hard),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod quota_tests;
