use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Placeholder for an absent textual field.
pub const NOT_AVAILABLE: &str = "N/A";
/// Placeholder for an absent classification (type, phase, creation time).
pub const UNKNOWN: &str = "Unknown";

pub fn or_na(value: Option<&str>) -> String {
    non_empty(value).unwrap_or(NOT_AVAILABLE).to_string()
}

pub fn or_unknown(value: Option<&str>) -> String {
    non_empty(value).unwrap_or(UNKNOWN).to_string()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum View {
    Workloads,
    Services,
    Namespaces,
    Clusters,
}

impl View {
    pub const ALL: [Self; 4] = [
        Self::Workloads,
        Self::Services,
        Self::Namespaces,
        Self::Clusters,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "wl" | "workload" | "workloads" | "wds" => Some(Self::Workloads),
            "svc" | "service" | "services" => Some(Self::Services),
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            "cl" | "cluster" | "clusters" => Some(Self::Clusters),
            _ => None,
        }
    }

    pub fn short_token(self) -> &'static str {
        match self {
            Self::Workloads => "wl",
            Self::Services => "svc",
            Self::Namespaces => "ns",
            Self::Clusters => "cl",
        }
    }

    /// Views whose rows depend on the active namespace.
    pub fn is_namespaced(self) -> bool {
        matches!(self, Self::Services)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Service,
    Deployment,
    Other(String),
}

impl ResourceKind {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "svc" | "service" | "services" => Self::Service,
            "deploy" | "deployment" | "deployments" | "dp" => Self::Deployment,
            _ => Self::Other(canonical_kind_name(token.trim())),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Service => "Service",
            Self::Deployment => "Deployment",
            Self::Other(kind) => kind,
        }
    }

    /// Path segment used by the generic `/api/{kind}/{namespace}/{name}` route.
    pub fn api_segment(&self) -> String {
        let lower = self.name().to_ascii_lowercase();
        if lower.ends_with('s') {
            lower
        } else {
            format!("{lower}s")
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn canonical_kind_name(token: &str) -> String {
    let singular = match token.to_ascii_lowercase().as_str() {
        "configmaps" | "configmap" | "cm" => return "ConfigMap".to_string(),
        "secrets" | "secret" => return "Secret".to_string(),
        "statefulsets" | "statefulset" | "sts" => return "StatefulSet".to_string(),
        "daemonsets" | "daemonset" | "ds" => return "DaemonSet".to_string(),
        "replicasets" | "replicaset" | "rs" => return "ReplicaSet".to_string(),
        "jobs" | "job" => return "Job".to_string(),
        "cronjobs" | "cronjob" | "cj" => return "CronJob".to_string(),
        "pods" | "pod" | "po" => return "Pod".to_string(),
        "ingresses" | "ingress" | "ing" => return "Ingress".to_string(),
        _ => token.trim_end_matches('s').to_string(),
    };

    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => singular,
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceTarget {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceTarget {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Display for ResourceTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SyncStatus {
    Synced,
    OutOfSync,
}

impl Display for SyncStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "Synced"),
            Self::OutOfSync => write!(f, "Out of Sync"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "Healthy"),
            Self::Degraded => write!(f, "Degraded"),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObjectMetadata {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub namespace: Option<String>,
    #[serde(deserialize_with = "lenient_string", alias = "UID", alias = "Uid")]
    pub uid: Option<String>,
    #[serde(
        deserialize_with = "lenient_string",
        alias = "creation_timestamp",
        alias = "creationTime"
    )]
    pub creation_timestamp: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PortSpec {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_i32")]
    pub port: Option<i32>,
    #[serde(alias = "target_port", alias = "targetport")]
    pub target_port: Option<IntOrString>,
    #[serde(deserialize_with = "lenient_i32", alias = "node_port")]
    pub node_port: Option<i32>,
    #[serde(deserialize_with = "lenient_string")]
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceSpecView {
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub type_: Option<String>,
    #[serde(
        rename = "clusterIP",
        alias = "clusterIp",
        alias = "cluster_ip",
        alias = "clusterip",
        deserialize_with = "lenient_string"
    )]
    pub cluster_ip: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ports: Vec<PortSpec>,
    #[serde(deserialize_with = "null_as_default")]
    pub selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadBalancerIngressView {
    #[serde(deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoadBalancerView {
    #[serde(deserialize_with = "null_as_default")]
    pub ingress: Vec<LoadBalancerIngressView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceStatusView {
    #[serde(alias = "load_balancer", deserialize_with = "null_as_default")]
    pub load_balancer: LoadBalancerView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceResource {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: ObjectMetadata,
    #[serde(deserialize_with = "null_as_default")]
    pub spec: ServiceSpecView,
    #[serde(deserialize_with = "null_as_default")]
    pub status: ServiceStatusView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerPortView {
    #[serde(
        deserialize_with = "lenient_i32",
        alias = "container_port",
        alias = "containerport",
        alias = "port"
    )]
    pub container_port: Option<i32>,
    #[serde(deserialize_with = "lenient_string")]
    pub protocol: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerView {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub image: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ports: Vec<ContainerPortView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodSpecView {
    #[serde(deserialize_with = "null_as_default")]
    pub containers: Vec<ContainerView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PodTemplateView {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: ObjectMetadata,
    #[serde(deserialize_with = "null_as_default")]
    pub spec: PodSpecView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelSelectorView {
    #[serde(alias = "match_labels", deserialize_with = "null_as_default")]
    pub match_labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentSpecView {
    #[serde(deserialize_with = "lenient_i32")]
    pub replicas: Option<i32>,
    #[serde(deserialize_with = "null_as_default")]
    pub selector: LabelSelectorView,
    #[serde(deserialize_with = "null_as_default")]
    pub template: PodTemplateView,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentStatusView {
    #[serde(deserialize_with = "lenient_i32")]
    pub replicas: Option<i32>,
    #[serde(deserialize_with = "lenient_i32", alias = "ready_replicas")]
    pub ready_replicas: Option<i32>,
    #[serde(deserialize_with = "lenient_i32", alias = "available_replicas")]
    pub available_replicas: Option<i32>,
    #[serde(deserialize_with = "lenient_i32", alias = "updated_replicas")]
    pub updated_replicas: Option<i32>,
    #[serde(deserialize_with = "lenient_i32", alias = "unavailable_replicas")]
    pub unavailable_replicas: Option<i32>,
}

impl DeploymentStatusView {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Fills counters the object did not carry from a separate status lookup.
    pub fn fill_missing(&mut self, other: &DeploymentStatusView) {
        self.replicas = self.replicas.or(other.replicas);
        self.ready_replicas = self.ready_replicas.or(other.ready_replicas);
        self.available_replicas = self.available_replicas.or(other.available_replicas);
        self.updated_replicas = self.updated_replicas.or(other.updated_replicas);
        self.unavailable_replicas = self.unavailable_replicas.or(other.unavailable_replicas);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentResource {
    #[serde(deserialize_with = "null_as_default")]
    pub metadata: ObjectMetadata,
    #[serde(deserialize_with = "null_as_default")]
    pub spec: DeploymentSpecView,
    #[serde(deserialize_with = "null_as_default")]
    pub status: DeploymentStatusView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicResource {
    pub kind: String,
    pub metadata: ObjectMetadata,
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceItem {
    Service(ServiceResource),
    Deployment(DeploymentResource),
    Dynamic(DynamicResource),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SummaryRow {
    pub label: &'static str,
    pub value: String,
}

impl SummaryRow {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

impl ResourceItem {
    /// Parses a backend object into the canonical schema for `kind`. An object
    /// that names its own `kind` wins over the requested one.
    pub fn from_value(kind: &ResourceKind, value: Value) -> Result<Self, serde_json::Error> {
        let declared = value
            .get("kind")
            .and_then(Value::as_str)
            .map(ResourceKind::from_token);
        let kind = declared.unwrap_or_else(|| kind.clone());

        match kind {
            ResourceKind::Service => Ok(Self::Service(serde_json::from_value(value)?)),
            ResourceKind::Deployment => Ok(Self::Deployment(serde_json::from_value(value)?)),
            ResourceKind::Other(kind) => {
                let metadata = match value.get("metadata") {
                    Some(metadata) => serde_json::from_value(metadata.clone())?,
                    None => ObjectMetadata::default(),
                };
                Ok(Self::Dynamic(DynamicResource {
                    kind,
                    metadata,
                    raw: value,
                }))
            }
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Service(_) => ResourceKind::Service,
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::Dynamic(dynamic) => ResourceKind::Other(dynamic.kind.clone()),
        }
    }

    pub fn metadata(&self) -> &ObjectMetadata {
        match self {
            Self::Service(service) => &service.metadata,
            Self::Deployment(deployment) => &deployment.metadata,
            Self::Dynamic(dynamic) => &dynamic.metadata,
        }
    }

    pub fn name(&self) -> String {
        or_na(self.metadata().name.as_deref())
    }

    pub fn namespace(&self) -> String {
        or_na(self.metadata().namespace.as_deref())
    }

    pub fn target(&self, fallback_namespace: &str) -> ResourceTarget {
        let namespace = non_empty(self.metadata().namespace.as_deref())
            .unwrap_or(fallback_namespace)
            .to_string();
        ResourceTarget::new(self.kind(), namespace, self.name())
    }

    /// The subfield whose presence marks the resource as synced and healthy:
    /// the cluster IP for services, the server-assigned uid otherwise.
    pub fn identity_marker(&self) -> Option<&str> {
        let marker = match self {
            Self::Service(service) => service.spec.cluster_ip.as_deref(),
            Self::Deployment(deployment) => deployment.metadata.uid.as_deref(),
            Self::Dynamic(dynamic) => dynamic.metadata.uid.as_deref(),
        };
        non_empty(marker)
    }

    pub fn sync_status(&self) -> SyncStatus {
        if self.identity_marker().is_some() {
            SyncStatus::Synced
        } else {
            SyncStatus::OutOfSync
        }
    }

    pub fn health_status(&self) -> HealthStatus {
        if self.identity_marker().is_some() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }

    pub fn summary_rows(&self, now: DateTime<Utc>) -> Vec<SummaryRow> {
        let metadata = self.metadata();
        let mut rows = vec![
            SummaryRow::new("Kind", self.kind().name()),
            SummaryRow::new("Name", self.name()),
            SummaryRow::new("Namespace", self.namespace()),
            SummaryRow::new(
                "Created",
                format_created(metadata.creation_timestamp.as_deref(), now),
            ),
        ];

        match self {
            Self::Service(service) => {
                rows.push(SummaryRow::new(
                    "Type",
                    or_unknown(service.spec.type_.as_deref()),
                ));
                rows.push(SummaryRow::new(
                    "Cluster IP",
                    or_na(service.spec.cluster_ip.as_deref()),
                ));
                rows.push(SummaryRow::new("Ports", service_ports_summary(service)));
                rows.push(SummaryRow::new(
                    "Selector",
                    join_labels(&service.spec.selector),
                ));
                let ingress = service
                    .status
                    .load_balancer
                    .ingress
                    .iter()
                    .filter_map(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()))
                    .collect::<Vec<_>>();
                rows.push(SummaryRow::new(
                    "External",
                    if ingress.is_empty() {
                        NOT_AVAILABLE.to_string()
                    } else {
                        ingress.join(",")
                    },
                ));
            }
            Self::Deployment(deployment) => {
                let desired = deployment.spec.replicas;
                let ready = deployment.status.ready_replicas;
                rows.push(SummaryRow::new(
                    "Replicas",
                    match (ready, desired) {
                        (Some(ready), Some(desired)) => format!("{ready}/{desired}"),
                        (None, Some(desired)) => format!("0/{desired}"),
                        (Some(ready), None) => format!("{ready}/{NOT_AVAILABLE}"),
                        (None, None) => NOT_AVAILABLE.to_string(),
                    },
                ));
                rows.push(SummaryRow::new(
                    "Available",
                    deployment
                        .status
                        .available_replicas
                        .map(|count| count.to_string())
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                ));
                let images = deployment
                    .spec
                    .template
                    .spec
                    .containers
                    .iter()
                    .filter_map(|container| container.image.clone())
                    .collect::<Vec<_>>();
                rows.push(SummaryRow::new(
                    "Images",
                    if images.is_empty() {
                        NOT_AVAILABLE.to_string()
                    } else {
                        images.join(",")
                    },
                ));
                rows.push(SummaryRow::new(
                    "Selector",
                    join_labels(&deployment.spec.selector.match_labels),
                ));
            }
            Self::Dynamic(dynamic) => {
                rows.push(SummaryRow::new(
                    "API Version",
                    or_na(dynamic.raw.get("apiVersion").and_then(Value::as_str)),
                ));
            }
        }

        rows.push(SummaryRow::new("Labels", join_labels(&metadata.labels)));
        rows.push(SummaryRow::new("Status", self.sync_status().to_string()));
        rows.push(SummaryRow::new("Health", self.health_status().to_string()));
        rows
    }
}

pub fn service_ports_summary(service: &ServiceResource) -> String {
    let ports = service
        .spec
        .ports
        .iter()
        .map(|port| {
            let number = port
                .port
                .map(|port| port.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let protocol = port.protocol.as_deref().unwrap_or("TCP");
            format!("{number}/{protocol}")
        })
        .collect::<Vec<_>>();
    if ports.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        ports.join(",")
    }
}

pub fn join_labels(labels: &BTreeMap<String, String>) -> String {
    if labels.is_empty() {
        return NOT_AVAILABLE.to_string();
    }
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn format_created(timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(raw) = non_empty(timestamp) else {
        return UNKNOWN.to_string();
    };
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => {
            let age = human_age(parsed.with_timezone(&Utc), now);
            format!("{raw} ({age})")
        }
        Err(_) => raw.to_string(),
    }
}

pub fn human_age(created: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_elapsed_seconds((now - created).num_seconds().max(0))
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkloadSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub namespace: Option<String>,
    #[serde(
        deserialize_with = "lenient_string",
        alias = "creationTimestamp",
        alias = "creation_time"
    )]
    pub creation_time: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamespaceSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub pods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagedCluster {
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(
        deserialize_with = "lenient_string",
        alias = "creationTimestamp",
        alias = "creation_time"
    )]
    pub creation_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub context: Option<String>,
}

/// `GET /api/clusters`: managed clusters plus the backend's kubeconfig context.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterInventory {
    #[serde(deserialize_with = "lenient_string")]
    pub current_context: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub its_data: Vec<ManagedCluster>,
}

/// A namespace together with every resource the backend reported inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceGroup {
    pub name: String,
    pub status: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub members: Vec<ResourceItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NamespaceDetailsWire {
    #[serde(deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    status: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    labels: BTreeMap<String, String>,
    #[serde(deserialize_with = "null_as_default")]
    resources: BTreeMap<String, Vec<Value>>,
}

impl NamespaceGroup {
    pub fn from_value(fallback_name: &str, value: Value) -> Result<Self, serde_json::Error> {
        let wire: NamespaceDetailsWire = serde_json::from_value(value)?;
        let mut members = Vec::new();
        for (kind_token, objects) in wire.resources {
            let kind = ResourceKind::from_token(&kind_token);
            for object in objects {
                members.push(ResourceItem::from_value(&kind, object)?);
            }
        }
        members.sort_by(|left, right| {
            left.kind()
                .name()
                .cmp(right.kind().name())
                .then_with(|| left.name().cmp(&right.name()))
        });

        Ok(Self {
            name: non_empty(wire.name.as_deref())
                .unwrap_or(fallback_name)
                .to_string(),
            status: wire.status,
            labels: wire.labels,
            members,
        })
    }

    pub fn sync_status(&self) -> SyncStatus {
        if self
            .members
            .iter()
            .all(|member| member.sync_status() == SyncStatus::Synced)
        {
            SyncStatus::Synced
        } else {
            SyncStatus::OutOfSync
        }
    }

    pub fn health_status(&self) -> HealthStatus {
        let active = self
            .status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("active"));
        if active
            && self
                .members
                .iter()
                .all(|member| member.health_status() == HealthStatus::Healthy)
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RowData {
    pub name: String,
    pub namespace: Option<String>,
    pub kind: Option<String>,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<RowData>,
    pub selected: usize,
    pub last_refreshed: Option<DateTime<chrono::Local>>,
    pub error: Option<String>,
}

impl TableData {
    pub fn set_rows(
        &mut self,
        headers: Vec<String>,
        rows: Vec<RowData>,
        refreshed_at: DateTime<chrono::Local>,
    ) {
        self.headers = headers;
        self.rows = rows;
        self.last_refreshed = Some(refreshed_at);
        self.error = None;
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    pub fn set_error(&mut self, error: impl Into<String>, refreshed_at: DateTime<chrono::Local>) {
        self.rows.clear();
        self.error = Some(error.into());
        self.last_refreshed = Some(refreshed_at);
        self.selected = 0;
    }

    pub fn selected_row(&self) -> Option<&RowData> {
        self.rows.get(self.selected)
    }
}

pub fn workload_table(workloads: Vec<WorkloadSummary>, now: DateTime<Utc>) -> TableData {
    let mut rows = workloads
        .into_iter()
        .map(|workload| {
            let name = or_na(workload.name.as_deref());
            let kind = or_unknown(workload.kind.as_deref());
            let namespace = or_na(workload.namespace.as_deref());
            let age = workload
                .creation_time
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|created| human_age(created.with_timezone(&Utc), now))
                .unwrap_or_else(|| UNKNOWN.to_string());
            RowData {
                name: name.clone(),
                namespace: Some(namespace.clone()),
                kind: Some(kind.clone()),
                columns: vec![name, kind, namespace, join_labels(&workload.labels), age],
            }
        })
        .collect::<Vec<_>>();
    sort_rows(&mut rows);

    let mut table = TableData::default();
    table.set_rows(
        vec![
            "Name".to_string(),
            "Kind".to_string(),
            "Namespace".to_string(),
            "Labels".to_string(),
            "Age".to_string(),
        ],
        rows,
        chrono::Local::now(),
    );
    table
}

pub fn service_table(services: Vec<ServiceResource>, now: DateTime<Utc>) -> TableData {
    let mut rows = services
        .into_iter()
        .map(|service| {
            let service_type = or_unknown(service.spec.type_.as_deref());
            let cluster_ip = or_na(service.spec.cluster_ip.as_deref());
            let ports = service_ports_summary(&service);
            let age = service
                .metadata
                .creation_timestamp
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|created| human_age(created.with_timezone(&Utc), now))
                .unwrap_or_else(|| UNKNOWN.to_string());

            let item = ResourceItem::Service(service);
            let name = item.name();
            let namespace = item.namespace();
            RowData {
                name: name.clone(),
                namespace: Some(namespace.clone()),
                kind: Some("Service".to_string()),
                columns: vec![
                    name,
                    namespace,
                    service_type,
                    cluster_ip,
                    ports,
                    item.sync_status().to_string(),
                    age,
                ],
            }
        })
        .collect::<Vec<_>>();
    sort_rows(&mut rows);

    let mut table = TableData::default();
    table.set_rows(
        vec![
            "Name".to_string(),
            "Namespace".to_string(),
            "Type".to_string(),
            "Cluster IP".to_string(),
            "Ports".to_string(),
            "Status".to_string(),
            "Age".to_string(),
        ],
        rows,
        chrono::Local::now(),
    );
    table
}

pub fn namespace_table(namespaces: Vec<NamespaceSummary>) -> TableData {
    let mut rows = namespaces
        .into_iter()
        .map(|namespace| {
            let name = or_na(namespace.name.as_deref());
            RowData {
                name: name.clone(),
                namespace: None,
                kind: Some("Namespace".to_string()),
                columns: vec![
                    name,
                    or_unknown(namespace.status.as_deref()),
                    namespace.pods.len().to_string(),
                ],
            }
        })
        .collect::<Vec<_>>();
    sort_rows(&mut rows);

    let mut table = TableData::default();
    table.set_rows(
        vec!["Name".to_string(), "Status".to_string(), "Pods".to_string()],
        rows,
        chrono::Local::now(),
    );
    table
}

pub fn cluster_table(inventory: ClusterInventory, now: DateTime<Utc>) -> TableData {
    let current = inventory.current_context;
    let mut rows = inventory
        .its_data
        .into_iter()
        .map(|cluster| {
            let name = or_na(cluster.name.as_deref());
            let status = if cluster.context.is_some() && cluster.context == current {
                "Current"
            } else {
                "Managed"
            };
            let age = cluster
                .creation_time
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|created| human_age(created.with_timezone(&Utc), now))
                .unwrap_or_else(|| UNKNOWN.to_string());
            RowData {
                name: name.clone(),
                namespace: None,
                kind: Some("ManagedCluster".to_string()),
                columns: vec![
                    name,
                    or_na(cluster.context.as_deref()),
                    join_labels(&cluster.labels),
                    status.to_string(),
                    age,
                ],
            }
        })
        .collect::<Vec<_>>();
    sort_rows(&mut rows);

    let mut table = TableData::default();
    table.set_rows(
        vec![
            "Name".to_string(),
            "Context".to_string(),
            "Labels".to_string(),
            "Status".to_string(),
            "Age".to_string(),
        ],
        rows,
        chrono::Local::now(),
    );
    table
}

fn sort_rows(rows: &mut [RowData]) {
    rows.sort_by(|left, right| {
        left.namespace
            .cmp(&right.namespace)
            .then_with(|| left.name.cmp(&right.name))
    });
}

#[cfg(test)]
mod tests {
    use super::{
        ClusterInventory, HealthStatus, NamespaceGroup, ResourceItem, ResourceKind, SyncStatus,
        View, cluster_table, format_created, human_age,
    };
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn view_aliases_map_to_expected_views() {
        assert_eq!(View::from_token("svc"), Some(View::Services));
        assert_eq!(View::from_token("WDS"), Some(View::Workloads));
        assert_eq!(View::from_token("namespaces"), Some(View::Namespaces));
        assert_eq!(View::from_token("clusters"), Some(View::Clusters));
        assert_eq!(View::from_token("pods"), None);
    }

    #[test]
    fn kind_tokens_resolve_to_canonical_names() {
        assert_eq!(ResourceKind::from_token("svc"), ResourceKind::Service);
        assert_eq!(ResourceKind::from_token("deployments"), ResourceKind::Deployment);
        assert_eq!(
            ResourceKind::from_token("configmaps"),
            ResourceKind::Other("ConfigMap".to_string())
        );
        assert_eq!(ResourceKind::from_token("widgets").name(), "Widget");
        assert_eq!(ResourceKind::from_token("cm").api_segment(), "configmaps");
    }

    #[test]
    fn service_with_cluster_ip_is_synced_and_healthy() {
        let item = ResourceItem::from_value(
            &ResourceKind::Service,
            json!({
                "metadata": {"name": "svc-a"},
                "spec": {
                    "clusterIP": "10.1.2.3",
                    "ports": [{"port": 8080, "targetPort": 8080, "protocol": "TCP"}]
                }
            }),
        )
        .expect("service parses");

        assert_eq!(item.sync_status(), SyncStatus::Synced);
        assert_eq!(item.health_status(), HealthStatus::Healthy);
        assert_eq!(item.sync_status().to_string(), "Synced");
        assert_eq!(item.health_status().to_string(), "Healthy");
    }

    #[test]
    fn service_without_cluster_ip_is_degraded() {
        for spec in [json!({}), json!({"clusterIP": ""}), json!({"clusterIP": null})] {
            let item = ResourceItem::from_value(
                &ResourceKind::Service,
                json!({"metadata": {"name": "svc-b"}, "spec": spec}),
            )
            .expect("service parses");
            assert_eq!(item.sync_status().to_string(), "Out of Sync");
            assert_eq!(item.health_status().to_string(), "Degraded");
        }
    }

    #[test]
    fn deployment_status_follows_uid() {
        let synced = ResourceItem::from_value(
            &ResourceKind::Deployment,
            json!({"metadata": {"name": "web", "uid": "abc-123"}}),
        )
        .expect("deployment parses");
        let missing = ResourceItem::from_value(
            &ResourceKind::Deployment,
            json!({"metadata": {"name": "web"}}),
        )
        .expect("deployment parses");

        assert_eq!(synced.sync_status(), SyncStatus::Synced);
        assert_eq!(missing.health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn tolerant_parsing_accepts_nulls_strings_and_alternate_casing() {
        let item = ResourceItem::from_value(
            &ResourceKind::Service,
            json!({
                "metadata": {"name": "svc-c", "labels": null, "namespace": "apps"},
                "spec": {
                    "clusterIp": "10.0.0.9",
                    "ports": [{"port": "9090", "targetPort": "http"}],
                    "selector": null
                },
                "status": null
            }),
        )
        .expect("service parses");

        let ResourceItem::Service(service) = &item else {
            panic!("expected a service");
        };
        assert_eq!(service.spec.cluster_ip.as_deref(), Some("10.0.0.9"));
        assert_eq!(service.spec.ports[0].port, Some(9090));
        assert!(service.metadata.labels.is_empty());
        assert_eq!(item.namespace(), "apps");
    }

    #[test]
    fn declared_kind_overrides_requested_kind() {
        let item = ResourceItem::from_value(
            &ResourceKind::Other("Thing".to_string()),
            json!({"kind": "Deployment", "metadata": {"name": "api"}}),
        )
        .expect("object parses");
        assert_eq!(item.kind(), ResourceKind::Deployment);
    }

    #[test]
    fn summary_substitutes_placeholders() {
        let item = ResourceItem::from_value(&ResourceKind::Service, json!({}))
            .expect("empty service parses");
        let rows = item.summary_rows(Utc::now());
        let lookup = |label: &str| {
            rows.iter()
                .find(|row| row.label == label)
                .map(|row| row.value.clone())
        };

        assert_eq!(lookup("Name").as_deref(), Some("N/A"));
        assert_eq!(lookup("Type").as_deref(), Some("Unknown"));
        assert_eq!(lookup("Created").as_deref(), Some("Unknown"));
        assert_eq!(lookup("Ports").as_deref(), Some("N/A"));
    }

    #[test]
    fn created_column_includes_age() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("valid date");
        assert_eq!(
            format_created(Some("2024-01-01T00:00:00Z"), now),
            "2024-01-01T00:00:00Z (1d)"
        );
        assert_eq!(format_created(Some("yesterday"), now), "yesterday");
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 23, 58, 0).single().expect("valid date");
        assert_eq!(human_age(created, now), "2m");
    }

    #[test]
    fn namespace_group_rolls_up_member_status() {
        let group = NamespaceGroup::from_value(
            "apps",
            json!({
                "name": "apps",
                "status": "Active",
                "labels": null,
                "resources": {
                    "services": [{"metadata": {"name": "svc"}, "spec": {"clusterIP": "10.0.0.1"}}],
                    "deployments": [{"metadata": {"name": "web", "uid": "u-1"}}]
                }
            }),
        )
        .expect("group parses");

        assert_eq!(group.members.len(), 2);
        assert_eq!(group.sync_status(), SyncStatus::Synced);
        assert_eq!(group.health_status(), HealthStatus::Healthy);

        let degraded = NamespaceGroup::from_value(
            "apps",
            json!({
                "status": "Terminating",
                "resources": {"services": [{"metadata": {"name": "svc"}}]}
            }),
        )
        .expect("group parses");
        assert_eq!(degraded.name, "apps");
        assert_eq!(degraded.sync_status(), SyncStatus::OutOfSync);
        assert_eq!(degraded.health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn cluster_table_marks_current_context() {
        let inventory: ClusterInventory = serde_json::from_value(json!({
            "contexts": [{"name": "wds1-kubeflex", "cluster": "wds1"}],
            "clusters": ["wds1"],
            "currentContext": "its1",
            "itsData": [
                {"name": "cluster2", "labels": null, "creationTime": "2024-01-01T00:00:00Z", "context": "its2"},
                {"name": "cluster1", "labels": {"location-group": "edge"}, "creationTime": "2024-01-01T23:00:00Z", "context": "its1"}
            ]
        }))
        .expect("inventory parses");
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).single().expect("valid date");

        let table = cluster_table(inventory, now);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(
            table.rows[0].columns,
            vec!["cluster1", "its1", "location-group=edge", "Current", "1h"]
        );
        assert_eq!(table.rows[1].columns[3], "Managed");
        assert_eq!(table.rows[1].columns[2], "N/A");
    }
}
