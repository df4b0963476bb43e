use crate::model::{
    ContainerView, DeploymentResource, DeploymentStatusView, DynamicResource, ObjectMetadata,
    ResourceItem, ResourceKind, ResourceTarget, ServiceResource,
};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, LoadBalancerIngress, LoadBalancerStatus, PodSpec, PodTemplateSpec,
    Service, ServicePort, ServiceSpec, ServiceStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DIFF_UNAVAILABLE: &str = "Diff unavailable";

const DEFAULT_SERVICE_TYPE: &str = "NodePort";
const DEFAULT_CLUSTER_IP: &str = "10.96.0.1";
const DEFAULT_PORT: i32 = 80;
const DEFAULT_PROTOCOL: &str = "TCP";
const DEFAULT_REPLICAS: i32 = 1;
const DEFAULT_IMAGE: &str = "nginx:latest";

/// Metadata keys the API server owns; the desired view never shows them.
const SERVER_METADATA_KEYS: [&str; 5] = [
    "uid",
    "resourceVersion",
    "creationTimestamp",
    "managedFields",
    "generation",
];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ManifestView {
    #[default]
    Live,
    Diff,
    Desired,
}

impl ManifestView {
    pub const ALL: [Self; 3] = [Self::Live, Self::Diff, Self::Desired];

    pub fn next(self) -> Self {
        match self {
            Self::Live => Self::Diff,
            Self::Diff => Self::Desired,
            Self::Desired => Self::Live,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ManifestFormat {
    #[default]
    Yaml,
    Json,
}

impl ManifestFormat {
    pub fn toggled(self) -> Self {
        match self {
            Self::Yaml => Self::Json,
            Self::Json => Self::Yaml,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

/// Renders the manifest text for a resource. Without a fetched resource the
/// canned template for `target` is produced instead.
pub fn generate_manifest(
    target: &ResourceTarget,
    resource: Option<&ResourceItem>,
    view: ManifestView,
    format: ManifestFormat,
) -> String {
    let live = match view {
        ManifestView::Diff => return DIFF_UNAVAILABLE.to_string(),
        ManifestView::Live => true,
        ManifestView::Desired => false,
    };

    match (&target.kind, resource) {
        (_, Some(ResourceItem::Service(service))) => {
            render(&service_manifest(target, Some(service), live), format)
        }
        (_, Some(ResourceItem::Deployment(deployment))) => {
            render(&deployment_manifest(target, Some(deployment), live), format)
        }
        (_, Some(ResourceItem::Dynamic(dynamic))) => {
            render(&dynamic_manifest(target, Some(dynamic), live), format)
        }
        (ResourceKind::Service, None) => render(&service_manifest(target, None, live), format),
        (ResourceKind::Deployment, None) => {
            render(&deployment_manifest(target, None, live), format)
        }
        (ResourceKind::Other(_), None) => render(&dynamic_manifest(target, None, live), format),
    }
}

fn render<T: Serialize>(value: &T, format: ManifestFormat) -> String {
    let rendered = match format {
        ManifestFormat::Yaml => serde_yaml::to_string(value).map_err(|error| error.to_string()),
        ManifestFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|error| error.to_string())
        }
    };
    rendered.unwrap_or_else(|error| format!("failed to render manifest: {error}"))
}

fn object_meta(target: &ResourceTarget, metadata: Option<&ObjectMetadata>, live: bool) -> ObjectMeta {
    let name = metadata
        .and_then(|metadata| metadata.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| target.name.clone());
    let namespace = metadata
        .and_then(|metadata| metadata.namespace.clone())
        .filter(|namespace| !namespace.is_empty())
        .unwrap_or_else(|| target.namespace.clone());
    let labels = metadata
        .map(|metadata| metadata.labels.clone())
        .filter(|labels| !labels.is_empty());

    let mut meta = ObjectMeta {
        name: Some(name),
        namespace: Some(namespace),
        labels,
        ..ObjectMeta::default()
    };

    if let Some(metadata) = metadata.filter(|_| live) {
        meta.uid = metadata.uid.clone().filter(|uid| !uid.is_empty());
        meta.creation_timestamp = metadata
            .creation_timestamp
            .as_deref()
            .and_then(|raw| serde_json::from_value::<Time>(Value::String(raw.to_string())).ok());
    }
    meta
}

fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), name.to_string())])
}

fn service_manifest(
    target: &ResourceTarget,
    service: Option<&ServiceResource>,
    live: bool,
) -> Service {
    let metadata = object_meta(target, service.map(|service| &service.metadata), live);
    let name = metadata.name.clone().unwrap_or_else(|| target.name.clone());

    let ports = service
        .map(|service| {
            service
                .spec
                .ports
                .iter()
                .map(|port| {
                    let number = port.port.unwrap_or(DEFAULT_PORT);
                    ServicePort {
                        name: port.name.clone(),
                        port: number,
                        target_port: Some(
                            port.target_port
                                .clone()
                                .unwrap_or(IntOrString::Int(number)),
                        ),
                        node_port: port.node_port,
                        protocol: Some(
                            port.protocol
                                .clone()
                                .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
                        ),
                        ..ServicePort::default()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|ports| !ports.is_empty())
        .unwrap_or_else(|| {
            vec![ServicePort {
                port: DEFAULT_PORT,
                target_port: Some(IntOrString::Int(DEFAULT_PORT)),
                protocol: Some(DEFAULT_PROTOCOL.to_string()),
                ..ServicePort::default()
            }]
        });

    let selector = service
        .map(|service| service.spec.selector.clone())
        .filter(|selector| !selector.is_empty())
        .unwrap_or_else(|| app_labels(&name));

    let spec = ServiceSpec {
        type_: Some(
            service
                .and_then(|service| service.spec.type_.clone())
                .filter(|kind| !kind.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_TYPE.to_string()),
        ),
        cluster_ip: Some(
            service
                .and_then(|service| service.spec.cluster_ip.clone())
                .filter(|ip| !ip.is_empty())
                .unwrap_or_else(|| DEFAULT_CLUSTER_IP.to_string()),
        ),
        ports: Some(ports),
        selector: Some(selector),
        ..ServiceSpec::default()
    };

    let status = service.filter(|_| live).and_then(|service| {
        let ingress = service
            .status
            .load_balancer
            .ingress
            .iter()
            .map(|entry| LoadBalancerIngress {
                ip: entry.ip.clone(),
                hostname: entry.hostname.clone(),
                ..LoadBalancerIngress::default()
            })
            .collect::<Vec<_>>();
        (!ingress.is_empty()).then(|| ServiceStatus {
            load_balancer: Some(LoadBalancerStatus {
                ingress: Some(ingress),
            }),
            ..ServiceStatus::default()
        })
    });

    Service {
        metadata,
        spec: Some(spec),
        status,
    }
}

fn container_from_view(view: &ContainerView, fallback_name: &str) -> Container {
    let ports = view
        .ports
        .iter()
        .filter_map(|port| {
            port.container_port.map(|number| ContainerPort {
                container_port: number,
                name: port.name.clone(),
                protocol: port.protocol.clone(),
                ..ContainerPort::default()
            })
        })
        .collect::<Vec<_>>();

    Container {
        name: view
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name.to_string()),
        image: Some(
            view.image
                .clone()
                .filter(|image| !image.is_empty())
                .unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
        ),
        ports: Some(if ports.is_empty() {
            vec![default_container_port()]
        } else {
            ports
        }),
        ..Container::default()
    }
}

fn default_container_port() -> ContainerPort {
    ContainerPort {
        container_port: DEFAULT_PORT,
        ..ContainerPort::default()
    }
}

fn deployment_status(status: &DeploymentStatusView) -> DeploymentStatus {
    DeploymentStatus {
        replicas: status.replicas,
        ready_replicas: status.ready_replicas,
        available_replicas: status.available_replicas,
        updated_replicas: status.updated_replicas,
        unavailable_replicas: status.unavailable_replicas,
        ..DeploymentStatus::default()
    }
}

fn deployment_manifest(
    target: &ResourceTarget,
    deployment: Option<&DeploymentResource>,
    live: bool,
) -> Deployment {
    let mut metadata = object_meta(target, deployment.map(|item| &item.metadata), live);
    let name = metadata.name.clone().unwrap_or_else(|| target.name.clone());
    if metadata.labels.is_none() {
        metadata.labels = Some(app_labels(&name));
    }

    let match_labels = deployment
        .map(|item| item.spec.selector.match_labels.clone())
        .filter(|labels| !labels.is_empty())
        .unwrap_or_else(|| app_labels(&name));
    let template_labels = deployment
        .map(|item| item.spec.template.metadata.labels.clone())
        .filter(|labels| !labels.is_empty())
        .unwrap_or_else(|| match_labels.clone());

    let containers = deployment
        .map(|item| {
            item.spec
                .template
                .spec
                .containers
                .iter()
                .map(|container| container_from_view(container, &name))
                .collect::<Vec<_>>()
        })
        .filter(|containers| !containers.is_empty())
        .unwrap_or_else(|| {
            vec![Container {
                name: name.clone(),
                image: Some(DEFAULT_IMAGE.to_string()),
                ports: Some(vec![default_container_port()]),
                ..Container::default()
            }]
        });

    let spec = DeploymentSpec {
        replicas: Some(
            deployment
                .and_then(|item| item.spec.replicas)
                .unwrap_or(DEFAULT_REPLICAS),
        ),
        selector: LabelSelector {
            match_labels: Some(match_labels),
            ..LabelSelector::default()
        },
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(template_labels),
                ..ObjectMeta::default()
            }),
            spec: Some(PodSpec {
                containers,
                ..PodSpec::default()
            }),
        },
        ..DeploymentSpec::default()
    };

    let status = deployment
        .filter(|item| live && !item.status.is_empty())
        .map(|item| deployment_status(&item.status));

    Deployment {
        metadata,
        spec: Some(spec),
        status,
    }
}

fn dynamic_manifest(
    target: &ResourceTarget,
    dynamic: Option<&DynamicResource>,
    live: bool,
) -> Value {
    let mut object = dynamic
        .and_then(|dynamic| dynamic.raw.as_object().cloned())
        .unwrap_or_default();

    if !object.contains_key("apiVersion") {
        object.insert("apiVersion".to_string(), Value::String("v1".to_string()));
    }
    if !object.contains_key("kind") {
        object.insert(
            "kind".to_string(),
            Value::String(target.kind.name().to_string()),
        );
    }

    let metadata = object
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Value::Object(metadata) = metadata {
        if !metadata.contains_key("name") {
            metadata.insert("name".to_string(), Value::String(target.name.clone()));
        }
        if !metadata.contains_key("namespace") {
            metadata.insert(
                "namespace".to_string(),
                Value::String(target.namespace.clone()),
            );
        }
        if !live {
            for key in SERVER_METADATA_KEYS {
                metadata.remove(key);
            }
        }
    }

    if !live {
        object.remove("status");
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::{DIFF_UNAVAILABLE, ManifestFormat, ManifestView, generate_manifest};
    use crate::model::{ResourceItem, ResourceKind, ResourceTarget};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn service_target(name: &str) -> ResourceTarget {
        ResourceTarget::new(ResourceKind::Service, "default", name)
    }

    #[test]
    fn live_service_manifest_carries_fetched_fields() {
        let target = service_target("svc-a");
        let item = ResourceItem::from_value(
            &ResourceKind::Service,
            json!({
                "metadata": {"name": "svc-a", "namespace": "default"},
                "spec": {
                    "clusterIP": "10.1.2.3",
                    "ports": [{"port": 8080, "targetPort": 8080, "protocol": "TCP"}]
                }
            }),
        )
        .expect("service parses");

        let yaml = generate_manifest(
            &target,
            Some(&item),
            ManifestView::Live,
            ManifestFormat::Yaml,
        );
        assert!(yaml.contains("clusterIP: 10.1.2.3"), "{yaml}");

        let parsed: Value = serde_yaml::from_str(&yaml).expect("manifest is valid yaml");
        let ports = parsed["spec"]["ports"].as_array().expect("ports array");
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0]["port"], json!(8080));
        assert_eq!(ports[0]["protocol"], json!("TCP"));
    }

    #[test]
    fn default_service_template_is_fixed() {
        let yaml = generate_manifest(
            &service_target("web"),
            None,
            ManifestView::Live,
            ManifestFormat::Yaml,
        );

        assert_eq!(
            yaml,
            "apiVersion: v1
kind: Service
metadata:
  name: web
  namespace: default
spec:
  clusterIP: 10.96.0.1
  ports:
  - port: 80
    protocol: TCP
    targetPort: 80
  selector:
    app: web
  type: NodePort
"
        );
    }

    #[test]
    fn default_deployment_template_uses_nginx() {
        let target = ResourceTarget::new(ResourceKind::Deployment, "apps", "api");
        let json_text = generate_manifest(&target, None, ManifestView::Live, ManifestFormat::Json);
        let parsed: Value = serde_json::from_str(&json_text).expect("manifest is valid json");

        assert_eq!(parsed["kind"], json!("Deployment"));
        assert_eq!(parsed["apiVersion"], json!("apps/v1"));
        assert_eq!(parsed["spec"]["replicas"], json!(1));
        assert_eq!(parsed["spec"]["selector"]["matchLabels"]["app"], json!("api"));
        let container = &parsed["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["name"], json!("api"));
        assert_eq!(container["image"], json!("nginx:latest"));
        assert_eq!(container["ports"][0]["containerPort"], json!(80));
    }

    #[test]
    fn diff_view_is_a_placeholder() {
        for format in [ManifestFormat::Yaml, ManifestFormat::Json] {
            assert_eq!(
                generate_manifest(&service_target("x"), None, ManifestView::Diff, format),
                DIFF_UNAVAILABLE
            );
        }
    }

    #[test]
    fn desired_view_drops_status_and_server_metadata() {
        let target = ResourceTarget::new(
            ResourceKind::Other("ConfigMap".to_string()),
            "default",
            "settings",
        );
        let item = ResourceItem::from_value(
            &target.kind,
            json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {
                    "name": "settings",
                    "namespace": "default",
                    "uid": "u-1",
                    "resourceVersion": "42",
                    "managedFields": [{}]
                },
                "data": {"mode": "fast"},
                "status": {"phase": "Bound"}
            }),
        )
        .expect("object parses");

        let live = generate_manifest(&target, Some(&item), ManifestView::Live, ManifestFormat::Json);
        let desired =
            generate_manifest(&target, Some(&item), ManifestView::Desired, ManifestFormat::Json);
        let live: Value = serde_json::from_str(&live).expect("json");
        let desired: Value = serde_json::from_str(&desired).expect("json");

        assert_eq!(live["status"]["phase"], json!("Bound"));
        assert_eq!(live["metadata"]["uid"], json!("u-1"));
        assert!(desired.get("status").is_none());
        assert!(desired["metadata"].get("uid").is_none());
        assert!(desired["metadata"].get("resourceVersion").is_none());
        assert!(desired["metadata"].get("managedFields").is_none());
        assert_eq!(desired["data"]["mode"], json!("fast"));
    }

    #[test]
    fn default_dynamic_template_has_metadata_only() {
        let target = ResourceTarget::new(ResourceKind::from_token("secrets"), "vault", "creds");
        let yaml = generate_manifest(&target, None, ManifestView::Live, ManifestFormat::Yaml);
        assert_eq!(
            yaml,
            "apiVersion: v1
kind: Secret
metadata:
  name: creds
  namespace: vault
"
        );
    }

    #[test]
    fn generation_is_idempotent() {
        let target = ResourceTarget::new(ResourceKind::Deployment, "apps", "web");
        let item = ResourceItem::from_value(
            &ResourceKind::Deployment,
            json!({
                "metadata": {"name": "web", "namespace": "apps", "uid": "abc", "labels": {"tier": "fe"}},
                "spec": {
                    "replicas": "3",
                    "template": {"spec": {"containers": [{"name": "web", "image": "web:1", "ports": [{"containerPort": 8080}]}]}}
                },
                "status": {"readyReplicas": 2}
            }),
        )
        .expect("deployment parses");

        for view in ManifestView::ALL {
            for format in [ManifestFormat::Yaml, ManifestFormat::Json] {
                let first = generate_manifest(&target, Some(&item), view, format);
                let second = generate_manifest(&target, Some(&item), view, format);
                assert_eq!(first, second);
            }
        }

        let desired =
            generate_manifest(&target, Some(&item), ManifestView::Desired, ManifestFormat::Yaml);
        assert!(!desired.contains("status:"));
        assert!(!desired.contains("uid:"));
        let parsed: Value = serde_yaml::from_str(&desired).expect("yaml");
        assert_eq!(parsed["spec"]["replicas"], json!(3));
        assert_eq!(
            parsed["spec"]["template"]["spec"]["containers"][0]["image"],
            json!("web:1")
        );
    }
}
