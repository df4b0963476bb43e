use crate::model::{
    ClusterInventory, DeploymentStatusView, NamespaceGroup, NamespaceSummary, ResourceItem, ResourceKind,
    ResourceTarget, ServiceResource, WorkloadSummary,
};
use crate::workload::{CreateWorkloadRequest, PayloadFormat, RepoDeployRequest};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ApiError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("not authenticated")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unexpected status {status}: {message}")]
    Unexpected { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::BAD_REQUEST => Self::BadRequest(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            status if status.is_server_error() => Self::Server {
                status: status.as_u16(),
                message,
            },
            status => Self::Unexpected {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// 400 and 409 both mean the backend refused to create a duplicate.
    pub fn is_conflict_like(&self) -> bool {
        matches!(self, Self::BadRequest(_) | Self::Conflict(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    let error = value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)?;
    match value.get("details").and_then(Value::as_str) {
        Some(details) if !details.is_empty() => Some(format!("{error}: {details}")),
        _ => Some(error.to_string()),
    }
}

const STATUS_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub username: String,
    pub permissions: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: UserInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServiceList {
    services: Option<Vec<ServiceResource>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NamespaceList {
    namespaces: Option<Vec<NamespaceSummary>>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .build()?;
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|error| ApiError::InvalidUrl(format!("{raw}: {error}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(raw));
        }
        Ok(Self {
            client,
            base_url,
            token: token.filter(|token| !token.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|token| !token.is_empty());
    }

    /// Appends each segment percent-encoded, so user input cannot add
    /// path components or a query string.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.endpoint(segments);
        debug!(%method, %url, "backend request");
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            let error = ApiError::from_status(status, &body);
            warn!(status = status.as_u16(), %error, "backend request failed");
            Err(error)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(builder).await?;
        serde_json::from_str(&body).map_err(|error| ApiError::Decode(error.to_string()))
    }

    /// Sends a mutation and returns the backend's `message`, if any.
    async fn send_for_message(
        &self,
        builder: RequestBuilder,
        fallback: &str,
    ) -> Result<String, ApiError> {
        let body = self.send(builder).await?;
        Ok(serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| fallback.to_string()))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::json!({ "username": username, "password": password });
        self.send_json(self.request(Method::POST, &["login"]).json(&body))
            .await
    }

    pub async fn current_user(&self) -> Result<UserInfo, ApiError> {
        self.send_json(self.request(Method::GET, &["api", "me"])).await
    }

    pub async fn list_workloads(&self) -> Result<Vec<WorkloadSummary>, ApiError> {
        let value: Value = self
            .send_json(self.request(Method::GET, &["api", "wds", "workloads"]))
            .await?;
        match value {
            Value::Null => Ok(Vec::new()),
            value => serde_json::from_value(value).map_err(|error| ApiError::Decode(error.to_string())),
        }
    }

    pub async fn list_services(&self, namespace: &str) -> Result<Vec<ServiceResource>, ApiError> {
        let list: ServiceList = self
            .send_json(self.request(Method::GET, &["api", "services", namespace]))
            .await?;
        Ok(list.services.unwrap_or_default())
    }

    pub async fn list_namespaces(&self) -> Result<Vec<NamespaceSummary>, ApiError> {
        let list: NamespaceList = self
            .send_json(self.request(Method::GET, &["api", "namespaces"]))
            .await?;
        Ok(list.namespaces.unwrap_or_default())
    }

    pub async fn list_clusters(&self) -> Result<ClusterInventory, ApiError> {
        self.send_json(self.request(Method::GET, &["api", "clusters"]))
            .await
    }

    pub async fn namespace_details(&self, namespace: &str) -> Result<NamespaceGroup, ApiError> {
        let value: Value = self
            .send_json(self.request(Method::GET, &["api", "namespaces", namespace]))
            .await?;
        NamespaceGroup::from_value(namespace, value)
            .map_err(|error| ApiError::Decode(error.to_string()))
    }

    /// Fetches one resource and normalizes it for the detail panel.
    pub async fn fetch_resource(&self, target: &ResourceTarget) -> Result<ResourceItem, ApiError> {
        match &target.kind {
            ResourceKind::Service => {
                let service = self
                    .list_services(&target.namespace)
                    .await?
                    .into_iter()
                    .find(|service| service.metadata.name.as_deref() == Some(target.name.as_str()))
                    .ok_or_else(|| {
                        ApiError::NotFound(format!(
                            "service {} in namespace {}",
                            target.name, target.namespace
                        ))
                    })?;
                Ok(ResourceItem::Service(service))
            }
            ResourceKind::Deployment => self.fetch_deployment(target).await,
            kind => {
                let segment = kind.api_segment();
                let value: Value = self
                    .send_json(self.request(
                        Method::GET,
                        &["api", segment.as_str(), target.namespace.as_str(), target.name.as_str()],
                    ))
                    .await?;
                ResourceItem::from_value(kind, value)
                    .map_err(|error| ApiError::Decode(error.to_string()))
            }
        }
    }

    async fn fetch_deployment(&self, target: &ResourceTarget) -> Result<ResourceItem, ApiError> {
        let value: Value = self
            .send_json(
                self.request(Method::GET, &["api", "wds", target.name.as_str()])
                    .query(&[("namespace", target.namespace.as_str())]),
            )
            .await?;
        let mut item = ResourceItem::from_value(&ResourceKind::Deployment, value)
            .map_err(|error| ApiError::Decode(error.to_string()))?;

        // The status route only reads the default namespace.
        if target.namespace == STATUS_NAMESPACE
            && let ResourceItem::Deployment(deployment) = &mut item
        {
            match self.deployment_status(&target.name).await {
                Ok(counters) => deployment.status.fill_missing(&counters),
                Err(error) => debug!(%error, name = %target.name, "deployment status unavailable"),
            }
        }
        Ok(item)
    }

    pub async fn deployment_status(&self, name: &str) -> Result<DeploymentStatusView, ApiError> {
        self.send_json(
            self.request(Method::GET, &["api", "wds", "status"])
                .query(&[("name", name)]),
        )
        .await
    }

    pub async fn create_workload(
        &self,
        content: String,
        format: PayloadFormat,
    ) -> Result<String, ApiError> {
        let form = Form::new()
            .text("file", content)
            .text("format", format.as_str());
        self.send_for_message(
            self.request(Method::POST, &["api", "wds", "create"]).multipart(form),
            "Workload created",
        )
        .await
    }

    pub async fn create_workload_json(
        &self,
        request: &CreateWorkloadRequest,
    ) -> Result<String, ApiError> {
        self.send_for_message(
            self.request(Method::POST, &["api", "wds", "create", "json"]).json(request),
            "Workload created",
        )
        .await
    }

    pub async fn deploy_repository(&self, request: &RepoDeployRequest) -> Result<String, ApiError> {
        self.send_for_message(
            self.request(Method::POST, &["api", "deploy"])
                .query(&[("branch", request.branch.as_str())])
                .json(request),
            "Deployment successful",
        )
        .await
    }

    pub async fn plugin_snapshot(&self, plugin_id: &str) -> Result<Value, ApiError> {
        self.send_json(self.request(Method::GET, &["api", "plugins", plugin_id, "snapshot"]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiClient, ApiError};
    use crate::model::{ResourceItem, ResourceKind, ResourceTarget, SyncStatus};
    use crate::workload::{PayloadFormat, RepoDeployRequest};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, token: Option<&str>) -> ApiClient {
        ApiClient::new(
            server.uri(),
            Duration::from_secs(2),
            token.map(str::to_string),
        )
        .expect("client builds")
    }

    #[test]
    fn status_codes_map_onto_error_taxonomy() {
        assert_eq!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        );
        assert_eq!(
            ApiError::from_status(StatusCode::CONFLICT, r#"{"error":"exists"}"#),
            ApiError::Conflict("exists".to_string())
        );
        assert_eq!(
            ApiError::from_status(
                StatusCode::BAD_REQUEST,
                r#"{"error":"Invalid request body","details":"EOF"}"#
            ),
            ApiError::BadRequest("Invalid request body: EOF".to_string())
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down"),
            ApiError::Server {
                status: 502,
                message: "upstream down".to_string()
            }
        );
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::Unexpected { status: 418, .. }
        ));
        assert!(ApiError::BadRequest(String::new()).is_conflict_like());
        assert!(!ApiError::NotFound(String::new()).is_conflict_like());
    }

    #[tokio::test]
    async fn requests_carry_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/me"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"username": "admin", "permissions": {"wds": "write"}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let user = client(&server, Some("secret"))
            .current_user()
            .await
            .expect("user resolves");
        assert_eq!(user.username, "admin");
    }

    #[tokio::test]
    async fn login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"username": "admin", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token": "jwt",
                "user": {"id": 1, "username": "admin", "permissions": {}}
            })))
            .mount(&server)
            .await;

        let response = client(&server, None)
            .login("admin", "pw")
            .await
            .expect("login succeeds");
        assert_eq!(response.token, "jwt");
        assert_eq!(response.user.username, "admin");
    }

    #[tokio::test]
    async fn expired_token_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/namespaces"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "token expired"})),
            )
            .mount(&server)
            .await;

        let error = client(&server, Some("old"))
            .list_namespaces()
            .await
            .expect_err("401 fails");
        assert!(error.is_unauthorized());
    }

    #[tokio::test]
    async fn cluster_listing_reads_managed_clusters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contexts": [],
                "clusters": ["wds1"],
                "currentContext": "its1",
                "itsData": [
                    {"name": "cluster1", "labels": {"env": "edge"}, "context": "its1"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let inventory = client(&server, Some("jwt"))
            .list_clusters()
            .await
            .expect("clusters resolve");
        assert_eq!(inventory.current_context.as_deref(), Some("its1"));
        assert_eq!(inventory.its_data.len(), 1);
        assert_eq!(inventory.its_data[0].name.as_deref(), Some("cluster1"));
    }

    #[tokio::test]
    async fn service_fetch_filters_namespace_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/services/default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "services": [
                    {"metadata": {"name": "other", "labels": null}, "spec": {}},
                    {"metadata": {"name": "svc-a"}, "spec": {"clusterIP": "10.1.2.3"}}
                ]
            })))
            .mount(&server)
            .await;

        let api = client(&server, None);
        let item = api
            .fetch_resource(&ResourceTarget::new(ResourceKind::Service, "default", "svc-a"))
            .await
            .expect("service found");
        assert_eq!(item.sync_status(), SyncStatus::Synced);

        let missing = api
            .fetch_resource(&ResourceTarget::new(ResourceKind::Service, "default", "nope"))
            .await
            .expect_err("unknown service");
        assert!(matches!(missing, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn deployment_fetch_merges_status_counters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wds/status"))
            .and(query_param("name", "web"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deployment": "web",
                "readyReplicas": 2,
                "availableReplicas": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/wds/web"))
            .and(query_param("namespace", "default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "web", "namespace": "default", "uid": "u-1"},
                "spec": {"replicas": 3}
            })))
            .mount(&server)
            .await;

        let item = client(&server, None)
            .fetch_resource(&ResourceTarget::new(ResourceKind::Deployment, "default", "web"))
            .await
            .expect("deployment resolves");
        let ResourceItem::Deployment(deployment) = item else {
            panic!("expected a deployment");
        };
        assert_eq!(deployment.status.ready_replicas, Some(2));
        assert_eq!(deployment.spec.replicas, Some(3));
    }

    #[tokio::test]
    async fn deployment_outside_default_keeps_its_own_counters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/wds/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "readyReplicas": 5,
                "availableReplicas": 5
            })))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/wds/web"))
            .and(query_param("namespace", "apps"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"name": "web", "namespace": "apps", "uid": "u-2"},
                "spec": {"replicas": 3},
                "status": {"replicas": 3}
            })))
            .mount(&server)
            .await;

        let item = client(&server, None)
            .fetch_resource(&ResourceTarget::new(ResourceKind::Deployment, "apps", "web"))
            .await
            .expect("deployment resolves");
        let ResourceItem::Deployment(deployment) = item else {
            panic!("expected a deployment");
        };
        assert_eq!(deployment.status.ready_replicas, None);
        assert_eq!(deployment.status.available_replicas, None);
    }

    #[tokio::test]
    async fn path_input_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/configmaps/default/a%3Fx=1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "ConfigMap",
                "metadata": {"name": "a?x=1", "uid": "cm-2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let item = client(&server, None)
            .fetch_resource(&ResourceTarget::new(
                ResourceKind::from_token("cm"),
                "default",
                "a?x=1",
            ))
            .await
            .expect("escaped name resolves");
        assert_eq!(item.name(), "a?x=1");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let error = ApiClient::new("not a url", Duration::from_secs(1), None)
            .expect_err("relative URL");
        assert!(matches!(error, ApiError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn dynamic_fetch_uses_generic_route() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/configmaps/default/settings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "ConfigMap",
                "metadata": {"name": "settings", "uid": "cm-1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let item = client(&server, None)
            .fetch_resource(&ResourceTarget::new(
                ResourceKind::from_token("configmap"),
                "default",
                "settings",
            ))
            .await
            .expect("object resolves");
        assert_eq!(item.kind().name(), "ConfigMap");
    }

    #[tokio::test]
    async fn conflicting_create_is_conflict_like() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/wds/create"))
            .respond_with(
                ResponseTemplate::new(409).set_body_json(json!({"error": "already exists"})),
            )
            .mount(&server)
            .await;

        let error = client(&server, None)
            .create_workload("kind: Deployment\n".to_string(), PayloadFormat::Yaml)
            .await
            .expect_err("conflict");
        assert!(error.is_conflict_like());
    }

    #[tokio::test]
    async fn repository_deploy_sends_branch_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/deploy"))
            .and(query_param("branch", "dev"))
            .and(body_json(json!({
                "repo_url": "https://github.com/acme/app",
                "folder_path": "k8s",
                "workload_label": "app"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"message": "Deployment successful"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let message = client(&server, None)
            .deploy_repository(&RepoDeployRequest {
                repo_url: "https://github.com/acme/app".to_string(),
                folder_path: "k8s".to_string(),
                workload_label: "app".to_string(),
                branch: "dev".to_string(),
            })
            .await
            .expect("deploy succeeds");
        assert_eq!(message, "Deployment successful");
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let api = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(500), None)
            .expect("client builds");
        let error = api.list_workloads().await.expect_err("nothing listens");
        assert!(matches!(error, ApiError::Transport(_)));
    }
}
