use crate::api::{ApiClient, ApiError};
use crate::model::DeploymentResource;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum PayloadFormat {
    #[default]
    Yaml,
    Json,
}

impl PayloadFormat {
    pub fn toggled(self) -> Self {
        match self {
            Self::Yaml => Self::Json,
            Self::Json => Self::Yaml,
        }
    }

    /// Value sent in the multipart `format` part.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }

    pub fn from_path(path: &str) -> Self {
        if path.to_ascii_lowercase().ends_with(".json") {
            Self::Json
        } else {
            Self::Yaml
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum DialogMode {
    #[default]
    Editor,
    Upload,
    Repository,
}

impl DialogMode {
    pub fn next(self) -> Self {
        match self {
            Self::Editor => Self::Upload,
            Self::Upload => Self::Repository,
            Self::Repository => Self::Editor,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum DialogState {
    #[default]
    Closed,
    EditingYaml,
    EditingJson,
    Submitting,
    Error(String),
    Success,
}

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DraftError {
    #[error("invalid workload file: {0}")]
    Parse(String),
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub fn validate_payload(content: &str, format: PayloadFormat) -> Result<(), String> {
    match format {
        PayloadFormat::Json => serde_json::from_str::<Value>(content)
            .map(|_| ())
            .map_err(|error| format!("invalid JSON: {error}")),
        PayloadFormat::Yaml => {
            if content.trim().is_empty() {
                return Err("YAML content is empty".to_string());
            }
            match serde_yaml::from_str::<serde_yaml::Value>(content) {
                Ok(serde_yaml::Value::Mapping(_)) => Ok(()),
                Ok(_) => Err("YAML document must be a mapping".to_string()),
                Err(error) => Err(format!("invalid YAML: {error}")),
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct PortRequest {
    #[serde(rename = "containerPort")]
    pub container_port: i32,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ContainerRequest {
    pub name: String,
    pub image: String,
    pub ports: Vec<PortRequest>,
}

/// Body of `POST /api/wds/create/json`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CreateWorkloadRequest {
    pub namespace: String,
    pub name: String,
    pub replicas: i32,
    pub labels: BTreeMap<String, String>,
    pub container: ContainerRequest,
}

/// A deployment read from a local file, reduced to what the JSON create
/// endpoint accepts.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WorkloadDraft {
    pub request: CreateWorkloadRequest,
}

impl WorkloadDraft {
    pub fn from_payload(content: &str, format: PayloadFormat) -> Result<Self, DraftError> {
        let value: Value = match format {
            PayloadFormat::Json => serde_json::from_str(content)
                .map_err(|error| DraftError::Parse(error.to_string()))?,
            PayloadFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|error| DraftError::Parse(error.to_string()))?,
        };
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, DraftError> {
        let deployment: DeploymentResource =
            serde_json::from_value(value).map_err(|error| DraftError::Parse(error.to_string()))?;

        let name = present(deployment.metadata.name.as_deref());
        let namespace = present(deployment.metadata.namespace.as_deref());
        let container = deployment.spec.template.spec.containers.first();
        let container_name = container.and_then(|container| present(container.name.as_deref()));
        let ports = container
            .map(|container| {
                container
                    .ports
                    .iter()
                    .filter_map(|port| port.container_port)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("metadata.name");
        }
        if namespace.is_none() {
            missing.push("metadata.namespace");
        }
        if container_name.is_none() {
            missing.push("spec.template.spec.containers[0].name");
        }
        if ports.is_empty() {
            missing.push("spec.template.spec.containers[0].ports[].containerPort");
        }

        let (Some(name), Some(namespace), Some(container_name)) = (name, namespace, container_name)
        else {
            return Err(DraftError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(DraftError::MissingFields(missing));
        }

        if let Some(port) = ports.iter().find(|port| !(1..=65_535).contains(*port)) {
            return Err(DraftError::Invalid {
                field: "containerPort",
                reason: format!("{port} is out of range"),
            });
        }

        let replicas = deployment.spec.replicas.unwrap_or(1);
        if replicas < 0 {
            return Err(DraftError::Invalid {
                field: "spec.replicas",
                reason: "must not be negative".to_string(),
            });
        }

        let labels = if deployment.metadata.labels.is_empty() {
            BTreeMap::from([("app".to_string(), name.clone())])
        } else {
            deployment.metadata.labels.clone()
        };
        let image = container
            .and_then(|container| present(container.image.as_deref()))
            .unwrap_or_default();

        Ok(Self {
            request: CreateWorkloadRequest {
                namespace,
                name,
                replicas,
                labels,
                container: ContainerRequest {
                    name: container_name,
                    image,
                    ports: ports
                        .into_iter()
                        .map(|container_port| PortRequest { container_port })
                        .collect(),
                },
            },
        })
    }
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Body of `POST /api/deploy`; the branch travels as a query parameter.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RepoDeployRequest {
    pub repo_url: String,
    pub folder_path: String,
    pub workload_label: String,
    #[serde(skip)]
    pub branch: String,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum RepoField {
    #[default]
    RepoUrl,
    FolderPath,
    Branch,
    WorkloadLabel,
}

impl RepoField {
    pub const ALL: [Self; 4] = [
        Self::RepoUrl,
        Self::FolderPath,
        Self::Branch,
        Self::WorkloadLabel,
    ];

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|field| *field == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RepoDeployForm {
    pub repo_url: String,
    pub folder_path: String,
    pub branch: String,
    pub workload_label: String,
    pub focus: RepoField,
}

impl RepoDeployForm {
    pub fn field(&self, field: RepoField) -> &str {
        match field {
            RepoField::RepoUrl => &self.repo_url,
            RepoField::FolderPath => &self.folder_path,
            RepoField::Branch => &self.branch,
            RepoField::WorkloadLabel => &self.workload_label,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            RepoField::RepoUrl => &mut self.repo_url,
            RepoField::FolderPath => &mut self.folder_path,
            RepoField::Branch => &mut self.branch,
            RepoField::WorkloadLabel => &mut self.workload_label,
        }
    }

    pub fn validate(&self) -> Result<RepoDeployRequest, DraftError> {
        let repo_url = self.repo_url.trim();
        if repo_url.is_empty() {
            return Err(DraftError::MissingFields(vec!["repo_url"]));
        }
        if !(repo_url.starts_with("https://") || repo_url.starts_with("http://")) {
            return Err(DraftError::Invalid {
                field: "repo_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if !repo_url.contains("github.com") {
            return Err(DraftError::Invalid {
                field: "repo_url",
                reason: "must point at a github.com repository".to_string(),
            });
        }

        let branch = match self.branch.trim() {
            "" => DEFAULT_BRANCH.to_string(),
            branch => branch.to_string(),
        };
        let workload_label = match self.workload_label.trim() {
            "" => default_workload_label(repo_url),
            label => label.to_string(),
        };

        Ok(RepoDeployRequest {
            repo_url: repo_url.to_string(),
            folder_path: self.folder_path.trim().to_string(),
            workload_label,
            branch,
        })
    }
}

/// Lowercased repository base name without a trailing `.git`.
pub fn default_workload_label(repo_url: &str) -> String {
    let trimmed = repo_url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    trimmed
        .rsplit('/')
        .next()
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitRequest {
    Editor {
        content: String,
        format: PayloadFormat,
    },
    Upload {
        path: String,
    },
    Repository(RepoDeployRequest),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SubmitOutcome {
    Created(String),
    AlreadyExists(String),
    Invalid(String),
    Failed(String),
}

impl SubmitOutcome {
    pub fn from_api(result: Result<String, ApiError>) -> Self {
        match result {
            Ok(message) => Self::Created(message),
            Err(error) if error.is_conflict_like() => Self::AlreadyExists(format!(
                "Workload already exists or was rejected: {error}"
            )),
            Err(error) => Self::Failed(format!("Failed to create workload: {error}")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkloadDialog {
    pub state: DialogState,
    pub mode: DialogMode,
    pub format: PayloadFormat,
    pub content: String,
    pub upload_path: String,
    pub repo: RepoDeployForm,
    validation: Option<String>,
}

impl WorkloadDialog {
    pub fn is_open(&self) -> bool {
        !matches!(self.state, DialogState::Closed | DialogState::Success)
    }

    pub fn open(&mut self) {
        self.state = DialogState::EditingYaml;
        self.mode = DialogMode::Editor;
        self.format = PayloadFormat::Yaml;
        self.revalidate();
    }

    pub fn close(&mut self) {
        *self = Self::default();
    }

    pub fn is_submitting(&self) -> bool {
        self.state == DialogState::Submitting
    }

    fn editing_state(&self) -> DialogState {
        match self.format {
            PayloadFormat::Yaml => DialogState::EditingYaml,
            PayloadFormat::Json => DialogState::EditingJson,
        }
    }

    pub fn toggle_format(&mut self) {
        if self.is_submitting() {
            return;
        }
        self.format = self.format.toggled();
        self.state = self.editing_state();
        self.revalidate();
    }

    pub fn cycle_mode(&mut self) {
        if self.is_submitting() {
            return;
        }
        self.mode = self.mode.next();
        self.state = self.editing_state();
    }

    pub fn next_field(&mut self) {
        self.repo.focus = self.repo.focus.next();
    }

    pub fn insert_char(&mut self, ch: char) {
        if self.is_submitting() {
            return;
        }
        match self.mode {
            DialogMode::Editor => self.content.push(ch),
            DialogMode::Upload => self.upload_path.push(ch),
            DialogMode::Repository => self.repo.focused_mut().push(ch),
        }
        self.after_edit();
    }

    /// Inserts a whole paste and validates once.
    pub fn insert_text(&mut self, text: &str) {
        if self.is_submitting() || text.is_empty() {
            return;
        }
        match self.mode {
            DialogMode::Editor => self.content.push_str(text),
            DialogMode::Upload => self.upload_path.push_str(text),
            DialogMode::Repository => self.repo.focused_mut().push_str(text),
        }
        self.after_edit();
    }

    pub fn backspace(&mut self) {
        if self.is_submitting() {
            return;
        }
        match self.mode {
            DialogMode::Editor => {
                self.content.pop();
            }
            DialogMode::Upload => {
                self.upload_path.pop();
            }
            DialogMode::Repository => {
                self.repo.focused_mut().pop();
            }
        }
        self.after_edit();
    }

    fn after_edit(&mut self) {
        if matches!(self.state, DialogState::Error(_) | DialogState::Success) {
            self.state = self.editing_state();
        }
        self.revalidate();
    }

    fn revalidate(&mut self) {
        self.validation = validate_payload(&self.content, self.format).err();
    }

    /// Editor validation message, if the current content does not parse.
    pub fn validation_error(&self) -> Option<&str> {
        self.validation.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        if !matches!(
            self.state,
            DialogState::EditingYaml | DialogState::EditingJson | DialogState::Error(_)
        ) {
            return false;
        }
        match self.mode {
            DialogMode::Editor => self.validation.is_none(),
            DialogMode::Upload => !self.upload_path.trim().is_empty(),
            DialogMode::Repository => self.repo.validate().is_ok(),
        }
    }

    /// Produces the request to send and enters `Submitting`, or records why
    /// nothing can be sent.
    pub fn submit(&mut self) -> Option<SubmitRequest> {
        if !self.can_submit() {
            if self.mode == DialogMode::Repository
                && !self.is_submitting()
                && let Err(error) = self.repo.validate()
            {
                self.state = DialogState::Error(error.to_string());
            }
            return None;
        }

        let request = match self.mode {
            DialogMode::Editor => SubmitRequest::Editor {
                content: self.content.clone(),
                format: self.format,
            },
            DialogMode::Upload => SubmitRequest::Upload {
                path: self.upload_path.trim().to_string(),
            },
            DialogMode::Repository => SubmitRequest::Repository(self.repo.validate().ok()?),
        };
        self.state = DialogState::Submitting;
        Some(request)
    }

    /// Applies the backend outcome. Success clears the editor and hides the dialog.
    pub fn finish(&mut self, outcome: &SubmitOutcome) {
        match outcome {
            SubmitOutcome::Created(_) => {
                self.close();
                self.state = DialogState::Success;
            }
            SubmitOutcome::AlreadyExists(message)
            | SubmitOutcome::Invalid(message)
            | SubmitOutcome::Failed(message) => {
                if self.is_open() {
                    self.state = DialogState::Error(message.clone());
                }
            }
        }
    }
}

/// Sends a dialog submission. Upload payloads are read and checked locally
/// first; an incomplete draft never reaches the backend.
pub async fn submit_workload(client: &ApiClient, request: SubmitRequest) -> SubmitOutcome {
    match request {
        SubmitRequest::Editor { content, format } => {
            SubmitOutcome::from_api(client.create_workload(content, format).await)
        }
        SubmitRequest::Upload { path } => match read_draft(&path).await {
            Ok(draft) => SubmitOutcome::from_api(client.create_workload_json(&draft.request).await),
            Err(message) => SubmitOutcome::Invalid(message),
        },
        SubmitRequest::Repository(request) => {
            SubmitOutcome::from_api(client.deploy_repository(&request).await)
        }
    }
}

async fn read_draft(path: &str) -> Result<WorkloadDraft, String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|error| format!("failed to read {path}: {error}"))?;
    WorkloadDraft::from_payload(&content, PayloadFormat::from_path(path))
        .map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::{
        DialogMode, DialogState, DraftError, PayloadFormat, RepoDeployForm, SubmitOutcome,
        SubmitRequest, WorkloadDialog, WorkloadDraft, default_workload_label, submit_workload,
        validate_payload,
    };
    use crate::api::{ApiClient, ApiError};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fmt::Write as _;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn json_validation_requires_parseable_text() {
        assert!(validate_payload("{\"kind\":\"Deployment\"}", PayloadFormat::Json).is_ok());
        assert!(validate_payload("{not json", PayloadFormat::Json).is_err());
    }

    #[test]
    fn yaml_validation_requires_a_mapping() {
        assert!(validate_payload("kind: Deployment\n", PayloadFormat::Yaml).is_ok());
        assert!(validate_payload("   ", PayloadFormat::Yaml).is_err());
        assert!(validate_payload("- a\n- b\n", PayloadFormat::Yaml).is_err());
        assert!(validate_payload("key: [unclosed", PayloadFormat::Yaml).is_err());
    }

    #[test]
    fn invalid_json_blocks_submit() {
        let mut dialog = WorkloadDialog::default();
        dialog.open();
        dialog.toggle_format();
        assert_eq!(dialog.state, DialogState::EditingJson);

        dialog.insert_text("{not json");
        assert!(dialog.validation_error().is_some());
        assert_eq!(dialog.submit(), None);
        assert_eq!(dialog.state, DialogState::EditingJson);
    }

    #[test]
    fn large_paste_is_accepted_in_one_pass() {
        let mut manifest = String::from("apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  labels:\n");
        for index in 0..1500 {
            let _ = writeln!(manifest, "    label-{index}: value-{index}");
        }

        let mut dialog = WorkloadDialog::default();
        dialog.open();
        dialog.insert_text(&manifest);

        assert_eq!(dialog.content, manifest);
        assert_eq!(dialog.validation_error(), None);
        assert!(dialog.can_submit());
    }

    #[test]
    fn paste_is_ignored_while_submitting() {
        let mut dialog = WorkloadDialog::default();
        dialog.open();
        dialog.insert_text("kind: Deployment\n");
        dialog.submit();

        dialog.insert_text("extra: true\n");
        assert_eq!(dialog.content, "kind: Deployment\n");
    }

    #[test]
    fn valid_editor_content_enters_submitting() {
        let mut dialog = WorkloadDialog::default();
        dialog.open();
        dialog.insert_text("kind: Deployment\n");

        let request = dialog.submit().expect("valid yaml submits");
        assert_eq!(
            request,
            SubmitRequest::Editor {
                content: "kind: Deployment\n".to_string(),
                format: PayloadFormat::Yaml,
            }
        );
        assert!(dialog.is_submitting());
        assert_eq!(dialog.submit(), None);
    }

    #[test]
    fn outcomes_drive_dialog_state() {
        let mut dialog = WorkloadDialog::default();
        dialog.open();
        dialog.insert_text("kind: Deployment\n");
        dialog.submit();

        let conflict = SubmitOutcome::from_api(Err(ApiError::Conflict("exists".to_string())));
        assert!(matches!(conflict, SubmitOutcome::AlreadyExists(_)));
        dialog.finish(&conflict);
        assert!(matches!(dialog.state, DialogState::Error(_)));

        dialog.submit();
        dialog.finish(&SubmitOutcome::from_api(Ok("created".to_string())));
        assert_eq!(dialog.state, DialogState::Success);
        assert!(!dialog.is_open());
        assert!(dialog.content.is_empty());
    }

    #[test]
    fn draft_without_required_fields_is_rejected() {
        let error = WorkloadDraft::from_value(json!({"metadata": {"name": "x"}}))
            .expect_err("draft is incomplete");
        assert_eq!(
            error,
            DraftError::MissingFields(vec![
                "metadata.namespace",
                "spec.template.spec.containers[0].name",
                "spec.template.spec.containers[0].ports[].containerPort",
            ])
        );
        assert!(error.to_string().starts_with("Missing required fields: "));
    }

    #[test]
    fn complete_yaml_draft_builds_request() {
        let yaml = "
metadata:
  name: web
  namespace: apps
spec:
  replicas: 2
  template:
    spec:
      containers:
        - name: web
          image: nginx:1.27
          ports:
            - containerPort: \"8080\"
";
        let draft = WorkloadDraft::from_payload(yaml, PayloadFormat::Yaml).expect("draft parses");
        let body = serde_json::to_value(&draft.request).expect("serializes");
        assert_eq!(
            body,
            json!({
                "namespace": "apps",
                "name": "web",
                "replicas": 2,
                "labels": {"app": "web"},
                "container": {
                    "name": "web",
                    "image": "nginx:1.27",
                    "ports": [{"containerPort": 8080}]
                }
            })
        );
    }

    #[test]
    fn repository_form_applies_defaults() {
        let form = RepoDeployForm {
            repo_url: "https://github.com/acme/Demo-App.git".to_string(),
            ..RepoDeployForm::default()
        };
        let request = form.validate().expect("valid form");
        assert_eq!(request.branch, "main");
        assert_eq!(request.workload_label, "demo-app");
        assert_eq!(default_workload_label("https://github.com/acme/tools/"), "tools");
    }

    #[test]
    fn repository_form_rejects_non_github_urls() {
        let mut form = RepoDeployForm::default();
        assert!(matches!(form.validate(), Err(DraftError::MissingFields(_))));

        form.repo_url = "https://gitlab.com/acme/app".to_string();
        assert!(matches!(form.validate(), Err(DraftError::Invalid { .. })));

        form.repo_url = "git@github.com:acme/app.git".to_string();
        assert!(form.validate().is_err());
    }

    #[test]
    fn invalid_repository_submit_reports_error() {
        let mut dialog = WorkloadDialog::default();
        dialog.open();
        dialog.cycle_mode();
        dialog.cycle_mode();
        assert_eq!(dialog.mode, DialogMode::Repository);

        dialog.insert_text("https://example.com/app");
        assert_eq!(dialog.submit(), None);
        assert!(matches!(dialog.state, DialogState::Error(_)));
    }

    #[test]
    fn upload_format_follows_extension() {
        assert_eq!(PayloadFormat::from_path("deploy.JSON"), PayloadFormat::Json);
        assert_eq!(PayloadFormat::from_path("deploy.yml"), PayloadFormat::Yaml);
    }

    #[tokio::test]
    async fn incomplete_upload_never_calls_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/wds/create/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("draft.json");
        std::fs::write(&file, r#"{"metadata":{"name":"x"}}"#).expect("write draft");

        let client = ApiClient::new(server.uri(), Duration::from_secs(5), Some("jwt".to_string()))
            .expect("client builds");
        let outcome = submit_workload(
            &client,
            SubmitRequest::Upload {
                path: file.display().to_string(),
            },
        )
        .await;

        match outcome {
            SubmitOutcome::Invalid(message) => {
                assert!(message.starts_with("Missing required fields"), "{message}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
