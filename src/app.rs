use crate::api::{ApiError, LoginResponse, UserInfo};
use crate::config::PluginShortcut;
use crate::detail::{DetailPanel, GroupPanel, Panel};
use crate::i18n::{Locale, Msg, tr};
use crate::input::Action;
use crate::model::{NamespaceGroup, ResourceItem, ResourceKind, ResourceTarget, TableData, View};
use crate::prefs::{PreferenceStore, Preferences};
use crate::toast::{ToastLevel, ToastQueue};
use crate::workload::{DialogMode, DialogState, SubmitOutcome, SubmitRequest, WorkloadDialog};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

const PAGE_STEP: isize = 10;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum InputMode {
    Normal,
    Command,
    Dialog,
    Login,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionState {
    Checking,
    Authenticated { username: String },
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    CheckSession,
    RefreshView {
        view: View,
        namespace: String,
    },
    FetchResource {
        target: ResourceTarget,
        generation: u64,
    },
    FetchGroup {
        namespace: String,
        generation: u64,
    },
    Submit(SubmitRequest),
    PluginSnapshot {
        id: String,
    },
    Login {
        username: String,
        password: String,
    },
    StoreToken {
        token: String,
        then_refresh: View,
    },
    ForgetToken,
}

/// Results reported back to the UI loop by spawned backend tasks.
#[derive(Debug)]
pub enum AppEvent {
    ViewLoaded {
        view: View,
        namespace: String,
        result: Result<TableData, ApiError>,
    },
    ResourceLoaded {
        generation: u64,
        result: Result<ResourceItem, ApiError>,
    },
    GroupLoaded {
        generation: u64,
        result: Result<NamespaceGroup, ApiError>,
    },
    SubmitFinished(SubmitOutcome),
    PluginLoaded {
        id: String,
        result: Result<Value, ApiError>,
    },
    LoginFinished(Result<LoginResponse, ApiError>),
    SessionChecked(Result<UserInfo, ApiError>),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ConfirmedAction {
    Delete,
}

#[derive(Debug, Clone)]
struct PendingConfirmation {
    prompt: String,
    action: ConfirmedAction,
    target: ResourceTarget,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub password_focused: bool,
    pub submitting: bool,
    pub error: Option<String>,
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        if self.password_focused {
            &mut self.password
        } else {
            &mut self.username
        }
    }
}

#[derive(Debug)]
pub struct App {
    running: bool,
    mode: InputMode,
    view: View,
    tables: HashMap<View, TableData>,
    namespace: String,
    input: String,
    status: String,
    show_help: bool,
    pending_confirmation: Option<PendingConfirmation>,
    panel: Option<Panel>,
    generation: u64,
    toasts: ToastQueue,
    dialog: WorkloadDialog,
    submit_toast: Option<u64>,
    prefs: PreferenceStore,
    session: SessionState,
    login: LoginForm,
    overlay: Option<(String, String)>,
    plugins: Vec<PluginShortcut>,
}

impl App {
    pub fn new(
        namespace: String,
        prefs: PreferenceStore,
        plugins: Vec<PluginShortcut>,
        has_token: bool,
    ) -> Self {
        let (session, mode) = if has_token {
            (SessionState::Checking, InputMode::Normal)
        } else {
            (SessionState::Public, InputMode::Login)
        };
        let locale = prefs.current().locale;
        Self {
            running: true,
            mode,
            view: View::Workloads,
            tables: HashMap::new(),
            namespace,
            input: String::new(),
            status: tr(locale, Msg::Loading).to_string(),
            show_help: false,
            pending_confirmation: None,
            panel: None,
            generation: 0,
            toasts: ToastQueue::default(),
            dialog: WorkloadDialog::default(),
            submit_toast: None,
            prefs,
            session,
            login: LoginForm::default(),
            overlay: None,
            plugins,
        }
    }

    /// Command to run before the first frame.
    pub fn initial_command(&self) -> AppCommand {
        match self.session {
            SessionState::Checking => AppCommand::CheckSession,
            _ => AppCommand::None,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn pending_confirmation_prompt(&self) -> Option<&str> {
        self.pending_confirmation
            .as_ref()
            .map(|pending| pending.prompt.as_str())
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.current()
    }

    pub fn locale(&self) -> Locale {
        self.prefs.current().locale
    }

    pub fn tr(&self, msg: Msg) -> &'static str {
        tr(self.locale(), msg)
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn login_form(&self) -> &LoginForm {
        &self.login
    }

    pub fn dialog(&self) -> &WorkloadDialog {
        &self.dialog
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn overlay(&self) -> Option<(&str, &str)> {
        self.overlay
            .as_ref()
            .map(|(title, body)| (title.as_str(), body.as_str()))
    }

    pub fn plugins(&self) -> &[PluginShortcut] {
        &self.plugins
    }

    pub fn panel(&self) -> Option<&Panel> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut Panel> {
        self.panel.as_mut()
    }

    pub fn active_table(&self) -> Option<&TableData> {
        self.tables.get(&self.view)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn refresh_command(&self) -> AppCommand {
        match self.session {
            SessionState::Authenticated { .. } => AppCommand::RefreshView {
                view: self.view,
                namespace: self.namespace.clone(),
            },
            SessionState::Checking => AppCommand::CheckSession,
            SessionState::Public => AppCommand::None,
        }
    }

    /// Prunes expired toasts and drops a panel whose close delay has elapsed.
    pub fn on_tick(&mut self, now: Instant) {
        self.toasts.prune(now);
        if self
            .panel
            .as_ref()
            .is_some_and(|panel| panel.chrome().poll_close(now))
        {
            debug!("panel closed");
            self.panel = None;
        }
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if matches!(action, Action::Quit) {
            self.running = false;
            self.status = "Exit requested".to_string();
            return AppCommand::None;
        }

        if let Some(pending) = self.pending_confirmation.take() {
            match action {
                Action::ConfirmYes => {
                    self.status = format!("Confirmed: {}", pending.prompt);
                    match pending.action {
                        ConfirmedAction::Delete => self.log_only_action("Delete", &pending.target),
                    }
                    return AppCommand::None;
                }
                Action::ConfirmNo | Action::CancelInput | Action::Close => {
                    self.status = "Action cancelled".to_string();
                    return AppCommand::None;
                }
                _ => {
                    self.pending_confirmation = Some(pending);
                    self.status =
                        "Pending confirmation: press y to confirm or n to cancel".to_string();
                    return AppCommand::None;
                }
            }
        }

        if self.show_help && !matches!(action, Action::ToggleHelp) {
            self.show_help = false;
            if matches!(action, Action::Close) {
                return AppCommand::None;
            }
        }

        match self.mode {
            InputMode::Login => self.apply_login_action(action),
            InputMode::Command => self.apply_command_action(action),
            InputMode::Dialog => self.apply_dialog_action(action),
            InputMode::Normal => self.apply_normal_action(action),
        }
    }

    /// Bracketed paste goes to whichever text field currently has focus.
    pub fn paste(&mut self, text: &str) {
        match self.mode {
            InputMode::Dialog => self.dialog.insert_text(text),
            InputMode::Command => self.input.push_str(text.lines().next().unwrap_or_default()),
            InputMode::Login => self.login.focused_mut().push_str(text.trim()),
            InputMode::Normal => {}
        }
    }

    fn apply_normal_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::Down | Action::ScrollDown => {
                self.move_cursor(1);
                AppCommand::None
            }
            Action::Up | Action::ScrollUp => {
                self.move_cursor(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_cursor(PAGE_STEP);
                AppCommand::None
            }
            Action::PageUp => {
                self.move_cursor(-PAGE_STEP);
                AppCommand::None
            }
            Action::Top => {
                self.move_cursor(isize::MIN / 2);
                AppCommand::None
            }
            Action::Bottom => {
                self.move_cursor(isize::MAX / 2);
                AppCommand::None
            }
            Action::NextView => self.switch_view_by_offset(1),
            Action::PrevView => self.switch_view_by_offset(-1),
            Action::SelectView(index) => match View::ALL.get(usize::from(index).saturating_sub(1)) {
                Some(view) if index > 0 => self.switch_view(*view),
                _ => AppCommand::None,
            },
            Action::ToggleHelp => {
                self.show_help = !self.show_help;
                AppCommand::None
            }
            Action::StartCommand => {
                self.mode = InputMode::Command;
                self.input.clear();
                self.status = "Command mode (:help for commands)".to_string();
                AppCommand::None
            }
            Action::Refresh => {
                self.status = format!("Refreshing {}", self.view_label(self.view));
                self.refresh_command()
            }
            Action::Open => self.open_selected(),
            Action::Close => {
                if let Some(panel) = self.panel.as_mut() {
                    panel.chrome_mut().request_close(Instant::now());
                } else if self.overlay.take().is_some() {
                    self.status = "Overlay closed".to_string();
                }
                AppCommand::None
            }
            Action::NextDetailTab => {
                if let Some(Panel::Detail(panel)) = self.panel.as_mut() {
                    panel.next_tab();
                }
                AppCommand::None
            }
            Action::PrevDetailTab => {
                if let Some(Panel::Detail(panel)) = self.panel.as_mut() {
                    panel.previous_tab();
                }
                AppCommand::None
            }
            Action::CycleManifestView => {
                if let Some(Panel::Detail(panel)) = self.panel.as_mut() {
                    panel.cycle_manifest_view();
                }
                AppCommand::None
            }
            Action::ToggleManifestFormat => {
                if let Some(Panel::Detail(panel)) = self.panel.as_mut() {
                    panel.toggle_manifest_format();
                    self.status = format!("Manifest format: {}", panel.manifest_format.label());
                }
                AppCommand::None
            }
            Action::SyncResource => {
                if let Some(target) = self.open_detail_target() {
                    self.log_only_action("Sync", &target);
                } else {
                    self.status = "Open a resource to sync it".to_string();
                }
                AppCommand::None
            }
            Action::DeleteResource => {
                let Some(target) = self.open_detail_target() else {
                    self.status = "Open a resource to delete it".to_string();
                    return AppCommand::None;
                };
                let prompt = format!("Delete {target}? (y/n)");
                self.status = prompt.clone();
                self.pending_confirmation = Some(PendingConfirmation {
                    prompt,
                    action: ConfirmedAction::Delete,
                    target,
                });
                AppCommand::None
            }
            Action::OpenCreateDialog => self.open_create_dialog(),
            Action::ToggleTheme => {
                let theme = self.prefs.toggle_theme();
                self.status = format!("Theme: {theme}");
                AppCommand::None
            }
            Action::CycleLocale => {
                let next = self.locale().next();
                self.prefs.set_locale(next);
                self.status = format!("Language: {next}");
                AppCommand::None
            }
            Action::Click { column, row } => {
                if let Some(panel) = self.panel.as_mut() {
                    let chrome = panel.chrome_mut();
                    if !chrome.is_closing() && chrome.area.is_some() && !chrome.contains(column, row)
                    {
                        chrome.request_close(Instant::now());
                    }
                }
                AppCommand::None
            }
            Action::ConfirmYes | Action::ConfirmNo => AppCommand::None,
            Action::Quit
            | Action::SubmitInput
            | Action::CancelInput
            | Action::Backspace
            | Action::InputChar(_)
            | Action::NextField
            | Action::CycleDialogMode => AppCommand::None,
        }
    }

    fn apply_command_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::InputChar(c) => {
                self.input.push(c);
                AppCommand::None
            }
            Action::Backspace => {
                self.input.pop();
                AppCommand::None
            }
            Action::CancelInput => {
                self.mode = InputMode::Normal;
                self.input.clear();
                self.status = "Command cancelled".to_string();
                AppCommand::None
            }
            Action::SubmitInput => {
                let line = self.input.trim().to_string();
                self.mode = InputMode::Normal;
                self.input.clear();
                self.execute_command_line(&line)
            }
            _ => AppCommand::None,
        }
    }

    fn apply_dialog_action(&mut self, action: Action) -> AppCommand {
        match action {
            Action::CancelInput => {
                self.dialog.close();
                self.mode = InputMode::Normal;
                self.status = "Create workload cancelled".to_string();
                AppCommand::None
            }
            Action::InputChar('\n') if self.dialog.mode != DialogMode::Editor => {
                self.submit_dialog()
            }
            Action::InputChar(c) => {
                self.dialog.insert_char(c);
                AppCommand::None
            }
            Action::Backspace => {
                self.dialog.backspace();
                AppCommand::None
            }
            Action::NextField => {
                match self.dialog.mode {
                    DialogMode::Editor => self.dialog.toggle_format(),
                    DialogMode::Repository => self.dialog.next_field(),
                    DialogMode::Upload => {}
                }
                AppCommand::None
            }
            Action::CycleDialogMode => {
                self.dialog.cycle_mode();
                AppCommand::None
            }
            Action::SubmitInput => self.submit_dialog(),
            _ => AppCommand::None,
        }
    }

    fn apply_login_action(&mut self, action: Action) -> AppCommand {
        if self.login.submitting {
            return AppCommand::None;
        }
        match action {
            Action::InputChar(c) => {
                self.login.focused_mut().push(c);
                self.login.error = None;
                AppCommand::None
            }
            Action::Backspace => {
                self.login.focused_mut().pop();
                AppCommand::None
            }
            Action::NextField => {
                self.login.password_focused = !self.login.password_focused;
                AppCommand::None
            }
            Action::CancelInput => {
                self.login = LoginForm::default();
                AppCommand::None
            }
            Action::SubmitInput => {
                let username = self.login.username.trim().to_string();
                let password = self.login.password.trim().to_string();
                if username.is_empty() || password.is_empty() {
                    self.login.error = Some("Username and password are required".to_string());
                    return AppCommand::None;
                }
                self.login.submitting = true;
                self.login.error = None;
                self.status = format!("Signing in as {username}");
                AppCommand::Login { username, password }
            }
            _ => AppCommand::None,
        }
    }

    fn submit_dialog(&mut self) -> AppCommand {
        match self.dialog.submit() {
            Some(request) => {
                let text = self.tr(Msg::Submitting);
                let id = self.toasts.loading(text);
                self.submit_toast = Some(id);
                AppCommand::Submit(request)
            }
            None => {
                if !self.dialog.is_submitting() {
                    let reason = match &self.dialog.state {
                        DialogState::Error(message) => message.clone(),
                        _ => self
                            .dialog
                            .validation_error()
                            .filter(|_| self.dialog.mode == DialogMode::Editor)
                            .unwrap_or("Nothing to submit")
                            .to_string(),
                    };
                    self.toasts.warning(reason);
                }
                AppCommand::None
            }
        }
    }

    fn open_create_dialog(&mut self) -> AppCommand {
        self.overlay = None;
        self.dialog.open();
        self.mode = InputMode::Dialog;
        self.status = "Create workload: Tab format, F2 source, Ctrl+S apply, Esc cancel".to_string();
        AppCommand::None
    }

    fn log_only_action(&mut self, verb: &str, target: &ResourceTarget) {
        info!(action = verb, kind = %target.kind, namespace = %target.namespace, name = %target.name, "resource action requested");
        self.toasts.warning(format!(
            "{verb} {target} is not available from this console yet"
        ));
    }

    fn open_detail_target(&self) -> Option<ResourceTarget> {
        match self.panel.as_ref()? {
            Panel::Detail(panel) if !panel.chrome.is_closing() => Some(panel.target.clone()),
            _ => None,
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn open_detail(&mut self, target: ResourceTarget) -> AppCommand {
        let generation = self.next_generation();
        self.status = format!("Loading {target}");
        self.panel = Some(Panel::Detail(DetailPanel::open(target.clone(), generation)));
        AppCommand::FetchResource { target, generation }
    }

    pub fn open_group(&mut self, namespace: String) -> AppCommand {
        let generation = self.next_generation();
        self.status = format!("Loading namespace {namespace}");
        self.panel = Some(Panel::Group(GroupPanel::open(namespace.clone(), generation)));
        AppCommand::FetchGroup {
            namespace,
            generation,
        }
    }

    fn open_selected(&mut self) -> AppCommand {
        if let Some(Panel::Group(group)) = self.panel.as_ref() {
            return match group.selected_target() {
                Some(target) => self.open_detail(target),
                None => AppCommand::None,
            };
        }
        if self.panel.is_some() {
            return AppCommand::None;
        }

        let Some(row) = self.active_table().and_then(TableData::selected_row).cloned() else {
            self.status = "Nothing selected".to_string();
            return AppCommand::None;
        };

        match self.view {
            View::Clusters => {
                self.status = format!("Cluster {}: {}", row.name, row.columns.join("  "));
                AppCommand::None
            }
            View::Namespaces => self.open_group(row.name),
            View::Services => {
                let namespace = row.namespace.unwrap_or_else(|| self.namespace.clone());
                self.open_detail(ResourceTarget::new(ResourceKind::Service, namespace, row.name))
            }
            View::Workloads => {
                let kind = row
                    .kind
                    .as_deref()
                    .map(ResourceKind::from_token)
                    .unwrap_or(ResourceKind::Deployment);
                let namespace = row.namespace.unwrap_or_else(|| self.namespace.clone());
                self.open_detail(ResourceTarget::new(kind, namespace, row.name))
            }
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        match self.panel.as_mut() {
            Some(Panel::Group(group)) => {
                if delta > 0 {
                    for _ in 0..delta.min(PAGE_STEP * 100) {
                        group.select_next();
                    }
                } else {
                    for _ in 0..delta.unsigned_abs().min(PAGE_STEP as usize * 100) {
                        group.select_previous();
                    }
                }
            }
            Some(Panel::Detail(detail)) => {
                let amount = u16::try_from(delta.unsigned_abs()).unwrap_or(u16::MAX);
                if delta > 0 {
                    detail.chrome.scroll_down(amount);
                } else {
                    detail.chrome.scroll_up(amount);
                }
            }
            None => {
                let Some(table) = self.tables.get_mut(&self.view) else {
                    return;
                };
                if table.rows.is_empty() {
                    table.selected = 0;
                    return;
                }
                let max = table.rows.len() as isize - 1;
                table.selected = (table.selected as isize + delta).clamp(0, max) as usize;
            }
        }
    }

    fn switch_view_by_offset(&mut self, offset: isize) -> AppCommand {
        let len = View::ALL.len() as isize;
        let index = View::ALL
            .iter()
            .position(|view| *view == self.view)
            .unwrap_or(0) as isize;
        let next = View::ALL[(index + offset).rem_euclid(len) as usize];
        self.switch_view(next)
    }

    pub fn switch_view(&mut self, view: View) -> AppCommand {
        if self.panel.take().is_some() {
            debug!("panel dropped on view switch");
        }
        self.overlay = None;
        self.view = view;
        self.status = self.view_label(view).to_string();
        self.refresh_command()
    }

    fn view_label(&self, view: View) -> &'static str {
        crate::menu::view_label(self.locale(), view)
    }

    fn execute_command_line(&mut self, line: &str) -> AppCommand {
        let normalized = line.trim_start_matches(':').trim();
        if normalized.is_empty() {
            self.status = "No command entered".to_string();
            return AppCommand::None;
        }

        let mut parts = normalized.split_whitespace();
        let command = parts.next().unwrap_or_default().to_ascii_lowercase();

        match command.as_str() {
            "q" | "quit" | "exit" => {
                self.running = false;
                self.status = "Exit requested".to_string();
                AppCommand::None
            }
            "r" | "refresh" | "reload" => self.refresh_command(),
            "help" | "h" => {
                self.show_help = true;
                AppCommand::None
            }
            "ns" | "namespace" if parts.clone().next().is_some() => {
                let namespace = parts.next().unwrap_or_default().to_string();
                self.namespace = namespace.clone();
                self.status = format!("Namespace set to '{namespace}'");
                self.refresh_command()
            }
            "theme" => match parts.next() {
                Some(token) => match crate::prefs::Theme::from_token(token) {
                    Some(theme) => {
                        self.prefs.set_theme(theme);
                        self.status = format!("Theme: {theme}");
                        AppCommand::None
                    }
                    None => {
                        self.status = format!("Unknown theme '{token}' (dark|light)");
                        AppCommand::None
                    }
                },
                None => {
                    let theme = self.prefs.toggle_theme();
                    self.status = format!("Theme: {theme}");
                    AppCommand::None
                }
            },
            "lang" | "locale" | "language" => {
                let Some(token) = parts.next() else {
                    self.status = format!("Language: {}", self.locale());
                    return AppCommand::None;
                };
                match Locale::from_token(token) {
                    Some(locale) => {
                        self.prefs.set_locale(locale);
                        self.status = format!("Language: {locale}");
                    }
                    None => self.status = format!("Unknown language '{token}' (en|es|de)"),
                }
                AppCommand::None
            }
            "create" | "new" => self.open_create_dialog(),
            "plugin" | "plugins" => {
                let Some(id) = parts.next() else {
                    let ids = self
                        .plugins
                        .iter()
                        .map(|plugin| plugin.id.as_str())
                        .collect::<Vec<_>>();
                    self.status = if ids.is_empty() {
                        "Usage: :plugin <id>".to_string()
                    } else {
                        format!("Plugins: {}", ids.join(", "))
                    };
                    return AppCommand::None;
                };
                self.status = format!("Loading plugin '{id}'");
                AppCommand::PluginSnapshot { id: id.to_string() }
            }
            "open" | "describe" => {
                let (Some(kind), Some(path)) = (parts.next(), parts.next()) else {
                    self.status = "Usage: :open <kind> <namespace>/<name>".to_string();
                    return AppCommand::None;
                };
                let (namespace, name) = match path.split_once('/') {
                    Some((namespace, name)) => (namespace.to_string(), name.to_string()),
                    None => (self.namespace.clone(), path.to_string()),
                };
                if name.is_empty() {
                    self.status = "Usage: :open <kind> <namespace>/<name>".to_string();
                    return AppCommand::None;
                }
                if matches!(kind.to_ascii_lowercase().as_str(), "ns" | "namespace") {
                    return self.open_group(name);
                }
                self.open_detail(ResourceTarget::new(
                    ResourceKind::from_token(kind),
                    namespace,
                    name,
                ))
            }
            "whoami" => {
                self.status = match &self.session {
                    SessionState::Authenticated { username } => format!("Signed in as {username}"),
                    SessionState::Checking => "Session check pending".to_string(),
                    SessionState::Public => "Not signed in".to_string(),
                };
                AppCommand::None
            }
            "logout" | "signout" => {
                self.to_public();
                self.toasts.success("Signed out");
                AppCommand::ForgetToken
            }
            token => match View::from_token(token) {
                Some(view) => self.switch_view(view),
                None => {
                    self.status = format!("Unknown command: {token}");
                    AppCommand::None
                }
            },
        }
    }

    fn to_public(&mut self) {
        self.session = SessionState::Public;
        self.mode = InputMode::Login;
        self.panel = None;
        self.overlay = None;
        self.pending_confirmation = None;
        self.dialog.close();
        self.tables.clear();
        self.login = LoginForm::default();
        self.status = self.tr(Msg::PublicNotice).to_string();
    }

    fn session_expired(&mut self) -> AppCommand {
        if self.session == SessionState::Public {
            return AppCommand::None;
        }
        self.to_public();
        self.toasts.warning("Session expired, sign in again");
        AppCommand::ForgetToken
    }

    pub fn handle_event(&mut self, event: AppEvent) -> AppCommand {
        match event {
            AppEvent::ViewLoaded {
                view,
                namespace,
                ..
            } if view.is_namespaced() && namespace != self.namespace => {
                debug!(
                    ?view,
                    %namespace,
                    current = %self.namespace,
                    "discarding view response for another namespace"
                );
                AppCommand::None
            }
            AppEvent::ViewLoaded { view, result, .. } => match result {
                Ok(table) => {
                    let selected = self.tables.get(&view).map_or(0, |table| table.selected);
                    let mut table = table;
                    table.selected = selected.min(table.rows.len().saturating_sub(1));
                    if view == self.view {
                        self.status = format!("{} ({})", self.view_label(view), table.rows.len());
                    }
                    self.tables.insert(view, table);
                    AppCommand::None
                }
                Err(error) if error.is_unauthorized() => self.session_expired(),
                Err(error) => {
                    let message = compact_error(&error);
                    self.tables
                        .entry(view)
                        .or_default()
                        .set_error(message.clone(), chrono::Local::now());
                    if view == self.view {
                        self.set_status(format!("Failed loading {}: {message}", self.view_label(view)));
                    }
                    AppCommand::None
                }
            },
            AppEvent::ResourceLoaded { generation, result } => {
                if matches!(&result, Err(error) if error.is_unauthorized()) {
                    return self.session_expired();
                }
                let Some(Panel::Detail(panel)) = self.panel.as_mut() else {
                    debug!(generation, "discarding resource response: no detail panel");
                    return AppCommand::None;
                };
                let failure = result.as_ref().err().map(compact_error);
                let target = panel.target.to_string();
                if panel.accept(generation, result.map_err(|error| compact_error(&error))) {
                    match failure {
                        Some(message) => {
                            self.toasts.error(format!("Failed to load {target}: {message}"));
                            self.set_status(format!("Failed to load {target}"));
                        }
                        None => self.status = format!("Loaded {target}"),
                    }
                }
                AppCommand::None
            }
            AppEvent::GroupLoaded { generation, result } => {
                if matches!(&result, Err(error) if error.is_unauthorized()) {
                    return self.session_expired();
                }
                let Some(Panel::Group(panel)) = self.panel.as_mut() else {
                    debug!(generation, "discarding namespace response: no group panel");
                    return AppCommand::None;
                };
                let failure = result.as_ref().err().map(compact_error);
                let namespace = panel.namespace.clone();
                if panel.accept(generation, result.map_err(|error| compact_error(&error))) {
                    match failure {
                        Some(message) => {
                            self.toasts
                                .error(format!("Failed to load namespace {namespace}: {message}"));
                        }
                        None => self.status = format!("Loaded namespace {namespace}"),
                    }
                }
                AppCommand::None
            }
            AppEvent::SubmitFinished(outcome) => {
                self.dialog.finish(&outcome);
                if !self.dialog.is_open() && self.mode == InputMode::Dialog {
                    self.mode = InputMode::Normal;
                }
                let (level, text) = match &outcome {
                    SubmitOutcome::Created(message) => (ToastLevel::Success, message.clone()),
                    SubmitOutcome::AlreadyExists(message) => (ToastLevel::Warning, message.clone()),
                    SubmitOutcome::Invalid(message) | SubmitOutcome::Failed(message) => {
                        (ToastLevel::Error, message.clone())
                    }
                };
                match self.submit_toast.take() {
                    Some(id) if self.toasts.resolve(id, level, text.clone()) => {}
                    _ => {
                        self.toasts.push(level, text);
                    }
                }
                match outcome {
                    SubmitOutcome::Created(_) => AppCommand::RefreshView {
                        view: self.view,
                        namespace: self.namespace.clone(),
                    },
                    _ => AppCommand::None,
                }
            }
            AppEvent::PluginLoaded { id, result } => {
                match result {
                    Ok(value) => {
                        let body = serde_json::to_string_pretty(&value)
                            .unwrap_or_else(|_| value.to_string());
                        self.overlay = Some((format!("Plugin {id}"), body));
                        self.status = format!("Plugin '{id}' loaded (Esc to close)");
                    }
                    Err(error) if error.is_unauthorized() => return self.session_expired(),
                    Err(error) => {
                        self.toasts
                            .error(format!("Plugin '{id}' failed: {}", compact_error(&error)));
                    }
                }
                AppCommand::None
            }
            AppEvent::LoginFinished(result) => {
                self.login.submitting = false;
                match result {
                    Ok(response) => {
                        let username = if response.user.username.is_empty() {
                            self.login.username.trim().to_string()
                        } else {
                            response.user.username.clone()
                        };
                        self.session = SessionState::Authenticated {
                            username: username.clone(),
                        };
                        self.login = LoginForm::default();
                        self.mode = InputMode::Normal;
                        self.toasts.success(format!("Signed in as {username}"));
                        AppCommand::StoreToken {
                            token: response.token,
                            then_refresh: self.view,
                        }
                    }
                    Err(ApiError::Unauthorized) => {
                        self.login.error = Some("Invalid credentials".to_string());
                        self.login.password.clear();
                        AppCommand::None
                    }
                    Err(error) => {
                        self.login.error = Some(compact_error(&error));
                        AppCommand::None
                    }
                }
            }
            AppEvent::SessionChecked(result) => match result {
                Ok(user) => {
                    self.session = SessionState::Authenticated {
                        username: user.username,
                    };
                    self.mode = InputMode::Normal;
                    self.refresh_command()
                }
                Err(error) if error.is_unauthorized() => self.session_expired(),
                Err(error) => {
                    let message = compact_error(&error);
                    self.toasts.error(format!("Backend unavailable: {message}"));
                    self.set_status(format!("Backend unavailable: {message} (r to retry)"));
                    AppCommand::None
                }
            },
        }
    }
}

pub fn compact_error(error: &ApiError) -> String {
    summarize_error_line(&error.to_string())
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
