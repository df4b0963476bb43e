use crate::i18n::Msg;
use crate::manifest::{ManifestFormat, ManifestView, generate_manifest};
use crate::model::{HealthStatus, NamespaceGroup, ResourceItem, ResourceTarget, SyncStatus};
use ratatui::layout::{Position, Rect};
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a panel stays on screen in the closing state before it is dropped.
pub const PANEL_CLOSE_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum DetailTab {
    #[default]
    Summary,
    Events,
    Logs,
}

impl DetailTab {
    pub const ALL: [Self; 3] = [Self::Summary, Self::Events, Self::Logs];

    pub fn msg(self) -> Msg {
        match self {
            Self::Summary => Msg::Summary,
            Self::Events => Msg::Events,
            Self::Logs => Msg::Logs,
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let index = Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PanelPhase {
    Open,
    Closing { since: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelLoad<T> {
    Loading,
    Ready(T),
    Failed(String),
}

/// Lifecycle shared by every slide-in panel: fetch generation, deferred close
/// and the last area the panel was drawn into.
#[derive(Debug, Clone)]
pub struct PanelChrome {
    pub generation: u64,
    pub phase: PanelPhase,
    pub area: Option<Rect>,
    pub scroll: u16,
}

impl PanelChrome {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            phase: PanelPhase::Open,
            area: None,
            scroll: 0,
        }
    }

    pub fn is_closing(&self) -> bool {
        matches!(self.phase, PanelPhase::Closing { .. })
    }

    /// Starts the close animation. Returns false when already closing.
    pub fn request_close(&mut self, now: Instant) -> bool {
        if self.is_closing() {
            return false;
        }
        self.phase = PanelPhase::Closing { since: now };
        true
    }

    /// True once the close delay has elapsed and the panel can be dropped.
    pub fn poll_close(&self, now: Instant) -> bool {
        match self.phase {
            PanelPhase::Open => false,
            PanelPhase::Closing { since } => now.duration_since(since) >= PANEL_CLOSE_DELAY,
        }
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        self.area
            .is_some_and(|area| area.contains(Position::new(column, row)))
    }

    fn admits(&self, generation: u64, what: &str) -> bool {
        if generation != self.generation {
            debug!(
                generation,
                current = self.generation,
                "discarding stale {what} response"
            );
            return false;
        }
        if self.is_closing() {
            debug!(generation, "discarding {what} response for closing panel");
            return false;
        }
        true
    }

    pub fn scroll_down(&mut self, amount: u16) {
        self.scroll = self.scroll.saturating_add(amount);
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.scroll = self.scroll.saturating_sub(amount);
    }
}

#[derive(Debug, Clone)]
pub struct DetailPanel {
    pub target: ResourceTarget,
    pub chrome: PanelChrome,
    pub load: PanelLoad<Box<ResourceItem>>,
    pub tab: DetailTab,
    pub manifest_view: ManifestView,
    pub manifest_format: ManifestFormat,
}

impl DetailPanel {
    pub fn open(target: ResourceTarget, generation: u64) -> Self {
        Self {
            target,
            chrome: PanelChrome::new(generation),
            load: PanelLoad::Loading,
            tab: DetailTab::default(),
            manifest_view: ManifestView::default(),
            manifest_format: ManifestFormat::default(),
        }
    }

    /// Commits a fetch result. Responses for an older generation, or arriving
    /// after close was requested, are dropped.
    pub fn accept(&mut self, generation: u64, result: Result<ResourceItem, String>) -> bool {
        if !self.chrome.admits(generation, "resource") {
            return false;
        }
        self.load = match result {
            Ok(item) => PanelLoad::Ready(Box::new(item)),
            Err(message) => PanelLoad::Failed(message),
        };
        true
    }

    pub fn resource(&self) -> Option<&ResourceItem> {
        match &self.load {
            PanelLoad::Ready(item) => Some(item),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.load {
            PanelLoad::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load, PanelLoad::Loading)
    }

    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.resource().map(ResourceItem::sync_status)
    }

    pub fn health_status(&self) -> Option<HealthStatus> {
        self.resource().map(ResourceItem::health_status)
    }

    pub fn manifest_text(&self) -> String {
        generate_manifest(
            &self.target,
            self.resource(),
            self.manifest_view,
            self.manifest_format,
        )
    }

    pub fn next_tab(&mut self) {
        self.tab = self.tab.next();
        self.chrome.scroll = 0;
    }

    pub fn previous_tab(&mut self) {
        self.tab = self.tab.previous();
        self.chrome.scroll = 0;
    }

    pub fn cycle_manifest_view(&mut self) {
        self.manifest_view = self.manifest_view.next();
        self.chrome.scroll = 0;
    }

    pub fn toggle_manifest_format(&mut self) {
        self.manifest_format = self.manifest_format.toggled();
    }
}

#[derive(Debug, Clone)]
pub struct GroupPanel {
    pub namespace: String,
    pub chrome: PanelChrome,
    pub load: PanelLoad<NamespaceGroup>,
    pub selected: usize,
}

impl GroupPanel {
    pub fn open(namespace: impl Into<String>, generation: u64) -> Self {
        Self {
            namespace: namespace.into(),
            chrome: PanelChrome::new(generation),
            load: PanelLoad::Loading,
            selected: 0,
        }
    }

    pub fn accept(&mut self, generation: u64, result: Result<NamespaceGroup, String>) -> bool {
        if !self.chrome.admits(generation, "namespace") {
            return false;
        }
        self.selected = 0;
        self.load = match result {
            Ok(group) => PanelLoad::Ready(group),
            Err(message) => PanelLoad::Failed(message),
        };
        true
    }

    pub fn group(&self) -> Option<&NamespaceGroup> {
        match &self.load {
            PanelLoad::Ready(group) => Some(group),
            _ => None,
        }
    }

    pub fn select_next(&mut self) {
        let len = self.group().map_or(0, |group| group.members.len());
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_target(&self) -> Option<ResourceTarget> {
        let member = self.group()?.members.get(self.selected)?;
        Some(member.target(&self.namespace))
    }
}

#[derive(Debug, Clone)]
pub enum Panel {
    Detail(DetailPanel),
    Group(GroupPanel),
}

impl Panel {
    pub fn chrome(&self) -> &PanelChrome {
        match self {
            Self::Detail(panel) => &panel.chrome,
            Self::Group(panel) => &panel.chrome,
        }
    }

    pub fn chrome_mut(&mut self) -> &mut PanelChrome {
        match self {
            Self::Detail(panel) => &mut panel.chrome,
            Self::Group(panel) => &mut panel.chrome,
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::Detail(panel) => panel.target.to_string(),
            Self::Group(panel) => format!("Namespace {}", panel.namespace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DetailPanel, DetailTab, GroupPanel, PANEL_CLOSE_DELAY, PanelLoad};
    use crate::manifest::{DIFF_UNAVAILABLE, ManifestFormat, ManifestView};
    use crate::model::{
        NamespaceGroup, ResourceItem, ResourceKind, ResourceTarget, SyncStatus,
    };
    use ratatui::layout::Rect;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn service(name: &str, cluster_ip: &str) -> ResourceItem {
        ResourceItem::from_value(
            &ResourceKind::Service,
            json!({"metadata": {"name": name}, "spec": {"clusterIP": cluster_ip}}),
        )
        .expect("service parses")
    }

    fn target(name: &str) -> ResourceTarget {
        ResourceTarget::new(ResourceKind::Service, "default", name)
    }

    #[test]
    fn panel_starts_loading_and_commits_current_generation() {
        let mut panel = DetailPanel::open(target("svc-a"), 3);
        assert!(panel.is_loading());

        assert!(panel.accept(3, Ok(service("svc-a", "10.1.2.3"))));
        assert_eq!(panel.sync_status(), Some(SyncStatus::Synced));
    }

    #[test]
    fn stale_generation_is_discarded() {
        let mut panel = DetailPanel::open(target("svc-b"), 7);
        assert!(!panel.accept(6, Ok(service("svc-a", "10.1.2.3"))));
        assert!(panel.is_loading());
    }

    #[test]
    fn results_after_close_request_are_discarded() {
        let mut panel = DetailPanel::open(target("svc-a"), 1);
        let now = Instant::now();
        assert!(panel.chrome.request_close(now));
        assert!(!panel.accept(1, Ok(service("svc-a", "10.1.2.3"))));
        assert!(panel.resource().is_none());
    }

    #[test]
    fn failure_suppresses_body_without_retry() {
        let mut panel = DetailPanel::open(target("svc-a"), 1);
        assert!(panel.accept(1, Err("HTTP 500".to_string())));
        assert_eq!(panel.error(), Some("HTTP 500"));
        assert!(panel.sync_status().is_none());
        assert!(matches!(panel.load, PanelLoad::Failed(_)));
    }

    #[test]
    fn close_completes_after_delay() {
        let mut panel = DetailPanel::open(target("svc-a"), 1);
        let now = Instant::now();
        assert!(!panel.chrome.poll_close(now));

        panel.chrome.request_close(now);
        assert!(!panel.chrome.request_close(now));
        assert!(!panel.chrome.poll_close(now + Duration::from_millis(100)));
        assert!(panel.chrome.poll_close(now + PANEL_CLOSE_DELAY));
    }

    #[test]
    fn click_hit_testing_uses_last_rendered_area() {
        let mut panel = DetailPanel::open(target("svc-a"), 1);
        assert!(!panel.chrome.contains(50, 5));

        panel.chrome.area = Some(Rect::new(40, 2, 30, 20));
        assert!(panel.chrome.contains(50, 5));
        assert!(!panel.chrome.contains(10, 5));
    }

    #[test]
    fn tabs_and_manifest_views_cycle() {
        let mut panel = DetailPanel::open(target("svc-a"), 1);
        panel.next_tab();
        assert_eq!(panel.tab, DetailTab::Events);
        panel.previous_tab();
        panel.previous_tab();
        assert_eq!(panel.tab, DetailTab::Logs);

        panel.cycle_manifest_view();
        assert_eq!(panel.manifest_view, ManifestView::Diff);
        assert_eq!(panel.manifest_text(), DIFF_UNAVAILABLE);

        panel.toggle_manifest_format();
        assert_eq!(panel.manifest_format, ManifestFormat::Json);
    }

    #[test]
    fn group_panel_selects_members_for_drill_down() {
        let mut panel = GroupPanel::open("apps", 2);
        let group = NamespaceGroup::from_value(
            "apps",
            json!({
                "status": "Active",
                "resources": {
                    "services": [
                        {"metadata": {"name": "a"}, "spec": {"clusterIP": "10.0.0.1"}},
                        {"metadata": {"name": "b"}, "spec": {"clusterIP": "10.0.0.2"}}
                    ]
                }
            }),
        )
        .expect("group parses");

        assert!(!panel.accept(1, Ok(group.clone())));
        assert!(panel.accept(2, Ok(group)));

        panel.select_next();
        panel.select_next();
        let selected = panel.selected_target().expect("member selected");
        assert_eq!(selected.name, "b");
        assert_eq!(selected.namespace, "apps");
        assert_eq!(selected.kind, ResourceKind::Service);
    }
}
