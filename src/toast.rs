use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const TOAST_TTL: Duration = Duration::from_secs(4);
const MAX_TOASTS: usize = 6;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ToastLevel {
    Success,
    Error,
    Warning,
    Loading,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub level: ToastLevel,
    pub text: String,
    pub created: Instant,
}

impl Toast {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.level != ToastLevel::Loading && now.duration_since(self.created) >= TOAST_TTL
    }
}

#[derive(Debug, Default)]
pub struct ToastQueue {
    items: VecDeque<Toast>,
    next_id: u64,
}

impl ToastQueue {
    pub fn push(&mut self, level: ToastLevel, text: impl Into<String>) -> u64 {
        self.push_at(level, text, Instant::now())
    }

    pub fn push_at(&mut self, level: ToastLevel, text: impl Into<String>, now: Instant) -> u64 {
        let text = text.into();
        match level {
            ToastLevel::Success | ToastLevel::Loading => info!("{text}"),
            ToastLevel::Warning => warn!("{text}"),
            ToastLevel::Error => error!("{text}"),
        }

        self.next_id += 1;
        let id = self.next_id;
        self.items.push_back(Toast {
            id,
            level,
            text,
            created: now,
        });

        while self.items.len() > MAX_TOASTS {
            let Some(position) = self
                .items
                .iter()
                .position(|toast| toast.level != ToastLevel::Loading)
            else {
                break;
            };
            self.items.remove(position);
        }
        id
    }

    pub fn success(&mut self, text: impl Into<String>) -> u64 {
        self.push(ToastLevel::Success, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> u64 {
        self.push(ToastLevel::Error, text)
    }

    pub fn warning(&mut self, text: impl Into<String>) -> u64 {
        self.push(ToastLevel::Warning, text)
    }

    pub fn loading(&mut self, text: impl Into<String>) -> u64 {
        self.push(ToastLevel::Loading, text)
    }

    /// Replaces a pending loading toast with its final outcome. The expiry
    /// clock restarts from `now`.
    pub fn resolve_at(
        &mut self,
        id: u64,
        level: ToastLevel,
        text: impl Into<String>,
        now: Instant,
    ) -> bool {
        let Some(toast) = self.items.iter_mut().find(|toast| toast.id == id) else {
            return false;
        };
        toast.level = level;
        toast.text = text.into();
        toast.created = now;
        true
    }

    pub fn resolve(&mut self, id: u64, level: ToastLevel, text: impl Into<String>) -> bool {
        self.resolve_at(id, level, text, Instant::now())
    }

    pub fn prune(&mut self, now: Instant) {
        self.items.retain(|toast| !toast.is_expired(now));
    }

    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{TOAST_TTL, ToastLevel, ToastQueue};
    use std::time::{Duration, Instant};

    #[test]
    fn toasts_expire_after_ttl() {
        let mut queue = ToastQueue::default();
        let start = Instant::now();
        queue.push_at(ToastLevel::Success, "created", start);
        queue.push_at(ToastLevel::Error, "failed", start);

        queue.prune(start + Duration::from_secs(1));
        assert_eq!(queue.visible().count(), 2);

        queue.prune(start + TOAST_TTL);
        assert!(queue.is_empty());
    }

    #[test]
    fn loading_toasts_persist_until_resolved() {
        let mut queue = ToastQueue::default();
        let start = Instant::now();
        let id = queue.push_at(ToastLevel::Loading, "applying", start);

        queue.prune(start + TOAST_TTL * 10);
        assert_eq!(queue.visible().count(), 1);

        let resolved_at = start + TOAST_TTL * 10;
        assert!(queue.resolve_at(id, ToastLevel::Success, "applied", resolved_at));
        queue.prune(resolved_at + Duration::from_millis(10));
        assert_eq!(queue.visible().count(), 1);
        queue.prune(resolved_at + TOAST_TTL);
        assert!(queue.is_empty());
    }

    #[test]
    fn resolving_unknown_id_is_rejected() {
        let mut queue = ToastQueue::default();
        assert!(!queue.resolve(42, ToastLevel::Success, "nope"));
    }

    #[test]
    fn queue_drops_oldest_transient_toast_when_full() {
        let mut queue = ToastQueue::default();
        let start = Instant::now();
        let pinned = queue.push_at(ToastLevel::Loading, "pinned", start);
        for index in 0..10 {
            queue.push_at(ToastLevel::Warning, format!("warn {index}"), start);
        }

        assert_eq!(queue.visible().count(), 6);
        assert!(queue.visible().any(|toast| toast.id == pinned));
        assert_eq!(
            queue.visible().last().map(|toast| toast.text.as_str()),
            Some("warn 9")
        );
    }
}
