use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "dark" | "d" | "night" => Some(Self::Dark),
            "light" | "l" | "day" => Some(Self::Light),
            _ => None,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dark => write!(f, "dark"),
            Self::Light => write!(f, "light"),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Preferences {
    pub theme: Theme,
    pub locale: Locale,
}

/// Process-wide theme/locale store.
///
/// Readers take snapshots with [`PreferenceStore::current`]; writers go through
/// the setters, which notify every subscriber only when a value actually changes.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    tx: Arc<watch::Sender<Preferences>>,
}

impl PreferenceStore {
    pub fn new(initial: Preferences) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Preferences {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.tx.subscribe()
    }

    pub fn set_theme(&self, theme: Theme) -> bool {
        let changed = self.tx.send_if_modified(|prefs| {
            if prefs.theme == theme {
                return false;
            }
            prefs.theme = theme;
            true
        });
        if changed {
            debug!(%theme, "theme changed");
        }
        changed
    }

    pub fn toggle_theme(&self) -> Theme {
        let next = self.current().theme.toggled();
        self.set_theme(next);
        next
    }

    pub fn set_locale(&self, locale: Locale) -> bool {
        let changed = self.tx.send_if_modified(|prefs| {
            if prefs.locale == locale {
                return false;
            }
            prefs.locale = locale;
            true
        });
        if changed {
            debug!(%locale, "locale changed");
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::{PreferenceStore, Preferences, Theme};
    use crate::i18n::Locale;

    #[test]
    fn subscribers_see_theme_changes() {
        let store = PreferenceStore::new(Preferences::default());
        let mut rx = store.subscribe();

        assert!(store.set_theme(Theme::Light));
        assert!(rx.has_changed().unwrap_or(false));
        assert_eq!(rx.borrow_and_update().theme, Theme::Light);
    }

    #[test]
    fn unchanged_values_do_not_notify() {
        let store = PreferenceStore::new(Preferences::default());
        let rx = store.subscribe();

        assert!(!store.set_locale(Locale::En));
        assert!(!rx.has_changed().unwrap_or(true));
    }

    #[test]
    fn toggle_flips_between_themes() {
        let store = PreferenceStore::new(Preferences::default());
        assert_eq!(store.toggle_theme(), Theme::Light);
        assert_eq!(store.toggle_theme(), Theme::Dark);
        assert_eq!(store.current().theme, Theme::Dark);
    }

    #[test]
    fn clones_share_the_same_store() {
        let store = PreferenceStore::new(Preferences::default());
        let other = store.clone();
        other.set_locale(Locale::De);
        assert_eq!(store.current().locale, Locale::De);
    }
}
