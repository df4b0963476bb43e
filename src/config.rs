use crate::cli::CliArgs;
use crate::i18n::Locale;
use crate::prefs::{Preferences, Theme};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:4000";
const DEFAULT_REFRESH_MS: u64 = 5_000;
const MIN_REFRESH_MS: u64 = 500;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct PluginShortcut {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(alias = "api", alias = "backend_url")]
    pub api_url: Option<String>,
    pub refresh_ms: Option<u64>,
    #[serde(alias = "timeout_secs")]
    pub request_timeout_secs: Option<u64>,
    #[serde(alias = "namespace")]
    pub default_namespace: Option<String>,
    pub theme: Option<Theme>,
    pub locale: Option<Locale>,
    pub plugins: Vec<PluginShortcut>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

/// The only state persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
}

impl SessionFile {
    /// A missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read session {}", path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse session {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_yaml::to_string(self).context("failed to encode session")?;
        fs::write(path, raw).with_context(|| format!("failed to write session {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
    pub namespace: String,
    pub refresh: Duration,
    pub request_timeout: Duration,
    pub preferences: Preferences,
    pub plugins: Vec<PluginShortcut>,
    pub config_source: Option<String>,
}

impl Settings {
    /// Layers CLI flags over the session file over the config file.
    pub fn resolve(
        cli: &CliArgs,
        config: Option<(PathBuf, ConfigFile)>,
        session: &SessionFile,
    ) -> Result<Self> {
        let (config_source, config) = match config {
            Some((path, config)) => (Some(path.display().to_string()), config),
            None => (None, ConfigFile::default()),
        };

        let theme = match cli.theme.as_deref() {
            Some(token) => Theme::from_token(token)
                .with_context(|| format!("unknown theme `{token}` (expected dark or light)"))?,
            None => session.theme.or(config.theme).unwrap_or_default(),
        };
        let locale = match cli.locale.as_deref() {
            Some(token) => Locale::from_token(token)
                .with_context(|| format!("unknown locale `{token}` (expected en, es or de)"))?,
            None => session.locale.or(config.locale).unwrap_or_default(),
        };

        let refresh_ms = cli
            .refresh_ms
            .or(config.refresh_ms)
            .unwrap_or(DEFAULT_REFRESH_MS)
            .max(MIN_REFRESH_MS);
        let timeout_secs = config
            .request_timeout_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Ok(Self {
            api_url: cli
                .api_url
                .clone()
                .or(config.api_url)
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token: cli
                .token
                .clone()
                .or_else(|| session.token.clone())
                .filter(|token| !token.trim().is_empty()),
            namespace: cli
                .namespace
                .clone()
                .or(config.default_namespace)
                .filter(|namespace| !namespace.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            refresh: Duration::from_millis(refresh_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            preferences: Preferences { theme, locale },
            plugins: config.plugins,
            config_source,
        })
    }
}

pub fn load_discovered_config() -> Result<Option<(PathBuf, ConfigFile)>> {
    let Some(path) = discover_config_path() else {
        return Ok(None);
    };
    let config = ConfigFile::load(&path)?;
    Ok(Some((path, config)))
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("STELLAR_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("stellar-deck.yaml"),
        PathBuf::from("stellar-deck.yml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/stellar-deck/config.yaml"),
            PathBuf::from(&home).join(".config/stellar-deck/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

pub fn session_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("STELLAR_SESSION")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config/stellar-deck/session.yaml"))
}

/// Commit hash baked in at build time.
pub fn commit_hash() -> &'static str {
    option_env!("STELLAR_COMMIT_HASH").unwrap_or("dev")
}

pub fn environment_label() -> &'static str {
    if cfg!(debug_assertions) {
        "development"
    } else {
        "production"
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigFile, DEFAULT_API_URL, SessionFile, Settings};
    use crate::cli::CliArgs;
    use crate::i18n::Locale;
    use crate::prefs::Theme;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn config_file_parses_with_aliases() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stellar-deck.yaml");
        fs::write(
            &path,
            "api: http://backend:4000\nnamespace: apps\ntheme: light\nplugins:\n  - id: cluster-status\n    description: Cluster status\n",
        )
        .expect("write config");

        let config = ConfigFile::load(&path).expect("config parses");
        assert_eq!(config.api_url.as_deref(), Some("http://backend:4000"));
        assert_eq!(config.default_namespace.as_deref(), Some("apps"));
        assert_eq!(config.theme, Some(Theme::Light));
        assert_eq!(config.plugins[0].id, "cluster-status");
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "refresh_ms: [oops").expect("write config");

        let error = ConfigFile::load(&path).expect_err("config is invalid");
        assert!(format!("{error:#}").contains("broken.yaml"));
    }

    #[test]
    fn session_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/session.yaml");
        assert_eq!(
            SessionFile::load(&path).expect("missing is empty"),
            SessionFile::default()
        );

        let session = SessionFile {
            token: Some("jwt".to_string()),
            theme: Some(Theme::Light),
            locale: Some(Locale::Es),
        };
        session.save(&path).expect("session saves");
        assert_eq!(SessionFile::load(&path).expect("session loads"), session);
    }

    #[test]
    fn cli_overrides_session_and_config() {
        let cli = CliArgs {
            theme: Some("dark".to_string()),
            refresh_ms: Some(10),
            ..CliArgs::default()
        };
        let config = ConfigFile {
            theme: Some(Theme::Light),
            locale: Some(Locale::De),
            default_namespace: Some("apps".to_string()),
            ..ConfigFile::default()
        };
        let session = SessionFile {
            token: Some("stored".to_string()),
            locale: Some(Locale::Es),
            ..SessionFile::default()
        };

        let settings = Settings::resolve(&cli, Some(("cfg.yaml".into(), config)), &session)
            .expect("settings resolve");
        assert_eq!(settings.preferences.theme, Theme::Dark);
        assert_eq!(settings.preferences.locale, Locale::Es);
        assert_eq!(settings.namespace, "apps");
        assert_eq!(settings.token.as_deref(), Some("stored"));
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.refresh, Duration::from_millis(500));
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn unknown_theme_flag_is_rejected() {
        let cli = CliArgs {
            theme: Some("sepia".to_string()),
            ..CliArgs::default()
        };
        assert!(Settings::resolve(&cli, None, &SessionFile::default()).is_err());
    }
}
