use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use kanade_api::ProviderKind;
use serde::{Deserialize, Serialize};

use crate::error::KanadeError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
///
/// Sections missing from a user file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub mpd: MpdConfig,
    pub providers: ProvidersConfig,
    pub presence: PresenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub poll_interval_secs: u64,
    pub seek_slack_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpdConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub order: Vec<ProviderKind>,
    pub itunes: ServiceToggle,
    pub discogs: DiscogsConfig,
    pub lastfm: LastfmConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceToggle {
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscogsConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastfmConfig {
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub api_key: Option<String>,
}

fn enabled() -> bool {
    true
}

/// Whether the presence shows time elapsed or time remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeDisplay {
    #[default]
    Elapsed,
    Remaining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub application_id: String,
    pub details: String,
    pub state: String,
    pub large_text: String,
    pub small_text: String,
    pub large_image_fallback: String,
    pub small_image: String,
    pub time_display: TimeDisplay,
    pub share_button: Option<String>,
    pub search_button: Option<String>,
    pub search_url: Option<String>,
    pub republish_on_failure: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            seek_slack_secs: 2,
            request_timeout_secs: 5,
        }
    }
}

impl GeneralConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// How far the position may advance between two polls and still count
    /// as the same playback.
    pub fn seek_tolerance(&self) -> Duration {
        self.poll_interval() + Duration::from_secs(self.seek_slack_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for MpdConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 6600,
            password: None,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: ProviderKind::ALL.to_vec(),
            itunes: ServiceToggle { enabled: true },
            discogs: DiscogsConfig {
                enabled: true,
                token: None,
            },
            lastfm: LastfmConfig {
                enabled: true,
                api_key: None,
            },
        }
    }
}

impl ProvidersConfig {
    /// Providers that are enabled and have their credential, in priority
    /// order, without duplicates.
    pub fn active(&self) -> Vec<ProviderKind> {
        let mut active = Vec::new();
        for kind in &self.order {
            if !active.contains(kind) && self.is_usable(*kind) {
                active.push(*kind);
            }
        }
        active
    }

    fn is_usable(&self, kind: ProviderKind) -> bool {
        let has = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        match kind {
            ProviderKind::Itunes => self.itunes.enabled,
            ProviderKind::Discogs => self.discogs.enabled && has(&self.discogs.token),
            ProviderKind::Lastfm => self.lastfm.enabled && has(&self.lastfm.api_key),
        }
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            application_id: "1037215044141854721".into(),
            details: "{title}".into(),
            state: "by {artist} ({album})".into(),
            large_text: "{title}".into(),
            small_text: "{title} by {artist} ({album})".into(),
            large_image_fallback: "applemusic".into(),
            small_image: "play".into(),
            time_display: TimeDisplay::Elapsed,
            share_button: Some("Listen".into()),
            search_button: Some("Search on Last.fm".into()),
            search_url: Some("https://www.last.fm/search/tracks?q={artist} {title}".into()),
            republish_on_failure: false,
        }
    }
}

impl AppConfig {
    /// Load the user config file if it exists, otherwise the built-in defaults.
    pub fn load() -> Result<Self, KanadeError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            Self::load_from(&user_path)
        } else {
            Self::builtin()
        }
    }

    /// Load a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, KanadeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KanadeError::Config(format!("{}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| KanadeError::Config(format!("{}: {e}", path.display())))
    }

    /// The embedded `config/default.toml`.
    pub fn builtin() -> Result<Self, KanadeError> {
        toml::from_str(DEFAULT_CONFIG).map_err(|e| KanadeError::Config(e.to_string()))
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), KanadeError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), KanadeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| KanadeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "kanade")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_matches_default() {
        let builtin = AppConfig::builtin().unwrap();
        assert_eq!(builtin, AppConfig::default());
        assert_eq!(builtin.general.poll_interval_secs, 5);
        assert_eq!(builtin.mpd.port, 6600);
        assert_eq!(builtin.presence.time_display, TimeDisplay::Elapsed);
    }

    #[test]
    fn test_partial_user_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [presence]
            time_display = "remaining"

            [providers.discogs]
            token = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.presence.time_display, TimeDisplay::Remaining);
        assert_eq!(config.presence.details, "{title}");
        assert_eq!(config.general.poll_interval_secs, 5);
        assert_eq!(config.mpd.host, "localhost");
        assert_eq!(config.providers.discogs.token.as_deref(), Some("abc"));
        assert!(config.providers.discogs.enabled);
    }

    #[test]
    fn test_active_providers() {
        let mut providers = ProvidersConfig::default();
        assert_eq!(providers.active(), vec![ProviderKind::Itunes]);

        providers.discogs.token = Some("token".into());
        providers.lastfm.api_key = Some("  ".into());
        assert_eq!(
            providers.active(),
            vec![ProviderKind::Itunes, ProviderKind::Discogs]
        );

        providers.order = vec![
            ProviderKind::Discogs,
            ProviderKind::Itunes,
            ProviderKind::Discogs,
        ];
        providers.itunes.enabled = false;
        assert_eq!(providers.active(), vec![ProviderKind::Discogs]);
    }

    #[test]
    fn test_tolerance() {
        let general = GeneralConfig::default();
        assert_eq!(general.seek_tolerance(), Duration::from_secs(7));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.mpd.port = 6601;
        config.presence.time_display = TimeDisplay::Remaining;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\npoll_interval_secs = \"soon\"\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(KanadeError::Config(_))
        ));
    }
}
