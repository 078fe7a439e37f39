//! The activity published to the rich-presence service, and the
//! [`PresencePublisher`] seam the reconciler talks through.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::clock::to_delta;
use crate::config::{PresenceConfig, TimeDisplay};
use crate::models::Song;
use crate::template::{render, render_url};

/// Discord rejects text fields outside 2..=128 characters.
const MAX_TEXT_CHARS: usize = 128;
const MIN_TEXT_CHARS: usize = 2;
const MAX_LABEL_CHARS: usize = 32;
const MAX_BUTTONS: usize = 2;

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("presence service unavailable: {0}")]
    Connect(String),

    #[error("presence update rejected: {0}")]
    Rejected(String),
}

/// A rich-presence session. All calls block.
pub trait PresencePublisher {
    fn login(&mut self, application_id: &str) -> Result<(), PresenceError>;

    fn logout(&mut self) -> Result<(), PresenceError>;

    fn set_activity(&mut self, activity: &Activity) -> Result<(), PresenceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    /// Upper line.
    pub details: String,
    /// Lower line.
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: String,
    pub small_text: String,
    /// When the song would have started, had it played without pause.
    pub start: DateTime<Utc>,
    /// When the song will end; only set when showing remaining time.
    pub end: Option<DateTime<Utc>>,
    pub buttons: Vec<ActivityButton>,
}

/// Renders [`Activity`] values from the configured templates.
#[derive(Debug, Clone)]
pub struct ActivityTemplate {
    config: PresenceConfig,
}

impl ActivityTemplate {
    pub fn new(config: PresenceConfig) -> Self {
        Self { config }
    }

    pub fn application_id(&self) -> &str {
        &self.config.application_id
    }

    pub fn build(&self, song: &Song, position: Duration, now: DateTime<Utc>) -> Activity {
        let cfg = &self.config;

        let start = now - to_delta(position);
        let end = match cfg.time_display {
            TimeDisplay::Remaining if !song.duration.is_zero() => {
                Some(now + to_delta(song.duration.saturating_sub(position)))
            }
            _ => None,
        };

        let large_image = song
            .artwork_url
            .clone()
            .unwrap_or_else(|| cfg.large_image_fallback.clone());

        Activity {
            details: fit_text(&render(&cfg.details, song)),
            state: fit_text(&render(&cfg.state, song)),
            large_image,
            large_text: fit_text(&render(&cfg.large_text, song)),
            small_image: cfg.small_image.clone(),
            small_text: fit_text(&render(&cfg.small_text, song)),
            start,
            end,
            buttons: self.buttons(song),
        }
    }

    fn buttons(&self, song: &Song) -> Vec<ActivityButton> {
        let cfg = &self.config;
        let mut buttons = Vec::new();

        if let (Some(label), Some(url)) = (non_empty(&cfg.share_button), &song.share_url) {
            push_button(&mut buttons, label, url);
        }
        if let (Some(label), Some(template)) =
            (non_empty(&cfg.search_button), non_empty(&cfg.search_url))
        {
            push_button(&mut buttons, label, &render_url(template, song));
        }

        buttons.truncate(MAX_BUTTONS);
        buttons
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.trim().is_empty())
}

/// Only http(s) links make it into a button.
fn push_button(buttons: &mut Vec<ActivityButton>, label: &str, url: &str) {
    let Ok(parsed) = Url::parse(url) else {
        return;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return;
    }
    buttons.push(ActivityButton {
        label: truncate(label.trim(), MAX_LABEL_CHARS),
        url: parsed.to_string(),
    });
}

/// Clamp to Discord's length limits.
fn fit_text(s: &str) -> String {
    let mut out = truncate(s.trim(), MAX_TEXT_CHARS);
    while out.chars().count() < MIN_TEXT_CHARS {
        out.push(' ');
    }
    out
}

/// At most `max` chars, ending in `…` when cut.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;

    /// Publisher that records calls and fails on demand.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingPublisher {
        pub logins: usize,
        pub logouts: usize,
        pub activities: Vec<Activity>,
        pub fail_login: bool,
        pub fail_publish: bool,
    }

    impl PresencePublisher for RecordingPublisher {
        fn login(&mut self, _application_id: &str) -> Result<(), PresenceError> {
            if self.fail_login {
                return Err(PresenceError::Connect("no IPC socket".into()));
            }
            self.logins += 1;
            Ok(())
        }

        fn logout(&mut self) -> Result<(), PresenceError> {
            self.logouts += 1;
            Ok(())
        }

        fn set_activity(&mut self, activity: &Activity) -> Result<(), PresenceError> {
            if self.fail_publish {
                return Err(PresenceError::Rejected("bad payload".into()));
            }
            self.activities.push(activity.clone());
            Ok(())
        }
    }

    pub(crate) fn song(id: u64) -> Song {
        Song {
            id,
            title: "Example".into(),
            artist: "Artist".into(),
            album: "Album".into(),
            album_artist: None,
            genre: None,
            year: Some(2019),
            duration: Duration::from_secs(200),
            artwork_url: None,
            share_url: None,
            artwork_provider: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_default_template() {
        let template = ActivityTemplate::new(PresenceConfig::default());
        let activity = template.build(&song(1), Duration::from_secs(10), now());

        assert_eq!(activity.details, "Example");
        assert_eq!(activity.state, "by Artist (Album)");
        assert_eq!(activity.small_text, "Example by Artist (Album)");
        assert_eq!(activity.large_image, "applemusic");
        assert_eq!(activity.small_image, "play");
        assert_eq!(activity.start, now() - chrono::Duration::seconds(10));
        assert_eq!(activity.end, None);

        assert_eq!(activity.buttons.len(), 1);
        assert_eq!(activity.buttons[0].label, "Search on Last.fm");
        assert_eq!(
            activity.buttons[0].url,
            "https://www.last.fm/search/tracks?q=Artist%20Example"
        );
    }

    #[test]
    fn test_remaining_time() {
        let config = PresenceConfig {
            time_display: TimeDisplay::Remaining,
            ..Default::default()
        };
        let template = ActivityTemplate::new(config);
        let activity = template.build(&song(1), Duration::from_secs(50), now());
        assert_eq!(activity.end, Some(now() + chrono::Duration::seconds(150)));

        let mut stream = song(2);
        stream.duration = Duration::ZERO;
        assert_eq!(template.build(&stream, Duration::from_secs(50), now()).end, None);
    }

    #[test]
    fn test_artwork_and_share_button() {
        let template = ActivityTemplate::new(PresenceConfig::default());
        let mut s = song(1);
        s.artwork_url = Some("https://img.example/cover.jpg".into());
        s.share_url = Some("https://music.apple.com/us/album/1".into());

        let activity = template.build(&s, Duration::ZERO, now());
        assert_eq!(activity.large_image, "https://img.example/cover.jpg");
        assert_eq!(activity.buttons.len(), 2);
        assert_eq!(activity.buttons[0].label, "Listen");
        assert_eq!(activity.buttons[0].url, "https://music.apple.com/us/album/1");
    }

    #[test]
    fn test_buttons_disabled_by_empty_label() {
        let config = PresenceConfig {
            share_button: Some(String::new()),
            search_button: None,
            ..Default::default()
        };
        let mut s = song(1);
        s.share_url = Some("https://music.apple.com/us/album/1".into());
        let activity = ActivityTemplate::new(config).build(&s, Duration::ZERO, now());
        assert!(activity.buttons.is_empty());
    }

    #[test]
    fn test_non_http_share_url_dropped() {
        let config = PresenceConfig {
            search_button: None,
            ..Default::default()
        };
        let mut s = song(1);
        s.share_url = Some("spotify:track:123".into());
        let activity = ActivityTemplate::new(config).build(&s, Duration::ZERO, now());
        assert!(activity.buttons.is_empty());
    }

    #[test]
    fn test_long_button_label_clamped() {
        let config = PresenceConfig {
            search_button: Some("Search for this track on Last.fm right now".into()),
            ..Default::default()
        };
        let activity = ActivityTemplate::new(config).build(&song(1), Duration::ZERO, now());
        let label = &activity.buttons[0].label;
        assert_eq!(label.chars().count(), MAX_LABEL_CHARS);
        assert!(label.ends_with('…'));
    }

    #[test]
    fn test_fit_text() {
        assert_eq!(fit_text("a"), "a ");
        assert_eq!(fit_text("  ok  "), "ok");
        let long = "x".repeat(300);
        let fitted = fit_text(&long);
        assert_eq!(fitted.chars().count(), MAX_TEXT_CHARS);
        assert!(fitted.ends_with('…'));
    }
}
