use std::sync::Arc;
use std::time::Duration;

use kanade_api::ProviderKind;

/// A queued track with its resolved metadata.
///
/// `id` is MPD's queue id: stable while the song stays queued, not across
/// daemon restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub duration: Duration,
    pub artwork_url: Option<String>,
    pub share_url: Option<String>,
    pub artwork_provider: Option<ProviderKind>,
}

/// Player state as reported in MPD's `state` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    Other(String),
}

impl PlaybackState {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "play" => Self::Playing,
            "pause" => Self::Paused,
            "stop" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Playing => write!(f, "play"),
            Self::Paused => write!(f, "pause"),
            Self::Stopped => write!(f, "stop"),
            Self::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// One poll's observation of the player.
///
/// `song` is only present while playing; `position` is zero otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub song: Option<Arc<Song>>,
    pub position: Duration,
}

impl PlaybackSnapshot {
    pub fn idle(state: PlaybackState) -> Self {
        Self {
            state,
            song: None,
            position: Duration::ZERO,
        }
    }

    pub fn playing(song: Arc<Song>, position: Duration) -> Self {
        Self {
            state: PlaybackState::Playing,
            song: Some(song),
            position,
        }
    }

    /// The song and position, if something is playing.
    pub fn now_playing(&self) -> Option<(&Song, Duration)> {
        match (&self.state, &self.song) {
            (PlaybackState::Playing, Some(song)) => Some((song.as_ref(), self.position)),
            _ => None,
        }
    }
}
