//! Turns raw MPD responses into [`PlaybackSnapshot`]s.
//!
//! Song metadata is resolved once per queue id and cached; the position is
//! parsed fresh on every poll.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use kanade_mpd::{Attrs, MpdError, PlayerSource};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::models::{PlaybackSnapshot, PlaybackState, Song};
use crate::resolver::MetadataResolver;

pub const SONG_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("player error: {0}")]
    Player(#[from] MpdError),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}`: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("track changed during poll (status says {expected}, current song is {actual})")]
    TrackChanged { expected: u64, actual: u64 },
}

pub struct SnapshotBuilder {
    song_cache: TtlCache<u64, Arc<Song>>,
    resolver: MetadataResolver,
}

impl SnapshotBuilder {
    pub fn new(resolver: MetadataResolver, clock: Arc<dyn Clock>) -> Self {
        Self {
            song_cache: TtlCache::new(clock),
            resolver,
        }
    }

    /// Drop expired songs, artwork and share links.
    pub fn sweep(&self) -> usize {
        self.song_cache.sweep() + self.resolver.sweep()
    }

    /// Build a snapshot from a `status` response, asking `player` for the
    /// current song only when its id is not cached.
    pub async fn build<P: PlayerSource>(
        &self,
        status: &Attrs,
        player: &mut P,
    ) -> Result<PlaybackSnapshot, SnapshotError> {
        let state = PlaybackState::parse(field(status, "state")?);
        if !state.is_playing() {
            return Ok(PlaybackSnapshot::idle(state));
        }

        let song_id = parse_id(status, "songid")?;
        let position = parse_position(status)?;

        if let Some(song) = self.song_cache.get(&song_id) {
            debug!(song_id, "Got song from cache");
            return Ok(PlaybackSnapshot::playing(song, position));
        }

        let track = player.current_track().await?;
        let track_id = parse_id(&track, "Id")?;
        if track_id != song_id {
            return Err(SnapshotError::TrackChanged {
                expected: song_id,
                actual: track_id,
            });
        }

        let song = Arc::new(self.resolve_song(song_id, &track).await?);
        self.song_cache.set(song_id, song.clone(), SONG_TTL);
        Ok(PlaybackSnapshot::playing(song, position))
    }

    async fn resolve_song(&self, id: u64, track: &Attrs) -> Result<Song, SnapshotError> {
        let title = track_title(track);
        let artist = tag(track, "Artist").unwrap_or_default();
        let album = tag(track, "Album").unwrap_or_default();
        let duration = parse_duration(track)?;

        let resolution = self.resolver.resolve(&artist, &album, &title).await;
        if let Some(provider) = resolution.provider {
            info!(song_id = id, %provider, "Found artwork");
        }

        Ok(Song {
            id,
            title,
            artist,
            album,
            album_artist: tag(track, "AlbumArtist"),
            genre: tag(track, "Genre"),
            year: track.get("Date").and_then(|d| parse_year(d)),
            duration,
            artwork_url: resolution.artwork_url,
            share_url: resolution.share_url,
            artwork_provider: resolution.provider,
        })
    }
}

fn field<'a>(attrs: &'a Attrs, name: &'static str) -> Result<&'a str, SnapshotError> {
    attrs
        .get(name)
        .map(String::as_str)
        .ok_or(SnapshotError::MissingField(name))
}

fn invalid(field: &'static str, value: &str) -> SnapshotError {
    SnapshotError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn tag(attrs: &Attrs, name: &str) -> Option<String> {
    attrs
        .get(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_id(attrs: &Attrs, name: &'static str) -> Result<u64, SnapshotError> {
    let raw = field(attrs, name)?;
    raw.trim().parse().map_err(|_| invalid(name, raw))
}

fn parse_seconds(name: &'static str, raw: &str) -> Result<Duration, SnapshotError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .ok_or_else(|| invalid(name, raw))
}

/// Fractional `elapsed` when the daemon sends it, else the whole seconds
/// before the colon in `time` (`"10:200"`).
fn parse_position(status: &Attrs) -> Result<Duration, SnapshotError> {
    if let Some(elapsed) = status.get("elapsed") {
        return parse_seconds("elapsed", elapsed);
    }
    let time = field(status, "time")?;
    let (elapsed, _) = time.split_once(':').unwrap_or((time, ""));
    parse_seconds("time", elapsed)
}

/// Streams have no duration and get zero; a malformed one is an error.
fn parse_duration(track: &Attrs) -> Result<Duration, SnapshotError> {
    if let Some(duration) = track.get("duration") {
        return parse_seconds("duration", duration);
    }
    match track.get("Time") {
        Some(time) => parse_seconds("Time", time),
        None => Ok(Duration::ZERO),
    }
}

/// Leading year of a `Date` tag: `2019-05-01` → 2019.
fn parse_year(date: &str) -> Option<i32> {
    date.trim().split('-').next()?.trim().parse().ok()
}

/// `Title`, then a stream's `Name`, then the file name.
fn track_title(track: &Attrs) -> String {
    tag(track, "Title")
        .or_else(|| tag(track, "Name"))
        .or_else(|| {
            track.get("file").and_then(|f| {
                Path::new(f)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
        })
        .unwrap_or_default()
}
