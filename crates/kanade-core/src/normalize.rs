//! Identity keys for the artwork and share-link caches.
//!
//! A key depends only on the tags that identify a release or track, never
//! on the song's queue id or playback position, so replays of an album hit
//! the cache even after the song itself was dropped from the song cache.

use unicode_normalization::UnicodeNormalization;
use url::form_urlencoded;

/// Key for a release's artwork: shared by every track of an album.
///
/// Singles and streams carry no album, so their artwork is keyed per track.
pub fn album_key(artist: &str, album: &str, title: &str) -> String {
    if album.trim().is_empty() {
        track_key(artist, album, title)
    } else {
        identity_key(&[artist, album])
    }
}

/// Key for a single track.
pub fn track_key(artist: &str, album: &str, title: &str) -> String {
    identity_key(&[artist, album, title])
}

/// Normalize and query-escape each part, then join with `|`.
///
/// Escaping turns any `|` inside a part into `%7C`, so the separator is
/// unambiguous.
pub fn identity_key(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| form_urlencoded::byte_serialize(normalize(p).as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("|")
}

/// NFKC + lowercase + whitespace collapse.
fn normalize(s: &str) -> String {
    s.nfkc()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
