//! Trait definitions for metadata providers.
//!
//! All providers (iTunes, Discogs, Last.fm) implement [`MetadataProvider`],
//! so the resolver can walk a configured list without knowing which
//! service it is talking to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Identifies a metadata provider in config and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Itunes,
    Discogs,
    Lastfm,
}

impl ProviderKind {
    pub const ALL: &[ProviderKind] = &[Self::Itunes, Self::Discogs, Self::Lastfm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Itunes => "itunes",
            Self::Discogs => "discogs",
            Self::Lastfm => "lastfm",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the player told us about the track.
#[derive(Debug, Clone, Copy)]
pub struct TrackQuery<'a> {
    pub artist: &'a str,
    pub album: &'a str,
    pub title: &'a str,
}

impl TrackQuery<'_> {
    pub fn has_artist(&self) -> bool {
        !self.artist.trim().is_empty()
    }

    pub fn has_album(&self) -> bool {
        !self.album.trim().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_artist() && !self.has_album() && self.title.trim().is_empty()
    }
}

/// What a provider found. Both fields empty means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderMatch {
    pub artwork_url: Option<String>,
    pub share_url: Option<String>,
}

impl ProviderMatch {
    pub fn is_empty(&self) -> bool {
        self.artwork_url.is_none() && self.share_url.is_none()
    }
}

/// A source of album artwork and share links.
///
/// One call is one HTTP request; implementations do not retry.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether `query` has the fields this provider searches on. A query
    /// without them would match arbitrary records, so it is not sent.
    fn accepts(&self, query: &TrackQuery<'_>) -> bool {
        !query.is_empty()
    }

    async fn search(&self, query: &TrackQuery<'_>) -> Result<ProviderMatch, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_fields() {
        let stream = TrackQuery {
            artist: "",
            album: " ",
            title: "Radio X",
        };
        assert!(!stream.has_artist());
        assert!(!stream.has_album());
        assert!(!stream.is_empty());

        let blank = TrackQuery {
            artist: "",
            album: "",
            title: "  ",
        };
        assert!(blank.is_empty());
    }
}
