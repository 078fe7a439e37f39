//! Artwork and share-link lookup across metadata providers.
//!
//! Providers are asked in priority order until every missing field is
//! filled. Each field has its own cache keyed by tag identity, and a cached
//! "not found" is honored until it expires so unavailable tracks do not
//! trigger a request every poll.

use std::sync::Arc;
use std::time::Duration;

use kanade_api::discogs::DiscogsClient;
use kanade_api::itunes::ItunesClient;
use kanade_api::lastfm::LastfmClient;
use kanade_api::{MetadataProvider, ProviderKind, TrackQuery};
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::error::KanadeError;
use crate::normalize::{album_key, track_key};

pub const ARTWORK_TTL: Duration = Duration::from_secs(60 * 60);
pub const SHARE_TTL: Duration = Duration::from_secs(60 * 60);

/// Outcome of a lookup. All fields empty means nothing was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub artwork_url: Option<String>,
    pub share_url: Option<String>,
    /// Provider the artwork came from.
    pub provider: Option<ProviderKind>,
}

#[derive(Debug, Clone)]
struct CachedArtwork {
    url: Option<String>,
    provider: Option<ProviderKind>,
}

pub struct MetadataResolver {
    providers: Vec<Box<dyn MetadataProvider>>,
    artwork_cache: TtlCache<String, CachedArtwork>,
    share_cache: TtlCache<String, Option<String>>,
}

impl MetadataResolver {
    pub fn new(providers: Vec<Box<dyn MetadataProvider>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            providers,
            artwork_cache: TtlCache::new(clock.clone()),
            share_cache: TtlCache::new(clock),
        }
    }

    /// Build the enabled providers, in configured order, on one shared HTTP client.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, KanadeError> {
        let http = kanade_api::http::build_client(config.general.request_timeout())?;
        let providers_cfg = &config.providers;

        let mut providers: Vec<Box<dyn MetadataProvider>> = Vec::new();
        for kind in providers_cfg.active() {
            let provider: Box<dyn MetadataProvider> = match kind {
                ProviderKind::Itunes => Box::new(ItunesClient::new(http.clone())),
                ProviderKind::Discogs => Box::new(DiscogsClient::new(
                    http.clone(),
                    providers_cfg.discogs.token.clone().unwrap_or_default(),
                )),
                ProviderKind::Lastfm => Box::new(LastfmClient::new(
                    http.clone(),
                    providers_cfg.lastfm.api_key.clone().unwrap_or_default(),
                )),
            };
            info!(provider = %kind, "Using metadata provider");
            providers.push(provider);
        }

        Ok(Self::new(providers, clock))
    }

    /// Drop expired cache entries.
    pub fn sweep(&self) -> usize {
        self.artwork_cache.sweep() + self.share_cache.sweep()
    }

    pub async fn resolve(&self, artist: &str, album: &str, title: &str) -> Resolution {
        let artwork_key = album_key(artist, album, title);
        let share_key = track_key(artist, album, title);

        let cached_artwork = self.artwork_cache.get(&artwork_key);
        let cached_share = self.share_cache.get(&share_key);

        if let (Some(artwork), Some(share_url)) = (&cached_artwork, &cached_share) {
            debug!(key = %artwork_key, "Got artwork and share link from cache");
            return Resolution {
                artwork_url: artwork.url.clone(),
                share_url: share_url.clone(),
                provider: artwork.provider,
            };
        }

        if artist.is_empty() && album.is_empty() && title.is_empty() {
            return Resolution::default();
        }

        let query = TrackQuery {
            artist,
            album,
            title,
        };
        let need_artwork = cached_artwork.is_none();
        let need_share = cached_share.is_none();

        let mut found_artwork: Option<(String, ProviderKind)> = None;
        let mut found_share: Option<String> = None;
        let mut any_failed = false;

        for provider in &self.providers {
            let artwork_done = !need_artwork || found_artwork.is_some();
            let share_done = !need_share || found_share.is_some();
            if artwork_done && share_done {
                break;
            }
            if !provider.accepts(&query) {
                debug!(provider = %provider.kind(), "Not enough tags for provider, skipping");
                continue;
            }

            match provider.search(&query).await {
                Ok(found) => {
                    debug!(provider = %provider.kind(), ?found, "Provider lookup");
                    if !artwork_done {
                        found_artwork = found.artwork_url.map(|url| (url, provider.kind()));
                    }
                    if !share_done {
                        found_share = found.share_url;
                    }
                }
                Err(e) => {
                    warn!(provider = %provider.kind(), error = %e, "Provider lookup failed");
                    any_failed = true;
                }
            }
        }

        let artwork = match cached_artwork {
            Some(artwork) => artwork,
            None => {
                let artwork = CachedArtwork {
                    provider: found_artwork.as_ref().map(|(_, kind)| *kind),
                    url: found_artwork.map(|(url, _)| url),
                };
                // An outage is not a "not found"; only remember real answers.
                if artwork.url.is_some() || !any_failed {
                    self.artwork_cache
                        .set(artwork_key, artwork.clone(), ARTWORK_TTL);
                }
                artwork
            }
        };

        let share_url = match cached_share {
            Some(share_url) => share_url,
            None => {
                if found_share.is_some() || !any_failed {
                    self.share_cache.set(share_key, found_share.clone(), SHARE_TTL);
                }
                found_share
            }
        };

        Resolution {
            artwork_url: artwork.url,
            share_url,
            provider: artwork.provider,
        }
    }
}
