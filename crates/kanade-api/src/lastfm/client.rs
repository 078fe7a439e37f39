use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::LastfmAlbumInfoResponse;
use crate::error::ApiError;
use crate::traits::{MetadataProvider, ProviderKind, ProviderMatch, TrackQuery};

const BASE_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Last.fm `album.getinfo` client, authenticated with an API key.
pub struct LastfmClient {
    api_key: String,
    http: Client,
}

impl LastfmClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { api_key, http }
    }
}

#[async_trait]
impl MetadataProvider for LastfmClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Lastfm
    }

    /// `album.getinfo` needs both names.
    fn accepts(&self, query: &TrackQuery<'_>) -> bool {
        query.has_artist() && query.has_album()
    }

    async fn search(&self, query: &TrackQuery<'_>) -> Result<ProviderMatch, ApiError> {
        if !self.accepts(query) {
            return Ok(ProviderMatch::default());
        }

        let resp = self
            .http
            .get(BASE_URL)
            .query(&[
                ("method", "album.getinfo"),
                ("artist", query.artist),
                ("album", query.album),
                ("api_key", self.api_key.as_str()),
                ("autocorrect", "1"),
                ("format", "json"),
            ])
            .send()
            .await?;

        // Error bodies carry the Last.fm error code, so parse before
        // looking at the HTTP status.
        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body: LastfmAlbumInfoResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !(200..300).contains(&status) => {
                return Err(ApiError::Api {
                    status,
                    message: text,
                })
            }
            Err(e) => return Err(ApiError::Parse(e.to_string())),
        };

        debug!(
            artist = query.artist,
            album = query.album,
            error = ?body.error,
            "Last.fm album.getinfo"
        );
        body.into_match(status)
    }
}
