use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::DiscogsSearchResponse;
use crate::error::ApiError;
use crate::http::check_response;
use crate::traits::{MetadataProvider, ProviderKind, ProviderMatch, TrackQuery};

const SEARCH_URL: &str = "https://api.discogs.com/database/search";

/// Discogs database search, authenticated with a personal access token.
pub struct DiscogsClient {
    token: String,
    http: Client,
}

impl DiscogsClient {
    pub fn new(http: Client, token: String) -> Self {
        Self { token, http }
    }

    fn auth_header(&self) -> String {
        format!("Discogs token={}", self.token)
    }
}

#[async_trait]
impl MetadataProvider for DiscogsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Discogs
    }

    /// Both filters empty is an unfiltered database search.
    fn accepts(&self, query: &TrackQuery<'_>) -> bool {
        query.has_artist() || query.has_album()
    }

    async fn search(&self, query: &TrackQuery<'_>) -> Result<ProviderMatch, ApiError> {
        if !self.accepts(query) {
            return Ok(ProviderMatch::default());
        }

        let resp = self
            .http
            .get(SEARCH_URL)
            .header("Authorization", self.auth_header())
            .query(&[
                ("artist", query.artist),
                ("release_title", query.album),
                ("type", "release"),
                ("per_page", "1"),
            ])
            .send()
            .await?;

        let resp = check_response(resp).await?;
        let body: DiscogsSearchResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        debug!(
            artist = query.artist,
            album = query.album,
            results = body.results.len(),
            "Discogs search"
        );
        Ok(body.into_match())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query<'a>(artist: &'a str, album: &'a str) -> TrackQuery<'a> {
        TrackQuery {
            artist,
            album,
            title: "Song",
        }
    }

    #[test]
    fn test_accepts() {
        let client = DiscogsClient::new(Client::new(), "token".into());
        assert!(client.accepts(&query("Artist", "")));
        assert!(!client.accepts(&query("", "")));
        assert!(client.accepts(&query("Artist", "Album")));
    }
}
