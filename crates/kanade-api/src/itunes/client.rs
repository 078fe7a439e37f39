use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::types::ItunesSearchResponse;
use crate::error::ApiError;
use crate::http::check_response;
use crate::traits::{MetadataProvider, ProviderKind, ProviderMatch, TrackQuery};

const SEARCH_URL: &str = "https://itunes.apple.com/search";

/// iTunes Search API client. Free, no credential.
pub struct ItunesClient {
    http: Client,
}

impl ItunesClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MetadataProvider for ItunesClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Itunes
    }

    async fn search(&self, query: &TrackQuery<'_>) -> Result<ProviderMatch, ApiError> {
        if !self.accepts(query) {
            return Ok(ProviderMatch::default());
        }

        let term = [query.artist, query.album, query.title]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");

        let resp = self
            .http
            .get(SEARCH_URL)
            .query(&[("term", term.as_str()), ("limit", "1"), ("entity", "song")])
            .send()
            .await?;

        let resp = check_response(resp).await?;
        let body: ItunesSearchResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))?;

        debug!(term = %term, results = body.result_count, "iTunes search");
        Ok(body.into_match())
    }
}
