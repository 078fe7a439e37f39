use serde::Deserialize;

use crate::http::non_empty;
use crate::traits::ProviderMatch;

const SITE_URL: &str = "https://www.discogs.com";

#[derive(Debug, Deserialize)]
pub struct DiscogsSearchResponse {
    #[serde(default)]
    pub results: Vec<DiscogsResult>,
}

#[derive(Debug, Deserialize)]
pub struct DiscogsResult {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub thumb: Option<String>,
    pub cover_image: Option<String>,
    pub uri: Option<String>,
}

impl DiscogsSearchResponse {
    /// Map the first release. Discogs serves a `spacer.gif` when a release
    /// has no image, which is as good as nothing.
    pub fn into_match(self) -> ProviderMatch {
        let Some(release) = self.results.into_iter().next() else {
            return ProviderMatch::default();
        };

        let is_image = |url: &String| !url.ends_with("spacer.gif");
        let artwork_url = non_empty(release.thumb)
            .filter(is_image)
            .or(non_empty(release.cover_image).filter(is_image));

        let share_url = non_empty(release.uri).map(|uri| {
            if uri.starts_with("http") {
                uri
            } else {
                format!("{SITE_URL}{uri}")
            }
        });

        ProviderMatch {
            artwork_url,
            share_url,
        }
    }
}
