use serde::Deserialize;

use crate::http::non_empty;
use crate::traits::ProviderMatch;

#[derive(Debug, Deserialize)]
pub struct ItunesSearchResponse {
    #[serde(rename = "resultCount")]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<ItunesTrack>,
}

#[derive(Debug, Deserialize)]
pub struct ItunesTrack {
    #[serde(rename = "artworkUrl100")]
    pub artwork_url_100: Option<String>,
    #[serde(rename = "trackViewUrl")]
    pub track_view_url: Option<String>,
    #[serde(rename = "collectionViewUrl")]
    pub collection_view_url: Option<String>,
}

impl ItunesSearchResponse {
    /// Map the first hit, if any.
    pub fn into_match(self) -> ProviderMatch {
        if self.result_count == 0 {
            return ProviderMatch::default();
        }
        let Some(track) = self.results.into_iter().next() else {
            return ProviderMatch::default();
        };
        ProviderMatch {
            artwork_url: non_empty(track.artwork_url_100),
            share_url: non_empty(track.track_view_url).or(non_empty(track.collection_view_url)),
        }
    }
}
