use serde::Deserialize;

use crate::error::ApiError;
use crate::http::non_empty;
use crate::traits::ProviderMatch;

/// Last.fm error code for an unknown artist/album.
pub const ERROR_NOT_FOUND: u32 = 6;

/// `album.getinfo` reply. Last.fm reports failures in-band, so the body is
/// either an `album` or an `error` + `message`.
#[derive(Debug, Deserialize)]
pub struct LastfmAlbumInfoResponse {
    pub album: Option<LastfmAlbum>,
    pub error: Option<u32>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LastfmAlbum {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub image: Vec<LastfmImage>,
}

#[derive(Debug, Deserialize)]
pub struct LastfmImage {
    #[serde(rename = "#text")]
    pub url: String,
    #[serde(default)]
    pub size: String,
}

impl LastfmImage {
    fn rank(&self) -> u8 {
        match self.size.as_str() {
            "small" => 1,
            "medium" => 2,
            "large" => 3,
            "extralarge" => 4,
            "mega" => 5,
            _ => 0,
        }
    }
}

impl LastfmAlbumInfoResponse {
    pub fn into_match(self, status: u16) -> Result<ProviderMatch, ApiError> {
        match self.error {
            Some(ERROR_NOT_FOUND) => return Ok(ProviderMatch::default()),
            Some(code) => {
                return Err(ApiError::Api {
                    status,
                    message: format!(
                        "Last.fm error {code}: {}",
                        self.message.unwrap_or_default()
                    ),
                })
            }
            None => {}
        }

        let Some(album) = self.album else {
            return Ok(ProviderMatch::default());
        };

        let artwork_url = album
            .image
            .into_iter()
            .filter(|img| !img.url.trim().is_empty())
            .max_by_key(LastfmImage::rank)
            .map(|img| img.url);

        Ok(ProviderMatch {
            artwork_url,
            share_url: non_empty(album.url),
        })
    }
}
