use std::time::Duration;

use reqwest::Client;

use crate::error::ApiError;

const USER_AGENT: &str = concat!("kanade/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client shared by all providers.
///
/// Every request is bounded by `timeout`; a hung provider costs at most
/// that much of a poll.
pub fn build_client(timeout: Duration) -> Result<Client, ApiError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Turn a non-2xx response into an [`ApiError::Api`].
pub(crate) async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if resp.status().is_success() {
        Ok(resp)
    } else {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Api {
            status,
            message: body,
        })
    }
}

/// `Some(s)` unless `s` is empty or whitespace.
pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
