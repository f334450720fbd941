use crate::core::{Provider, RateError};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("ratehub/", env!("CARGO_PKG_VERSION"));

pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Issues a single GET and decodes the JSON body.
///
/// Transport failures, non-success statuses and undecodable bodies all map to
/// `RateError::Api` tagged with the provider. There is no retry. Transport errors
/// are stripped of their URL, which may carry an API key in its path.
pub async fn get_json<T: DeserializeOwned>(
    provider: Provider,
    url: &str,
    timeout: Duration,
) -> Result<T, RateError> {
    let client = http_client(timeout).map_err(|e| RateError::api(provider.label(), e))?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| {
            RateError::api(
                provider.label(),
                format!("Request error: {}", e.without_url()),
            )
        })?;

    debug!(status = %response.status(), "Received {} response", provider.label());

    if !response.status().is_success() {
        return Err(RateError::api(
            provider.label(),
            format!("HTTP error: {}", response.status()),
        ));
    }

    let text = response.text().await.map_err(|e| {
        RateError::api(
            provider.label(),
            format!("Failed to read response: {}", e.without_url()),
        )
    })?;

    serde_json::from_str(&text).map_err(|e| {
        RateError::api(
            provider.label(),
            format!("Failed to parse JSON response: {e}"),
        )
    })
}
