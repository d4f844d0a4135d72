//! Remote configuration loading over HTTP

use std::time::Duration;

use log::{debug, info};
use thiserror::Error;

use crate::config_file::{Config, ConfigError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum RemoteFetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        source: reqwest::Error,
        url: String,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { status: u16, url: String },
    #[error(transparent)]
    Parse(#[from] ConfigError),
}

/// Fetch a configuration document from `url`.
///
/// The body may use either the current or the legacy (bare array) shape.
///
/// # Errors
///
/// Returns `RemoteFetchError::Request` on network failure, `Status` for a
/// non-success response, or `Parse` if the body is not a valid configuration.
pub async fn fetch_config(url: &str) -> Result<Config, RemoteFetchError> {
    let request_error = |source| RemoteFetchError::Request {
        source,
        url: url.to_string(),
    };

    debug!("Fetching remote config from {url}");
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(concat!("tooldeck/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(request_error)?;

    let response = client.get(url).send().await.map_err(request_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteFetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let body = response.text().await.map_err(request_error)?;
    let config = Config::from_json(&body, url)?;
    info!(
        "Fetched remote config from {url} ({} categories)",
        config.categories.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let result = fetch_config("not a url").await;
        assert!(matches!(result, Err(RemoteFetchError::Request { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let result = fetch_config("http://127.0.0.1:9/commands.json").await;
        assert!(matches!(result, Err(RemoteFetchError::Request { .. })));
    }
}
