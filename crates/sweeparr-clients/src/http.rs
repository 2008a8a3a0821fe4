//! Transport helpers shared by every driver.

use std::time::Duration;

use reqwest::{Client, Response};
use url::Url;

use crate::error::ClientError;

/// Build the HTTP client used by a driver; cookies persist the session.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(timeout)
        .cookie_store(true)
        .build()
        .map_err(|source| ClientError::ClientBuild { source })
}

/// Join host, optional url base, and a path without doubling slashes.
pub(crate) fn join_url(host: &Url, url_base: Option<&str>, path: &str) -> String {
    let mut url = host.as_str().trim_end_matches('/').to_string();
    if let Some(base) = url_base.map(|base| base.trim_matches('/')).filter(|b| !b.is_empty()) {
        url.push('/');
        url.push_str(base);
    }
    url.push('/');
    url.push_str(path.trim_start_matches('/'));
    url
}

/// Reject non-success responses with the request context attached.
pub(crate) fn ensure_success(
    operation: &'static str,
    url: &str,
    response: Response,
) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ClientError::HttpStatus {
            operation,
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Host name of a tracker announce URL.
pub(crate) fn tracker_host(announce: &str) -> Option<String> {
    Url::parse(announce)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes_and_base() -> Result<(), url::ParseError> {
        let host = Url::parse("http://localhost:8080/")?;
        assert_eq!(
            join_url(&host, None, "/api/v2/torrents/info"),
            "http://localhost:8080/api/v2/torrents/info"
        );
        assert_eq!(
            join_url(&host, Some("/qbit/"), "api/v2/app/version"),
            "http://localhost:8080/qbit/api/v2/app/version"
        );
        assert_eq!(join_url(&host, Some(""), "json"), "http://localhost:8080/json");
        Ok(())
    }

    #[test]
    fn tracker_host_extracts_lowercase_host() {
        assert_eq!(
            tracker_host("https://Tracker.Example.org:443/announce?passkey=x"),
            Some("tracker.example.org".to_string())
        );
        assert_eq!(tracker_host("** [DHT] **"), None);
    }
}
