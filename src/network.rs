//! Request helpers shared by the sources
//!
//! Every request carries the referer of the site it targets. Responses are
//! checked for Cloudflare challenges and error statuses before the body is
//! read.

use crate::config::HttpConfig;
use crate::error::{Result, SourceError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Build the HTTP client used for every source
pub fn build_client(config: &HttpConfig) -> std::result::Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    ClientBuilder::new()
        .timeout(config.timeout())
        .user_agent(config.user_agent.as_str())
        .cookie_store(config.enable_cookies)
        .gzip(config.enable_compression)
        .brotli(config.enable_compression)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .default_headers(headers)
        .build()
}

/// Map a response status and headers to the error taxonomy
pub fn check_status(url: &str, status: StatusCode, headers: &HeaderMap) -> Result<()> {
    let challenged = headers
        .get("cf-mitigated")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("challenge"));
    if challenged || status == StatusCode::SERVICE_UNAVAILABLE {
        return Err(SourceError::Cloudflare { url: url.to_string() });
    }
    if status == StatusCode::FORBIDDEN {
        return Err(SourceError::Forbidden { url: url.to_string() });
    }
    if !status.is_success() {
        return Err(SourceError::Status {
            status,
            url: url.to_string(),
        });
    }
    Ok(())
}

pub fn decode_json<T: DeserializeOwned>(url: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|source| SourceError::Json {
        url: url.to_string(),
        source,
    })
}

/// Send a prepared request and return the checked headers and body
pub async fn send_text(url: &str, request: RequestBuilder) -> Result<(HeaderMap, String)> {
    log::debug!("GET {}", url);
    let response = request.send().await?;
    check_status(url, response.status(), response.headers())?;
    let headers = response.headers().clone();
    let body = response.text().await?;
    Ok((headers, body))
}

pub async fn fetch_text(client: &Client, url: &str, referer: &str) -> Result<String> {
    let request = client.get(url).header(REFERER, referer);
    let (_, body) = send_text(url, request).await?;
    Ok(body)
}

pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str, referer: &str) -> Result<T> {
    let body = fetch_text(client, url, referer).await?;
    decode_json(url, &body)
}

pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    client: &Client,
    url: &str,
    referer: &str,
    body: &B,
) -> Result<T> {
    let request = client.post(url).header(REFERER, referer).json(body);
    let (_, text) = send_text(url, request).await?;
    decode_json(url, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = build_client(&HttpConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_cloudflare_statuses() {
        let empty = HeaderMap::new();
        let err = check_status("u", StatusCode::SERVICE_UNAVAILABLE, &empty).unwrap_err();
        assert!(matches!(err, SourceError::Cloudflare { .. }));

        let mut challenged = HeaderMap::new();
        challenged.insert("cf-mitigated", HeaderValue::from_static("challenge"));
        let err = check_status("u", StatusCode::OK, &challenged).unwrap_err();
        assert!(matches!(err, SourceError::Cloudflare { .. }));
    }

    #[test]
    fn test_error_statuses() {
        let empty = HeaderMap::new();
        assert!(matches!(
            check_status("u", StatusCode::FORBIDDEN, &empty),
            Err(SourceError::Forbidden { .. })
        ));
        assert!(matches!(
            check_status("u", StatusCode::NOT_FOUND, &empty),
            Err(SourceError::Status { status: StatusCode::NOT_FOUND, .. })
        ));
        assert!(check_status("u", StatusCode::OK, &empty).is_ok());
    }

    #[test]
    fn test_decode_json_reports_url() {
        let err = decode_json::<serde_json::Value>("https://x.test/api", "{oops").unwrap_err();
        assert!(err.to_string().contains("https://x.test/api"));
    }
}
