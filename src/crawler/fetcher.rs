//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and referer
//! - GET requests that keep HTTP error responses instead of failing
//! - Skipping responses that are not HTML

use crate::config::UserAgentConfig;
use crate::LexiError;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;

/// A fetched HTML page
///
/// `status_code` may be an error code; such pages are parsed for links but
/// not stored.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    pub status_code: u16,
    pub body: String,
}

/// Result of a fetch that reached the server
#[derive(Debug)]
pub enum FetchOutcome {
    Page(FetchedPage),

    /// The response declared a non-HTML Content-Type
    NotHtml { content_type: String },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent and referer to send
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use lexicrawl::config::UserAgentConfig;
/// use lexicrawl::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     user_agent: "LexiCrawlBot/1.0".to_string(),
///     referer: "https://www.google.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, LexiError> {
    let mut headers = HeaderMap::new();
    let referer = HeaderValue::from_str(&config.referer).map_err(|e| {
        LexiError::Config(crate::ConfigError::Validation(format!(
            "Invalid referer '{}': {}",
            config.referer, e
        )))
    })?;
    headers.insert(REFERER, referer);

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|source| LexiError::Http {
            url: String::new(),
            source,
        })
}

/// Fetches pages with a shared client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GETs `url`
    ///
    /// HTTP error statuses are returned as pages, not errors. Only transport
    /// failures (connection, timeout, body decoding) produce `Err`.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, LexiError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| LexiError::Http {
                url: url.to_string(),
                source,
            })?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        if let Some(content_type) = content_type {
            if !is_html(&content_type) {
                return Ok(FetchOutcome::NotHtml { content_type });
            }
        }

        let body = response.text().await.map_err(|source| LexiError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(FetchOutcome::Page(FetchedPage {
            url: final_url,
            status_code,
            body,
        }))
    }
}

fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            user_agent: "TestBot/1.0".to_string(),
            referer: "https://www.google.com".to_string(),
        }
    }

    fn fetcher() -> Fetcher {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap();
        Fetcher::new(client)
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(15));
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_referer() {
        let mut config = create_test_config();
        config.referer = "bad\nvalue".to_string();
        assert!(build_http_client(&config, Duration::from_secs(15)).is_err());
    }

    #[tokio::test]
    async fn test_fetch_sends_identification_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(header("user-agent", "TestBot/1.0"))
            .and(header("referer", "https://www.google.com"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = fetcher().fetch(&server.uri()).await.unwrap();
        match outcome {
            FetchOutcome::Page(page) => {
                assert_eq!(page.status_code, 200);
                assert_eq!(page.body, "<p>ok</p>");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_error_is_a_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_raw("<p>gone</p>", "text/html"))
            .mount(&server)
            .await;

        let outcome = fetcher()
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap();
        assert!(matches!(outcome, FetchOutcome::Page(page) if page.status_code == 404));
    }

    #[tokio::test]
    async fn test_non_html_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let outcome = fetcher().fetch(&server.uri()).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::NotHtml { .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_an_error() {
        let result = fetcher().fetch("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(LexiError::Http { .. })));
    }
}
