// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page body, treating non-success statuses as errors.
pub async fn fetch_text(client: &reqwest::Client, url: &str, timeout: Duration) -> Result<String> {
    let response = client.get(url).timeout(timeout).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::status(url, status.as_u16()));
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_text_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/News/Notice"))
            .and(header("User-Agent", "newsbell-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<a href=\"/x\">x</a>"))
            .mount(&server)
            .await;

        let config = CrawlerConfig {
            user_agent: "newsbell-test".into(),
            ..CrawlerConfig::default()
        };
        let client = create_async_client(&config).unwrap();
        let url = format!("{}/News/Notice", server.uri());
        let body = fetch_text(&client, &url, Duration::from_secs(5)).await.unwrap();
        assert!(body.contains("href"));
    }

    #[tokio::test]
    async fn test_fetch_text_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = create_async_client(&CrawlerConfig::default()).unwrap();
        let url = format!("{}/News/Update", server.uri());
        match fetch_text(&client, &url, Duration::from_secs(5)).await {
            Err(AppError::Status { status, .. }) => assert_eq!(status, 502),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_text_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = create_async_client(&CrawlerConfig::default()).unwrap();
        let result = fetch_text(&client, &server.uri(), Duration::from_millis(50)).await;
        assert!(result.unwrap_err().is_fetch_error());
    }
}
