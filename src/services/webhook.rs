use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::WebhookSettings;

/// Errors that can occur when posting to the chat webhook
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Webhook rejected message ({status}): {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("Webhook unavailable after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

/// Message body accepted by the webhook
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Chat webhook client
///
/// Posts `{"content": ...}` messages. Server errors and transport failures
/// are retried with exponential backoff; client errors fail straight away.
pub struct WebhookClient {
    url: String,
    client: Client,
    max_retries: u32,
    initial_backoff: Duration,
}

impl WebhookClient {
    /// Create a new webhook client
    pub fn new(
        url: String,
        timeout: Duration,
        max_retries: u32,
        initial_backoff: Duration,
    ) -> Result<Self, WebhookError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url,
            client,
            max_retries,
            initial_backoff,
        })
    }

    /// Create a client from settings, `None` when no webhook URL is configured
    pub fn from_settings(settings: &WebhookSettings) -> Result<Option<Self>, WebhookError> {
        settings
            .url
            .as_ref()
            .map(|url| {
                Self::new(
                    url.clone(),
                    Duration::from_secs(settings.timeout_secs),
                    settings.max_retries,
                    Duration::from_millis(settings.initial_backoff_ms),
                )
            })
            .transpose()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// First try plus retries
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Post a message to the webhook
    pub async fn post_message(&self, content: &str) -> Result<(), WebhookError> {
        let payload = WebhookMessage { content };
        let attempts = self.attempts();
        let mut backoff = self.initial_backoff;

        for attempt in 1..=attempts {
            let last_error = match self.client.post(&self.url).json(&payload).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Webhook accepted message ({} chars)", content.len());
                    return Ok(());
                }
                Ok(response) if response.status().is_client_error() => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unable to read body".to_string());
                    tracing::error!("Webhook rejected message: {} - {}", status, body);
                    return Err(WebhookError::Rejected { status, body });
                }
                Ok(response) => format!("server responded {}", response.status()),
                Err(e) => e.to_string(),
            };

            if attempt == attempts {
                return Err(WebhookError::Exhausted { attempts, last_error });
            }

            tracing::warn!(
                "Webhook attempt {}/{} failed ({}), retrying in {:?}",
                attempt,
                attempts,
                last_error,
                backoff
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        // attempts is at least 1, so the loop always returns
        Err(WebhookError::Exhausted {
            attempts,
            last_error: "no attempt made".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard, max_retries: u32) -> WebhookClient {
        WebhookClient::new(
            format!("{}/hook", server.url()),
            Duration::from_secs(5),
            max_retries,
            Duration::from_millis(1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_content_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({ "content": "hello" })))
            .with_status(200)
            .create_async()
            .await;

        client_for(&server, 0).post_message("hello").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(400)
            .with_body("bad payload")
            .expect(1)
            .create_async()
            .await;

        let result = client_for(&server, 3).post_message("hello").await;

        assert!(matches!(
            &result,
            Err(WebhookError::Rejected { status, body }) if *status == StatusCode::BAD_REQUEST && body == "bad payload"
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/hook")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let result = client_for(&server, 2).post_message("hello").await;

        assert!(matches!(result, Err(WebhookError::Exhausted { attempts: 3, .. })));
        mock.assert_async().await;
    }

    #[test]
    fn test_attempts_do_not_overflow() {
        let client = WebhookClient::new(
            "http://localhost/hook".to_string(),
            Duration::from_secs(1),
            u32::MAX,
            Duration::from_millis(1),
        )
        .unwrap();
        assert_eq!(client.attempts(), u32::MAX);

        let settings = WebhookSettings {
            url: Some("http://localhost/hook".to_string()),
            ..WebhookSettings::default()
        };
        let client = WebhookClient::from_settings(&settings).unwrap().unwrap();
        assert_eq!(client.attempts(), 4);
    }

    #[test]
    fn test_no_url_means_no_client() {
        let settings = WebhookSettings::default();
        assert!(WebhookClient::from_settings(&settings).unwrap().is_none());
    }
}
