use crate::publish::{PublishError, Publisher};
use crate::util::{require_secure_base, truncate_chars};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://discord.com/api/v10";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Posts to a Discord channel through the bot REST API.
#[derive(Clone)]
pub struct DiscordPublisher {
    client: reqwest::Client,
    token: SecretString,
    channel_id: String,
    base_url: String,
}

impl std::fmt::Debug for DiscordPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordPublisher")
            .field("token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl DiscordPublisher {
    pub fn new(client: reqwest::Client, token: SecretString, channel_id: impl Into<String>) -> Self {
        Self {
            client,
            token,
            channel_id: channel_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

#[async_trait]
impl Publisher for DiscordPublisher {
    async fn send_chunk(&self, chunk: &str) -> Result<(), PublishError> {
        require_secure_base(&self.base_url).map_err(|_| PublishError::InsecureBaseUrl)?;

        let url = format!("{}/channels/{}/messages", self.base_url, self.channel_id);
        let send = self
            .client
            .post(url)
            .header(
                "Authorization",
                format!("Bot {}", self.token.expose_secret()),
            )
            .json(&CreateMessage { content: chunk })
            .send();

        let response = tokio::time::timeout(REQUEST_TIMEOUT, send)
            .await
            .map_err(|_| PublishError::Timeout)?
            .map_err(PublishError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::HttpStatus {
                status: status.as_u16(),
                body: truncate_chars(&body, 200).to_string(),
            });
        }

        tracing::debug!(channel = %self.channel_id, chars = chunk.chars().count(), "Message sent to Discord");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(base: &str) -> DiscordPublisher {
        DiscordPublisher::new(
            reqwest::Client::new(),
            SecretString::from("bot-token".to_string()),
            "123456789",
        )
        .with_base_url(base)
    }

    #[tokio::test]
    async fn test_send_chunk_posts_content() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/123456789/messages"))
            .and(header("Authorization", "Bot bot-token"))
            .and(body_json(serde_json::json!({"content": "hello"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        publisher(&mock_server.uri()).send_chunk("hello").await.unwrap();
    }

    #[tokio::test]
    async fn test_long_message_posts_three_times() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/123456789/messages"))
            .respond_with(ResponseTemplate::new(200))
            .expect(3)
            .mount(&mock_server)
            .await;

        let sent = publisher(&mock_server.uri())
            .publish(&"y".repeat(4500))
            .await
            .unwrap();
        assert_eq!(sent, 3);
    }

    #[tokio::test]
    async fn test_rejected_message_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Channel"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = publisher(&mock_server.uri())
            .publish("hello")
            .await
            .unwrap_err();
        match err {
            PublishError::Chunk { index: 1, total: 1, source } => {
                assert!(matches!(*source, PublishError::HttpStatus { status: 404, .. }))
            }
            other => panic!("Expected chunk failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_http_base_rejected() {
        let result = publisher("http://discord.example.com").send_chunk("hi").await;
        assert!(matches!(result, Err(PublishError::InsecureBaseUrl)));
    }

    #[test]
    fn test_debug_masks_token() {
        let debug_output = format!("{:?}", publisher("https://discord.com/api/v10"));
        assert!(!debug_output.contains("bot-token"));
        assert!(debug_output.contains("123456789"));
    }
}
